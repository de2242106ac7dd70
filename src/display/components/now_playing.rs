/*
 *  display/components/now_playing.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Record details, footer and framed cover art
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use embedded_graphics::mono_font::{
    ascii::{FONT_10X20, FONT_6X10, FONT_9X15_BOLD},
    MonoTextStyle,
};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyleBuilder, Rectangle, StrokeAlignment};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use embedded_text::{
    alignment::{HorizontalAlignment, VerticalAlignment},
    style::TextBoxStyleBuilder,
    TextBox,
};

use super::gradient::GradientBar;
use crate::record::{CoverArt, RecordMetadata};

pub const FOOTER_HEIGHT: u32 = 20;
pub const TEXT_LEFT: i32 = 10;
pub const TITLE_Y: i32 = 40;
pub const LINE_SPACING: i32 = 30;
pub const CODE_Y: i32 = TITLE_Y + 4 * LINE_SPACING;

pub const COVER_TOP: i32 = 80;
/// Distance from the cover's left edge to the right edge of the screen
pub const COVER_RIGHT_INSET: i32 = 130;
pub const SHADOW_OFFSET: i32 = 4;
pub const BORDER_WIDTH: u32 = 2;
pub const SHADOW: Rgb888 = Rgb888::new(128, 128, 128);

/// Everything on the now-playing screen below the clock bar.
#[derive(Debug, Clone, Copy, Default)]
pub struct NowPlayingPanel {
    pub gradient: GradientBar,
}

impl NowPlayingPanel {
    pub fn render<D>(&self, target: &mut D, record: &RecordMetadata) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888> + OriginDimensions,
    {
        let Size { width, height } = target.size();
        self.render_footer(target, width, height, &record.section)?;

        let medium = MonoTextStyle::new(&FONT_9X15_BOLD, Rgb888::WHITE);
        let line_w = width.saturating_sub(2 * TEXT_LEFT as u32);
        for (text, y) in [(&record.title, TITLE_Y), (&record.artists, TITLE_Y + LINE_SPACING)] {
            single_line(target, text, Point::new(TEXT_LEFT, y), line_w, medium)?;
        }

        let huge = MonoTextStyle::new(&FONT_10X20, Rgb888::WHITE);
        Text::with_baseline(&record.code, Point::new(TEXT_LEFT, CODE_Y), huge, Baseline::Top)
            .draw(target)?;

        if let Some(cover) = record.cover.as_ref() {
            let origin = Point::new(width as i32 - COVER_RIGHT_INSET, COVER_TOP);
            framed_cover(target, cover, origin)?;
        }
        Ok(())
    }

    fn render_footer<D>(&self, target: &mut D, width: u32, height: u32, section: &str) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let top = height as i32 - FOOTER_HEIGHT as i32;
        self.gradient
            .draw(target, Rectangle::new(Point::new(0, top), Size::new(width, FOOTER_HEIGHT)))?;

        let small = MonoTextStyle::new(&FONT_6X10, Rgb888::WHITE);
        let text_y = top + 2;
        Text::with_baseline("Now Playing", Point::new(5, text_y), small, Baseline::Top)
            .draw(target)?;

        let right = TextStyleBuilder::new()
            .alignment(Alignment::Right)
            .baseline(Baseline::Top)
            .build();
        Text::with_text_style(section, Point::new(width as i32 - 10, text_y), small, right)
            .draw(target)?;
        Ok(())
    }
}

/// One row of text, wrapped rows beyond the first are dropped.
fn single_line<D>(
    target: &mut D,
    text: &str,
    origin: Point,
    width: u32,
    style: MonoTextStyle<'_, Rgb888>,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let row_h = style.font.character_size.height;
    let textbox_style = TextBoxStyleBuilder::new()
        .alignment(HorizontalAlignment::Left)
        .vertical_alignment(VerticalAlignment::Top)
        .build();
    TextBox::with_textbox_style(text, Rectangle::new(origin, Size::new(width, row_h)), style, textbox_style)
        .draw(target)?;
    Ok(())
}

/// Cover over a drop shadow, inside a white border.
fn framed_cover<D>(target: &mut D, cover: &CoverArt, origin: Point) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let size = Size::new(cover.width(), cover.height());
    let pad = SHADOW_OFFSET as u32;

    Rectangle::new(origin + Point::new(SHADOW_OFFSET, SHADOW_OFFSET), size + Size::new(pad, pad))
        .into_styled(PrimitiveStyleBuilder::new().fill_color(SHADOW).build())
        .draw(target)?;

    let b = BORDER_WIDTH as i32;
    // spans origin-2 ..= origin+edge+2, stroke drawn inward
    Rectangle::new(origin - Point::new(b, b), size + Size::new(2 * BORDER_WIDTH + 1, 2 * BORDER_WIDTH + 1))
        .into_styled(
            PrimitiveStyleBuilder::new()
                .stroke_color(Rgb888::WHITE)
                .stroke_width(BORDER_WIDTH)
                .stroke_alignment(StrokeAlignment::Inside)
                .build(),
        )
        .draw(target)?;

    let (w, h) = (cover.width(), cover.height());
    let pixels = (0..h).flat_map(|y| {
        (0..w).map(move |x| {
            let [r, g, b] = cover.rgb_at(x, y);
            Rgb888::new(r, g, b)
        })
    });
    target.fill_contiguous(&Rectangle::new(origin, size), pixels)
}
