/*
 *  display/components/clock.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Header bar with the wall clock
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

use chrono::NaiveTime;
use embedded_graphics::mono_font::{ascii::FONT_6X10, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::{Baseline, Text};

use super::gradient::GradientBar;

/// Clock inset from the top-left corner of the bar
pub const CLOCK_ORIGIN: Point = Point::new(5, 2);

/// Gradient strip across the top of the screen with HH:MM at the left.
#[derive(Debug, Clone, Copy)]
pub struct ClockBar {
    pub height: u32,
    pub gradient: GradientBar,
}

impl ClockBar {
    pub fn new(height: u32) -> Self {
        Self { height, gradient: GradientBar::default() }
    }

    pub fn format(now: NaiveTime) -> String {
        now.format("%H:%M").to_string()
    }

    pub fn render<D>(&self, target: &mut D, now: NaiveTime) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888> + OriginDimensions,
    {
        let width = target.size().width;
        self.gradient
            .draw(target, Rectangle::new(Point::zero(), Size::new(width, self.height)))?;

        let style = MonoTextStyle::new(&FONT_6X10, Rgb888::WHITE);
        Text::with_baseline(&Self::format(now), CLOCK_ORIGIN, style, Baseline::Top)
            .draw(target)?;
        Ok(())
    }
}
