/*
 *  display/components/gradient.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Horizontal gradient bars used for the header and footer
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

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// Navy to mid blue, left to right
pub const BAR_START: Rgb888 = Rgb888::new(0, 34, 85);
pub const BAR_END: Rgb888 = Rgb888::new(0, 102, 204);

/// Left-to-right linear gradient, constant down each column.
#[derive(Debug, Clone, Copy)]
pub struct GradientBar {
    pub start: Rgb888,
    pub end: Rgb888,
}

impl Default for GradientBar {
    fn default() -> Self {
        Self { start: BAR_START, end: BAR_END }
    }
}

impl GradientBar {
    /// Colour of column `x` in a bar `width` pixels wide. Channels truncate,
    /// so the last column hits `end` exactly and the first hits `start`.
    pub fn column_color(&self, x: u32, width: u32) -> Rgb888 {
        if width <= 1 {
            return self.start;
        }
        let ratio = x.min(width - 1) as f32 / (width - 1) as f32;
        let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * ratio) as u8;
        Rgb888::new(
            lerp(self.start.r(), self.end.r()),
            lerp(self.start.g(), self.end.g()),
            lerp(self.start.b(), self.end.b()),
        )
    }

    pub fn draw<D>(&self, target: &mut D, area: Rectangle) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let Size { width, height } = area.size;
        if width == 0 || height == 0 {
            return Ok(());
        }
        let row: Vec<Rgb888> = (0..width).map(|x| self.column_color(x, width)).collect();
        target.fill_contiguous(&area, (0..height).flat_map(|_| row.iter().copied()))
    }
}
