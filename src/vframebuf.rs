/*
 *  vframebuf.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Runtime-sized embedded-graphics draw target
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

use core::convert::Infallible;
use embedded_graphics::pixelcolor::PixelColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// Framebuffer whose dimensions are only known once config is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct VarFrameBuf<C: PixelColor> {
    pixels: Vec<C>,
    cols: usize,
    rows: usize,
}

impl<C: PixelColor> VarFrameBuf<C> {
    pub fn new(width: u32, height: u32, fill: C) -> Self {
        let (cols, rows) = (width as usize, height as usize);
        Self { pixels: vec![fill; cols * rows], cols, rows }
    }

    pub fn width(&self) -> usize { self.cols }
    pub fn height(&self) -> usize { self.rows }

    /// Row-major pixels
    pub fn as_slice(&self) -> &[C] { &self.pixels }

    pub fn as_mut_slice(&mut self) -> &mut [C] { &mut self.pixels }

    pub fn pixel(&self, x: usize, y: usize) -> Option<C> {
        (x < self.cols && y < self.rows).then(|| self.pixels[y * self.cols + x])
    }

    pub fn clear_color(&mut self, color: C) {
        self.pixels.fill(color);
    }

    #[inline]
    fn offset(&self, p: Point) -> Option<usize> {
        let x = usize::try_from(p.x).ok().filter(|&x| x < self.cols)?;
        let y = usize::try_from(p.y).ok().filter(|&y| y < self.rows)?;
        Some(y * self.cols + x)
    }
}

impl<C: PixelColor> OriginDimensions for VarFrameBuf<C> {
    fn size(&self) -> Size {
        Size::new(self.cols as u32, self.rows as u32)
    }
}

impl<C: PixelColor> DrawTarget for VarFrameBuf<C> {
    type Color = C;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.offset(p) {
                self.pixels[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.clear_color(color);
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        // colors are consumed row-major over the whole area, clipped or not
        if area.is_zero_sized() {
            return Ok(());
        }
        if self.bounding_box().intersection(area) != *area {
            for (p, c) in area.points().zip(colors) {
                if let Some(i) = self.offset(p) {
                    self.pixels[i] = c;
                }
            }
            return Ok(());
        }

        // fully on screen: straight row copies
        let (x0, y0) = (area.top_left.x as usize, area.top_left.y as usize);
        let run = area.size.width as usize;
        let mut colors = colors.into_iter();
        for y in y0..y0 + area.size.height as usize {
            let row = &mut self.pixels[y * self.cols + x0..][..run];
            for (dst, c) in row.iter_mut().zip(colors.by_ref()) {
                *dst = c;
            }
        }
        Ok(())
    }
}
