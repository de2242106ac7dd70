/*
 *  display/framebuffer.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  RGB frame handed from the renderer to a display sink
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
use crate::display::error::DisplayError;
use crate::vframebuf::VarFrameBuf;

/// One full screen of 24-bit colour.
///
/// Frames are plain data: renderers draw into them through `DrawTarget`,
/// sinks read them back out in whatever wire format the panel wants.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    fb: VarFrameBuf<Rgb888>,
}

impl Frame {
    /// Black frame of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self { fb: VarFrameBuf::new(width, height, Rgb888::BLACK) }
    }

    pub fn filled(width: u32, height: u32, color: Rgb888) -> Self {
        Self { fb: VarFrameBuf::new(width, height, color) }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.fb.width() as u32, self.fb.height() as u32)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        self.fb.pixel(x as usize, y as usize)
    }

    pub fn pixels(&self) -> &[Rgb888] {
        self.fb.as_slice()
    }

    /// Draw target for embedded-graphics
    pub fn target(&mut self) -> &mut VarFrameBuf<Rgb888> {
        &mut self.fb
    }

    /// Linear per-channel mix of `self` towards `other`.
    ///
    /// `alpha` is clamped to [0, 1]; 0 yields `self`, 1 yields `other`.
    pub fn blend(&self, other: &Frame, alpha: f32) -> Result<Frame, DisplayError> {
        if self.dimensions() != other.dimensions() {
            return Err(DisplayError::BufferSizeMismatch {
                expected: self.fb.as_slice().len(),
                actual: other.fb.as_slice().len(),
            });
        }
        let alpha = if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) };
        if alpha == 0.0 {
            return Ok(self.clone());
        }
        if alpha == 1.0 {
            return Ok(other.clone());
        }

        let (w, h) = self.dimensions();
        let mut out = VarFrameBuf::new(w, h, Rgb888::BLACK);
        let mix = |a: u8, b: u8| -> u8 {
            (a as f32 + (b as f32 - a as f32) * alpha).round().clamp(0.0, 255.0) as u8
        };
        for ((dst, a), b) in out
            .as_mut_slice()
            .iter_mut()
            .zip(self.fb.as_slice())
            .zip(other.fb.as_slice())
        {
            *dst = Rgb888::new(mix(a.r(), b.r()), mix(a.g(), b.g()), mix(a.b(), b.b()));
        }
        Ok(Frame { fb: out })
    }

    /// RGB565, big-endian, row-major. What MIPI-DCS panels take on RAMWR
    /// with COLMOD 0x55.
    pub fn to_rgb565_be(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.fb.as_slice().len() * 2);
        for c in self.fb.as_slice() {
            let v: u16 = ((c.r() as u16 & 0xF8) << 8)
                | ((c.g() as u16 & 0xFC) << 3)
                | (c.b() as u16 >> 3);
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        bytes
    }

    /// Copy into an RGBA8 buffer (alpha opaque). `dst` must be exactly
    /// `width * height * 4` bytes.
    pub fn write_rgba(&self, dst: &mut [u8]) -> Result<(), DisplayError> {
        let expected = self.fb.as_slice().len() * 4;
        if dst.len() != expected {
            return Err(DisplayError::BufferSizeMismatch { expected, actual: dst.len() });
        }
        for (px, c) in dst.chunks_exact_mut(4).zip(self.fb.as_slice()) {
            px.copy_from_slice(&[c.r(), c.g(), c.b(), 0xFF]);
        }
        Ok(())
    }
}
