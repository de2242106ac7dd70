/*
 *  display/traits.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display sink contract shared by the panel and emulator backends
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

use crate::display::error::DisplayError;
use crate::display::framebuffer::Frame;

/// Which kind of sink is behind the trait object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// SPI TFT panel
    Tft,
    /// Desktop window
    Emulator,
    /// Frame recorder, tests only
    Mock,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Tft => "tft",
            Backend::Emulator => "emulator",
            Backend::Mock => "mock",
        }
    }
}

/// Display capabilities and metadata
#[derive(Debug, Clone)]
pub struct DisplayCapabilities {
    /// Display width in pixels
    pub width: u32,

    /// Display height in pixels
    pub height: u32,

    pub backend: Backend,

    /// Controller name for logging, e.g. "ST7789"
    pub controller: &'static str,
}

/// Everything the session loop needs from a screen.
///
/// `show` may block, but only for as long as it takes to push one frame.
/// `shutdown` blanks whatever is visible and releases the hardware; it is
/// best-effort, never fails, and is safe to call more than once.
pub trait DisplaySink: Send {
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the display dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Bring the hardware up. Called once by the factory.
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Present one full frame
    fn show(&mut self, frame: &Frame) -> Result<(), DisplayError>;

    /// Blank the visible output
    fn clear(&mut self) -> Result<(), DisplayError> {
        let (w, h) = self.dimensions();
        self.show(&Frame::new(w, h))
    }

    fn shutdown(&mut self);
}

/// Sinks are chosen at runtime from config
pub type BoxedSink = Box<dyn DisplaySink>;

/// Reject frames that don't match the sink
pub(crate) fn check_frame(caps: &DisplayCapabilities, frame: &Frame) -> Result<(), DisplayError> {
    let (w, h) = frame.dimensions();
    if (w, h) != (caps.width, caps.height) {
        return Err(DisplayError::BufferSizeMismatch {
            expected: (caps.width * caps.height) as usize,
            actual: (w * h) as usize,
        });
    }
    Ok(())
}
