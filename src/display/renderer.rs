/*
 *  display/renderer.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Session state to pixels
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

use crate::display::components::{ClockBar, NowPlayingPanel};
use crate::display::error::DisplayError;
use crate::display::framebuffer::Frame;
use crate::record::RecordMetadata;

pub const IDLE_BAR_HEIGHT: u32 = 10;
pub const SHOWING_BAR_HEIGHT: u32 = 20;

/// Pure drawing: the same inputs always give the same frame. The wall
/// clock is passed in so callers (and tests) own time.
#[derive(Debug, Clone)]
pub struct FrameRenderer {
    width: u32,
    height: u32,
    idle_bar: ClockBar,
    showing_bar: ClockBar,
    panel: NowPlayingPanel,
}

impl FrameRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            idle_bar: ClockBar::new(IDLE_BAR_HEIGHT),
            showing_bar: ClockBar::new(SHOWING_BAR_HEIGHT),
            panel: NowPlayingPanel::default(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Clock only
    pub fn render_idle(&self, now: NaiveTime) -> Frame {
        let mut frame = Frame::new(self.width, self.height);
        let Ok(()) = self.idle_bar.render(frame.target(), now);
        frame
    }

    pub fn render_showing(&self, record: &RecordMetadata, now: NaiveTime) -> Frame {
        let mut frame = Frame::new(self.width, self.height);
        let Ok(()) = self.showing_bar.render(frame.target(), now);
        let Ok(()) = self.panel.render(frame.target(), record);
        frame
    }

    /// Cross-fade step, see [`Frame::blend`]
    pub fn blend(&self, from: &Frame, to: &Frame, alpha: f32) -> Result<Frame, DisplayError> {
        from.blend(to, alpha)
    }
}
