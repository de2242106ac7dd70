/*
 *  display/drivers/emulator.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Desktop emulator sink, frames land in shared state the window paints
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

use log::debug;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::display::error::DisplayError;
use crate::display::framebuffer::Frame;
use crate::display::traits::{check_frame, Backend, DisplayCapabilities, DisplaySink};

/// Shared between the sink (session task) and the window (main thread)
#[derive(Debug)]
pub struct EmulatorState {
    /// RGBA8, row-major, what `pixels` wants
    pub rgba: Vec<u8>,

    pub width: u32,
    pub height: u32,

    pub frame_count: u64,

    /// Panel name for the window title
    pub display_type: String,

    /// Window was closed or Esc/Q pressed
    pub close_requested: bool,

    /// Sink has been shut down
    pub shut_down: bool,

    /// Set once the session has returned; the window exits with this code
    pub exit_code: Option<i32>,
}

impl EmulatorState {
    pub fn new(width: u32, height: u32, display_type: &str) -> Self {
        let mut rgba = vec![0u8; (width * height * 4) as usize];
        blank_rgba(&mut rgba);
        Self {
            rgba,
            width,
            height,
            frame_count: 0,
            display_type: display_type.to_string(),
            close_requested: false,
            shut_down: false,
            exit_code: None,
        }
    }
}

fn blank_rgba(buf: &mut [u8]) {
    for px in buf.chunks_exact_mut(4) {
        px.copy_from_slice(&[0, 0, 0, 0xFF]);
    }
}

/// Lock that survives a panicked holder; the buffer is plain pixels.
pub(crate) fn lock_state(state: &Mutex<EmulatorState>) -> MutexGuard<'_, EmulatorState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Tell the window the session is over and how the process should exit.
pub fn record_exit(state: &Mutex<EmulatorState>, code: i32) {
    lock_state(state).exit_code = Some(code);
}

/// Emulator sink
///
/// Renders nothing itself: `show` copies the frame into `EmulatorState`
/// and the window thread paints it on its next redraw.
pub struct EmulatorSink {
    capabilities: DisplayCapabilities,
    state: Arc<Mutex<EmulatorState>>,
}

impl EmulatorSink {
    pub fn new(width: u32, height: u32, display_type: &'static str) -> Self {
        Self {
            capabilities: DisplayCapabilities {
                width,
                height,
                backend: Backend::Emulator,
                controller: display_type,
            },
            state: Arc::new(Mutex::new(EmulatorState::new(width, height, display_type))),
        }
    }

    /// Handle for the window
    pub fn state(&self) -> Arc<Mutex<EmulatorState>> {
        Arc::clone(&self.state)
    }
}

impl DisplaySink for EmulatorSink {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        // nothing to bring up, the window owns the surface
        Ok(())
    }

    fn show(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        check_frame(&self.capabilities, frame)?;
        let mut state = lock_state(&self.state);
        if state.shut_down {
            return Err(DisplayError::ShutDown);
        }
        frame.write_rgba(&mut state.rgba)?;
        state.frame_count += 1;
        Ok(())
    }

    fn shutdown(&mut self) {
        let mut state = lock_state(&self.state);
        if !state.shut_down {
            debug!("emulator shutdown after {} frames", state.frame_count);
        }
        blank_rgba(&mut state.rgba);
        state.shut_down = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::pixelcolor::Rgb888;
    use embedded_graphics::prelude::*;

    #[test]
    fn test_show_copies_rgba() {
        let mut sink = EmulatorSink::new(2, 2, "ST7789");
        sink.show(&Frame::filled(2, 2, Rgb888::new(9, 8, 7))).unwrap();
        let state = sink.state();
        let state = state.lock().unwrap();
        assert_eq!(&state.rgba[..4], &[9, 8, 7, 255]);
        assert_eq!(state.frame_count, 1);
    }

    #[test]
    fn test_shutdown_blanks_and_is_idempotent() {
        let mut sink = EmulatorSink::new(2, 2, "ST7789");
        sink.show(&Frame::filled(2, 2, Rgb888::WHITE)).unwrap();
        sink.shutdown();
        sink.shutdown();
        let state = sink.state();
        let state = state.lock().unwrap();
        assert!(state.shut_down);
        assert!(state.rgba.chunks(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn test_show_after_shutdown_fails() {
        let mut sink = EmulatorSink::new(2, 2, "ST7789");
        sink.shutdown();
        assert!(matches!(sink.show(&Frame::new(2, 2)), Err(DisplayError::ShutDown)));
    }

    #[test]
    fn test_exit_code_is_separate_from_shutdown() {
        let mut sink = EmulatorSink::new(2, 2, "ST7789");
        let state = sink.state();
        sink.shutdown();
        assert_eq!(state.lock().unwrap().exit_code, None);

        record_exit(&state, 1);
        assert_eq!(state.lock().unwrap().exit_code, Some(1));
    }
}
