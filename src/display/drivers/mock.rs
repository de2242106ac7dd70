/*
 *  display/drivers/mock.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Recording display sink for tests
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
use crate::display::traits::{check_frame, Backend, DisplayCapabilities, DisplaySink};

use std::sync::{Arc, Mutex};

/// Mock sink
///
/// Keeps every frame it is shown so tests can assert on exactly what the
/// session loop pushed, and can be told to start failing.
#[derive(Debug, Clone)]
pub struct MockSink {
    capabilities: DisplayCapabilities,
    state: Arc<Mutex<MockSinkState>>,
}

/// Shared with the test through `MockSink::state()`
#[derive(Debug, Default)]
pub struct MockSinkState {
    pub init_count: usize,

    /// Every frame accepted by show(), in order
    pub frames: Vec<Frame>,

    pub shutdown_count: usize,

    /// Whether the last thing on screen is a blank frame from shutdown()
    pub blanked: bool,

    /// Fail every show() while set
    pub simulate_show_failure: bool,

    /// Fail show() once this many frames have been accepted
    pub fail_after: Option<usize>,

    pub simulate_init_failure: bool,
}

impl MockSink {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            capabilities: DisplayCapabilities {
                width,
                height,
                backend: Backend::Mock,
                controller: "mock",
            },
            state: Arc::new(Mutex::new(MockSinkState::default())),
        }
    }

    pub fn state(&self) -> Arc<Mutex<MockSinkState>> {
        Arc::clone(&self.state)
    }

    pub fn frame_count(&self) -> usize {
        self.state.lock().unwrap().frames.len()
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.state.lock().unwrap().frames.last().cloned()
    }

    pub fn shutdown_count(&self) -> usize {
        self.state.lock().unwrap().shutdown_count
    }
}

impl DisplaySink for MockSink {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let mut state = self.state.lock().unwrap();
        if state.simulate_init_failure {
            return Err(DisplayError::InitializationFailed("Simulated init failure".to_string()));
        }
        state.init_count += 1;
        Ok(())
    }

    fn show(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        check_frame(&self.capabilities, frame)?;
        let mut state = self.state.lock().unwrap();
        if state.simulate_show_failure {
            return Err(DisplayError::Other("Simulated show failure".to_string()));
        }
        if state.fail_after.is_some_and(|n| state.frames.len() >= n) {
            return Err(DisplayError::Other("Simulated show failure".to_string()));
        }
        state.frames.push(frame.clone());
        state.blanked = false;
        Ok(())
    }

    fn shutdown(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.shutdown_count += 1;
        state.blanked = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::pixelcolor::Rgb888;
    use embedded_graphics::prelude::*;

    #[test]
    fn test_mock_sink_records_frames() {
        let mut sink = MockSink::new(8, 4);
        sink.init().unwrap();
        sink.show(&Frame::filled(8, 4, Rgb888::RED)).unwrap();
        sink.show(&Frame::new(8, 4)).unwrap();
        assert_eq!(sink.frame_count(), 2);
        assert_eq!(sink.last_frame(), Some(Frame::new(8, 4)));
        assert_eq!(sink.state().lock().unwrap().init_count, 1);
    }

    #[test]
    fn test_mock_sink_rejects_wrong_size() {
        let mut sink = MockSink::new(8, 4);
        assert!(matches!(
            sink.show(&Frame::new(4, 4)),
            Err(DisplayError::BufferSizeMismatch { expected: 32, actual: 16 })
        ));
        assert_eq!(sink.frame_count(), 0);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut sink = MockSink::new(8, 4);
        sink.shutdown();
        sink.shutdown();
        sink.shutdown();
        assert_eq!(sink.shutdown_count(), 3);
        assert!(sink.state().lock().unwrap().blanked);
    }

    #[test]
    fn test_clear_shows_black() {
        let mut sink = MockSink::new(8, 4);
        sink.clear().unwrap();
        assert_eq!(sink.last_frame(), Some(Frame::new(8, 4)));
    }

    #[test]
    fn test_simulated_failures() {
        let mut sink = MockSink::new(8, 4);
        sink.state().lock().unwrap().fail_after = Some(1);
        assert!(sink.show(&Frame::new(8, 4)).is_ok());
        assert!(sink.show(&Frame::new(8, 4)).is_err());

        sink.state().lock().unwrap().simulate_init_failure = true;
        assert!(sink.init().is_err());
    }
}
