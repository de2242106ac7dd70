/*
 *  display/emulator_window.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Desktop window that paints the emulator sink
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

use log::{error, info, warn};
use pixels::{Pixels, SurfaceTexture};
use winit::{
    dpi::PhysicalSize,
    event::{Event, VirtualKeyCode},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};
use winit_input_helper::WinitInputHelper;

use crate::display::drivers::emulator::{lock_state, EmulatorState};
use crate::shutdown::ShutdownSignal;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// How long the window waits for the session to blank the sink after a
/// close request before going anyway.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct EmulatorWindowConfig {
    /// Screen pixels per panel pixel
    pub scale: u32,

    /// RGBA painted while no frame matches the window size
    pub bg_color: [u8; 4],
}

impl Default for EmulatorWindowConfig {
    fn default() -> Self {
        Self {
            scale: 2,
            bg_color: [16, 16, 24, 255],
        }
    }
}

/// Desktop stand-in for the panel
pub struct EmulatorWindow {
    state: Arc<Mutex<EmulatorState>>,
    config: EmulatorWindowConfig,
    shutdown: ShutdownSignal,
}

impl EmulatorWindow {
    pub fn new(
        state: Arc<Mutex<EmulatorState>>,
        config: EmulatorWindowConfig,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self { state, config, shutdown }
    }

    /// Runs the event loop on the calling thread, which must be the main
    /// thread. Does not return once the loop starts: the process exits with
    /// the code the session recorded.
    pub fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let (width, height, display_type) = {
            let state = lock_state(&self.state);
            (state.width, state.height, state.display_type.clone())
        };

        let event_loop = EventLoop::new();
        let mut input = WinitInputHelper::new();

        // physical size, so desktop DPI scaling cannot blur the pixels
        let window = WindowBuilder::new()
            .with_title(format!("platter emulator - {} ({}x{})", display_type, width, height))
            .with_inner_size(PhysicalSize::new(width * self.config.scale, height * self.config.scale))
            .with_resizable(false)
            .build(&event_loop)?;

        let window_size = window.inner_size();
        let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
        let mut pixels = Pixels::new(width, height, surface_texture)?;

        info!("emulator window {}x{} at {}x scale, Esc or Q to quit", width, height, self.config.scale);

        let mut close_started: Option<Instant> = None;

        event_loop.run(move |event, _, control_flow| {
            *control_flow = ControlFlow::WaitUntil(Instant::now() + Duration::from_millis(33));

            if let Event::RedrawRequested(_) = event {
                self.paint(pixels.frame_mut());
                if let Err(err) = pixels.render() {
                    error!("pixels.render() failed: {}", err);
                    self.request_close();
                    *control_flow = ControlFlow::ExitWithCode(1);
                    return;
                }
            }

            if input.update(&event) {
                let quit = input.key_pressed(VirtualKeyCode::Escape)
                    || input.key_pressed(VirtualKeyCode::Q)
                    || input.close_requested();
                if quit && close_started.is_none() {
                    info!("emulator window closing");
                    self.request_close();
                    close_started = Some(Instant::now());
                }
            }

            if let Some(code) = lock_state(&self.state).exit_code {
                *control_flow = ControlFlow::ExitWithCode(code);
                return;
            }
            if close_started.is_some_and(|t| t.elapsed() > CLOSE_GRACE) {
                warn!("session did not finish within {:?}, closing anyway", CLOSE_GRACE);
                *control_flow = ControlFlow::Exit;
                return;
            }

            window.request_redraw();
        });
    }

    fn request_close(&self) {
        lock_state(&self.state).close_requested = true;
        self.shutdown.trigger();
    }

    fn paint(&self, frame: &mut [u8]) {
        let state = lock_state(&self.state);
        if frame.len() == state.rgba.len() {
            frame.copy_from_slice(&state.rgba);
        } else {
            for px in frame.chunks_exact_mut(4) {
                px.copy_from_slice(&self.config.bg_color);
            }
        }
    }
}
