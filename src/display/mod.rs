/*
 *  display/mod.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem: frames, rendering and sinks
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

pub mod traits;
pub mod error;
pub mod framebuffer;
pub mod factory;
pub mod renderer;

// UI components
pub mod components;

pub mod drivers;

// Emulator window (only with emulator feature)
#[cfg(feature = "emulator")]
pub mod emulator_window;

// Re-exports for convenience
pub use traits::{Backend, BoxedSink, DisplayCapabilities, DisplaySink};
pub use error::{DisplayError, DisplayFactoryError};
pub use framebuffer::Frame;
pub use factory::{BuiltSink, DisplaySinkFactory};
pub use renderer::FrameRenderer;
