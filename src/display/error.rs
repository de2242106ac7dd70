/*
 *  display/error.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error types for the display subsystem
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

use std::error::Error;
use std::fmt;

/// Anything that can go wrong putting pixels on glass
#[derive(Debug)]
pub enum DisplayError {
    /// Panel bring-up failed
    InitializationFailed(String),

    SpiError(String),

    /// DC, reset or backlight line
    GpioError(String),

    InvalidConfiguration(String),

    /// Panel rotation outside 0/90/180/270
    InvalidRotation(u16),

    /// Frame does not match the sink, in pixels
    BufferSizeMismatch { expected: usize, actual: usize },

    /// show() after shutdown()
    ShutDown,

    Other(String),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializationFailed(msg) => write!(f, "panel bring-up failed: {}", msg),
            Self::SpiError(msg) => write!(f, "spidev transfer failed: {}", msg),
            Self::GpioError(msg) => write!(f, "gpio line error: {}", msg),
            Self::InvalidConfiguration(msg) => write!(f, "bad display settings: {}", msg),
            Self::InvalidRotation(deg) => write!(f, "rotation {} is not one of 0, 90, 180, 270", deg),
            Self::BufferSizeMismatch { expected, actual } => {
                write!(f, "frame has {} pixels, sink wants {}", actual, expected)
            }
            Self::ShutDown => f.write_str("sink already shut down"),
            Self::Other(msg) => f.write_str(msg),
        }
    }
}

impl Error for DisplayError {}

/// Errors building a sink from configuration
#[derive(Debug)]
pub enum DisplayFactoryError {
    /// The requested backend was not compiled in
    BackendUnavailable(&'static str),

    /// The backend is there but would not start
    SinkInit(DisplayError),
}

impl fmt::Display for DisplayFactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BackendUnavailable(hint) => write!(f, "display backend not built in ({})", hint),
            Self::SinkInit(err) => write!(f, "display sink failed to start: {}", err),
        }
    }
}

impl Error for DisplayFactoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SinkInit(err) => Some(err),
            Self::BackendUnavailable(_) => None,
        }
    }
}

impl From<DisplayError> for DisplayFactoryError {
    fn from(err: DisplayError) -> Self {
        Self::SinkInit(err)
    }
}
