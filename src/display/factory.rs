/*
 *  display/factory.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Build the configured display sink
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

#[cfg(any(feature = "tft", feature = "emulator"))]
use log::info;

use crate::config::DisplayConfig;
use crate::display::error::DisplayFactoryError;
use crate::display::traits::BoxedSink;

#[cfg(feature = "emulator")]
use crate::display::drivers::emulator::{EmulatorSink, EmulatorState};
#[cfg(feature = "emulator")]
use std::sync::{Arc, Mutex};

/// The sink plus, for the emulator, the state its window paints from
pub struct BuiltSink {
    pub sink: BoxedSink,
    #[cfg(feature = "emulator")]
    pub emulator_state: Option<Arc<Mutex<EmulatorState>>>,
}

/// Factory for creating display sinks from configuration
pub struct DisplaySinkFactory;

impl DisplaySinkFactory {
    /// Panel or emulator, decided by `use_tft` alone. A backend that fails to
    /// come up is an error; there is no fallback to the other one.
    pub fn create_from_config(config: &DisplayConfig) -> Result<BuiltSink, DisplayFactoryError> {
        if config.use_tft {
            Self::create_tft(config)
        } else {
            Self::create_emulator(config)
        }
    }

    #[cfg(feature = "tft")]
    fn create_tft(config: &DisplayConfig) -> Result<BuiltSink, DisplayFactoryError> {
        use crate::display::drivers::tft;
        use crate::display::traits::DisplaySink;

        info!("Creating {} panel sink", config.tft.driver.name());
        let mut sink = tft::open(&config.tft, config.width, config.height)?;
        sink.init()?;
        Ok(BuiltSink {
            sink: Box::new(sink),
            #[cfg(feature = "emulator")]
            emulator_state: None,
        })
    }

    #[cfg(not(feature = "tft"))]
    fn create_tft(_config: &DisplayConfig) -> Result<BuiltSink, DisplayFactoryError> {
        Err(DisplayFactoryError::BackendUnavailable("build with --features tft to drive a panel"))
    }

    #[cfg(feature = "emulator")]
    fn create_emulator(config: &DisplayConfig) -> Result<BuiltSink, DisplayFactoryError> {
        use crate::display::traits::DisplaySink;

        info!("Creating emulator sink {}x{}", config.width, config.height);
        let mut sink = EmulatorSink::new(config.width, config.height, config.tft.driver.name());
        sink.init()?;
        let state = sink.state();
        Ok(BuiltSink { sink: Box::new(sink), emulator_state: Some(state) })
    }

    #[cfg(not(feature = "emulator"))]
    fn create_emulator(_config: &DisplayConfig) -> Result<BuiltSink, DisplayFactoryError> {
        Err(DisplayFactoryError::BackendUnavailable(
            "USE_TFT is off and the emulator is not built; set USE_TFT=1 for the panel or build with --features emulator",
        ))
    }
}
