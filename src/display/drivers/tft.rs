/*
 *  display/drivers/tft.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  ST7789 / ILI9341 SPI panels over spidev and gpio-cdev
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

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use linux_embedded_hal::{
    gpio_cdev::{Chip, LineRequestFlags},
    spidev::{SpiModeFlags, SpidevOptions},
    CdevPin, SpidevDevice,
};
use log::{debug, info, warn};
use std::thread::sleep;
use std::time::Duration;

use crate::config::{TftConfig, TftDriver};
use crate::display::error::DisplayError;
use crate::display::framebuffer::Frame;
use crate::display::traits::{check_frame, Backend, DisplayCapabilities, DisplaySink};

/// MIPI-DCS commands both controllers understand
mod cmd {
    pub const SWRESET: u8 = 0x01;
    pub const SLPOUT: u8 = 0x11;
    pub const INVON: u8 = 0x21;
    pub const DISPOFF: u8 = 0x28;
    pub const DISPON: u8 = 0x29;
    pub const CASET: u8 = 0x2A;
    pub const RASET: u8 = 0x2B;
    pub const RAMWR: u8 = 0x2C;
    pub const MADCTL: u8 = 0x36;
    pub const COLMOD: u8 = 0x3A;
}

/// MADCTL bits
const MY: u8 = 0x80;
const MX: u8 = 0x40;
const MV: u8 = 0x20;
const BGR: u8 = 0x08;

/// 16 bpp on both the interface and the panel
const COLMOD_RGB565: u8 = 0x55;

/// spidev's default bufsiz
pub const SPI_CHUNK: usize = 4096;

/// One step of panel bring-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitStep {
    pub command: u8,
    pub data: Vec<u8>,
    pub delay_ms: u64,
}

impl InitStep {
    fn new(command: u8, data: &[u8], delay_ms: u64) -> Self {
        Self { command, data: data.to_vec(), delay_ms }
    }
}

/// Scan direction for a rotation. ILI9341 modules are wired BGR.
pub fn madctl(driver: TftDriver, rotation: u16) -> Result<u8, DisplayError> {
    let base = match driver {
        TftDriver::St7789 => match rotation {
            0 => 0,
            90 => MX | MV,
            180 => MX | MY,
            270 => MY | MV,
            other => return Err(DisplayError::InvalidRotation(other)),
        },
        TftDriver::Ili9341 => match rotation {
            0 => MX,
            90 => MV,
            180 => MY,
            270 => MX | MY | MV,
            other => return Err(DisplayError::InvalidRotation(other)),
        },
    };
    Ok(match driver {
        TftDriver::St7789 => base,
        TftDriver::Ili9341 => base | BGR,
    })
}

/// Bring-up after the hardware reset pulse
pub fn init_sequence(driver: TftDriver, rotation: u16) -> Result<Vec<InitStep>, DisplayError> {
    let mut steps = vec![
        InitStep::new(cmd::SWRESET, &[], 150),
        InitStep::new(cmd::SLPOUT, &[], 120),
        InitStep::new(cmd::COLMOD, &[COLMOD_RGB565], 10),
        InitStep::new(cmd::MADCTL, &[madctl(driver, rotation)?], 0),
    ];
    // ST7789 glass is normally-black, needs inversion for true colours
    if driver == TftDriver::St7789 {
        steps.push(InitStep::new(cmd::INVON, &[], 10));
    }
    steps.push(InitStep::new(cmd::DISPON, &[], 100));
    Ok(steps)
}

/// Start and end address, big-endian, as CASET/RASET want them
pub fn address_window(start: u16, len: u16) -> [u8; 4] {
    let end = start + len.saturating_sub(1);
    let [s_hi, s_lo] = start.to_be_bytes();
    let [e_hi, e_lo] = end.to_be_bytes();
    [s_hi, s_lo, e_hi, e_lo]
}

/// What the panel logic needs from the wiring
pub trait PanelBus: Send {
    fn command(&mut self, command: u8, data: &[u8]) -> Result<(), DisplayError>;

    /// Pixel payload following RAMWR
    fn data(&mut self, bytes: &[u8]) -> Result<(), DisplayError>;

    fn reset(&mut self) -> Result<(), DisplayError>;

    fn backlight(&mut self, on: bool) -> Result<(), DisplayError>;
}

/// Panel protocol over any bus
pub struct TftSink<B: PanelBus> {
    bus: B,
    driver: TftDriver,
    rotation: u16,
    capabilities: DisplayCapabilities,
    shut_down: bool,
}

impl<B: PanelBus> TftSink<B> {
    pub fn with_bus(bus: B, driver: TftDriver, rotation: u16, width: u32, height: u32) -> Result<Self, DisplayError> {
        if width > u16::MAX as u32 || height > u16::MAX as u32 {
            return Err(DisplayError::InvalidConfiguration(format!("{}x{} is too large for a DCS panel", width, height)));
        }
        madctl(driver, rotation)?;
        Ok(Self {
            bus,
            driver,
            rotation,
            capabilities: DisplayCapabilities {
                width,
                height,
                backend: Backend::Tft,
                controller: driver.name(),
            },
            shut_down: false,
        })
    }

    fn write_frame_bytes(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        let (w, h) = (self.capabilities.width as u16, self.capabilities.height as u16);
        self.bus.command(cmd::CASET, &address_window(0, w))?;
        self.bus.command(cmd::RASET, &address_window(0, h))?;
        self.bus.command(cmd::RAMWR, &[])?;
        for chunk in bytes.chunks(SPI_CHUNK) {
            self.bus.data(chunk)?;
        }
        Ok(())
    }
}

impl<B: PanelBus> DisplaySink for TftSink<B> {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        info!(
            "Initializing {} {}x{} rotation {}",
            self.driver.name(), self.capabilities.width, self.capabilities.height, self.rotation
        );
        self.bus.reset()?;
        for step in init_sequence(self.driver, self.rotation)? {
            self.bus.command(step.command, &step.data)?;
            if step.delay_ms > 0 {
                sleep(Duration::from_millis(step.delay_ms));
            }
        }
        self.bus.backlight(true)?;
        Ok(())
    }

    fn show(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        if self.shut_down {
            return Err(DisplayError::ShutDown);
        }
        check_frame(&self.capabilities, frame)?;
        self.write_frame_bytes(&frame.to_rgb565_be())
    }

    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        let black = Frame::new(self.capabilities.width, self.capabilities.height);
        if let Err(e) = self.write_frame_bytes(&black.to_rgb565_be()) {
            warn!("blanking {} failed: {}", self.driver.name(), e);
        }
        if let Err(e) = self.bus.command(cmd::DISPOFF, &[]) {
            warn!("DISPOFF failed: {}", e);
        }
        if let Err(e) = self.bus.backlight(false) {
            warn!("backlight off failed: {}", e);
        }
        debug!("{} shut down", self.driver.name());
    }
}

/// spidev plus DC/RST/backlight lines
pub struct SpiBus {
    spi: SpidevDevice,
    dc: CdevPin,
    rst: CdevPin,
    bl: Option<CdevPin>,
}

fn gpio_err(what: &str, e: impl std::fmt::Display) -> DisplayError {
    DisplayError::GpioError(format!("{}: {}", what, e))
}

fn output_line(chip: &mut Chip, line: u32, initial: u8, label: &str) -> Result<CdevPin, DisplayError> {
    let handle = chip
        .get_line(line)
        .map_err(|e| gpio_err(label, e))?
        .request(LineRequestFlags::OUTPUT, initial, label)
        .map_err(|e| gpio_err(label, e))?;
    CdevPin::new(handle).map_err(|e| gpio_err(label, e))
}

impl SpiBus {
    pub fn open(cfg: &TftConfig) -> Result<Self, DisplayError> {
        info!("Opening {} at {} Hz", cfg.spi_device, cfg.spi_hz);
        let mut spi = SpidevDevice::open(&cfg.spi_device).map_err(|e| {
            DisplayError::InitializationFailed(format!("opening {}: {:?}", cfg.spi_device, e))
        })?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(cfg.spi_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)
            .map_err(|e| DisplayError::SpiError(format!("configuring {}: {}", cfg.spi_device, e)))?;

        let mut chip = Chip::new(&cfg.gpio_chip).map_err(|e| gpio_err(&cfg.gpio_chip, e))?;
        let dc = output_line(&mut chip, cfg.dc_pin, 0, "platter-dc")?;
        let rst = output_line(&mut chip, cfg.rst_pin, 1, "platter-rst")?;
        // backlight stays dark until init has drawn something sane
        let bl = match cfg.bl_pin {
            Some(pin) => Some(output_line(&mut chip, pin, 0, "platter-bl")?),
            None => None,
        };

        Ok(Self { spi, dc, rst, bl })
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        SpiDevice::write(&mut self.spi, bytes).map_err(|e| DisplayError::SpiError(format!("{:?}", e)))
    }

    fn set_dc(&mut self, data: bool) -> Result<(), DisplayError> {
        let res = if data { self.dc.set_high() } else { self.dc.set_low() };
        res.map_err(|e| gpio_err("dc", format!("{:?}", e)))
    }
}

impl PanelBus for SpiBus {
    fn command(&mut self, command: u8, data: &[u8]) -> Result<(), DisplayError> {
        self.set_dc(false)?;
        self.write(&[command])?;
        if !data.is_empty() {
            self.set_dc(true)?;
            self.write(data)?;
        }
        Ok(())
    }

    fn data(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.set_dc(true)?;
        self.write(bytes)
    }

    fn reset(&mut self) -> Result<(), DisplayError> {
        let pulse = |rst: &mut CdevPin, high: bool| {
            let res = if high { rst.set_high() } else { rst.set_low() };
            res.map_err(|e| gpio_err("rst", format!("{:?}", e)))
        };
        pulse(&mut self.rst, true)?;
        sleep(Duration::from_millis(5));
        pulse(&mut self.rst, false)?;
        sleep(Duration::from_millis(20));
        pulse(&mut self.rst, true)?;
        sleep(Duration::from_millis(150));
        Ok(())
    }

    fn backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        let Some(bl) = self.bl.as_mut() else { return Ok(()) };
        let res = if on { bl.set_high() } else { bl.set_low() };
        res.map_err(|e| gpio_err("backlight", format!("{:?}", e)))
    }
}

/// Open the wiring and wrap it
pub fn open(cfg: &TftConfig, width: u32, height: u32) -> Result<TftSink<SpiBus>, DisplayError> {
    let bus = SpiBus::open(cfg)?;
    TftSink::with_bus(bus, cfg.driver, cfg.rotation, width, height)
}
