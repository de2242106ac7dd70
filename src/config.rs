/*
 *  config.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Layered configuration: defaults, YAML, environment, command line
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

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

pub const DEFAULT_HOST_URL: &str = "https://records.thejowers.com";

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid value {value:?} for {var}")]
    Env { var: &'static str, value: String },
    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Records service base URL
    pub host_url: String,
    /// How long a record stays up, fractional minutes
    pub timeout_minutes: f64,
    pub display: DisplayConfig,
    pub scanner: ScannerConfig,
    pub session: SessionTuning,
    /// Liveness endpoint, off when unset
    pub health_port: Option<u16>,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host_url: DEFAULT_HOST_URL.to_string(),
            timeout_minutes: 0.5,
            display: DisplayConfig::default(),
            scanner: ScannerConfig::default(),
            session: SessionTuning::default(),
            health_port: None,
            debug: false,
        }
    }
}

impl Config {
    /// Idle timeout. Values too large for a `Duration` saturate.
    pub fn timeout(&self) -> Duration {
        timeout_from_minutes(self.timeout_minutes).unwrap_or(Duration::MAX)
    }
}

fn timeout_from_minutes(minutes: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(minutes * 60.0).ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    /// SPI panel when true, desktop emulator otherwise
    pub use_tft: bool,
    pub tft: TftConfig,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { width: 320, height: 240, use_tft: false, tft: TftConfig::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TftDriver {
    St7789,
    Ili9341,
}

impl TftDriver {
    pub fn name(&self) -> &'static str {
        match self {
            TftDriver::St7789 => "ST7789",
            TftDriver::Ili9341 => "ILI9341",
        }
    }
}

impl std::str::FromStr for TftDriver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "st7789" => Ok(TftDriver::St7789),
            "ili9341" => Ok(TftDriver::Ili9341),
            other => Err(format!("unknown TFT driver {other:?}")),
        }
    }
}

/// SPI panel wiring, BCM line numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TftConfig {
    pub driver: TftDriver,
    pub rotation: u16,
    pub spi_device: String,
    pub gpio_chip: String,
    pub dc_pin: u32,
    pub rst_pin: u32,
    pub bl_pin: Option<u32>,
    pub spi_hz: u32,
}

impl Default for TftConfig {
    fn default() -> Self {
        Self {
            driver: TftDriver::St7789,
            rotation: 90,
            spi_device: "/dev/spidev0.0".to_string(),
            gpio_chip: "/dev/gpiochip0".to_string(),
            dc_pin: 25,
            rst_pin: 27,
            bl_pin: Some(24),
            spi_hz: 32_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// evdev node; discovered from /proc/bus/input/devices when unset
    pub hid_device: Option<PathBuf>,
    pub queue_capacity: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self { hid_device: None, queue_capacity: 32 }
    }
}

/// Loop timing. YAML only, the defaults suit every panel so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTuning {
    pub tick_ms: u64,
    pub fade_steps: u32,
    pub fade_ms: u64,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self { tick_ms: 100, fade_steps: 10, fade_ms: 500 }
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML and env.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "platter", version, about = "Now playing display for the record scanner")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub host_url: Option<String>,
    #[arg(long)]
    pub timeout_minutes: Option<f64>,
    #[arg(long)]
    pub width: Option<u32>,
    #[arg(long)]
    pub height: Option<u32>,
    #[arg(long, action = ArgAction::Set)]
    pub use_tft: Option<bool>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub hid_device: Option<PathBuf>,
    #[arg(long)]
    pub health_port: Option<u16>,
    /// Enable debug log level
    #[arg(long, short = 'v', alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, apply env, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = load_from(&cli, |k| std::env::var(k).ok())?;

    if cli.dump_config {
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Same as [`load`] with the CLI and environment supplied by the caller.
pub fn load_from<F>(cli: &Cli, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // 1) defaults, 2) YAML file (explicit path or search)
    let mut cfg = match cli.config.as_ref() {
        Some(p) if p.exists() => read_yaml(p)?,
        Some(p) => {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
        None => match find_config_file() {
            Some(p) => read_yaml(&p)?,
            None => Config::default(),
        },
    };

    // 3) environment
    apply_env(&mut cfg, env)?;

    // 4) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let p = home.join(".config/platter/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/platter.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["platter.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    if s.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// `1/true/yes/on`, any case, is true; everything else is false
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env { var, value })
}

fn apply_env<F>(cfg: &mut Config, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = env("TIMEOUT_MINUTES") { cfg.timeout_minutes = parse_env("TIMEOUT_MINUTES", v)?; }
    if let Some(v) = env("DISPLAY_WIDTH")   { cfg.display.width = parse_env("DISPLAY_WIDTH", v)?; }
    if let Some(v) = env("DISPLAY_HEIGHT")  { cfg.display.height = parse_env("DISPLAY_HEIGHT", v)?; }
    if let Some(v) = env("HOST_URL")        { cfg.host_url = v.trim().to_string(); }
    if let Some(v) = env("USE_TFT")         { cfg.display.use_tft = parse_bool(&v); }
    if let Some(v) = env("HID_DEVICE") {
        let v = v.trim();
        cfg.scanner.hid_device = if v.is_empty() { None } else { Some(PathBuf::from(v)) };
    }
    if let Some(v) = env("HEALTH_PORT")     { cfg.health_port = Some(parse_env("HEALTH_PORT", v)?); }

    let tft = &mut cfg.display.tft;
    if let Some(v) = env("TFT_DRIVER")      { tft.driver = parse_env("TFT_DRIVER", v)?; }
    if let Some(v) = env("TFT_ROTATION")    { tft.rotation = parse_env("TFT_ROTATION", v)?; }
    if let Some(v) = env("TFT_SPI_DEVICE")  { tft.spi_device = v.trim().to_string(); }
    if let Some(v) = env("TFT_GPIO_CHIP")   { tft.gpio_chip = v.trim().to_string(); }
    if let Some(v) = env("TFT_DC_PIN")      { tft.dc_pin = parse_env("TFT_DC_PIN", v)?; }
    if let Some(v) = env("TFT_RST_PIN")     { tft.rst_pin = parse_env("TFT_RST_PIN", v)?; }
    if let Some(v) = env("TFT_BL_PIN") {
        // "none" for panels with the backlight tied high
        tft.bl_pin = match v.trim().to_ascii_lowercase().as_str() {
            "" | "none" => None,
            _ => Some(parse_env("TFT_BL_PIN", v)?),
        };
    }
    if let Some(v) = env("TFT_SPI_HZ")      { tft.spi_hz = parse_env("TFT_SPI_HZ", v)?; }
    Ok(())
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if let Some(v) = cli.host_url.as_ref()   { cfg.host_url = v.clone(); }
    if let Some(v) = cli.timeout_minutes     { cfg.timeout_minutes = v; }
    if let Some(v) = cli.width               { cfg.display.width = v; }
    if let Some(v) = cli.height              { cfg.display.height = v; }
    if let Some(v) = cli.use_tft             { cfg.display.use_tft = v; }
    if let Some(v) = cli.hid_device.as_ref() { cfg.scanner.hid_device = Some(v.clone()); }
    if let Some(v) = cli.health_port         { cfg.health_port = Some(v); }
    if cli.debug                             { cfg.debug = true; }
}

/// Put any invariants here (required fields, ranges, etc.)
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.display.width == 0 || cfg.display.height == 0 {
        return Err(ConfigError::Validation("display width/height must be > 0".into()));
    }
    if !cfg.timeout_minutes.is_finite() || timeout_from_minutes(cfg.timeout_minutes).is_none() {
        return Err(ConfigError::Validation("timeout_minutes must be a finite, non-negative number small enough for a Duration".into()));
    }
    if cfg.host_url.trim().is_empty() {
        return Err(ConfigError::Validation("host_url must not be empty".into()));
    }
    match cfg.display.tft.rotation {
        0 | 90 | 180 | 270 => {}
        _ => return Err(ConfigError::Validation("tft rotation must be 0|90|180|270".into())),
    }
    if cfg.scanner.queue_capacity == 0 {
        return Err(ConfigError::Validation("scanner queue_capacity must be > 0".into()));
    }
    if cfg.session.tick_ms == 0 || cfg.session.fade_steps == 0 {
        return Err(ConfigError::Validation("session tick_ms and fade_steps must be > 0".into()));
    }
    Ok(())
}
