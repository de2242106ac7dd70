/*
 *  record.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Scan inputs and the record metadata they resolve to
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

use image::{imageops::FilterType, RgbImage};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Length of a short lookup code printed on the sleeve labels.
pub const LOOKUP_CODE_LEN: usize = 6;

/// Edge length (pixels) covers are scaled to once decoded.
pub const COVER_EDGE: u32 = 120;

/// A single completed scan, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanInput {
    /// Exactly six characters, resolved through `/plays/scan/{code}`
    LookupCode(String),
    /// Anything else, fetched as-is
    Locator(String),
}

impl ScanInput {
    /// Classify a raw scan string. Whitespace is trimmed; an empty result is
    /// "no input" and yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.chars().count() == LOOKUP_CODE_LEN {
            Some(ScanInput::LookupCode(trimmed.to_string()))
        } else {
            Some(ScanInput::Locator(trimmed.to_string()))
        }
    }

    /// The URL the metadata request goes to.
    pub fn request_url(&self, host: &str) -> String {
        match self {
            ScanInput::LookupCode(code) => {
                format!("{}/plays/scan/{}", host.trim_end_matches('/'), code)
            }
            ScanInput::Locator(url) => url.clone(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ScanInput::LookupCode(s) | ScanInput::Locator(s) => s,
        }
    }
}

impl fmt::Display for ScanInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanInput::LookupCode(code) => write!(f, "code {}", code),
            ScanInput::Locator(url) => write!(f, "locator {}", url),
        }
    }
}

/// Decoded cover art, already scaled to `COVER_EDGE` square.
#[derive(Clone, PartialEq)]
pub struct CoverArt {
    image: RgbImage,
}

impl CoverArt {
    /// Decode PNG/JPEG bytes and scale to `edge` x `edge`.
    pub fn decode(bytes: &[u8], edge: u32) -> Result<Self, image::ImageError> {
        let decoded = image::load_from_memory(bytes)?.to_rgb8();
        Ok(Self::from_rgb(decoded, edge))
    }

    pub fn from_rgb(image: RgbImage, edge: u32) -> Self {
        let image = if image.width() == edge && image.height() == edge {
            image
        } else {
            image::imageops::resize(&image, edge, edge, FilterType::Triangle)
        };
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// RGB triple at (x, y); out of range reads as black.
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        self.image
            .get_pixel_checked(x, y)
            .map(|p| p.0)
            .unwrap_or([0, 0, 0])
    }
}

impl fmt::Debug for CoverArt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CoverArt({}x{})", self.image.width(), self.image.height())
    }
}

/// Album metadata for one "now playing" episode.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMetadata {
    pub title: String,
    pub artists: String,
    pub section: String,
    pub code: String,
    pub cover_path: Option<String>,
    pub cover: Option<CoverArt>,
}

/// `record` object as served by the scan endpoint. Missing or null fields
/// fall back to the placeholders the sleeve labels use; numbers and booleans
/// are shown as written.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawRecord")]
pub struct RecordPayload {
    pub title: String,
    pub artists: String,
    pub section: String,
    pub code: String,
    pub cover_path: Option<String>,
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    artists: Option<Value>,
    #[serde(default)]
    section: Option<Value>,
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    cover_path: Option<Value>,
}

fn text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl From<RawRecord> for RecordPayload {
    fn from(raw: RawRecord) -> Self {
        Self {
            title: text(raw.title).unwrap_or_else(|| "Unknown Album".to_string()),
            artists: text(raw.artists).unwrap_or_else(|| "Unknown Artist".to_string()),
            section: text(raw.section).unwrap_or_else(|| "N/A".to_string()),
            code: text(raw.code).unwrap_or_else(|| "XXXXXX".to_string()),
            cover_path: match raw.cover_path {
                Some(Value::String(path)) => Some(path),
                _ => None,
            },
        }
    }
}

impl RecordMetadata {
    pub fn from_payload(payload: RecordPayload, cover: Option<CoverArt>) -> Self {
        Self {
            title: payload.title,
            artists: payload.artists,
            section: payload.section,
            code: payload.code,
            cover_path: payload.cover_path.filter(|p| !p.is_empty()),
            cover,
        }
    }
}
