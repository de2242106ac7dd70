/*
 *  scanner/evdev.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Raw Linux input devices: discovery and event records
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

use std::io::{self, Read};
use std::mem::size_of;
use std::path::PathBuf;

pub const EV_KEY: u16 = 1;

const DEVICES_LIST: &str = "/proc/bus/input/devices";

/// struct input_event { struct timeval time; __u16 type; __u16 code; __s32 value; }
const TIME_LEN: usize = size_of::<libc::timeval>();
pub const EVENT_LEN: usize = TIME_LEN + 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    pub fn from_bytes(raw: &[u8; EVENT_LEN]) -> Self {
        let at = TIME_LEN;
        Self {
            kind: u16::from_ne_bytes([raw[at], raw[at + 1]]),
            code: u16::from_ne_bytes([raw[at + 2], raw[at + 3]]),
            value: i32::from_ne_bytes([raw[at + 4], raw[at + 5], raw[at + 6], raw[at + 7]]),
        }
    }

    #[cfg(test)]
    pub fn to_bytes(self) -> Vec<u8> {
        let mut out = vec![0u8; TIME_LEN];
        out.extend_from_slice(&self.kind.to_ne_bytes());
        out.extend_from_slice(&self.code.to_ne_bytes());
        out.extend_from_slice(&self.value.to_ne_bytes());
        out
    }
}

/// Blocking read of the next whole event record.
pub fn read_event<R: Read>(reader: &mut R) -> io::Result<InputEvent> {
    let mut raw = [0u8; EVENT_LEN];
    reader.read_exact(&mut raw)?;
    Ok(InputEvent::from_bytes(&raw))
}

/// First `eventN` node among the listed devices whose EV bitmap includes
/// EV_KEY. Keyboard-wedge scanners always do.
pub fn find_key_device(listing: &str) -> Option<PathBuf> {
    for block in listing.split("\n\n") {
        let mut handler = None;
        let mut has_keys = false;
        for line in block.lines() {
            if let Some(rest) = line.strip_prefix("H: Handlers=") {
                handler = rest.split_whitespace().find(|h| {
                    h.strip_prefix("event").is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
                });
            } else if let Some(mask) = line.strip_prefix("B: EV=") {
                has_keys = u64::from_str_radix(mask.trim(), 16)
                    .map(|bits| bits & (1 << EV_KEY) != 0)
                    .unwrap_or(false);
            }
        }
        if let (Some(node), true) = (handler, has_keys) {
            return Some(PathBuf::from("/dev/input").join(node));
        }
    }
    None
}

pub fn discover() -> Option<PathBuf> {
    let listing = std::fs::read_to_string(DEVICES_LIST).ok()?;
    find_key_device(&listing)
}
