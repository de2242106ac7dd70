/*
 *  scanner/keymap.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Linux key codes to scan characters
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

// <linux/input-event-codes.h>
pub const KEY_ENTER: u16 = 28;
pub const KEY_LEFTSHIFT: u16 = 42;
pub const KEY_RIGHTSHIFT: u16 = 54;
pub const KEY_KPENTER: u16 = 96;

const KEY_UP: i32 = 0;
const KEY_DOWN: i32 = 1;

/// Letter rows, in key code order
const ROW_Q: (u16, &str) = (16, "qwertyuiop");
const ROW_A: (u16, &str) = (30, "asdfghjkl");
const ROW_Z: (u16, &str) = (44, "zxcvbnm");

fn letter(code: u16) -> Option<char> {
    [ROW_Q, ROW_A, ROW_Z].iter().find_map(|&(first, row)| {
        let idx = code.checked_sub(first)? as usize;
        row.chars().nth(idx)
    })
}

/// Character for a key-down, ignoring Shift for everything except letters.
pub fn key_char(code: u16, shift: bool) -> Option<char> {
    if let Some(c) = letter(code) {
        return Some(if shift { c.to_ascii_uppercase() } else { c });
    }
    let c = match code {
        2..=10 => char::from(b'1' + (code - 2) as u8),
        11 => '0',
        12 => '-',
        13 => '=',
        26 => '[',
        27 => ']',
        39 => ';',
        40 => '\'',
        43 => '\\',
        51 => ',',
        52 => '.',
        53 => '/',
        57 => ' ',
        _ => return None,
    };
    Some(c)
}

/// Accumulates key events from a keyboard-wedge scanner into whole scans.
#[derive(Debug, Default)]
pub struct KeyDecoder {
    shift: bool,
    buf: String,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one EV_KEY event; `value` is 0 up, 1 down, 2 autorepeat.
    /// Returns a completed scan when Enter closes a non-empty buffer.
    pub fn feed(&mut self, code: u16, value: i32) -> Option<String> {
        let is_shift = code == KEY_LEFTSHIFT || code == KEY_RIGHTSHIFT;
        match value {
            KEY_DOWN if is_shift => self.shift = true,
            KEY_UP if is_shift => self.shift = false,
            KEY_DOWN if code == KEY_ENTER || code == KEY_KPENTER => {
                if !self.buf.is_empty() {
                    return Some(std::mem::take(&mut self.buf));
                }
            }
            KEY_DOWN => {
                if let Some(c) = key_char(code, self.shift) {
                    self.buf.push(c);
                }
            }
            _ => {}
        }
        None
    }

    pub fn pending(&self) -> &str {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tap(dec: &mut KeyDecoder, code: u16) -> Option<String> {
        let out = dec.feed(code, KEY_DOWN);
        assert!(dec.feed(code, KEY_UP).is_none());
        out
    }

    #[test]
    fn test_letters_and_digits() {
        assert_eq!(key_char(30, false), Some('a'));
        assert_eq!(key_char(50, false), Some('m'));
        assert_eq!(key_char(25, true), Some('P'));
        assert_eq!(key_char(2, true), Some('1'));
        assert_eq!(key_char(11, false), Some('0'));
        assert_eq!(key_char(53, false), Some('/'));
        assert_eq!(key_char(KEY_ENTER, false), None);
        assert_eq!(key_char(1, false), None); // Esc
    }

    #[test]
    fn test_shift_uppercases_letters_only() {
        let mut dec = KeyDecoder::new();
        dec.feed(KEY_LEFTSHIFT, KEY_DOWN);
        tap(&mut dec, 30); // A
        tap(&mut dec, 48); // B
        tap(&mut dec, 46); // C
        dec.feed(KEY_LEFTSHIFT, KEY_UP);
        for code in [2, 3, 4] {
            tap(&mut dec, code);
        }
        assert_eq!(tap(&mut dec, KEY_ENTER).as_deref(), Some("ABC123"));
    }

    #[test]
    fn test_shift_released_lowercases_again() {
        let mut dec = KeyDecoder::new();
        dec.feed(KEY_RIGHTSHIFT, KEY_DOWN);
        tap(&mut dec, 35);
        dec.feed(KEY_RIGHTSHIFT, KEY_UP);
        tap(&mut dec, 35);
        assert_eq!(dec.pending(), "Hh");
    }

    #[test]
    fn test_enter_on_empty_buffer_emits_nothing() {
        let mut dec = KeyDecoder::new();
        assert!(tap(&mut dec, KEY_ENTER).is_none());
        assert!(tap(&mut dec, KEY_KPENTER).is_none());
    }

    #[test]
    fn test_keypad_enter_terminates_and_resets() {
        let mut dec = KeyDecoder::new();
        tap(&mut dec, 19);
        tap(&mut dec, 57);
        tap(&mut dec, 9);
        assert_eq!(tap(&mut dec, KEY_KPENTER).as_deref(), Some("r 8"));
        assert_eq!(dec.pending(), "");
    }

    #[test]
    fn test_autorepeat_and_unknown_keys_ignored() {
        let mut dec = KeyDecoder::new();
        dec.feed(30, KEY_DOWN);
        dec.feed(30, 2);
        dec.feed(30, 2);
        dec.feed(15, KEY_DOWN); // Tab
        assert_eq!(dec.pending(), "a");
    }
}
