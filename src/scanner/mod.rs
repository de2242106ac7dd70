/*
 *  scanner/mod.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Barcode scanner input: background listener and bounded scan queue
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

pub mod evdev;
pub mod keymap;

use log::{debug, info, warn};
use std::fs::File;
use std::io::{self, BufRead, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::ScannerConfig;
use keymap::KeyDecoder;

const STOP_WAIT: Duration = Duration::from_secs(1);
const STDIN_IDLE: Duration = Duration::from_millis(50);

/// Where completed scans come from. Polled once per tick, never blocks.
pub trait ScanSource: Send {
    fn poll_scan(&mut self) -> Option<String>;

    /// False once the listener has ended, e.g. the device went away
    fn is_alive(&self) -> bool;

    /// Idempotent
    fn stop(&mut self);
}

/// Keyboard-wedge scanner read on its own OS thread.
pub struct HidScanner {
    rx: Receiver<String>,
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
    origin: String,
}

impl HidScanner {
    /// Listen on the configured device, the first key-capable input device,
    /// or stdin lines when neither can be opened.
    pub fn spawn(config: &ScannerConfig) -> io::Result<Self> {
        let device = config.hid_device.clone().or_else(evdev::discover);
        match device {
            Some(path) => match File::open(&path) {
                Ok(file) => {
                    info!("scanner: reading key events from {}", path.display());
                    Self::with_event_reader(file, config.queue_capacity, path.display().to_string())
                }
                Err(e) => {
                    warn!("scanner: cannot open {}: {}, falling back to stdin", path.display(), e);
                    Self::stdin(config.queue_capacity)
                }
            },
            None => {
                info!("scanner: no input device found, reading scans from stdin");
                Self::stdin(config.queue_capacity)
            }
        }
    }

    fn stdin(capacity: usize) -> io::Result<Self> {
        Self::with_line_reader(io::BufReader::new(io::stdin()), capacity, "stdin".into())
    }

    /// Raw `input_event` records, e.g. an open /dev/input/eventN
    pub fn with_event_reader<R>(reader: R, capacity: usize, origin: String) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        Self::start(capacity, origin, move |running, tx| pump_events(reader, &running, &tx))
    }

    /// One scan per line
    pub fn with_line_reader<R>(reader: R, capacity: usize, origin: String) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        Self::start(capacity, origin, move |running, tx| pump_lines(reader, &running, &tx))
    }

    fn start<F>(capacity: usize, origin: String, listener: F) -> io::Result<Self>
    where
        F: FnOnce(Arc<AtomicBool>, SyncSender<String>) + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let join = thread::Builder::new()
            .name("scanner".into())
            .spawn(move || listener(flag, tx))?;
        Ok(Self { rx, running, join: Some(join), origin })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl ScanSource for HidScanner {
    fn poll_scan(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    fn is_alive(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let Some(join) = self.join.take() else { return };
        let deadline = Instant::now() + STOP_WAIT;
        while !join.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        if join.is_finished() {
            let _ = join.join();
            debug!("scanner: listener on {} stopped", self.origin);
        } else {
            // blocked in a read; it dies with the process
            warn!("scanner: listener on {} did not stop within {:?}, abandoning", self.origin, STOP_WAIT);
        }
    }
}

impl Drop for HidScanner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Queue a finished scan. False when the consumer has gone away.
fn offer(tx: &SyncSender<String>, scan: String) -> bool {
    match tx.try_send(scan) {
        Ok(()) => true,
        Err(TrySendError::Full(dropped)) => {
            warn!("scanner: queue full, dropping scan {:?}", dropped);
            true
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}

fn pump_events<R: Read>(mut reader: R, running: &AtomicBool, tx: &SyncSender<String>) {
    let mut decoder = KeyDecoder::new();
    while running.load(Ordering::SeqCst) {
        let ev = match evdev::read_event(&mut reader) {
            Ok(ev) => ev,
            Err(e) => {
                warn!("scanner: device read failed: {}", e);
                return;
            }
        };
        if ev.kind != evdev::EV_KEY {
            continue;
        }
        if let Some(scan) = decoder.feed(ev.code, ev.value) {
            debug!("scanner: scanned {:?}", scan);
            if !offer(tx, scan) {
                return;
            }
        }
    }
}

fn pump_lines<R: BufRead>(mut reader: R, running: &AtomicBool, tx: &SyncSender<String>) {
    let mut line = String::new();
    while running.load(Ordering::SeqCst) {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => {
                thread::sleep(STDIN_IDLE);
                continue;
            }
            Ok(_) => {}
        }
        let scan = line.trim();
        if !scan.is_empty() && !offer(tx, scan.to_string()) {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::InputEvent;
    use keymap::{KEY_ENTER, KEY_LEFTSHIFT};
    use std::io::Cursor;

    fn key(code: u16, value: i32) -> Vec<u8> {
        InputEvent { kind: evdev::EV_KEY, code, value }.to_bytes()
    }

    fn typed(codes: &[u16]) -> Vec<u8> {
        let mut out = Vec::new();
        for &c in codes {
            out.extend(key(c, 1));
            out.extend(key(c, 0));
        }
        out
    }

    fn wait_until_dead(scanner: &HidScanner) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while scanner.is_alive() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_events_become_scans() {
        let mut bytes = key(KEY_LEFTSHIFT, 1);
        bytes.extend(typed(&[30, 48, 46]));
        bytes.extend(key(KEY_LEFTSHIFT, 0));
        // a non-key event between keys
        bytes.extend(InputEvent { kind: 4, code: 4, value: 458_756 }.to_bytes());
        bytes.extend(typed(&[2, 3, 4, KEY_ENTER]));
        bytes.extend(typed(&[KEY_ENTER]));
        bytes.extend(typed(&[10, KEY_ENTER]));

        let mut scanner = HidScanner::with_event_reader(Cursor::new(bytes), 8, "test".into()).unwrap();
        wait_until_dead(&scanner);

        assert_eq!(scanner.poll_scan().as_deref(), Some("ABC123"));
        assert_eq!(scanner.poll_scan().as_deref(), Some("9"));
        assert_eq!(scanner.poll_scan(), None);
    }

    #[test]
    fn test_read_error_ends_listener() {
        let mut scanner = HidScanner::with_event_reader(Cursor::new(vec![0u8; 3]), 4, "short".into()).unwrap();
        wait_until_dead(&scanner);
        assert!(!scanner.is_alive());
        assert_eq!(scanner.poll_scan(), None);
    }

    #[test]
    fn test_overflow_keeps_oldest() {
        let mut bytes = Vec::new();
        for code in 2..=6u16 {
            bytes.extend(typed(&[code, KEY_ENTER]));
        }
        let mut scanner = HidScanner::with_event_reader(Cursor::new(bytes), 3, "burst".into()).unwrap();
        wait_until_dead(&scanner);

        let got: Vec<String> = std::iter::from_fn(|| scanner.poll_scan()).collect();
        assert_eq!(got, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_lines_trimmed_and_blank_skipped() {
        let input = "  ABC123 \n\n   \nhttps://example.com/r/9\n";
        let mut scanner = HidScanner::with_line_reader(Cursor::new(input), 8, "lines".into()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut got = Vec::new();
        while got.len() < 2 && Instant::now() < deadline {
            match scanner.poll_scan() {
                Some(s) => got.push(s),
                None => thread::sleep(Duration::from_millis(5)),
            }
        }
        assert_eq!(got, vec!["ABC123", "https://example.com/r/9"]);

        // EOF keeps the line listener idling until stopped
        assert!(scanner.is_alive());
        scanner.stop();
        assert!(!scanner.is_alive());
        scanner.stop();
    }
}
