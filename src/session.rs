/*
 *  session.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  The now-playing session: scan, show, expire, repeat
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

use chrono::{Local, NaiveTime};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::config::Config;
use crate::display::{BoxedSink, DisplayError, FrameRenderer};
use crate::fetcher::MetadataFetcher;
use crate::health::Liveness;
use crate::pacer::TickPacer;
use crate::record::{RecordMetadata, ScanInput};
use crate::scanner::ScanSource;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Loop period
    pub tick: Duration,
    /// How long a record stays up after its scan
    pub timeout: Duration,
    pub fade_steps: u32,
    pub fade_duration: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            timeout: Duration::from_secs(30),
            fade_steps: 10,
            fade_duration: Duration::from_millis(500),
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            tick: Duration::from_millis(cfg.session.tick_ms),
            timeout: cfg.timeout(),
            fade_steps: cfg.session.fade_steps,
            fade_duration: Duration::from_millis(cfg.session.fade_ms),
        }
    }
}

/// The fade back to idle is not a state of its own: it plays out inside
/// the tick that notices the expiry.
#[derive(Debug)]
pub enum SessionState {
    Idle,
    Showing { record: RecordMetadata, shown_at: Instant },
}

/// What the scanner poll led to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchOutcome {
    #[default]
    NoScan,
    /// Blank scan, never sent to the fetcher
    Ignored,
    /// Now showing the record with this code
    Shown(String),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TickReport {
    pub faded: bool,
    pub fetch: FetchOutcome,
}

pub struct Session<F, S> {
    fetcher: F,
    scanner: S,
    sink: BoxedSink,
    renderer: FrameRenderer,
    config: SessionConfig,
    state: SessionState,
    liveness: Arc<Liveness>,
    wall_clock: fn() -> NaiveTime,
}

fn local_time() -> NaiveTime {
    Local::now().time()
}

impl<F, S> Session<F, S>
where
    F: MetadataFetcher,
    S: ScanSource,
{
    pub fn new(
        fetcher: F,
        scanner: S,
        sink: BoxedSink,
        config: SessionConfig,
        liveness: Arc<Liveness>,
    ) -> Self {
        let (width, height) = sink.dimensions();
        Self {
            fetcher,
            scanner,
            sink,
            renderer: FrameRenderer::new(width, height),
            config,
            state: SessionState::Idle,
            liveness,
            wall_clock: local_time,
        }
    }

    /// Clock shown on screen. Local time unless replaced.
    pub fn with_wall_clock(mut self, clock: fn() -> NaiveTime) -> Self {
        self.wall_clock = clock;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current(&self) -> Option<&RecordMetadata> {
        match &self.state {
            SessionState::Showing { record, .. } => Some(record),
            SessionState::Idle => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, SessionState::Idle)
    }

    /// Tick at a fixed cadence until `stop` flips, then stop the scanner and
    /// blank the sink. A failed display push ends the loop with its error;
    /// the cleanup still happens.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> Result<(), DisplayError> {
        info!(
            "session started: tick {:?}, timeout {:?}, {} backend",
            self.config.tick,
            self.config.timeout,
            self.sink.capabilities().backend.as_str()
        );
        self.liveness.set_running(true);
        let mut pacer = TickPacer::new(self.config.tick);

        let result = loop {
            let stopping = *stop.borrow();
            if stopping {
                info!("session stop requested");
                break Ok(());
            }
            if let Err(e) = self.tick(Instant::now()).await {
                error!("display failed, ending session: {}", e);
                break Err(e);
            }
            tokio::select! {
                _ = pacer.wait() => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        info!("stop signal dropped, ending session");
                        break Ok(());
                    }
                }
            }
        };

        self.close();
        result
    }

    /// One pass: expire, draw, poll. Only a failure to show the regular
    /// frame is returned; everything else is logged.
    pub async fn tick(&mut self, now: Instant) -> Result<TickReport, DisplayError> {
        let wall = (self.wall_clock)();
        let mut report = TickReport::default();

        if self.is_expired(now) {
            self.expire(wall).await;
            report.faded = true;
        }

        let frame = match &self.state {
            SessionState::Idle => self.renderer.render_idle(wall),
            SessionState::Showing { record, .. } => self.renderer.render_showing(record, wall),
        };
        self.sink.show(&frame)?;

        report.fetch = self.poll_scanner(now).await;
        self.liveness.set_scanner_alive(self.scanner.is_alive());
        Ok(report)
    }

    fn is_expired(&self, now: Instant) -> bool {
        match &self.state {
            SessionState::Showing { shown_at, .. } => {
                now.saturating_duration_since(*shown_at) > self.config.timeout
            }
            SessionState::Idle => false,
        }
    }

    /// State is Idle afterwards whatever the fade did.
    async fn expire(&mut self, wall: NaiveTime) {
        let previous = std::mem::replace(&mut self.state, SessionState::Idle);
        let SessionState::Showing { record, .. } = previous else {
            return;
        };
        info!("{} timed out, back to idle", record.code);
        if let Err(e) = self.fade_to_idle(&record, wall).await {
            error!("fade to idle failed: {}", e);
        }
    }

    async fn fade_to_idle(&mut self, record: &RecordMetadata, wall: NaiveTime) -> Result<(), DisplayError> {
        let steps = self.config.fade_steps.max(1);
        let pause = self.config.fade_duration / steps;
        let from = self.renderer.render_showing(record, wall);
        let to = self.renderer.render_idle(wall);
        for i in 1..=steps {
            let frame = self.renderer.blend(&from, &to, i as f32 / steps as f32)?;
            self.sink.show(&frame)?;
            tokio::time::sleep(pause).await;
        }
        Ok(())
    }

    async fn poll_scanner(&mut self, now: Instant) -> FetchOutcome {
        let Some(raw) = self.scanner.poll_scan() else {
            return FetchOutcome::NoScan;
        };
        let Some(scan) = ScanInput::parse(&raw) else {
            debug!("ignoring blank scan");
            return FetchOutcome::Ignored;
        };

        info!("scanned {}", scan);
        let started = Instant::now();
        match self.fetcher.fetch(&scan).await {
            Ok(record) => {
                info!("now playing: {} by {} [{}]", record.title, record.artists, record.code);
                let code = record.code.clone();
                // age counts from when the record arrived, not when the tick began
                let shown_at = now + started.elapsed();
                self.state = SessionState::Showing { record, shown_at };
                FetchOutcome::Shown(code)
            }
            Err(e) => {
                warn!("lookup for {} failed: {}", scan, e);
                FetchOutcome::Failed
            }
        }
    }

    fn close(&mut self) {
        self.liveness.set_running(false);
        self.scanner.stop();
        self.liveness.set_scanner_alive(false);
        self.sink.shutdown();
        info!("session closed");
    }

    #[cfg(test)]
    fn show_since(&mut self, record: RecordMetadata, shown_at: Instant) {
        self.state = SessionState::Showing { record, shown_at };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::MockSink;
    use crate::display::Frame;
    use crate::fetcher::FetchError;
    use crate::shutdown::ShutdownSignal;
    use reqwest::StatusCode;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const W: u32 = 320;
    const H: u32 = 240;

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    fn record(code: &str) -> RecordMetadata {
        RecordMetadata {
            title: "X".into(),
            artists: "Y".into(),
            section: "Z".into(),
            code: code.into(),
            cover_path: None,
            cover: None,
        }
    }

    /// Known codes resolve; anything else is a 500
    #[derive(Clone, Default)]
    struct FakeFetcher {
        records: HashMap<String, RecordMetadata>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeFetcher {
        fn with(codes: &[&str]) -> Self {
            let records = codes.iter().map(|c| (c.to_string(), record(c))).collect();
            Self { records, ..Default::default() }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl MetadataFetcher for FakeFetcher {
        async fn fetch(&self, scan: &ScanInput) -> Result<RecordMetadata, FetchError> {
            self.calls.lock().unwrap().push(scan.as_str().to_string());
            self.records.get(scan.as_str()).cloned().ok_or(FetchError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                url: scan.to_string(),
            })
        }
    }

    #[derive(Clone, Default)]
    struct FakeScanner {
        queue: Arc<Mutex<VecDeque<String>>>,
        stops: Arc<AtomicUsize>,
    }

    impl FakeScanner {
        fn push(&self, scan: &str) {
            self.queue.lock().unwrap().push_back(scan.to_string());
        }
    }

    impl ScanSource for FakeScanner {
        fn poll_scan(&mut self) -> Option<String> {
            self.queue.lock().unwrap().pop_front()
        }

        fn is_alive(&self) -> bool {
            self.stops.load(Ordering::SeqCst) == 0
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Rig {
        session: Session<FakeFetcher, FakeScanner>,
        fetcher: FakeFetcher,
        scanner: FakeScanner,
        sink: MockSink,
        liveness: Arc<Liveness>,
    }

    fn rig(codes: &[&str], config: SessionConfig) -> Rig {
        let fetcher = FakeFetcher::with(codes);
        let scanner = FakeScanner::default();
        let sink = MockSink::new(W, H);
        let liveness = Arc::new(Liveness::new("mock"));
        let session = Session::new(
            fetcher.clone(),
            scanner.clone(),
            Box::new(sink.clone()),
            config,
            liveness.clone(),
        )
        .with_wall_clock(noon);
        Rig { session, fetcher, scanner, sink, liveness }
    }

    fn quick_fade() -> SessionConfig {
        SessionConfig { fade_duration: Duration::from_millis(10), ..Default::default() }
    }

    fn frames(sink: &MockSink) -> Vec<Frame> {
        sink.state().lock().unwrap().frames.clone()
    }

    #[tokio::test]
    async fn test_idle_tick_shows_clock_only() {
        let mut r = rig(&[], quick_fade());
        let report = r.session.tick(Instant::now()).await.unwrap();
        assert_eq!(report, TickReport::default());
        assert_eq!(r.sink.last_frame(), Some(FrameRenderer::new(W, H).render_idle(noon())));
        assert!(r.fetcher.calls().is_empty());
        assert!(r.liveness.scanner_alive());
    }

    #[tokio::test]
    async fn test_lookup_code_scan_enters_showing() {
        let mut r = rig(&["ABC123"], quick_fade());
        r.scanner.push("  ABC123\n");

        let report = r.session.tick(Instant::now()).await.unwrap();
        assert_eq!(report.fetch, FetchOutcome::Shown("ABC123".into()));
        assert_eq!(r.fetcher.calls(), vec!["ABC123"]);

        let current = r.session.current().unwrap();
        assert_eq!(
            (current.title.as_str(), current.artists.as_str(), current.section.as_str(), current.code.as_str()),
            ("X", "Y", "Z", "ABC123")
        );
        assert!(current.cover.is_none());

        // drawn on the next tick
        r.session.tick(Instant::now()).await.unwrap();
        let expected = FrameRenderer::new(W, H).render_showing(current_record(&r), noon());
        assert_eq!(r.sink.last_frame(), Some(expected));
    }

    fn current_record<'a>(r: &'a Rig) -> &'a RecordMetadata {
        r.session.current().unwrap()
    }

    #[tokio::test]
    async fn test_new_scan_preempts_without_fade() {
        let mut r = rig(&["AAAAAA", "BBBBBB"], quick_fade());
        let t0 = Instant::now();
        r.scanner.push("AAAAAA");
        r.session.tick(t0).await.unwrap();

        let t1 = t0 + Duration::from_secs(20);
        r.scanner.push("BBBBBB");
        let report = r.session.tick(t1).await.unwrap();
        assert!(!report.faded);
        assert_eq!(report.fetch, FetchOutcome::Shown("BBBBBB".into()));
        assert_eq!(r.sink.frame_count(), 2);

        // age restarted at t1: 40s after the first scan, 20s after the second
        let report = r.session.tick(t0 + Duration::from_secs(40)).await.unwrap();
        assert!(!report.faded);
        assert_eq!(r.session.current().map(|c| c.code.as_str()), Some("BBBBBB"));
    }

    #[tokio::test]
    async fn test_timeout_must_be_exceeded() {
        let mut r = rig(&[], quick_fade());
        let t0 = Instant::now();
        r.session.show_since(record("ABC123"), t0);

        let report = r.session.tick(t0 + Duration::from_secs(30)).await.unwrap();
        assert!(!report.faded);
        assert!(!r.session.is_idle());

        let report = r.session.tick(t0 + Duration::from_secs(30) + Duration::from_nanos(1)).await.unwrap();
        assert!(report.faded);
        assert!(r.session.is_idle());
    }

    #[tokio::test]
    async fn test_half_minute_timeout_fades_at_31s() {
        let config = SessionConfig {
            timeout: Duration::from_secs_f64(0.5 * 60.0),
            ..quick_fade()
        };
        let mut r = rig(&["ABC123"], config);
        let t0 = Instant::now();
        r.scanner.push("ABC123");
        r.session.tick(t0).await.unwrap();
        assert!(!r.session.is_idle());

        let report = r.session.tick(t0 + Duration::from_secs(31)).await.unwrap();
        assert!(report.faded);
        assert!(r.session.is_idle());
    }

    #[tokio::test]
    async fn test_fade_frames() {
        let mut r = rig(&[], quick_fade());
        let t0 = Instant::now();
        let rec = record("ABC123");
        r.session.show_since(rec.clone(), t0);

        let renderer = FrameRenderer::new(W, H);
        let showing = renderer.render_showing(&rec, noon());
        let idle = renderer.render_idle(noon());

        r.session.tick(t0 + Duration::from_secs(31)).await.unwrap();
        let shown = frames(&r.sink);
        // ten fade frames then the regular idle frame
        assert_eq!(shown.len(), 11);
        assert_ne!(shown[0], showing);
        assert_ne!(shown[0], idle);
        assert_eq!(shown[0], renderer.blend(&showing, &idle, 0.1).unwrap());
        assert_eq!(shown[9], idle);
        assert_eq!(shown[10], idle);
    }

    #[tokio::test]
    async fn test_fade_failure_still_clears() {
        let mut r = rig(&[], quick_fade());
        let t0 = Instant::now();
        r.session.show_since(record("ABC123"), t0);
        r.sink.state().lock().unwrap().fail_after = Some(3);

        // the fade dies on its fourth frame, then the idle frame fails too
        let result = r.session.tick(t0 + Duration::from_secs(60)).await;
        assert!(result.is_err());
        assert!(r.session.is_idle());
        assert_eq!(r.sink.frame_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_state() {
        let mut r = rig(&["ABC123"], quick_fade());
        let t0 = Instant::now();

        r.scanner.push("ZZZ999");
        let report = r.session.tick(t0).await.unwrap();
        assert_eq!(report.fetch, FetchOutcome::Failed);
        assert!(r.session.is_idle());

        r.scanner.push("ABC123");
        r.session.tick(t0).await.unwrap();
        r.scanner.push("https://example.com/r/9");
        let report = r.session.tick(t0 + Duration::from_secs(1)).await.unwrap();
        assert_eq!(report.fetch, FetchOutcome::Failed);
        assert_eq!(r.session.current().map(|c| c.code.as_str()), Some("ABC123"));
        assert_eq!(r.fetcher.calls(), vec!["ZZZ999", "ABC123", "https://example.com/r/9"]);
    }

    #[tokio::test]
    async fn test_blank_scans_never_fetched() {
        let mut r = rig(&[], quick_fade());
        for blank in ["", "   ", "\t\n"] {
            r.scanner.push(blank);
            let report = r.session.tick(Instant::now()).await.unwrap();
            assert_eq!(report.fetch, FetchOutcome::Ignored);
        }
        assert!(r.fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_show_failure_outside_fade_propagates() {
        let mut r = rig(&[], quick_fade());
        r.sink.state().lock().unwrap().simulate_show_failure = true;
        assert!(r.session.tick(Instant::now()).await.is_err());
    }

    #[tokio::test]
    async fn test_run_until_stopped() {
        let r = rig(&[], SessionConfig { tick: Duration::from_millis(5), ..quick_fade() });
        let signal = ShutdownSignal::new();
        let liveness = r.liveness.clone();
        let handle = tokio::spawn(r.session.run(signal.subscribe()));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(liveness.running());
        signal.trigger();
        handle.await.unwrap().unwrap();

        assert!(r.sink.frame_count() >= 2);
        assert_eq!(r.sink.shutdown_count(), 1);
        assert_eq!(r.scanner.stops.load(Ordering::SeqCst), 1);
        assert!(!liveness.running());
        assert!(!liveness.scanner_alive());
    }

    #[tokio::test]
    async fn test_run_display_failure_still_cleans_up() {
        let r = rig(&[], quick_fade());
        r.sink.state().lock().unwrap().simulate_show_failure = true;
        let signal = ShutdownSignal::new();

        let result = r.session.run(signal.subscribe()).await;
        assert!(result.is_err());
        assert_eq!(r.sink.shutdown_count(), 1);
        assert_eq!(r.scanner.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_config_from_app_config() {
        let cfg = Config { timeout_minutes: 0.5, ..Default::default() };
        let session = SessionConfig::from(&cfg);
        assert_eq!(session.timeout, Duration::from_secs(30));
        assert_eq!(session.tick, Duration::from_millis(100));
        assert_eq!(session.fade_steps, 10);
        assert_eq!(session.fade_duration, Duration::from_millis(500));
    }
}
