/*
 *  main.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Entry point: wire the collaborators and run the session
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

use anyhow::{anyhow, Context};
use env_logger::Env;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};

use platter::config;
use platter::display::{DisplaySink, DisplaySinkFactory};
use platter::fetcher::HttpFetcher;
use platter::health::{self, Liveness};
use platter::scanner::HidScanner;
use platter::session::{Session, SessionConfig};
use platter::shutdown::ShutdownSignal;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Asynchronously waits for a SIGINT, SIGTERM, or SIGHUP signal.
async fn signal_handler() -> Result<(), Box<dyn std::error::Error>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load()?;

    env_logger::Builder::from_env(Env::default().default_filter_or(if cfg.debug { "debug" } else { "info" }))
        .format_timestamp_secs()
        .init();

    info!("platter v.{} built {} ({})", env!("CARGO_PKG_VERSION"), BUILD_DATE, BUILD_PROFILE);
    info!(
        "records from {}, {}x{} on {}, timeout {:?}",
        cfg.host_url,
        cfg.display.width,
        cfg.display.height,
        if cfg.display.use_tft { cfg.display.tft.driver.name() } else { "emulator" },
        cfg.timeout()
    );

    let shutdown = ShutdownSignal::new();

    let built = DisplaySinkFactory::create_from_config(&cfg.display).context("display unavailable")?;
    let liveness = Arc::new(Liveness::new(built.sink.capabilities().backend.as_str()));
    let fetcher = HttpFetcher::new(&cfg.host_url)?;
    let scanner = HidScanner::spawn(&cfg.scanner).context("cannot start scanner listener")?;

    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        match signal_handler().await {
            Ok(()) => on_signal.trigger(),
            Err(e) => error!("signal handling unavailable: {}", e),
        }
    });

    if let Some(port) = cfg.health_port {
        let live = Arc::clone(&liveness);
        let stop = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) = health::serve(port, live, stop).await {
                warn!("health endpoint stopped: {}", e);
            }
        });
    }

    let session = Session::new(fetcher, scanner, built.sink, SessionConfig::from(&cfg), liveness);

    #[cfg(feature = "emulator")]
    if let Some(state) = built.emulator_state {
        use platter::display::drivers::emulator::record_exit;
        use platter::display::emulator_window::{EmulatorWindow, EmulatorWindowConfig};

        let exit_state = Arc::clone(&state);
        let stop = shutdown.subscribe();
        let session_task = tokio::spawn(async move {
            let result = session.run(stop).await;
            let code = match &result {
                Ok(()) => 0,
                Err(e) => {
                    error!("display failed: {}", e);
                    1
                }
            };
            record_exit(&exit_state, code);
            result
        });

        // the window owns the main thread and exits the process with the
        // session's code once it has finished
        let window = EmulatorWindow::new(state, EmulatorWindowConfig::default(), shutdown.clone());
        let failure = window.run().err().map(|e| e.to_string());
        shutdown.trigger();
        if let Err(e) = session_task.await {
            error!("session task failed: {}", e);
        }
        return match failure {
            Some(msg) => Err(anyhow!("emulator window failed: {msg}")),
            None => Ok(()),
        };
    }

    let result = session.run(shutdown.subscribe()).await;
    info!("platter stopped");
    result.context("display failed")
}
