/*
 *  health.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Optional HTTP liveness endpoint
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

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use log::info;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Flags the session loop writes every tick and the endpoint only reads.
#[derive(Debug)]
pub struct Liveness {
    running: AtomicBool,
    scanner_alive: AtomicBool,
    backend: &'static str,
}

impl Liveness {
    pub fn new(backend: &'static str) -> Self {
        Self {
            running: AtomicBool::new(false),
            scanner_alive: AtomicBool::new(false),
            backend,
        }
    }

    pub fn set_running(&self, on: bool) {
        self.running.store(on, Ordering::Relaxed);
    }

    pub fn set_scanner_alive(&self, on: bool) {
        self.scanner_alive.store(on, Ordering::Relaxed);
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn scanner_alive(&self) -> bool {
        self.scanner_alive.load(Ordering::Relaxed)
    }

    pub fn report(&self) -> HealthReport {
        let running = self.running();
        let scanner_alive = self.scanner_alive();
        HealthReport {
            status: if running && scanner_alive { "ok" } else { "degraded" }.to_string(),
            running,
            scanner_alive,
            backend: self.backend.to_string(),
            pid: std::process::id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    pub status: String,
    pub running: bool,
    pub scanner_alive: bool,
    pub backend: String,
    pub pid: u32,
}

/// GET /health
async fn health(State(liveness): State<Arc<Liveness>>) -> Json<HealthReport> {
    Json(liveness.report())
}

pub fn router(liveness: Arc<Liveness>) -> Router {
    Router::new().route("/health", get(health)).with_state(liveness)
}

/// Serve until the stop flag flips
pub async fn serve(
    port: u16,
    liveness: Arc<Liveness>,
    mut stop: watch::Receiver<bool>,
) -> Result<(), std::io::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("health endpoint on http://{}/health", listener.local_addr()?);

    axum::serve(listener, router(liveness))
        .with_graceful_shutdown(async move {
            let _ = stop.wait_for(|s| *s).await;
        })
        .await
}
