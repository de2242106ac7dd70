/*
 *  fetcher.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Resolve a scan to record metadata and cover art over HTTP
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

use log::{debug, warn};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::record::{CoverArt, RecordMetadata, RecordPayload, ScanInput, COVER_EDGE};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Why a scan could not be resolved. The session loop treats them all the
/// same; the variants exist for the log line.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    Status { status: StatusCode, url: String },
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("response carried no record")]
    MissingRecord,
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

/// Turns a scan into a record. One request, no retries.
pub trait MetadataFetcher: Send + Sync {
    fn fetch(
        &self,
        scan: &ScanInput,
    ) -> impl Future<Output = Result<RecordMetadata, FetchError>> + Send;
}

#[derive(Debug, Deserialize)]
struct ScanResponse {
    #[serde(default)]
    record: Option<Value>,
}

/// Pull the `record` object out of a scan response body. Missing, null,
/// non-object and empty records are all "no record".
pub fn parse_record(body: &[u8]) -> Result<RecordPayload, FetchError> {
    let response: ScanResponse = serde_json::from_slice(body)?;
    match response.record {
        Some(Value::Object(map)) if !map.is_empty() => {
            Ok(serde_json::from_value(Value::Object(map))?)
        }
        _ => Err(FetchError::MissingRecord),
    }
}

/// Client for the records service.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    host: String,
    client: Client,
}

impl HttpFetcher {
    pub fn new(host: &str) -> Result<Self, FetchError> {
        const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(VERSION));
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Cover art is optional; every failure here is logged and becomes `None`.
    async fn fetch_cover(&self, cover_path: &str) -> Option<CoverArt> {
        let url = format!("{}{}", self.host, cover_path);
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("cover fetch failed for {}: {}", url, e);
                return None;
            }
        };
        if !response.status().is_success() {
            warn!("cover fetch for {} returned {}", url, response.status());
            return None;
        }
        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                warn!("cover body read failed for {}: {}", url, e);
                return None;
            }
        };
        match CoverArt::decode(&bytes, COVER_EDGE) {
            Ok(cover) => Some(cover),
            Err(e) => {
                warn!("cover decode failed for {}: {}", url, e);
                None
            }
        }
    }
}

impl MetadataFetcher for HttpFetcher {
    async fn fetch(&self, scan: &ScanInput) -> Result<RecordMetadata, FetchError> {
        let url = scan.request_url(&self.host);
        debug!("resolving {} via {}", scan, url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status, url });
        }
        let body = response.bytes().await?;
        let payload = parse_record(&body)?;

        let cover = match payload.cover_path.as_deref() {
            Some(path) if !path.is_empty() => self.fetch_cover(path).await,
            _ => None,
        };

        Ok(RecordMetadata::from_payload(payload, cover))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record_fields() {
        let body = br#"{"record":{"title":"X","artists":"Y","section":"Z","code":"ABC123"}}"#;
        let payload = parse_record(body).unwrap();
        assert_eq!(payload.title, "X");
        assert_eq!(payload.artists, "Y");
        assert_eq!(payload.section, "Z");
        assert_eq!(payload.code, "ABC123");
        assert!(payload.cover_path.is_none());
    }

    #[test]
    fn test_parse_record_keeps_record_with_null_or_numeric_fields() {
        let body = br#"{"record":{"title":"X","artists":"Y","section":null,"code":"ABC123"}}"#;
        let payload = parse_record(body).unwrap();
        assert_eq!(payload.section, "N/A");
        assert_eq!(payload.code, "ABC123");

        let body = br#"{"record":{"title":"X","artists":"Y","section":"Z","code":123456}}"#;
        assert_eq!(parse_record(body).unwrap().code, "123456");
    }

    #[test]
    fn test_missing_null_and_empty_records_fail() {
        for body in [&b"{}"[..], br#"{"record":null}"#, br#"{"record":{}}"#, br#"{"record":"ABC"}"#] {
            assert!(
                matches!(parse_record(body), Err(FetchError::MissingRecord)),
                "{}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn test_malformed_json_fails() {
        assert!(matches!(parse_record(b"<html>"), Err(FetchError::Payload(_))));
    }

    #[test]
    fn test_host_trailing_slash_trimmed() {
        let fetcher = HttpFetcher::new("http://records.local/").unwrap();
        assert_eq!(fetcher.host(), "http://records.local");
    }
}
