/*
 *  tests/common/mod.rs
 *
 *  In-process stand-in for the records service
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 */

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

pub const COVER_RGB: [u8; 3] = [200, 40, 0];

/// Paths and User-Agent headers seen by the fake service
#[derive(Clone, Default)]
pub struct Hits(Arc<Mutex<Vec<(String, String)>>>);

impl Hits {
    fn log(&self, path: String, headers: &HeaderMap) {
        let agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.0.lock().unwrap().push((path, agent));
    }

    pub fn paths(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn agents(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(_, a)| a.clone()).collect()
    }
}

fn record(code: &str, cover_path: Option<&str>) -> serde_json::Value {
    json!({ "record": { "title": "X", "artists": "Y", "section": "Z", "code": code, "cover_path": cover_path } })
}

async fn scan(Path(code): Path<String>, State(hits): State<Hits>, headers: HeaderMap) -> Response {
    hits.log(format!("/plays/scan/{code}"), &headers);
    match code.as_str() {
        "ABC123" => Json(record("ABC123", None)).into_response(),
        "COVER1" => Json(record("COVER1", Some("/covers/1.png"))).into_response(),
        "NOART1" => Json(record("NOART1", Some("/covers/gone.png"))).into_response(),
        "JUNKAR" => Json(record("JUNKAR", Some("/covers/junk.png"))).into_response(),
        "SPARSE" => Json(json!({ "record": { "code": "SPARSE" } })).into_response(),
        "NOREC0" => Json(json!({ "record": null })).into_response(),
        "FAIL00" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn direct(State(hits): State<Hits>, headers: HeaderMap) -> Response {
    hits.log("/r/9".into(), &headers);
    Json(record("R00009", None)).into_response()
}

async fn cover(Path(name): Path<String>, State(hits): State<Hits>, headers: HeaderMap) -> Response {
    hits.log(format!("/covers/{name}"), &headers);
    match name.as_str() {
        "1.png" => ([(header::CONTENT_TYPE, "image/png")], cover_png()).into_response(),
        "junk.png" => ([(header::CONTENT_TYPE, "image/png")], b"not a png".to_vec()).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

pub fn cover_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(60, 40, image::Rgb(COVER_RGB));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png).unwrap();
    out
}

/// Start the fake service on an ephemeral port; returns its base URL.
pub async fn spawn_records_service() -> (String, Hits) {
    let hits = Hits::default();
    let app = Router::new()
        .route("/plays/scan/{code}", get(scan))
        .route("/r/9", get(direct))
        .route("/covers/{name}", get(cover))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), hits)
}
