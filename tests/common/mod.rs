// Each integration test file is a separate binary; helpers not used in every
// binary would otherwise trigger dead_code warnings from clippy.
#![allow(dead_code)]

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode},
    routing::get,
    Router,
};
use http_body_util::BodyExt;
use ipnet::IpNet;
use serde_json::Value;
use tower::ServiceExt;

use og_grabber::{
    config::FetchLimits,
    guard::{Blocklists, UrlGuard},
    handlers,
    state::AppState,
};

pub const HTML_LIMIT: usize = 4096;
pub const IMAGE_LIMIT: usize = 16 * 1024;

/// Tight limits so size and timeout paths are cheap to hit.
pub fn test_limits() -> FetchLimits {
    FetchLimits {
        timeout: Duration::from_millis(500),
        max_html_bytes: HTML_LIMIT,
        max_image_bytes: IMAGE_LIMIT,
    }
}

/// Build the application router with the production block-lists.
pub fn create_test_app() -> Router {
    router(UrlGuard::new(Blocklists::standard()))
}

/// Build the application router with loopback allowed, so requests can reach
/// wiremock servers. Every other block stays in force.
pub fn create_loopback_test_app() -> Router {
    let loopback: IpNet = "127.0.0.0/8".parse().unwrap();
    router(UrlGuard::new(
        Blocklists::standard().without_range(loopback),
    ))
}

fn router(guard: UrlGuard) -> Router {
    let state = AppState::new(guard, test_limits()).expect("Failed to build test state");
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/resolve", get(handlers::resolve::resolve_og))
        .route("/download", get(handlers::download::download_image))
        .with_state(state)
}

/// Percent-encode a value for use in a query string.
pub fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

// ── Request helpers ──────────────────────────────────────────────────────────

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, bytes) = get_raw(app, uri).await;
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn get_raw(app: Router, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
    let req = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, bytes)
}

// ── Scenario helpers ─────────────────────────────────────────────────────────

/// GET /resolve for `url`, returning status and JSON body.
pub async fn resolve(app: Router, url: &str) -> (StatusCode, Value) {
    get_json(app, &format!("/resolve?url={}", encode(url))).await
}

/// Minimal HTML page carrying the given `<head>` contents.
pub fn page(head: &str) -> String {
    format!("<!doctype html><html><head>{head}</head><body>hi</body></html>")
}
