//! HTTP API tests: drive the axum router with `tower::ServiceExt::oneshot`.
//!
//! The converter is backed by `StubTransport`, so no socket is opened and no
//! page is fetched. Only error paths are exercised here; a successful
//! `POST /convert` needs libpdfium and lives in `tests/e2e.rs`.

#![cfg(feature = "server")]

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use edgequake_url2pdf::server::{router, ErrorBody};
use edgequake_url2pdf::{ConversionConfig, Converter, FetchFailure, StubTransport};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn app(stub: StubTransport) -> axum::Router {
    router(Arc::new(Converter::new(ConversionConfig::default(), Arc::new(stub))))
}

fn convert_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/convert")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send `request` and return the status plus the decoded `{"error"}` body.
async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, ErrorBody) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: ErrorBody = serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("non-JSON error body ({e}): {:?}", String::from_utf8_lossy(&bytes)));
    (status, body)
}

const ARTICLE: &str = "<article><h1>Title</h1><p>Hello</p></article>";

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_check() {
    let response = app(StubTransport::html(ARTICLE))
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn invalid_url_is_bad_request() {
    let (status, body) = send(
        app(StubTransport::html(ARTICLE)),
        convert_request(r#"{"url":"ftp://example.com/post"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.error.contains("ftp://example.com/post"), "{}", body.error);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    for raw in ["{not json", r#"{"link":"https://example.com"}"#, "[]"] {
        let (status, body) = send(app(StubTransport::html(ARTICLE)), convert_request(raw)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{raw}");
        assert!(!body.error.is_empty());
    }
}

#[tokio::test]
async fn upstream_status_is_bad_gateway() {
    let (status, body) = send(
        app(StubTransport::html("<p>not here</p>").with_status(404)),
        convert_request(r#"{"url":"https://example.com/post/1"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.error.contains("404"), "{}", body.error);
}

#[tokio::test]
async fn upstream_timeout_is_gateway_timeout() {
    let (status, _) = send(
        app(StubTransport::failing(FetchFailure::Timeout { secs: 15 })),
        convert_request(r#"{"url":"https://example.com/post/1"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn page_without_content_is_internal_error() {
    let (status, _) = send(
        app(StubTransport::html("<html><body><nav>menu</nav></body></html>")),
        convert_request(r#"{"url":"https://example.com/post/1"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let response = app(StubTransport::html(ARTICLE))
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
