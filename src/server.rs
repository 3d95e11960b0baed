//! HTTP API: `POST /convert` turns a JSON `{"url": …}` into a PDF download.
//!
//! | Outcome | Status |
//! |---|---|
//! | PDF produced | `200 application/pdf` |
//! | malformed body or [`Url2PdfError::InvalidUrl`] | `400` |
//! | [`Url2PdfError::FetchFailed`] with a timeout | `504` |
//! | any other fetch failure | `502` |
//! | [`Url2PdfError::RenderFailed`] and everything else | `500` |
//!
//! Errors are JSON bodies of the form `{"error": "<message>"}`.

use crate::convert::Converter;
use crate::error::{FetchFailure, Url2PdfError};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Request body of `POST /convert`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConvertRequest {
    pub url: String,
}

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// An error on its way to becoming a response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<&Url2PdfError> for ApiError {
    fn from(err: &Url2PdfError) -> Self {
        let status = match err {
            Url2PdfError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
            Url2PdfError::FetchFailed {
                reason: FetchFailure::Timeout { .. },
                ..
            } => StatusCode::GATEWAY_TIMEOUT,
            Url2PdfError::FetchFailed { .. } => StatusCode::BAD_GATEWAY,
            Url2PdfError::RenderFailed { .. }
            | Url2PdfError::OutputWriteFailed { .. }
            | Url2PdfError::InvalidConfig(_)
            | Url2PdfError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[derive(Clone)]
struct AppState {
    converter: Arc<Converter>,
}

/// Build the router. Exposed separately from [`serve`] so tests can drive
/// it with `tower::ServiceExt::oneshot`.
pub fn router(converter: Arc<Converter>) -> Router {
    Router::new()
        .route("/convert", post(convert_handler))
        .route("/healthz", get(health_handler))
        .with_state(AppState { converter })
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(converter: Arc<Converter>, addr: SocketAddr) -> Result<(), Url2PdfError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Url2PdfError::Internal(format!("Failed to bind {addr}: {e}")))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(converter))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .map_err(|e| Url2PdfError::Internal(format!("Server error: {e}")))
}

async fn health_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn convert_handler(
    State(state): State<AppState>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.inspect_err(|e| warn!("Rejected request body: {}", e))?;

    let output = state
        .converter
        .convert_output(&request.url)
        .await
        .map_err(|e| {
            let api = ApiError::from(&e);
            warn!("Conversion of {} failed ({}): {}", request.url, api.status, e);
            api
        })?;

    let disposition = format!("attachment; filename=\"{}.pdf\"", output.url.slug());
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"article.pdf\""));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        output.pdf,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (Url2PdfError::invalid_url("x", "bad"), StatusCode::BAD_REQUEST),
            (
                Url2PdfError::fetch("u", FetchFailure::Timeout { secs: 15 }),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                Url2PdfError::fetch("u", FetchFailure::Status { status: 404 }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                Url2PdfError::fetch("u", FetchFailure::TooLarge { limit: 1 }),
                StatusCode::BAD_GATEWAY,
            ),
            (Url2PdfError::render("empty"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(&err).status(), status, "{err}");
        }
    }
}
