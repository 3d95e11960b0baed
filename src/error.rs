//! Error types for the edgequake-url2pdf library.
//!
//! Every failure that ends a conversion is a [`Url2PdfError`]. The three
//! variants a caller usually has to branch on are:
//!
//! * [`Url2PdfError::InvalidUrl`] — the input was rejected before any network
//!   activity. Client fault.
//! * [`Url2PdfError::FetchFailed`] — the source page could not be retrieved;
//!   [`FetchFailure`] says why (timeout, status, size cap, transport).
//! * [`Url2PdfError::RenderFailed`] — there was nothing to render, or the PDF
//!   backend failed.
//!
//! The cleanup, stripping, normalisation and metadata stages have no error
//! type at all: malformed markup degrades to fewer blocks or empty fields.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-url2pdf library.
#[derive(Debug, Error)]
pub enum Url2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The candidate URL was rejected by the validator.
    #[error("Invalid URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },

    // ── Fetch errors ──────────────────────────────────────────────────────
    /// The source page could not be retrieved.
    #[error("Failed to fetch '{url}': {reason}")]
    FetchFailed { url: String, reason: FetchFailure },

    // ── Render errors ─────────────────────────────────────────────────────
    /// The document could not be turned into a PDF.
    #[error("Failed to render PDF: {reason}")]
    RenderFailed { reason: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Url2PdfError {
    pub(crate) fn invalid_url(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn fetch(url: &str, reason: FetchFailure) -> Self {
        Self::FetchFailed {
            url: url.to_string(),
            reason,
        }
    }

    pub(crate) fn render(reason: impl Into<String>) -> Self {
        Self::RenderFailed {
            reason: reason.into(),
        }
    }
}

/// Why a fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    /// No complete response within the configured timeout.
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The server answered with a non-2xx status.
    #[error("HTTP status {status}")]
    Status { status: u16 },

    /// The response body exceeded the configured size cap.
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    /// Connection, TLS, DNS or decoding failure.
    #[error("{0}")]
    Transport(String),
}
