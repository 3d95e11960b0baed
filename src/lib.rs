//! # edgequake-url2pdf
//!
//! Convert web articles into clean, readable PDF documents.
//!
//! Blog pages carry far more than the article: navigation, cookie banners,
//! ad slots, subscribe widgets, comment threads. This crate fetches a page,
//! throws all of that away, keeps the headings, paragraphs, lists and
//! quotes in reading order, and typesets them as a paginated PDF with the
//! title, author, date and source URL up front.
//!
//! ## Pipeline Overview
//!
//! ```text
//! URL
//!  │
//!  ├─ 1. Validate   http/https only, length cap, optional host allowlist
//!  ├─ 2. Fetch      one bounded GET (timeout + body size cap)
//!  ├─ 3. Platform   Medium / WordPress / Blogger / Substack furniture
//!  ├─ 4. Strip      ads, navigation, scripts, empty wrappers
//!  ├─ 5. Normalize  headings, paragraphs, list items, quotes
//!  ├─ 6. Metadata   title, author, publication date, canonical URL
//!  └─ 7. Render     Helvetica layout, pagination, pdfium (spawn_blocking)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_url2pdf::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let pdf = convert("https://example.com/blog/my-post", &config).await?;
//!     std::fs::write("my-post.pdf", pdf)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Testing without the network
//!
//! [`Converter::new`] takes any [`Transport`]. [`StubTransport`] answers
//! with a fixed page, and [`RecordingSurface`] stands in for pdfium:
//!
//! ```rust
//! use edgequake_url2pdf::{ConversionConfig, Converter, StubTransport};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let stub = StubTransport::html("<article><h1>Title</h1><p>Hello</p></article>");
//! let converter = Converter::new(ConversionConfig::default(), Arc::new(stub));
//! let doc = converter.prepare("https://example.com/post/1").await.unwrap();
//! assert_eq!(doc.metadata.title, "Title");
//! # });
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | The axum HTTP API in [`server`] |
//! | `cli`    | on      | The `url2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable both when using only the library:
//! ```toml
//! edgequake-url2pdf = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! Rendering binds the pdfium shared library at runtime: `PDFIUM_LIB_PATH`
//! (file or directory) first, then the working directory, then the system
//! library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, PaperSize};
pub use convert::{convert, convert_sync, convert_to_file, Converter};
pub use document::{
    CleanedMarkup, ContentBlock, DocumentMetadata, RawDocument, RenderableDocument, ValidatedUrl,
};
pub use error::{FetchFailure, Url2PdfError};
pub use output::{ConversionOutput, ConversionStats};
pub use pipeline::fetch::{ContentFetcher, FetchLimits, HttpTransport, StubTransport, Transport, TransportResponse};
pub use pipeline::layout::{Helvetica, TextMetrics};
pub use pipeline::render::{PdfSurface, PdfiumSurface, RecordingSurface, RenderOptions};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
