//! Result types returned by a finished conversion.

use crate::document::{RenderableDocument, ValidatedUrl};
use serde::{Deserialize, Serialize};

/// Everything a conversion produced.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// The URL that was fetched.
    pub url: ValidatedUrl,
    /// The encoded PDF.
    pub pdf: Vec<u8>,
    /// The document that was rendered.
    pub document: RenderableDocument,
    pub stats: ConversionStats,
}

/// Counts and timings for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub pages: usize,
    pub blocks: usize,
    pub pdf_bytes: usize,
    /// Bytes of markup received from the source.
    pub source_bytes: usize,
    pub fetch_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}
