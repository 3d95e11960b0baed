//! Configuration types for URL-to-PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. One struct holds every knob so a
//! config can be cloned into request handlers, logged, and compared between
//! runs.

use crate::error::Url2PdfError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for a URL-to-PDF conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_url2pdf::{ConversionConfig, PaperSize};
///
/// let config = ConversionConfig::builder()
///     .fetch_timeout_secs(10)
///     .paper(PaperSize::Letter)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Longest accepted URL, in bytes. Default: 2048.
    ///
    /// Checked before the URL is parsed so adversarial input never reaches
    /// the parser or the network.
    pub max_url_length: usize,

    /// Hosts the validator accepts. Empty (default) accepts every host.
    ///
    /// Entries match on label boundaries: `medium.com` accepts
    /// `medium.com`, `www.medium.com` and `team.medium.com`.
    pub allowed_hosts: Vec<String>,

    /// Whole-request timeout for the page fetch, in seconds. Default: 15.
    pub fetch_timeout_secs: u64,

    /// Largest accepted response body, in bytes. Default: 5 MiB.
    pub max_body_bytes: u64,

    /// `User-Agent` sent with the fetch. Many blog hosts serve a stripped or
    /// blocked page to unknown agents, so the default looks like a browser.
    pub user_agent: String,

    /// Output paper size. Default: [`PaperSize::A4`].
    pub paper: PaperSize,

    /// Page margin on all four sides, in points. Default: 56 (≈ 20 mm).
    pub margin_pt: f32,

    /// Draw the source URL and "Page N of M" at the foot of every page. Default: true.
    pub include_footer: bool,

    /// Stage-level progress events. Not serialised.
    #[serde(skip)]
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_url_length: 2048,
            allowed_hosts: Vec::new(),
            fetch_timeout_secs: 15,
            max_body_bytes: 5 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            paper: PaperSize::default(),
            margin_pt: 56.0,
            include_footer: true,
            progress_callback: None,
        }
    }
}

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; url2pdf/",
    env!("CARGO_PKG_VERSION"),
    "; +https://github.com/raphaelmansuy/edgequake-url2pdf)"
);

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("max_url_length", &self.max_url_length)
            .field("allowed_hosts", &self.allowed_hosts)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("user_agent", &self.user_agent)
            .field("paper", &self.paper)
            .field("margin_pt", &self.margin_pt)
            .field("include_footer", &self.include_footer)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn max_url_length(mut self, n: usize) -> Self {
        self.config.max_url_length = n;
        self
    }

    pub fn allowed_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_hosts = hosts
            .into_iter()
            .map(|h| h.into().trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    pub fn max_body_bytes(mut self, n: u64) -> Self {
        self.config.max_body_bytes = n;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn paper(mut self, paper: PaperSize) -> Self {
        self.config.paper = paper;
        self
    }

    pub fn margin_pt(mut self, pt: f32) -> Self {
        self.config.margin_pt = pt;
        self
    }

    pub fn include_footer(mut self, v: bool) -> Self {
        self.config.include_footer = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Url2PdfError> {
        let c = &self.config;
        if c.max_url_length < 16 {
            return Err(Url2PdfError::InvalidConfig(format!(
                "max_url_length must be ≥ 16, got {}",
                c.max_url_length
            )));
        }
        if c.fetch_timeout_secs == 0 {
            return Err(Url2PdfError::InvalidConfig(
                "fetch timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_body_bytes == 0 {
            return Err(Url2PdfError::InvalidConfig(
                "max_body_bytes must be ≥ 1".into(),
            ));
        }
        let (w, h) = c.paper.dimensions_pt();
        if !(c.margin_pt >= 0.0 && c.margin_pt * 4.0 < w.min(h)) {
            return Err(Url2PdfError::InvalidConfig(format!(
                "margin {}pt leaves no room on a {:?} page",
                c.margin_pt, c.paper
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Output paper size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    /// 210 × 297 mm. (default)
    #[default]
    A4,
    /// 8.5 × 11 in.
    Letter,
}

impl PaperSize {
    /// `(width, height)` in PDF points.
    pub fn dimensions_pt(self) -> (f32, f32) {
        match self {
            PaperSize::A4 => (595.28, 841.89),
            PaperSize::Letter => (612.0, 792.0),
        }
    }
}
