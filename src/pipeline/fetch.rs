//! Content fetching: one bounded GET for a validated URL.
//!
//! The network is reached only through the [`Transport`] trait. Production
//! code passes an [`HttpTransport`]; tests pass a [`StubTransport`] into
//! [`ContentFetcher::new`] so no request ever leaves the process.
//!
//! Every failure becomes [`Url2PdfError::FetchFailed`] with a typed
//! [`FetchFailure`]. Nothing is retried here; the caller decides.

use crate::config::ConversionConfig;
use crate::document::{RawDocument, ValidatedUrl};
use crate::error::{FetchFailure, Url2PdfError};
use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Limits applied to a single fetch.
#[derive(Debug, Clone, Copy)]
pub struct FetchLimits {
    pub timeout: Duration,
    pub max_body_bytes: u64,
}

impl FetchLimits {
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.fetch_timeout_secs),
            max_body_bytes: config.max_body_bytes,
        }
    }
}

/// What a transport hands back for a completed exchange.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub status: u16,
    /// Header names lower-cased.
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// The outbound HTTP capability.
///
/// Implementations enforce `limits` themselves: a body over the cap is
/// reported as [`FetchFailure::TooLarge`], a slow server as
/// [`FetchFailure::Timeout`]. Status codes are passed through untouched.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(
        &self,
        url: &ValidatedUrl,
        limits: FetchLimits,
    ) -> Result<TransportResponse, FetchFailure>;
}

/// Retrieves raw markup through an injected [`Transport`].
#[derive(Clone)]
pub struct ContentFetcher {
    transport: Arc<dyn Transport>,
    limits: FetchLimits,
}

impl ContentFetcher {
    pub fn new(transport: Arc<dyn Transport>, limits: FetchLimits) -> Self {
        Self { transport, limits }
    }

    /// Fetch `url`, failing on transport errors, non-2xx status, or an
    /// oversized body.
    pub async fn fetch(&self, url: ValidatedUrl) -> Result<RawDocument, Url2PdfError> {
        let start = Instant::now();
        info!("Fetching {}", url);

        let response = tokio::time::timeout(self.limits.timeout, self.transport.get(&url, self.limits))
            .await
            .map_err(|_| FetchFailure::Timeout {
                secs: self.limits.timeout.as_secs(),
            })
            .and_then(|r| r)
            .map_err(|reason| {
                warn!("Fetch of {} failed: {}", url, reason);
                Url2PdfError::fetch(url.as_str(), reason)
            })?;

        if !(200..300).contains(&response.status) {
            warn!("Fetch of {} returned HTTP {}", url, response.status);
            return Err(Url2PdfError::fetch(
                url.as_str(),
                FetchFailure::Status {
                    status: response.status,
                },
            ));
        }

        // Transports are expected to enforce the cap while reading; this
        // catches ones that don't.
        if response.body.len() as u64 > self.limits.max_body_bytes {
            return Err(Url2PdfError::fetch(
                url.as_str(),
                FetchFailure::TooLarge {
                    limit: self.limits.max_body_bytes,
                },
            ));
        }

        debug!(
            "Fetched {} bytes from {} in {}ms",
            response.body.len(),
            url,
            start.elapsed().as_millis()
        );

        Ok(RawDocument {
            url,
            status: response.status,
            headers: response.headers,
            markup: response.body,
        })
    }
}

// ── reqwest transport ────────────────────────────────────────────────────

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &ConversionConfig) -> Result<Self, Url2PdfError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Url2PdfError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &ValidatedUrl,
        limits: FetchLimits,
    ) -> Result<TransportResponse, FetchFailure> {
        let secs = limits.timeout.as_secs();
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchFailure::Timeout { secs }
            } else {
                FetchFailure::Transport(e.to_string())
            }
        };

        let mut response = self
            .client
            .get(url.as_url().clone())
            .timeout(limits.timeout)
            .send()
            .await
            .map_err(map_err)?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        if response
            .content_length()
            .is_some_and(|len| len > limits.max_body_bytes)
        {
            return Err(FetchFailure::TooLarge {
                limit: limits.max_body_bytes,
            });
        }

        // Content-Length can be absent or wrong; count while streaming.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(map_err)? {
            if (body.len() + chunk.len()) as u64 > limits.max_body_bytes {
                return Err(FetchFailure::TooLarge {
                    limit: limits.max_body_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        let body = decode_body(&body, headers.get("content-type").map(String::as_str));
        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

// ── Body decoding ────────────────────────────────────────────────────────

/// How far into the body a `<meta charset>` declaration is looked for.
const META_SNIFF_BYTES: usize = 1024;

static META_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i-u)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_:.\-]+)"#)
        .expect("META_CHARSET: valid regex")
});

/// Decode `body` to text.
///
/// A byte-order mark wins, then the `Content-Type` charset, then a
/// `<meta charset>` near the top of the page, then UTF-8. Undecodable bytes
/// become U+FFFD.
pub fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_param)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| sniff_meta_charset(body))
        .unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(body);
    if had_errors {
        debug!("Body contained bytes invalid as {}", used.name());
    }
    text.into_owned()
}

/// The `charset` parameter of a `Content-Type` value.
fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(|c| c == '"' || c == '\''))
    })
}

fn sniff_meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = &body[..body.len().min(META_SNIFF_BYTES)];
    let label = META_CHARSET.captures(head)?.get(1)?;
    Encoding::for_label(label.as_bytes())
}

// ── Stub transport ───────────────────────────────────────────────────────

/// [`Transport`] that answers every request with a fixed response.
///
/// The stub never touches the network. It applies the same size cap as the
/// real transport so limit handling can be tested.
#[derive(Debug, Clone)]
pub struct StubTransport {
    outcome: Result<TransportResponse, FetchFailure>,
}

impl StubTransport {
    /// Respond `200 OK` with `body` as `text/html`.
    pub fn html(body: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "text/html; charset=utf-8".to_string());
        Self::response(TransportResponse {
            status: 200,
            headers,
            body: body.into(),
        })
    }

    pub fn response(response: TransportResponse) -> Self {
        Self {
            outcome: Ok(response),
        }
    }

    /// Fail every request with `failure`.
    pub fn failing(failure: FetchFailure) -> Self {
        Self {
            outcome: Err(failure),
        }
    }

    /// Add a response header (name is lower-cased).
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        if let Ok(ref mut response) = self.outcome {
            response
                .headers
                .insert(name.to_ascii_lowercase(), value.into());
        }
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        if let Ok(ref mut response) = self.outcome {
            response.status = status;
        }
        self
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(
        &self,
        url: &ValidatedUrl,
        limits: FetchLimits,
    ) -> Result<TransportResponse, FetchFailure> {
        debug!("Stub transport answering {}", url);
        let response = self.outcome.clone()?;
        if response.body.len() as u64 > limits.max_body_bytes {
            return Err(FetchFailure::TooLarge {
                limit: limits.max_body_bytes,
            });
        }
        Ok(response)
    }
}
