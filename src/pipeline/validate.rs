//! URL validation: accept or reject a candidate before any network activity.
//!
//! Checks run cheapest-first. The length cap is applied to the raw input
//! so an adversarial multi-megabyte string never reaches the URL parser.

use crate::config::ConversionConfig;
use crate::document::ValidatedUrl;
use crate::error::Url2PdfError;
use reqwest::Url;
use tracing::debug;

/// The subset of [`ConversionConfig`] the validator reads.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    pub max_length: usize,
    pub allowed_hosts: Vec<String>,
}

impl ValidationPolicy {
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self {
            max_length: config.max_url_length,
            allowed_hosts: config.allowed_hosts.clone(),
        }
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::from_config(&ConversionConfig::default())
    }
}

/// Validate a candidate URL.
///
/// Leading and trailing whitespace is ignored. Everything else must be a
/// well-formed absolute `http`/`https` URL with a host.
pub fn validate(candidate: &str, policy: &ValidationPolicy) -> Result<ValidatedUrl, Url2PdfError> {
    let trimmed = candidate.trim();

    if trimmed.is_empty() {
        return Err(Url2PdfError::invalid_url(candidate, "URL is empty"));
    }
    if trimmed.len() > policy.max_length {
        return Err(Url2PdfError::invalid_url(
            &truncate_for_display(trimmed),
            format!(
                "URL is {} bytes long (maximum {})",
                trimmed.len(),
                policy.max_length
            ),
        ));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(Url2PdfError::invalid_url(
            trimmed,
            "URL contains control characters",
        ));
    }
    if !has_scheme(trimmed) {
        return Err(Url2PdfError::invalid_url(
            trimmed,
            "missing scheme (expected http:// or https://)",
        ));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| Url2PdfError::invalid_url(trimmed, format!("malformed URL: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Url2PdfError::invalid_url(
                trimmed,
                format!("unsupported scheme '{other}'"),
            ))
        }
    }

    let host = match url.host_str() {
        Some(h) if !h.is_empty() => h.to_ascii_lowercase(),
        _ => return Err(Url2PdfError::invalid_url(trimmed, "missing host")),
    };

    if !policy.allowed_hosts.is_empty()
        && !policy
            .allowed_hosts
            .iter()
            .any(|allowed| host_matches(&host, allowed))
    {
        return Err(Url2PdfError::invalid_url(
            trimmed,
            format!("host '{host}' is not in the allowed list"),
        ));
    }

    debug!("Validated URL: {}", url);
    Ok(ValidatedUrl::new(url))
}

/// `true` when `host` equals `pattern` or is a subdomain of it.
pub(crate) fn host_matches(host: &str, pattern: &str) -> bool {
    let host = host.strip_prefix("www.").unwrap_or(host);
    let pattern = pattern.strip_prefix("www.").unwrap_or(pattern);
    host == pattern
        || host
            .strip_suffix(pattern)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// RFC 3986 scheme followed by `:`. A bare `example.com/post` has none;
/// `localhost:8080` looks like one but the parser later rejects the scheme.
fn has_scheme(s: &str) -> bool {
    match s.split_once(':') {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

fn truncate_for_display(s: &str) -> String {
    const KEEP: usize = 64;
    match s.char_indices().nth(KEEP) {
        Some((idx, _)) => format!("{}\u{2026}", &s[..idx]),
        None => s.to_string(),
    }
}
