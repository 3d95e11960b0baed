//! Artifacts handed from one pipeline stage to the next.
//!
//! Each type is produced exactly once and moved into the following stage:
//!
//! ```text
//! ValidatedUrl ─▶ RawDocument ─▶ CleanedMarkup ─▶ Vec<ContentBlock> ─┐
//!                     └──────────▶ DocumentMetadata ──────────────────┴─▶ RenderableDocument
//! ```

use chrono::NaiveDate;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A URL that passed [`crate::pipeline::validate::validate`].
///
/// Guaranteed to use `http` or `https`, to have a non-empty host and to
/// contain no control characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl(Url);

impl ValidatedUrl {
    pub(crate) fn new(url: Url) -> Self {
        Self(url)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Lower-cased host without a leading `www.`.
    pub fn host(&self) -> String {
        let host = self.0.host_str().unwrap_or_default().to_ascii_lowercase();
        match host.strip_prefix("www.") {
            Some(rest) => rest.to_string(),
            None => host,
        }
    }

    /// A filesystem-friendly name derived from the last path segment,
    /// e.g. `https://blog.example.com/2024/my-post/` → `my-post`.
    pub fn slug(&self) -> String {
        let last = self
            .0
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or_default();
        let slug: String = last
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        let slug = slug.trim_matches('-');
        if slug.is_empty() {
            "article".to_string()
        } else {
            slug.to_string()
        }
    }
}

impl fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The page as it came off the wire.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub url: ValidatedUrl,
    pub status: u16,
    /// Response headers, names lower-cased.
    pub headers: BTreeMap<String, String>,
    pub markup: String,
}

impl RawDocument {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Markup with advertisement, navigation and script nodes removed.
///
/// Only [`crate::pipeline::strip::strip`] constructs this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedMarkup(String);

impl CleanedMarkup {
    pub(crate) fn new(markup: String) -> Self {
        Self(markup)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// One semantically typed unit of article body content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentBlock {
    Heading { level: u8, text: String },
    Paragraph { text: String },
    /// `ordinal` is the 1-based position within the enclosing list.
    ListItem { text: String, ordinal: usize },
    Quote { text: String },
}

impl ContentBlock {
    pub fn text(&self) -> &str {
        match self {
            ContentBlock::Heading { text, .. }
            | ContentBlock::Paragraph { text }
            | ContentBlock::ListItem { text, .. }
            | ContentBlock::Quote { text } => text,
        }
    }
}

/// Title, byline and provenance of an article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Empty when no title could be recovered.
    pub title: String,
    pub author: Option<String>,
    /// Serialised as ISO `YYYY-MM-DD`.
    pub published: Option<NaiveDate>,
    /// Canonical URL (`og:url`) or the URL that was fetched.
    pub source_url: String,
    pub site_name: Option<String>,
}

impl DocumentMetadata {
    /// "By Jane Doe · 2024-03-01", or whichever half is known.
    pub fn byline(&self) -> Option<String> {
        let date = self.published.map(|d| d.format("%Y-%m-%d").to_string());
        match (self.author.as_deref(), date) {
            (Some(a), Some(d)) => Some(format!("By {a} \u{b7} {d}")),
            (Some(a), None) => Some(format!("By {a}")),
            (None, Some(d)) => Some(d),
            (None, None) => None,
        }
    }
}

/// Everything the renderer needs, and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderableDocument {
    pub metadata: DocumentMetadata,
    pub blocks: Vec<ContentBlock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> ValidatedUrl {
        ValidatedUrl::new(Url::parse(s).unwrap())
    }

    #[test]
    fn host_strips_www() {
        assert_eq!(url("https://www.Medium.com/x").host(), "medium.com");
        assert_eq!(url("https://blog.example.org/").host(), "blog.example.org");
    }

    #[test]
    fn slug_from_last_segment() {
        assert_eq!(url("https://example.com/2024/My_Post/").slug(), "my-post");
        assert_eq!(url("https://example.com/").slug(), "article");
        assert_eq!(url("https://example.com/post/1").slug(), "1");
    }

    #[test]
    fn byline_variants() {
        let mut meta = DocumentMetadata::default();
        assert_eq!(meta.byline(), None);
        meta.author = Some("Ada".into());
        assert_eq!(meta.byline().as_deref(), Some("By Ada"));
        meta.published = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert_eq!(meta.byline().as_deref(), Some("By Ada \u{b7} 2024-03-01"));
    }

    #[test]
    fn content_block_serialises_with_kind_tag() {
        let block = ContentBlock::Heading {
            level: 2,
            text: "Intro".into(),
        };
        let json = serde_json::to_string(&block).unwrap();
        assert_eq!(json, r#"{"kind":"heading","level":2,"text":"Intro"}"#);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = BTreeMap::new();
        headers.insert("last-modified".to_string(), "x".to_string());
        let doc = RawDocument {
            url: url("https://example.com/"),
            status: 200,
            headers,
            markup: String::new(),
        };
        assert_eq!(doc.header("Last-Modified"), Some("x"));
    }
}
