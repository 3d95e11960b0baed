//! Metadata extraction: title, author, publication date and provenance.
//!
//! Every field is read through an ordered list of lookups; the first
//! lookup yielding a usable value wins. Nothing here fails: a page without
//! metadata produces empty or `None` fields.

use crate::document::{DocumentMetadata, RawDocument};
use crate::pipeline::normalize::collapse_whitespace;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// How much leading body text is scanned for "Published on …".
const DATE_PHRASE_WINDOW: usize = 2000;

/// Where a lookup reads its value from.
#[derive(Debug, Clone, Copy)]
enum Take {
    /// The `content` attribute.
    Content,
    /// Flattened text.
    Text,
    /// `content` when present, else text.
    ContentOrText,
    /// A named attribute.
    Attr(&'static str),
}

struct Lookup {
    selector: Selector,
    take: Take,
}

fn lookups(list: &[(&str, Take)]) -> Vec<Lookup> {
    list.iter()
        .map(|(css, take)| Lookup {
            selector: Selector::parse(css).expect("metadata lookup: valid CSS selector"),
            take: *take,
        })
        .collect()
}

static TITLE: Lazy<Vec<Lookup>> = Lazy::new(|| {
    lookups(&[
        (r#"meta[property="og:title"]"#, Take::Content),
        (r#"meta[name="twitter:title"]"#, Take::Content),
        ("title", Take::Text),
        ("h1", Take::Text),
    ])
});

static AUTHOR: Lazy<Vec<Lookup>> = Lazy::new(|| {
    lookups(&[
        (r#"meta[name="author"]"#, Take::Content),
        (r#"meta[property="article:author"]"#, Take::Content),
        (r#"meta[name="article:author"]"#, Take::Content),
        (r#"meta[property="byline"]"#, Take::Content),
        (r#"meta[name="byline"]"#, Take::Content),
        (r#"a[rel~="author"]"#, Take::Text),
        (r#"[itemprop="author"]"#, Take::ContentOrText),
        (".byline", Take::Text),
    ])
});

static PUBLISHED: Lazy<Vec<Lookup>> = Lazy::new(|| {
    lookups(&[
        (r#"meta[property="article:published_time"]"#, Take::Content),
        (r#"meta[name="pubdate"]"#, Take::Content),
        (r#"meta[name="publishdate"]"#, Take::Content),
        (r#"meta[name="date"]"#, Take::Content),
        (r#"meta[itemprop="datePublished"]"#, Take::Content),
        (r#"meta[property="og:updated_time"]"#, Take::Content),
        ("time[datetime]", Take::Attr("datetime")),
        ("time", Take::Text),
    ])
});

static SOURCE_URL: Lazy<Vec<Lookup>> =
    Lazy::new(|| lookups(&[(r#"meta[property="og:url"]"#, Take::Content)]));

static SITE_NAME: Lazy<Vec<Lookup>> =
    Lazy::new(|| lookups(&[(r#"meta[property="og:site_name"]"#, Take::Content)]));

static BODY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("BODY: valid CSS selector"));

static DATE_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:published|posted)\s+on\s+([A-Za-z0-9,/\- ]+)")
        .expect("DATE_PHRASE: valid regex")
});

/// Formats carrying a time of day, parsed as `NaiveDateTime`.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

/// Date-only formats, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Extract metadata from the fetched page.
pub fn extract(doc: &RawDocument) -> DocumentMetadata {
    let html = Html::parse_document(&doc.markup);

    let title = first(&html, &TITLE).unwrap_or_default();
    let author = first_where(&html, &AUTHOR, |v| !v.starts_with("http://") && !v.starts_with("https://"));
    let published = published(&html, doc);
    let source_url = first(&html, &SOURCE_URL).unwrap_or_else(|| doc.url.as_str().to_string());
    let site_name = first(&html, &SITE_NAME);

    debug!(
        "Metadata for {}: title={:?} author={:?} published={:?}",
        doc.url, title, author, published
    );

    DocumentMetadata {
        title,
        author,
        published,
        source_url,
        site_name,
    }
}

fn first(html: &Html, lookups: &[Lookup]) -> Option<String> {
    first_where(html, lookups, |_| true)
}

fn first_where(html: &Html, lookups: &[Lookup], accept: impl Fn(&str) -> bool) -> Option<String> {
    candidates(html, lookups).find(|v| accept(v))
}

/// Every non-empty lookup value, in lookup order then document order.
fn candidates<'a>(html: &'a Html, lookups: &'a [Lookup]) -> impl Iterator<Item = String> + 'a {
    lookups.iter().flat_map(move |lookup| {
        html.select(&lookup.selector)
            .filter_map(move |el| read(el, lookup.take))
    })
}

fn read(el: ElementRef<'_>, take: Take) -> Option<String> {
    let attr = |name: &str| el.value().attr(name).map(collapse_whitespace);
    let text = || Some(collapse_whitespace(&el.text().collect::<String>()));
    let value = match take {
        Take::Content => attr("content"),
        Take::Text => text(),
        Take::ContentOrText => attr("content").filter(|v| !v.is_empty()).or_else(text),
        Take::Attr(name) => attr(name),
    };
    value.filter(|v| !v.is_empty())
}

fn published(html: &Html, doc: &RawDocument) -> Option<NaiveDate> {
    if let Some(date) = candidates(html, &PUBLISHED).find_map(|v| parse_date(&v)) {
        return Some(date);
    }

    let body = html
        .select(&BODY)
        .next()
        .unwrap_or_else(|| html.root_element());
    let preview: String = collapse_whitespace(&body.text().collect::<String>())
        .chars()
        .take(DATE_PHRASE_WINDOW)
        .collect();
    if let Some(date) = DATE_PHRASE
        .captures_iter(&preview)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| parse_date_phrase(m.as_str()))
    {
        return Some(date);
    }

    doc.header("last-modified").and_then(parse_date)
}

/// Parse a date in any of the accepted formats.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok().map(|dt| dt.date()))
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        })
}

/// The phrase capture runs on past the date ("April 3, 2023 by Jane"), so
/// try successively shorter word prefixes.
fn parse_date_phrase(phrase: &str) -> Option<NaiveDate> {
    let words: Vec<&str> = phrase.split_whitespace().take(4).collect();
    (1..=words.len())
        .rev()
        .find_map(|n| parse_date(words[..n].join(" ").trim_end_matches(',')))
}
