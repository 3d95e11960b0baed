//! Pipeline integration tests.
//!
//! Every test runs offline: pages come from `StubTransport` and rendering
//! goes to `RecordingSurface`, so neither the network nor libpdfium is needed.
//!
//! Run with:
//!   cargo test --test pipeline

use edgequake_url2pdf::pipeline::layout::{self, LayoutOptions};
use edgequake_url2pdf::pipeline::{normalize, render, strip, validate};
use edgequake_url2pdf::{
    ContentBlock, ConversionConfig, Converter, FetchFailure, RecordingSurface, RenderableDocument,
    StubTransport, Url2PdfError,
};
use std::collections::BTreeMap;
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

const POST_URL: &str = "https://example.com/post/1";

fn converter(stub: StubTransport) -> Converter {
    Converter::new(ConversionConfig::default(), Arc::new(stub))
}

/// A sentence long enough to wrap over several lines at body size.
fn paragraph(n: usize) -> String {
    format!(
        "Paragraph {n}. The quick brown fox jumps over the lazy dog while the committee \
         reviews the quarterly figures, and nobody in the building is quite sure whether \
         the coffee machine on the third floor has been repaired yet or not."
    )
}

/// Parse `RecordingSurface` output into `page index → block indices drawn`.
fn blocks_per_page(recording: &[u8]) -> Vec<Vec<u64>> {
    let pages: serde_json::Value = serde_json::from_slice(recording).unwrap();
    pages
        .as_array()
        .unwrap()
        .iter()
        .map(|page| {
            page["runs"]
                .as_array()
                .unwrap()
                .iter()
                .filter_map(|run| run["block"].as_u64())
                .collect()
        })
        .collect()
}

// ── End-to-end scenarios ─────────────────────────────────────────────────────

#[tokio::test]
async fn article_with_ad_banner() {
    let stub = StubTransport::html(
        r#"<article><h1>Title</h1><p>Hello <b>world</b></p><div class="ad-banner">Buy now</div></article>"#,
    );
    let doc = converter(stub).prepare(POST_URL).await.unwrap();

    assert_eq!(doc.metadata.title, "Title");
    assert_eq!(
        doc.blocks,
        vec![
            ContentBlock::Heading {
                level: 1,
                text: "Title".into()
            },
            ContentBlock::Paragraph {
                text: "Hello world".into()
            },
        ]
    );
    assert!(doc.blocks.iter().all(|b| !b.text().contains("Buy now")));
}

#[tokio::test]
async fn missing_or_garbled_dates_are_absent() {
    let pages = [
        "<article><h1>No date</h1><p>Body text.</p></article>",
        r#"<html><head><meta property="article:published_time" content="sometime last spring"></head>
           <body><article><h1>Bad date</h1><p>Body text.</p></article></body></html>"#,
        r#"<article><h1>Bad time</h1><time datetime="2024-13-45">soon</time><p>Body.</p></article>"#,
    ];
    for page in pages {
        let doc = converter(StubTransport::html(page)).prepare(POST_URL).await.unwrap();
        assert_eq!(doc.metadata.published, None, "{page}");
    }
}

#[tokio::test]
async fn published_date_from_meta_tag() {
    let page = r#"<html><head>
        <meta property="article:published_time" content="2024-03-05T10:00:00Z">
        <meta name="author" content="Jane Doe">
        </head><body><article><h1>Dated</h1><p>Body.</p></article></body></html>"#;
    let doc = converter(StubTransport::html(page)).prepare(POST_URL).await.unwrap();

    assert_eq!(
        doc.metadata.published,
        chrono::NaiveDate::from_ymd_opt(2024, 3, 5)
    );
    assert_eq!(doc.metadata.author.as_deref(), Some("Jane Doe"));
}

#[tokio::test]
async fn long_article_paginates_without_splitting_blocks() {
    let body: String = (1..=60).map(|n| format!("<p>{}</p>", paragraph(n))).collect();
    let page = format!("<article><h1>Long read</h1>{body}</article>");
    let c = converter(StubTransport::html(page));

    let doc = c.prepare(POST_URL).await.unwrap();
    assert_eq!(doc.blocks.len(), 61);

    let recording = c
        .convert_with_surface(POST_URL, RecordingSurface::new())
        .await
        .unwrap();
    let pages = blocks_per_page(&recording);
    assert!(pages.len() > 1, "expected several pages, got {}", pages.len());

    let mut seen_on: BTreeMap<u64, usize> = BTreeMap::new();
    for (page_idx, blocks) in pages.iter().enumerate() {
        for &block in blocks {
            let first = *seen_on.entry(block).or_insert(page_idx);
            assert_eq!(first, page_idx, "block {block} spans pages {first} and {page_idx}");
        }
    }
    assert_eq!(seen_on.len(), 61, "every block is drawn");
    assert!(
        seen_on.values().zip(seen_on.values().skip(1)).all(|(a, b)| a <= b),
        "blocks are drawn in order"
    );
}

#[tokio::test]
async fn page_without_content_fails_to_render() {
    let stub = StubTransport::html(
        r#"<html><body><nav><a href="/">Home</a></nav><div class="ad">Buy</div><script>x()</script></body></html>"#,
    );
    let err = converter(stub)
        .convert_with_surface(POST_URL, RecordingSurface::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Url2PdfError::RenderFailed { .. }), "{err:?}");
}

// ── Platform cleanup through the whole pipeline ──────────────────────────────

#[tokio::test]
async fn substack_furniture_is_removed_only_on_substack() {
    let page = r#"<article><h1>Issue 12</h1><p>The real content.</p>
        <div id="paywall"><p>Keep reading with a free trial</p></div></article>"#;

    let on_substack = converter(StubTransport::html(page))
        .prepare("https://someone.substack.com/p/issue-12")
        .await
        .unwrap();
    assert!(on_substack
        .blocks
        .iter()
        .all(|b| !b.text().contains("free trial")));

    let elsewhere = converter(StubTransport::html(page))
        .prepare(POST_URL)
        .await
        .unwrap();
    assert!(elsewhere
        .blocks
        .iter()
        .any(|b| b.text().contains("free trial")));
}

#[tokio::test]
async fn wordpress_body_classes_keep_the_article() {
    let page = r#"<html><body class="post-template-default single has-sidebar">
        <article><h1>My post</h1><p>Real article text.</p></article></body></html>"#;
    let doc = converter(StubTransport::html(page))
        .prepare("https://someone.wordpress.com/2024/my-post/")
        .await
        .unwrap();
    assert_eq!(
        doc.blocks,
        vec![
            ContentBlock::Heading {
                level: 1,
                text: "My post".into()
            },
            ContentBlock::Paragraph {
                text: "Real article text.".into()
            },
        ]
    );
}

#[tokio::test]
async fn long_sponsored_paragraph_survives() {
    let prose = "A partner paid for this reporting, which still runs to several sentences. ".repeat(6);
    let page = format!(r#"<article><p class="sponsored">{prose}</p><p>after</p></article>"#);
    let doc = converter(StubTransport::html(page)).prepare(POST_URL).await.unwrap();

    let texts: Vec<&str> = doc.blocks.iter().map(|b| b.text()).collect();
    assert_eq!(texts, [prose.trim(), "after"]);
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_failures_surface_as_fetch_errors() {
    let cases = [
        StubTransport::failing(FetchFailure::Timeout { secs: 15 }),
        StubTransport::failing(FetchFailure::Transport("connection refused".into())),
        StubTransport::html("<p>gone</p>").with_status(404),
    ];
    for stub in cases {
        let err = converter(stub).prepare(POST_URL).await.unwrap_err();
        assert!(matches!(err, Url2PdfError::FetchFailed { .. }), "{err:?}");
    }
}

#[test]
fn non_http_schemes_are_invalid() {
    let policy = validate::ValidationPolicy::default();
    for input in [
        "example.com/post",
        "ftp://example.com/post",
        "file:///etc/passwd",
        "javascript:alert(1)",
        "mailto:someone@example.com",
        "//example.com/post",
        "",
    ] {
        let err = validate::validate(input, &policy).unwrap_err();
        assert!(matches!(err, Url2PdfError::InvalidUrl { .. }), "{input}: {err:?}");
    }
}

// ── Stage properties ─────────────────────────────────────────────────────────

#[test]
fn strip_is_idempotent_on_messy_markup() {
    let inputs = [
        "",
        "plain text, no tags",
        "<div><div><span></span></div></div><p>kept</p>",
        r#"<div class="sponsored"><div class="ad"><p>short</p></div></div><p>body</p>"#,
        r#"<aside data-ad-slot="1"></aside><section><img src="a.png"></section>"#,
        "<p>unclosed paragraph<p>another <b>bold</b>",
        r#"<article><h2>Heading</h2><div id="ads"><p>short</p></div><ul><li>one</li><li></li></ul></article>"#,
    ];
    for input in inputs {
        let once = strip::strip(input);
        let twice = strip::strip(once.as_str());
        assert_eq!(once, twice, "input: {input}");
    }
}

#[test]
fn normalize_preserves_order_of_content_elements() {
    let markup = strip::strip(
        "<article><h2>A</h2><p>B</p><blockquote>C</blockquote>\
         <ol><li>D</li><li>E</li></ol><section><p>F</p></section><h3>G</h3></article>",
    );
    let texts: Vec<String> = normalize::normalize(&markup)
        .iter()
        .map(|b| b.text().to_string())
        .collect();
    assert_eq!(texts, ["A", "B", "C", "D", "E", "F", "G"]);
}

#[test]
fn render_requires_blocks_and_yields_pages() {
    let mut doc = RenderableDocument {
        metadata: Default::default(),
        blocks: Vec::new(),
    };
    let err = render::render_document(&doc, &LayoutOptions::default(), RecordingSurface::new())
        .unwrap_err();
    assert!(matches!(err, Url2PdfError::RenderFailed { .. }));

    doc.blocks.push(ContentBlock::Paragraph {
        text: "One line.".into(),
    });
    let rendered =
        render::render_document(&doc, &LayoutOptions::default(), RecordingSurface::new()).unwrap();
    assert!(rendered.pages >= 1);
    assert_eq!(
        layout::paginate(&doc, &LayoutOptions::default()).page_count(),
        rendered.pages
    );
}
