//! Generic advertisement and boilerplate removal.
//!
//! Runs after platform cleanup as a catch-all for every host. The remover
//! errs toward keeping content: an element that looks like an ad but holds
//! a real paragraph or heading plus a meaningful amount of text survives.
//!
//! Every decision is taken bottom-up on an element's *final* subtree, i.e.
//! with already-removed descendants excluded. Running the remover on its own
//! output therefore removes nothing further.

use crate::document::CleanedMarkup;
use scraper::{ElementRef, Html, Node};
use tracing::debug;

/// Minimum visible characters an ad-looking element needs to be kept.
pub const MIXED_CONTENT_MIN_CHARS: usize = 200;

/// Nesting beyond this depth is kept as-is rather than inspected.
const MAX_DEPTH: usize = 256;

/// Always removed, whatever they contain.
const BLOCKED_TAGS: &[&str] = &["script", "style", "iframe", "noscript", "nav"];

/// Never removed, even when they match a rule.
pub(crate) const STRUCTURAL_TAGS: &[&str] = &["html", "head", "body"];

/// Elements that mark an ad-looking element, or its ancestors, as carrying
/// article content.
const CONTENT_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "article", "main",
];

const MEDIA_TAGS: &[&str] = &[
    "img", "picture", "video", "audio", "svg", "canvas", "object", "embed",
];

/// Wrappers that carry no meaning of their own and are dropped when empty.
const NON_SEMANTIC_TAGS: &[&str] = &[
    "div", "span", "section", "aside", "header", "footer", "ins", "form", "font", "center", "a",
];

/// Whole words in `id`, `class` or `aria-label` that mark an ad.
const AD_WORDS: &[&str] = &[
    "ad",
    "ads",
    "advert",
    "advertisement",
    "sponsor",
    "sponsored",
    "promoted",
    "adsbygoogle",
    "adslot",
    "adunit",
    "doubleclick",
    "googlesyndication",
    "taboola",
    "outbrain",
    "revcontent",
];

/// Ad-network attributes.
const AD_ATTRIBUTES: &[&str] = &[
    "data-ad",
    "data-ad-slot",
    "data-ad-client",
    "data-adunit",
    "data-google-query-id",
];

/// What survives below an element once its descendants have been decided.
#[derive(Debug, Default, Clone, Copy)]
struct Subtree {
    visible_chars: usize,
    has_content: bool,
    has_media: bool,
}

impl Subtree {
    fn absorb(&mut self, child: Subtree) {
        self.visible_chars += child.visible_chars;
        self.has_content |= child.has_content;
        self.has_media |= child.has_media;
    }
}

/// Remove ads, navigation, scripts and empty wrappers from `markup`.
pub fn strip(markup: &str) -> CleanedMarkup {
    let mut html = Html::parse_document(markup);

    let mut doomed = Vec::new();
    walk(html.root_element(), 0, &mut doomed);

    let ids: Vec<_> = doomed.iter().map(|el| el.id()).collect();
    drop(doomed);

    for id in &ids {
        if let Some(mut node) = html.tree.get_mut(*id) {
            node.detach();
        }
    }
    debug!("Removed {} ad/boilerplate elements", ids.len());

    CleanedMarkup::new(html.html())
}

/// Decide every element below `element`, pushing removals onto `doomed`.
/// Returns the surviving subtree of `element` itself (its children only;
/// the caller decides `element`).
fn walk<'a>(element: ElementRef<'a>, depth: usize, doomed: &mut Vec<ElementRef<'a>>) -> Subtree {
    let mut subtree = Subtree::default();

    for child in element.children() {
        match child.value() {
            Node::Text(text) => subtree.visible_chars += visible_len(text),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                if depth >= MAX_DEPTH {
                    subtree.absorb(opaque(child));
                    continue;
                }
                let below = walk(child, depth + 1, doomed);
                if should_remove(child, &below) {
                    doomed.push(child);
                } else {
                    let name = child.value().name();
                    subtree.absorb(Subtree {
                        has_content: below.has_content || CONTENT_TAGS.contains(&name),
                        has_media: below.has_media || MEDIA_TAGS.contains(&name),
                        ..below
                    });
                }
            }
            _ => {}
        }
    }
    subtree
}

fn should_remove(element: ElementRef<'_>, below: &Subtree) -> bool {
    let el = element.value();
    let name = el.name();

    if STRUCTURAL_TAGS.contains(&name) {
        return false;
    }
    if BLOCKED_TAGS.contains(&name) || el.attr("role") == Some("navigation") {
        return true;
    }
    if el.attr("aria-hidden") == Some("true") {
        return true;
    }
    if has_ad_signature(element) {
        let has_content = below.has_content || CONTENT_TAGS.contains(&name);
        let mixed = has_content && below.visible_chars >= MIXED_CONTENT_MIN_CHARS;
        return !mixed;
    }
    NON_SEMANTIC_TAGS.contains(&name) && below.visible_chars == 0 && !below.has_media
}

/// `true` when the element's naming or attributes mark it as an ad slot.
pub fn has_ad_signature(element: ElementRef<'_>) -> bool {
    let el = element.value();
    if AD_ATTRIBUTES.iter().any(|attr| el.attr(attr).is_some()) {
        return true;
    }
    ["id", "class", "aria-label"]
        .iter()
        .filter_map(|attr| el.attr(attr))
        .flat_map(|value| value.split(|c: char| c.is_whitespace() || c == '-' || c == '_'))
        .any(|word| AD_WORDS.iter().any(|ad| word.eq_ignore_ascii_case(ad)))
}

/// Summary of an element past the depth limit, taken without removals.
fn opaque(element: ElementRef<'_>) -> Subtree {
    let mut subtree = Subtree::default();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => subtree.visible_chars += visible_len(text),
            Node::Element(el) => {
                subtree.has_content |= CONTENT_TAGS.contains(&el.name());
                subtree.has_media |= MEDIA_TAGS.contains(&el.name());
            }
            _ => {}
        }
    }
    subtree
}

fn visible_len(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}
