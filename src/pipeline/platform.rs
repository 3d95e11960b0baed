//! Platform-specific cleanup for well-known blog hosts.
//!
//! Each host family has page furniture that the generic remover cannot
//! recognise by vocabulary alone (Medium's metabar, Substack's paywall
//! widgets, WordPress sidebars). [`PlatformRules::builtin`] holds those
//! rules; [`cleanup`] applies the rule set for the document's host.
//!
//! Matching is structural: a [`Matcher`] names an optional tag and an
//! attribute predicate, evaluated against the parsed tree.

use crate::document::RawDocument;
use crate::pipeline::strip::STRUCTURAL_TAGS;
use crate::pipeline::validate::host_matches;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Attribute predicate of a [`Matcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrPredicate {
    /// Some class token contains the given substring.
    ClassContains(&'static str),
    /// `id` equals the value.
    IdEquals(&'static str),
    /// The attribute is present.
    Has(&'static str),
    /// The attribute equals the value.
    Equals(&'static str, &'static str),
}

/// Identifies elements by tag name and attribute pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matcher {
    pub tag: Option<&'static str>,
    pub predicate: AttrPredicate,
}

impl Matcher {
    pub const fn class(fragment: &'static str) -> Self {
        Self {
            tag: None,
            predicate: AttrPredicate::ClassContains(fragment),
        }
    }

    pub const fn id(id: &'static str) -> Self {
        Self {
            tag: None,
            predicate: AttrPredicate::IdEquals(id),
        }
    }

    pub const fn tag_class(tag: &'static str, fragment: &'static str) -> Self {
        Self {
            tag: Some(tag),
            predicate: AttrPredicate::ClassContains(fragment),
        }
    }

    pub fn matches(&self, element: ElementRef<'_>) -> bool {
        let el = element.value();
        if let Some(tag) = self.tag {
            if !el.name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        match self.predicate {
            AttrPredicate::ClassContains(fragment) => el.classes().any(|c| c.contains(fragment)),
            AttrPredicate::IdEquals(id) => el.id() == Some(id),
            AttrPredicate::Has(name) => el.attr(name).is_some(),
            AttrPredicate::Equals(name, value) => el.attr(name) == Some(value),
        }
    }
}

/// Rules for one host family.
#[derive(Debug, Clone)]
pub struct PlatformRule {
    pub name: &'static str,
    /// Host suffixes this rule applies to.
    pub hosts: &'static [&'static str],
    /// Applied in order.
    pub matchers: Vec<Matcher>,
}

/// The full rule table.
#[derive(Debug, Clone)]
pub struct PlatformRules {
    rules: Vec<PlatformRule>,
}

static BUILTIN: Lazy<PlatformRules> = Lazy::new(|| PlatformRules {
    rules: vec![
        PlatformRule {
            name: "medium",
            hosts: &["medium.com"],
            matchers: vec![
                Matcher::class("metabar"),
                Matcher::class("js-stickyFooter"),
                Matcher::class("branch-journeys-top"),
                Matcher::class("paywallButton"),
                Matcher::class("meteredContent"),
                Matcher::class("promo"),
                Matcher::class("upvoteButton"),
            ],
        },
        PlatformRule {
            name: "wordpress",
            hosts: &["wordpress.com"],
            matchers: vec![
                Matcher::class("sidebar"),
                Matcher::class("widget-area"),
                Matcher::class("comment-list"),
                Matcher::class("comments"),
                Matcher::class("site-footer"),
                Matcher::class("wp-block-group"),
                Matcher::class("navigation"),
                Matcher::tag_class("header", "site-header"),
                Matcher::tag_class("footer", "site-footer"),
            ],
        },
        PlatformRule {
            name: "blogspot",
            hosts: &["blogspot.com", "blogger.com"],
            matchers: vec![
                Matcher::class("header-inner"),
                Matcher::class("footer"),
                Matcher::class("navbar"),
                Matcher::class("profile"),
                Matcher::class("sidebar"),
                Matcher::class("comments"),
            ],
        },
        PlatformRule {
            name: "substack",
            hosts: &["substack.com"],
            matchers: vec![
                Matcher::id("subscribe-button"),
                Matcher::id("paywall"),
                Matcher::id("newsletter-subscribe"),
                Matcher::id("post-meta"),
                Matcher::id("subscription-widget"),
            ],
        },
    ],
});

static META: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[name][content]").expect("META: valid CSS selector"));

impl PlatformRules {
    /// The built-in table, loaded once and shared read-only.
    pub fn builtin() -> &'static PlatformRules {
        &BUILTIN
    }

    pub fn new(rules: Vec<PlatformRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[PlatformRule] {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&PlatformRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// The rule whose host list matches `host`, if any.
    pub fn for_host(&self, host: &str) -> Option<&PlatformRule> {
        self.rules
            .iter()
            .find(|r| r.hosts.iter().any(|pattern| host_matches(host, pattern)))
    }
}

/// Apply the matching platform rule to `doc`.
///
/// When the host is unknown and the page does not announce itself as
/// WordPress, the markup is returned untouched (not re-serialised).
pub fn cleanup(doc: RawDocument, rules: &PlatformRules) -> RawDocument {
    let host = doc.url.host();
    let mut html = Html::parse_document(&doc.markup);

    let rule = match rules.for_host(&host) {
        Some(rule) => rule,
        None if is_wordpress_generated(&html) => match rules.get("wordpress") {
            Some(rule) => rule,
            None => return doc,
        },
        None => {
            debug!("No platform rule for {}", host);
            return doc;
        }
    };

    let doomed: Vec<_> = html
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| !STRUCTURAL_TAGS.contains(&el.value().name()))
        .filter(|el| rule.matchers.iter().any(|m| m.matches(*el)))
        .map(|el| el.id())
        .collect();

    if doomed.is_empty() {
        debug!("Platform rule '{}' matched nothing on {}", rule.name, host);
        return doc;
    }

    for id in &doomed {
        if let Some(mut node) = html.tree.get_mut(*id) {
            node.detach();
        }
    }
    debug!(
        "Platform rule '{}' removed {} elements from {}",
        rule.name,
        doomed.len(),
        host
    );

    RawDocument {
        markup: html.html(),
        ..doc
    }
}

fn is_wordpress_generated(html: &Html) -> bool {
    html.select(&META).any(|meta| {
        let el = meta.value();
        el.attr("name")
            .is_some_and(|n| n.eq_ignore_ascii_case("generator"))
            && el
                .attr("content")
                .is_some_and(|c| c.trim_start().to_ascii_lowercase().starts_with("wordpress"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::validate::{validate, ValidationPolicy};
    use std::collections::BTreeMap;

    fn doc(url: &str, markup: &str) -> RawDocument {
        RawDocument {
            url: validate(url, &ValidationPolicy::default()).unwrap(),
            status: 200,
            headers: BTreeMap::new(),
            markup: markup.to_string(),
        }
    }

    #[test]
    fn medium_furniture_removed() {
        let out = cleanup(
            doc(
                "https://medium.com/@ada/post",
                r#"<div class="metabar u-fixed">Sign in</div><article><p>Body</p></article><div class="js-stickyFooter">Follow</div>"#,
            ),
            PlatformRules::builtin(),
        );
        assert!(!out.markup.contains("Sign in"));
        assert!(!out.markup.contains("Follow"));
        assert!(out.markup.contains("<p>Body</p>"));
    }

    #[test]
    fn subdomain_uses_parent_rule() {
        let out = cleanup(
            doc(
                "https://someone.substack.com/p/post",
                r#"<div id="paywall">Pay</div><p>Free text</p><div id="paywall-note">Keep</div>"#,
            ),
            PlatformRules::builtin(),
        );
        assert!(!out.markup.contains("Pay<"));
        assert!(out.markup.contains("Free text"));
        // id matching is exact
        assert!(out.markup.contains("Keep"));
    }

    #[test]
    fn unknown_host_is_verbatim() {
        let markup = "<div class='sidebar'>x</div><p>y";
        let out = cleanup(doc("https://example.com/post", markup), PlatformRules::builtin());
        assert_eq!(out.markup, markup);
    }

    #[test]
    fn wordpress_detected_by_generator_meta() {
        let markup = r#"<html><head><meta name="generator" content="WordPress 6.4"></head>
            <body><header class="site-header">Blog name</header><p>Post</p>
            <aside class="widget-area">Widgets</aside></body></html>"#;
        let out = cleanup(doc("https://blog.example.org/post", markup), PlatformRules::builtin());
        assert!(!out.markup.contains("Blog name"));
        assert!(!out.markup.contains("Widgets"));
        assert!(out.markup.contains("Post"));
    }

    #[test]
    fn body_classes_never_remove_the_page() {
        let markup = r#"<html class="sidebar-layout"><body class="post-template-default single has-sidebar">
            <article><h1>My post</h1><p>Real article text.</p></article>
            <div class="sidebar">Recent posts</div></body></html>"#;
        let out = cleanup(
            doc("https://someone.wordpress.com/2024/my-post/", markup),
            PlatformRules::builtin(),
        );
        assert!(out.markup.contains("Real article text."));
        assert!(out.markup.contains("has-sidebar"));
        assert!(!out.markup.contains("Recent posts"));
    }

    #[test]
    fn blogger_host_alias() {
        let rules = PlatformRules::builtin();
        assert_eq!(rules.for_host("blogger.com").map(|r| r.name), Some("blogspot"));
        assert_eq!(rules.for_host("me.blogspot.com").map(|r| r.name), Some("blogspot"));
        assert!(rules.for_host("notmedium.com").is_none());
    }

    #[test]
    fn tag_restricted_matcher() {
        let html = Html::parse_fragment(r#"<div class="site-header">a</div><header class="site-header">b</header>"#);
        let matcher = Matcher::tag_class("header", "site-header");
        let hits: Vec<_> = html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| matcher.matches(*el))
            .map(|el| el.value().name().to_string())
            .collect();
        assert_eq!(hits, vec!["header"]);
    }
}
