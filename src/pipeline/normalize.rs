//! HTML normalisation: cleaned markup → ordered [`ContentBlock`]s.
//!
//! Only a handful of elements produce blocks. Layout containers are
//! unwrapped, everything else is skipped together with its subtree.

use crate::document::{CleanedMarkup, ContentBlock};
use scraper::{ElementRef, Html, Node};
use tracing::debug;

/// Unwrapped transparently; their children are normalised in place.
const CONTAINERS: &[&str] = &["html", "body", "main", "article", "section", "div", "header"];

/// Elements whose boundaries separate words when flattened.
const BLOCK_LEVEL: &[&str] = &[
    "p", "div", "li", "ul", "ol", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6", "section",
    "article", "header", "footer", "figure", "figcaption", "pre", "table", "tr", "td", "th", "dd",
    "dt",
];

const MAX_DEPTH: usize = 256;

/// Convert `markup` into content blocks in document order.
pub fn normalize(markup: &CleanedMarkup) -> Vec<ContentBlock> {
    let html = Html::parse_document(markup.as_str());
    let mut blocks = Vec::new();
    visit(html.root_element(), 0, &mut blocks);
    debug!("Normalised {} content blocks", blocks.len());
    blocks
}

fn visit(element: ElementRef<'_>, depth: usize, out: &mut Vec<ContentBlock>) {
    let name = element.value().name();
    match name {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name.as_bytes()[1] - b'0';
            push(out, flatten(element, false), |text| ContentBlock::Heading { level, text });
        }
        "p" => push(out, flatten(element, false), |text| ContentBlock::Paragraph { text }),
        "blockquote" => push(out, flatten(element, false), |text| ContentBlock::Quote { text }),
        "ul" | "ol" => list(element, depth, out),
        "li" => {
            // An `li` outside any list: number it among its `li` siblings.
            let ordinal = element
                .prev_siblings()
                .filter_map(ElementRef::wrap)
                .filter(|sib| sib.value().name() == "li")
                .count()
                + 1;
            item(element, ordinal, depth, out);
        }
        _ if CONTAINERS.contains(&name) && depth < MAX_DEPTH => {
            for child in element.children().filter_map(ElementRef::wrap) {
                visit(child, depth + 1, out);
            }
        }
        _ => {}
    }
}

fn list(element: ElementRef<'_>, depth: usize, out: &mut Vec<ContentBlock>) {
    let items = element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "li");
    for (idx, li) in items.enumerate() {
        item(li, idx + 1, depth, out);
    }
}

/// Emit one list item, then any lists nested inside it.
fn item(li: ElementRef<'_>, ordinal: usize, depth: usize, out: &mut Vec<ContentBlock>) {
    push(out, flatten(li, true), |text| ContentBlock::ListItem { text, ordinal });
    if depth < MAX_DEPTH {
        for nested in nested_lists(li) {
            list(nested, depth + 1, out);
        }
    }
}

/// Lists below `li` that are not themselves inside a deeper list.
fn nested_lists(li: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut found = Vec::new();
    let mut stack: Vec<ElementRef<'_>> = li.children().filter_map(ElementRef::wrap).collect();
    stack.reverse();
    while let Some(el) = stack.pop() {
        if is_list(el) {
            found.push(el);
        } else {
            let mut children: Vec<_> = el.children().filter_map(ElementRef::wrap).collect();
            children.reverse();
            stack.extend(children);
        }
    }
    found
}

fn is_list(el: ElementRef<'_>) -> bool {
    matches!(el.value().name(), "ul" | "ol")
}

fn push(out: &mut Vec<ContentBlock>, text: String, make: impl FnOnce(String) -> ContentBlock) {
    if !text.is_empty() {
        out.push(make(text));
    }
}

/// Flattened, whitespace-collapsed text of `element`. `<br>` and block
/// boundaries count as a space; with `skip_lists`, nested `ul`/`ol`
/// subtrees are left out.
pub(crate) fn flatten(element: ElementRef<'_>, skip_lists: bool) -> String {
    enum Step<N> {
        Visit(N),
        Space,
    }

    let mut raw = String::new();
    let mut stack: Vec<_> = element.children().map(Step::Visit).collect();
    stack.reverse();

    // Explicit stack: hostile nesting must not exhaust the call stack.
    while let Some(step) = stack.pop() {
        let node = match step {
            Step::Visit(node) => node,
            Step::Space => {
                raw.push(' ');
                continue;
            }
        };
        match node.value() {
            Node::Text(text) => raw.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if name == "br" {
                    raw.push(' ');
                    continue;
                }
                if matches!(name, "script" | "style") || (skip_lists && matches!(name, "ul" | "ol")) {
                    continue;
                }
                let block = BLOCK_LEVEL.contains(&name);
                if block {
                    raw.push(' ');
                    stack.push(Step::Space);
                }
                let mut children: Vec<_> = node.children().map(Step::Visit).collect();
                children.reverse();
                stack.extend(children);
            }
            _ => {}
        }
    }
    collapse_whitespace(&raw)
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::strip::strip;

    fn blocks(markup: &str) -> Vec<ContentBlock> {
        normalize(&CleanedMarkup::new(markup.to_string()))
    }

    fn para(text: &str) -> ContentBlock {
        ContentBlock::Paragraph { text: text.into() }
    }

    fn li(text: &str, ordinal: usize) -> ContentBlock {
        ContentBlock::ListItem {
            text: text.into(),
            ordinal,
        }
    }

    #[test]
    fn article_heading_and_paragraph() {
        let out = blocks("<article><h1>Title</h1><p>Hello <b>world</b></p></article>");
        assert_eq!(
            out,
            vec![
                ContentBlock::Heading {
                    level: 1,
                    text: "Title".into()
                },
                para("Hello world"),
            ]
        );
    }

    #[test]
    fn inline_markup_does_not_split_words() {
        assert_eq!(blocks("<p>un<em>believ</em>able</p>"), vec![para("unbelievable")]);
        assert_eq!(blocks("<p>line one<br>line   two\n</p>"), vec![para("line one line two")]);
    }

    #[test]
    fn lists_number_items_and_follow_nested_lists() {
        let out = blocks(
            "<ol><li>first<ul><li>inner a</li><li>inner b</li></ul></li><li>second</li></ol>",
        );
        assert_eq!(
            out,
            vec![li("first", 1), li("inner a", 1), li("inner b", 2), li("second", 2)]
        );
    }

    #[test]
    fn empty_item_keeps_position_of_siblings() {
        let out = blocks("<ul><li></li><li>b</li></ul>");
        assert_eq!(out, vec![li("b", 2)]);
    }

    #[test]
    fn stray_list_item_is_numbered_among_siblings() {
        let out = blocks("<div><li>a</li><p>x</p><li>b</li></div>");
        assert_eq!(out, vec![li("a", 1), para("x"), li("b", 2)]);
    }

    #[test]
    fn blockquote_is_flattened() {
        let out = blocks("<blockquote><p>To be</p><p>or not</p></blockquote>");
        assert_eq!(
            out,
            vec![ContentBlock::Quote {
                text: "To be or not".into()
            }]
        );
    }

    #[test]
    fn unknown_elements_and_head_are_skipped() {
        let out = blocks(
            "<html><head><title>T</title></head><body><table><tr><td><p>cell</p></td></tr></table>\
             <figure><p>caption</p></figure><section><div><p>kept</p></div></section></body></html>",
        );
        assert_eq!(out, vec![para("kept")]);
    }

    #[test]
    fn empty_text_yields_no_block() {
        assert!(blocks("<p>  </p><h2></h2><blockquote> </blockquote>").is_empty());
    }

    #[test]
    fn preserves_count_and_order() {
        let markup: String = (0..50).map(|i| format!("<p>para {i}</p>")).collect();
        let out = blocks(&format!("<main>{markup}</main>"));
        assert_eq!(out.len(), 50);
        for (i, block) in out.iter().enumerate() {
            assert_eq!(block.text(), format!("para {i}"));
        }
    }

    #[test]
    fn deterministic_after_strip() {
        let cleaned = strip("<article><h2>A</h2><div class=\"ad\">x</div><p>B</p></article>");
        assert_eq!(normalize(&cleaned), normalize(&cleaned));
        assert_eq!(normalize(&cleaned).len(), 2);
    }
}
