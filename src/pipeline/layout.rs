//! Page layout: word-wrap and paginate a [`RenderableDocument`].
//!
//! Pure arithmetic, no PDF library involved. The output is a list of pages,
//! each a list of positioned [`TextRun`]s that a [`super::render::PdfSurface`]
//! replays. Text is measured through [`TextMetrics`]; [`paginate`] uses the
//! standard [`Helvetica`] metrics and [`paginate_with`] takes the surface's.
//!
//! Coordinates are in PDF points with the origin at the **top-left** corner
//! of the page and `y` pointing down to the text baseline. Surfaces with a
//! bottom-left origin flip `y` themselves.
//!
//! ## Pagination
//!
//! Each block is laid out into a group of lines first. If the group does
//! not fit in the space left on the current page, a new page is started and
//! the whole group moves there. Only a group taller than an empty page is
//! split, at line boundaries.

use crate::config::PaperSize;
use crate::document::{ContentBlock, RenderableDocument};
use serde::Serialize;

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT: f32 = 1.35;

pub const BODY_SIZE: f32 = 11.0;
pub const TITLE_SIZE: f32 = 24.0;
pub const BYLINE_SIZE: f32 = 10.0;
pub const SOURCE_SIZE: f32 = 9.0;
pub const FOOTER_SIZE: f32 = 8.0;

pub const LIST_INDENT: f32 = 18.0;
pub const QUOTE_INDENT: f32 = 24.0;
pub const BULLET: &str = "\u{2022}";

/// Shown in place of an empty title.
pub const UNTITLED: &str = "Untitled";

const BLOCK_GAP: f32 = 6.0;
const FRONT_MATTER_GAP: f32 = 18.0;

/// Heading size by level (1-based).
pub fn heading_size(level: u8) -> f32 {
    match level {
        1 => 22.0,
        2 => 18.0,
        3 => 15.0,
        4 => 13.0,
        5 => 12.0,
        _ => 11.0,
    }
}

/// One of the three Helvetica faces the renderer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

/// A single line of text placed on a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRun {
    pub text: String,
    /// Left edge, from the left page edge.
    pub x: f32,
    /// Baseline, from the top page edge.
    pub y: f32,
    pub size: f32,
    pub style: FontStyle,
    /// Index of the body block this line belongs to; `None` for
    /// front-matter and footer lines.
    pub block: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageLayout {
    pub runs: Vec<TextRun>,
}

/// A fully paginated document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub width: f32,
    pub height: f32,
    pub pages: Vec<PageLayout>,
}

impl Layout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Page geometry and decorations.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub include_footer: bool,
}

impl LayoutOptions {
    pub fn new(paper: PaperSize, margin: f32, include_footer: bool) -> Self {
        let (width, height) = paper.dimensions_pt();
        Self {
            width,
            height,
            margin,
            include_footer,
        }
    }

    fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    fn content_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self::new(PaperSize::A4, 56.0, true)
    }
}

// ── Metrics ──────────────────────────────────────────────────────────────

/// Text measurement consulted while wrapping and paginating.
///
/// The provided methods use the standard Helvetica metrics, which match the
/// built-in PDF faces. A surface drawing with other fonts overrides them.
pub trait TextMetrics {
    /// Advance width of `text` in points.
    fn text_width(&self, text: &str, size: f32, style: FontStyle) -> f32 {
        text_width(text, size, style)
    }

    /// Distance between consecutive baselines.
    fn line_height(&self, size: f32) -> f32 {
        line_height(size)
    }

    /// Height of `text` once wrapped at `max_width`.
    fn measure_height(&self, text: &str, size: f32, style: FontStyle, max_width: f32) -> f32 {
        wrap_with(self, text, size, style, max_width).len() as f32 * self.line_height(size)
    }
}

/// The standard Helvetica metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct Helvetica;

impl TextMetrics for Helvetica {}

/// Helvetica advance widths for ASCII 0x20..=0x7E, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

const DEFAULT_WIDTH: u16 = 556;
const BOLD_FACTOR: f32 = 1.08;

/// Helvetica width of one character, in 1/1000 em.
fn char_units(c: char) -> u16 {
    match c {
        ' '..='~' => HELVETICA_WIDTHS[c as usize - 0x20],
        '\u{a0}' => 278,
        '\u{2018}' | '\u{2019}' | '\u{201a}' => 222,
        '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{2039}' | '\u{203a}' => 333,
        '\u{2022}' => 350,
        '\u{2013}' | '\u{20ac}' => 556,
        '\u{a9}' | '\u{ae}' => 737,
        '\u{2014}' | '\u{2026}' | '\u{2122}' => 1000,
        _ => DEFAULT_WIDTH,
    }
}

/// Advance width of `text` in points, in Helvetica.
pub fn text_width(text: &str, size: f32, style: FontStyle) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(char_units(c))).sum();
    let width = units as f32 * size / 1000.0;
    match style {
        FontStyle::Bold => width * BOLD_FACTOR,
        FontStyle::Regular | FontStyle::Italic => width,
    }
}

pub fn line_height(size: f32) -> f32 {
    size * LINE_HEIGHT
}

/// Greedy word wrap in Helvetica. Words wider than `max_width` are broken
/// by character.
pub fn wrap(text: &str, size: f32, style: FontStyle, max_width: f32) -> Vec<String> {
    wrap_with(&Helvetica, text, size, style, max_width)
}

/// [`wrap`] measuring with `metrics`.
pub fn wrap_with<M: TextMetrics + ?Sized>(
    metrics: &M,
    text: &str,
    size: f32,
    style: FontStyle,
    max_width: f32,
) -> Vec<String> {
    let space = metrics.text_width(" ", size, style);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0;

    for word in text.split_whitespace() {
        let word_width = metrics.text_width(word, size, style);

        if word_width > max_width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
            }
            let mut pieces = break_word(metrics, word, size, style, max_width);
            if let Some(last) = pieces.pop() {
                lines.extend(pieces);
                current_width = metrics.text_width(&last, size, style);
                current = last;
            }
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            current_width = word_width;
        } else if current_width + space + word_width <= max_width {
            current.push(' ');
            current.push_str(word);
            current_width += space + word_width;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
            current_width = word_width;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn break_word<M: TextMetrics + ?Sized>(
    metrics: &M,
    word: &str,
    size: f32,
    style: FontStyle,
    max_width: f32,
) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    for c in word.chars() {
        let mut candidate = piece.clone();
        candidate.push(c);
        if !piece.is_empty() && metrics.text_width(&candidate, size, style) > max_width {
            pieces.push(std::mem::take(&mut piece));
            piece.push(c);
        } else {
            piece = candidate;
        }
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

// ── Pagination ───────────────────────────────────────────────────────────

/// A block's lines before placement; `y` offsets are relative to the top
/// of the group.
struct LineGroup {
    lines: Vec<TextRun>,
    /// Height of the lines themselves.
    height: f32,
    /// Extra space above the group, dropped at the top of a page.
    space_before: f32,
    space_after: f32,
}

struct Cursor<'o> {
    options: &'o LayoutOptions,
    metrics: &'o dyn TextMetrics,
    pages: Vec<PageLayout>,
    /// Distance from the top of the content area to the next free line.
    used: f32,
}

impl<'o> Cursor<'o> {
    fn new(options: &'o LayoutOptions, metrics: &'o dyn TextMetrics) -> Self {
        Self {
            options,
            metrics,
            pages: vec![PageLayout::default()],
            used: 0.0,
        }
    }

    fn remaining(&self) -> f32 {
        self.options.content_height() - self.used
    }

    fn new_page(&mut self) {
        self.pages.push(PageLayout::default());
        self.used = 0.0;
    }

    fn place(&mut self, group: LineGroup) {
        let at_top = self.used == 0.0;
        let before = if at_top { 0.0 } else { group.space_before };

        if group.height <= self.options.content_height() {
            if before + group.height > self.remaining() && !at_top {
                self.new_page();
                self.place_lines(group.lines, 0.0);
            } else {
                self.place_lines(group.lines, before);
            }
            self.used += group.space_after;
            return;
        }

        // Taller than a whole page: start fresh and split by line.
        if !at_top {
            self.new_page();
        }
        // Runs sharing a `y` (bullet and first line) stay together.
        for row in group.lines.chunk_by(|a, b| a.y == b.y) {
            let h = row
                .iter()
                .map(|r| self.metrics.line_height(r.size))
                .fold(0.0, f32::max);
            if h > self.remaining() && self.used > 0.0 {
                self.new_page();
            }
            let runs = row.iter().map(|r| TextRun { y: 0.0, ..r.clone() }).collect();
            self.place_lines(runs, 0.0);
        }
        self.used += group.space_after;
    }

    /// Place `lines` (group-relative `y`) below the cursor.
    fn place_lines(&mut self, lines: Vec<TextRun>, before: f32) {
        let metrics = self.metrics;
        let top = self.options.margin + self.used + before;
        let mut bottom = self.used + before;
        let Some(page) = self.pages.last_mut() else {
            return;
        };
        for line in lines {
            let h = metrics.line_height(line.size);
            bottom = bottom.max(line.y + h + self.used + before);
            page.runs.push(TextRun {
                // Baseline sits at ~80% of the line box.
                y: top + line.y + h * 0.8,
                ..line
            });
        }
        self.used = bottom;
    }
}

/// Lay out `lines` of one style as a stacked group.
fn stack(
    metrics: &dyn TextMetrics,
    texts: Vec<String>,
    x: f32,
    size: f32,
    style: FontStyle,
    block: Option<usize>,
) -> (Vec<TextRun>, f32) {
    let h = metrics.line_height(size);
    let runs: Vec<TextRun> = texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| TextRun {
            text,
            x,
            y: i as f32 * h,
            size,
            style,
            block,
        })
        .collect();
    let height = runs.len() as f32 * h;
    (runs, height)
}

fn front_matter(
    doc: &RenderableDocument,
    options: &LayoutOptions,
    metrics: &dyn TextMetrics,
) -> LineGroup {
    let x = options.margin;
    let width = options.content_width();
    let meta = &doc.metadata;

    let title = if meta.title.trim().is_empty() {
        UNTITLED
    } else {
        meta.title.as_str()
    };

    let mut lines = Vec::new();
    let mut height = 0.0;
    let mut add = |texts: Vec<String>, size: f32, style: FontStyle| {
        let (mut runs, h) = stack(metrics, texts, x, size, style, None);
        for run in &mut runs {
            run.y += height;
        }
        lines.extend(runs);
        height += h;
    };

    let wrap = |text: &str, size: f32, style: FontStyle| wrap_with(metrics, text, size, style, width);
    add(wrap(title, TITLE_SIZE, FontStyle::Bold), TITLE_SIZE, FontStyle::Bold);
    if let Some(byline) = meta.byline() {
        add(wrap(&byline, BYLINE_SIZE, FontStyle::Italic), BYLINE_SIZE, FontStyle::Italic);
    }
    add(
        wrap(&meta.source_url, SOURCE_SIZE, FontStyle::Regular),
        SOURCE_SIZE,
        FontStyle::Regular,
    );

    LineGroup {
        lines,
        height,
        space_before: 0.0,
        space_after: FRONT_MATTER_GAP,
    }
}

fn block_group(
    index: usize,
    block: &ContentBlock,
    options: &LayoutOptions,
    metrics: &dyn TextMetrics,
) -> LineGroup {
    let margin = options.margin;
    let width = options.content_width();
    let block_id = Some(index);

    match block {
        ContentBlock::Heading { level, text } => {
            let size = heading_size(*level);
            let (lines, height) = stack(
                metrics,
                wrap_with(metrics, text, size, FontStyle::Bold, width),
                margin,
                size,
                FontStyle::Bold,
                block_id,
            );
            LineGroup {
                lines,
                height,
                space_before: size * 0.6,
                space_after: BLOCK_GAP * 0.5,
            }
        }
        ContentBlock::Paragraph { text } => {
            let (lines, height) = stack(
                metrics,
                wrap_with(metrics, text, BODY_SIZE, FontStyle::Regular, width),
                margin,
                BODY_SIZE,
                FontStyle::Regular,
                block_id,
            );
            LineGroup {
                lines,
                height,
                space_before: 0.0,
                space_after: BLOCK_GAP,
            }
        }
        ContentBlock::ListItem { text, .. } => {
            let x = margin + LIST_INDENT;
            let (mut lines, height) = stack(
                metrics,
                wrap_with(metrics, text, BODY_SIZE, FontStyle::Regular, width - LIST_INDENT),
                x,
                BODY_SIZE,
                FontStyle::Regular,
                block_id,
            );
            if !lines.is_empty() {
                let bullet_x = x - metrics.text_width(BULLET, BODY_SIZE, FontStyle::Regular) - 6.0;
                lines.insert(
                    0,
                    TextRun {
                        text: BULLET.to_string(),
                        x: bullet_x,
                        y: 0.0,
                        size: BODY_SIZE,
                        style: FontStyle::Regular,
                        block: block_id,
                    },
                );
            }
            LineGroup {
                lines,
                height,
                space_before: 0.0,
                space_after: BLOCK_GAP * 0.5,
            }
        }
        ContentBlock::Quote { text } => {
            let (lines, height) = stack(
                metrics,
                wrap_with(metrics, text, BODY_SIZE, FontStyle::Italic, width - QUOTE_INDENT),
                margin + QUOTE_INDENT,
                BODY_SIZE,
                FontStyle::Italic,
                block_id,
            );
            LineGroup {
                lines,
                height,
                space_before: BLOCK_GAP * 0.5,
                space_after: BLOCK_GAP,
            }
        }
    }
}

/// Paginate `doc` with Helvetica metrics. Always yields at least one page.
pub fn paginate(doc: &RenderableDocument, options: &LayoutOptions) -> Layout {
    paginate_with(doc, options, &Helvetica)
}

/// Paginate `doc`, measuring text with `metrics`.
pub fn paginate_with(
    doc: &RenderableDocument,
    options: &LayoutOptions,
    metrics: &dyn TextMetrics,
) -> Layout {
    let mut cursor = Cursor::new(options, metrics);
    cursor.place(front_matter(doc, options, metrics));
    for (index, block) in doc.blocks.iter().enumerate() {
        cursor.place(block_group(index, block, options, metrics));
    }

    let mut pages = cursor.pages;
    if options.include_footer {
        add_footers(&mut pages, &doc.metadata.source_url, options, metrics);
    }

    Layout {
        width: options.width,
        height: options.height,
        pages,
    }
}

fn add_footers(
    pages: &mut [PageLayout],
    source_url: &str,
    options: &LayoutOptions,
    metrics: &dyn TextMetrics,
) {
    let total = pages.len();
    let y = options.height - options.margin / 2.0;
    for (i, page) in pages.iter_mut().enumerate() {
        let label = format!("Page {} of {}", i + 1, total);
        let label_width = metrics.text_width(&label, FOOTER_SIZE, FontStyle::Regular);
        let room = options.content_width() - label_width - 12.0;
        page.runs.push(TextRun {
            text: truncate_to_width(metrics, source_url, FOOTER_SIZE, room),
            x: options.margin,
            y,
            size: FOOTER_SIZE,
            style: FontStyle::Regular,
            block: None,
        });
        page.runs.push(TextRun {
            text: label,
            x: options.width - options.margin - label_width,
            y,
            size: FOOTER_SIZE,
            style: FontStyle::Regular,
            block: None,
        });
    }
}

fn truncate_to_width(metrics: &dyn TextMetrics, text: &str, size: f32, max_width: f32) -> String {
    if metrics.text_width(text, size, FontStyle::Regular) <= max_width {
        return text.to_string();
    }
    let ellipsis = "...";
    let budget = max_width - metrics.text_width(ellipsis, size, FontStyle::Regular);
    let mut out = String::new();
    let mut width = 0.0;
    for c in text.chars() {
        let w = metrics.text_width(c.encode_utf8(&mut [0; 4]), size, FontStyle::Regular);
        if width + w > budget {
            break;
        }
        width += w;
        out.push(c);
    }
    out.push_str(ellipsis);
    out
}
