//! PDF rendering: replay a paginated [`Layout`] onto a drawing surface.
//!
//! Layout is pure and lives in [`super::layout`]. This module only knows
//! how to hand positioned text runs to a [`PdfSurface`] and collect the
//! resulting bytes.
//!
//! ## Surfaces
//!
//! [`PdfiumSurface`] needs the pdfium shared library at runtime.
//! [`RecordingSurface`] needs nothing and returns the placed runs as JSON.
//!
//! [`PdfiumSurface`] is blocking; call it from `spawn_blocking`.

use super::layout::{
    paginate_with, FontStyle, Layout, LayoutOptions, PageLayout, TextMetrics, TextRun,
};
use crate::document::RenderableDocument;
use crate::error::Url2PdfError;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Page geometry and decorations used when rendering.
pub type RenderOptions = LayoutOptions;

/// The PDF drawing backend.
///
/// A surface also measures text: [`TextMetrics::text_width`],
/// [`TextMetrics::line_height`] and [`TextMetrics::measure_height`] are
/// consulted while paginating. The provided metrics are Helvetica's; a
/// surface drawing with other fonts overrides them.
pub trait PdfSurface: TextMetrics {
    /// Start a new page of the given size in points.
    fn begin_page(&mut self, width: f32, height: f32) -> Result<(), Url2PdfError>;

    /// Draw one run on the current page. Coordinates are top-left based.
    fn draw_text(&mut self, run: &TextRun) -> Result<(), Url2PdfError>;

    /// Finalise the document and return its bytes.
    fn finish(self) -> Result<Vec<u8>, Url2PdfError>
    where
        Self: Sized;
}

/// Bytes plus the page count, for progress reporting.
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// Lay out and draw `doc`, returning the PDF bytes.
///
/// Fails with [`Url2PdfError::RenderFailed`] when `doc` has no body blocks.
pub fn render<S: PdfSurface>(
    doc: &RenderableDocument,
    options: &RenderOptions,
    surface: S,
) -> Result<Vec<u8>, Url2PdfError> {
    render_document(doc, options, surface).map(|pdf| pdf.bytes)
}

/// Like [`render`], also reporting the page count.
pub fn render_document<S: PdfSurface>(
    doc: &RenderableDocument,
    options: &RenderOptions,
    surface: S,
) -> Result<RenderedPdf, Url2PdfError> {
    if doc.blocks.is_empty() {
        return Err(Url2PdfError::render(
            "document has no body content to render",
        ));
    }
    let layout = paginate_with(doc, options, &surface);
    debug!(
        "Laid out {} blocks on {} pages",
        doc.blocks.len(),
        layout.page_count()
    );
    draw(&layout, surface)
}

/// Replay `layout` onto `surface`.
pub fn draw<S: PdfSurface>(layout: &Layout, mut surface: S) -> Result<RenderedPdf, Url2PdfError> {
    for page in &layout.pages {
        surface.begin_page(layout.width, layout.height)?;
        for run in &page.runs {
            surface.draw_text(run)?;
        }
    }
    let bytes = surface.finish()?;
    if bytes.is_empty() {
        return Err(Url2PdfError::render("surface produced an empty document"));
    }
    Ok(RenderedPdf {
        bytes,
        pages: layout.page_count(),
    })
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// [`PdfSurface`] that writes a real PDF through pdfium.
///
/// Runs are buffered and the document is built in [`PdfSurface::finish`],
/// so pdfium is bound only once per document and only on this thread.
#[derive(Debug, Default)]
pub struct PdfiumSurface {
    pages: Vec<(f32, f32, PageLayout)>,
}

impl PdfiumSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Draws with pdfium's built-in Helvetica faces.
impl TextMetrics for PdfiumSurface {}

impl PdfSurface for PdfiumSurface {
    fn begin_page(&mut self, width: f32, height: f32) -> Result<(), Url2PdfError> {
        self.pages.push((width, height, PageLayout::default()));
        Ok(())
    }

    fn draw_text(&mut self, run: &TextRun) -> Result<(), Url2PdfError> {
        match self.pages.last_mut() {
            Some((_, _, page)) => {
                page.runs.push(run.clone());
                Ok(())
            }
            None => Err(Url2PdfError::render("draw_text called before begin_page")),
        }
    }

    fn finish(self) -> Result<Vec<u8>, Url2PdfError> {
        let pdfium = bind_pdfium()?;
        let mut document = pdfium
            .create_new_pdf()
            .map_err(|e| Url2PdfError::render(format!("cannot create document: {:?}", e)))?;

        let regular = document.fonts_mut().helvetica();
        let bold = document.fonts_mut().helvetica_bold();
        let italic = document.fonts_mut().helvetica_oblique();

        for (index, (width, height, layout)) in self.pages.iter().enumerate() {
            let size = PdfPagePaperSize::from_points(PdfPoints::new(*width), PdfPoints::new(*height));
            let mut page = document
                .pages_mut()
                .create_page_at_end(size)
                .map_err(|e| {
                    Url2PdfError::render(format!("cannot create page {}: {:?}", index + 1, e))
                })?;

            for run in &layout.runs {
                let font = match run.style {
                    FontStyle::Regular => regular,
                    FontStyle::Bold => bold,
                    FontStyle::Italic => italic,
                };
                page.objects_mut()
                    .create_text_object(
                        PdfPoints::new(run.x),
                        // pdfium's origin is bottom-left.
                        PdfPoints::new(height - run.y),
                        &run.text,
                        font,
                        PdfPoints::new(run.size),
                    )
                    .map_err(|e| {
                        Url2PdfError::render(format!(
                            "cannot place text on page {}: {:?}",
                            index + 1,
                            e
                        ))
                    })?;
            }
        }

        let bytes = document
            .save_to_bytes()
            .map_err(|e| Url2PdfError::render(format!("cannot save document: {:?}", e)))?;
        info!("Wrote {} pages ({} bytes)", self.pages.len(), bytes.len());
        Ok(bytes)
    }
}

/// Bind pdfium from `PDFIUM_LIB_PATH` (file or directory), the working
/// directory, or the system library path, in that order.
pub fn bind_pdfium() -> Result<Pdfium, Url2PdfError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => {
            let path = Path::new(&path);
            if path.is_dir() {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
            } else {
                Pdfium::bind_to_library(path)
            }
        }
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| Url2PdfError::render(format!("cannot load the pdfium library: {:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

// ── Recording ────────────────────────────────────────────────────────────

/// [`PdfSurface`] that records what would be drawn.
///
/// `finish` returns the recorded pages as JSON, which keeps the output
/// inspectable in tests and in `--json` debugging.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pages: Vec<PageLayout>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextMetrics for RecordingSurface {}

impl PdfSurface for RecordingSurface {
    fn begin_page(&mut self, _width: f32, _height: f32) -> Result<(), Url2PdfError> {
        self.pages.push(PageLayout::default());
        Ok(())
    }

    fn draw_text(&mut self, run: &TextRun) -> Result<(), Url2PdfError> {
        self.pages
            .last_mut()
            .map(|page| page.runs.push(run.clone()))
            .ok_or_else(|| Url2PdfError::render("draw_text called before begin_page"))
    }

    fn finish(self) -> Result<Vec<u8>, Url2PdfError> {
        serde_json::to_vec(&self.pages)
            .map_err(|e| Url2PdfError::Internal(format!("cannot encode recording: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ContentBlock, DocumentMetadata};

    fn doc(blocks: Vec<ContentBlock>) -> RenderableDocument {
        RenderableDocument {
            metadata: DocumentMetadata {
                title: "Title".into(),
                source_url: "https://example.com/post/1".into(),
                ..DocumentMetadata::default()
            },
            blocks,
        }
    }

    #[test]
    fn empty_body_is_render_failed() {
        let err = render(&doc(vec![]), &RenderOptions::default(), RecordingSurface::new()).unwrap_err();
        assert!(matches!(err, Url2PdfError::RenderFailed { .. }));
    }

    #[test]
    fn non_empty_body_yields_pages() {
        let pdf = render_document(
            &doc(vec![ContentBlock::Paragraph {
                text: "Hello world".into(),
            }]),
            &RenderOptions::default(),
            RecordingSurface::new(),
        )
        .unwrap();
        assert_eq!(pdf.pages, 1);
        let pages: serde_json::Value = serde_json::from_slice(&pdf.bytes).unwrap();
        let texts: Vec<&str> = pages[0]["runs"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|r| r["text"].as_str())
            .collect();
        assert!(texts.contains(&"Hello world"));
    }

    #[test]
    fn draw_before_begin_page_fails() {
        let mut surface = RecordingSurface::new();
        let run = TextRun {
            text: "x".into(),
            x: 0.0,
            y: 0.0,
            size: 11.0,
            style: FontStyle::Regular,
            block: None,
        };
        assert!(surface.draw_text(&run).is_err());
    }

    struct EmptySurface;

    impl TextMetrics for EmptySurface {}

    impl PdfSurface for EmptySurface {
        fn begin_page(&mut self, _: f32, _: f32) -> Result<(), Url2PdfError> {
            Ok(())
        }
        fn draw_text(&mut self, _: &TextRun) -> Result<(), Url2PdfError> {
            Ok(())
        }
        fn finish(self) -> Result<Vec<u8>, Url2PdfError> {
            Ok(Vec::new())
        }
    }

    /// Records runs but measures every character as a full em.
    struct WideSurface(RecordingSurface);

    impl TextMetrics for WideSurface {
        fn text_width(&self, text: &str, size: f32, _style: FontStyle) -> f32 {
            text.chars().count() as f32 * size
        }
    }

    impl PdfSurface for WideSurface {
        fn begin_page(&mut self, width: f32, height: f32) -> Result<(), Url2PdfError> {
            self.0.begin_page(width, height)
        }
        fn draw_text(&mut self, run: &TextRun) -> Result<(), Url2PdfError> {
            self.0.draw_text(run)
        }
        fn finish(self) -> Result<Vec<u8>, Url2PdfError> {
            self.0.finish()
        }
    }

    #[test]
    fn surface_metrics_drive_pagination() {
        let text = "Measured by the surface, not by a fixed table. ".repeat(10);
        let d = doc((0..15).map(|_| ContentBlock::Paragraph { text: text.clone() }).collect());
        let options = RenderOptions::default();

        let standard = render_document(&d, &options, RecordingSurface::new()).unwrap();
        let wide = render_document(&d, &options, WideSurface(RecordingSurface::new())).unwrap();
        assert!(wide.pages > standard.pages, "{} vs {}", wide.pages, standard.pages);
    }

    #[test]
    fn empty_surface_output_is_an_error() {
        let err = render(
            &doc(vec![ContentBlock::Quote { text: "q".into() }]),
            &RenderOptions::default(),
            EmptySurface,
        )
        .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
