//! Conversion entry points: URL in, PDF bytes out.
//!
//! [`Converter`] owns the configuration and the injected [`Transport`] and
//! runs the stages in order:
//!
//! ```text
//! validate ─▶ fetch ─▶ platform cleanup ─▶ strip ─▶ normalize ─▶ metadata ─▶ render
//! ```
//!
//! Stages run sequentially for one request; a `Converter` holds no mutable
//! state and can be shared across tasks behind an `Arc`.

use crate::config::ConversionConfig;
use crate::document::{RenderableDocument, ValidatedUrl};
use crate::error::Url2PdfError;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::fetch::{ContentFetcher, FetchLimits, HttpTransport, Transport};
use crate::pipeline::platform::{self, PlatformRules};
use crate::pipeline::render::{self, PdfSurface, PdfiumSurface, RenderOptions, RenderedPdf};
use crate::pipeline::validate::{self, ValidationPolicy};
use crate::pipeline::{metadata, normalize, strip};
use crate::progress::Stage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Runs the URL-to-PDF pipeline.
#[derive(Clone)]
pub struct Converter {
    config: ConversionConfig,
    fetcher: ContentFetcher,
    policy: ValidationPolicy,
    rules: &'static PlatformRules,
}

/// A prepared document plus what preparing it cost.
struct Prepared {
    url: ValidatedUrl,
    document: RenderableDocument,
    source_bytes: usize,
    fetch_duration_ms: u64,
}

impl Converter {
    /// Build a converter that fetches through `transport`.
    pub fn new(config: ConversionConfig, transport: Arc<dyn Transport>) -> Self {
        let fetcher = ContentFetcher::new(transport, FetchLimits::from_config(&config));
        let policy = ValidationPolicy::from_config(&config);
        Self {
            config,
            fetcher,
            policy,
            rules: PlatformRules::builtin(),
        }
    }

    /// Build a converter backed by the reqwest [`HttpTransport`].
    pub fn with_http(config: ConversionConfig) -> Result<Self, Url2PdfError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Run every stage up to, but not including, rendering.
    pub async fn prepare(&self, url: &str) -> Result<RenderableDocument, Url2PdfError> {
        self.prepare_inner(url).await.map(|p| p.document)
    }

    /// Convert `url` to PDF bytes using pdfium.
    pub async fn convert(&self, url: &str) -> Result<Vec<u8>, Url2PdfError> {
        self.convert_output(url).await.map(|output| output.pdf)
    }

    /// Convert `url` and return the PDF together with the rendered document
    /// and stats.
    pub async fn convert_output(&self, url: &str) -> Result<ConversionOutput, Url2PdfError> {
        let total_start = Instant::now();
        let prepared = self.prepare_inner(url).await?;

        // ── Step 7: Render (pdfium is blocking) ──────────────────────────
        let render_start = self.stage_start(Stage::Render);
        let document = prepared.document;
        let options = self.render_options();
        let rendered = tokio::task::spawn_blocking(move || {
            let result = render::render_document(&document, &options, PdfiumSurface::new());
            (document, result)
        })
        .await
        .map_err(|e| Url2PdfError::Internal(format!("Render task panicked: {}", e)));
        let (document, rendered) = match rendered {
            Ok((document, Ok(rendered))) => (document, rendered),
            Ok((_, Err(e))) | Err(e) => return Err(self.stage_failed(Stage::Render, e)),
        };
        let render_duration_ms = self.stage_done(Stage::Render, render_start);

        Ok(self.finish(
            prepared.url,
            document,
            rendered,
            prepared.source_bytes,
            prepared.fetch_duration_ms,
            render_duration_ms,
            total_start,
        ))
    }

    /// Convert `url`, drawing onto a caller-supplied surface.
    ///
    /// The surface runs on the calling task; wrap blocking backends in
    /// `spawn_blocking` yourself or use [`Converter::convert`].
    pub async fn convert_with_surface<S: PdfSurface>(
        &self,
        url: &str,
        surface: S,
    ) -> Result<Vec<u8>, Url2PdfError> {
        let prepared = self.prepare_inner(url).await?;

        let render_start = self.stage_start(Stage::Render);
        let rendered = render::render_document(&prepared.document, &self.render_options(), surface)
            .map_err(|e| self.stage_failed(Stage::Render, e))?;
        self.stage_done(Stage::Render, render_start);

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_conversion_complete(rendered.pages, rendered.bytes.len());
        }
        Ok(rendered.bytes)
    }

    /// Convert `url` and write the PDF to `output_path`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub async fn convert_to_file(
        &self,
        url: &str,
        output_path: impl AsRef<Path>,
    ) -> Result<ConversionStats, Url2PdfError> {
        let output = self.convert_output(url).await?;
        write_atomic(output_path.as_ref(), &output.pdf).await?;
        Ok(output.stats)
    }

    fn render_options(&self) -> RenderOptions {
        RenderOptions::new(self.config.paper, self.config.margin_pt, self.config.include_footer)
    }

    async fn prepare_inner(&self, url: &str) -> Result<Prepared, Url2PdfError> {
        info!("Starting conversion: {}", url);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_conversion_start(url);
        }

        // ── Step 1: Validate ─────────────────────────────────────────────
        let t = self.stage_start(Stage::Validate);
        let validated = validate::validate(url, &self.policy)
            .map_err(|e| self.stage_failed(Stage::Validate, e))?;
        self.stage_done(Stage::Validate, t);

        // ── Step 2: Fetch ────────────────────────────────────────────────
        let t = self.stage_start(Stage::Fetch);
        let raw = self
            .fetcher
            .fetch(validated.clone())
            .await
            .map_err(|e| self.stage_failed(Stage::Fetch, e))?;
        let fetch_duration_ms = self.stage_done(Stage::Fetch, t);
        let source_bytes = raw.markup.len();

        // ── Step 3: Platform cleanup ─────────────────────────────────────
        // Metadata is read from the unmodified page: platform rules may drop
        // bylines and post headers.
        let t = self.stage_start(Stage::Cleanup);
        let cleaned = platform::cleanup(raw.clone(), self.rules);
        self.stage_done(Stage::Cleanup, t);

        // ── Step 4: Strip ads and boilerplate ────────────────────────────
        let t = self.stage_start(Stage::Strip);
        let stripped = strip::strip(&cleaned.markup);
        self.stage_done(Stage::Strip, t);

        // ── Step 5: Normalize ────────────────────────────────────────────
        let t = self.stage_start(Stage::Normalize);
        let blocks = normalize::normalize(&stripped);
        self.stage_done(Stage::Normalize, t);

        // ── Step 6: Metadata ─────────────────────────────────────────────
        let t = self.stage_start(Stage::Metadata);
        let metadata = metadata::extract(&raw);
        self.stage_done(Stage::Metadata, t);

        info!(
            "Prepared '{}': {} blocks from {} bytes",
            metadata.title,
            blocks.len(),
            source_bytes
        );

        Ok(Prepared {
            url: validated,
            document: RenderableDocument { metadata, blocks },
            source_bytes,
            fetch_duration_ms,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        url: ValidatedUrl,
        document: RenderableDocument,
        rendered: RenderedPdf,
        source_bytes: usize,
        fetch_duration_ms: u64,
        render_duration_ms: u64,
        total_start: Instant,
    ) -> ConversionOutput {
        let stats = ConversionStats {
            pages: rendered.pages,
            blocks: document.blocks.len(),
            pdf_bytes: rendered.bytes.len(),
            source_bytes,
            fetch_duration_ms,
            render_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Conversion complete: {} pages, {} bytes, {}ms total",
            stats.pages, stats.pdf_bytes, stats.total_duration_ms
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_conversion_complete(stats.pages, stats.pdf_bytes);
        }
        ConversionOutput {
            url,
            pdf: rendered.bytes,
            document,
            stats,
        }
    }

    // ── Progress plumbing ────────────────────────────────────────────────

    fn stage_start(&self, stage: Stage) -> Instant {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_start(stage);
        }
        Instant::now()
    }

    fn stage_done(&self, stage: Stage, start: Instant) -> u64 {
        let elapsed_ms = start.elapsed().as_millis() as u64;
        debug!("Stage {} finished in {}ms", stage, elapsed_ms);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_complete(stage, elapsed_ms);
        }
        elapsed_ms
    }

    fn stage_failed(&self, stage: Stage, error: Url2PdfError) -> Url2PdfError {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_error(stage, &error.to_string());
        }
        error
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Url2PdfError> {
    let write_err = |e: std::io::Error| Url2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

// ── Free functions ───────────────────────────────────────────────────────

/// Convert a web article to PDF bytes over HTTP.
///
/// This is the primary entry point for the library.
///
/// # Example
/// ```rust,no_run
/// use edgequake_url2pdf::{convert, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let pdf = convert("https://example.com/blog/post", &ConversionConfig::default()).await?;
/// std::fs::write("post.pdf", pdf)?;
/// # Ok(())
/// # }
/// ```
pub async fn convert(url: impl AsRef<str>, config: &ConversionConfig) -> Result<Vec<u8>, Url2PdfError> {
    Converter::with_http(config.clone())?.convert(url.as_ref()).await
}

/// Convert a web article and write the PDF to `output_path` atomically.
pub async fn convert_to_file(
    url: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Url2PdfError> {
    Converter::with_http(config.clone())?
        .convert_to_file(url.as_ref(), output_path)
        .await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(url: impl AsRef<str>, config: &ConversionConfig) -> Result<Vec<u8>, Url2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Url2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(url, config))
}
