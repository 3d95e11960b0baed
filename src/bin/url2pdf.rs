//! CLI binary for edgequake-url2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and either converts one URL or serves the HTTP API.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_url2pdf::pipeline::validate::{self, ValidationPolicy};
use edgequake_url2pdf::{
    server, ConversionConfig, ConversionProgressCallback, Converter, PaperSize, ProgressCallback,
    Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner naming the running stage, with one
/// log line per finished stage printed above it.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, url: &str) {
        self.bar
            .println(format!("{} {}", cyan("◆"), bold(&format!("Converting {url}"))));
    }

    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix(stage.label());
        self.bar.set_message("…");
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<18} {}",
            green("✓"),
            stage.label(),
            dim(&format!("{elapsed_ms}ms")),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(100) {
            Some((idx, _)) => format!("{}\u{2026}", &error[..idx]),
            None => error.to_string(),
        };

        self.bar.finish_and_clear();
        eprintln!("  {} {:<18} {}", red("✗"), stage.label(), red(&msg));
    }

    fn on_conversion_complete(&self, _pages: usize, _bytes: usize) {
        // main() prints the summary line.
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert an article; writes <last-path-segment>.pdf
  url2pdf https://blog.example.com/2024/my-post

  # Choose the output file
  url2pdf https://medium.com/@someone/a-story-123abc -o story.pdf

  # Write the PDF to stdout
  url2pdf https://example.com/post -o - > post.pdf

  # Letter paper, narrower margins, no footer
  url2pdf --paper letter --margin 40 --no-footer https://example.com/post

  # Inspect what would be rendered, as JSON (no PDF produced)
  url2pdf --json https://example.com/post

  # Only accept URLs on these hosts
  url2pdf --allow-host medium.com --allow-host substack.com https://x.substack.com/p/y

  # Run the HTTP API
  url2pdf --serve --bind 0.0.0.0:3000
  curl -X POST localhost:3000/convert -H 'content-type: application/json' \
       -d '{"url":"https://example.com/post"}' -o post.pdf

PLATFORMS WITH DEDICATED CLEANUP:
  medium.com, WordPress (*.wordpress.com or generator meta tag),
  blogspot.com / blogger.com, substack.com

ENVIRONMENT VARIABLES:
  URL2PDF_*               Every flag has a URL2PDF_<FLAG> fallback
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Overrides the log filter chosen by -v / -q
"#;

/// Convert web articles into clean, readable PDF documents.
#[derive(Parser, Debug)]
#[command(
    name = "url2pdf",
    version,
    about = "Convert web articles into clean, readable PDF documents",
    long_about = "Fetch a web article, strip ads, navigation and platform furniture \
(Medium, WordPress, Blogger, Substack), and typeset the remaining headings, paragraphs, \
lists and quotes as a paginated PDF with title, author, date and source URL.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Article URL (http or https).
    #[arg(required_unless_present = "serve")]
    url: Option<String>,

    /// Write the PDF here. `-` writes to stdout. Default: <slug>.pdf.
    #[arg(short, long, env = "URL2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Print the extracted document as JSON instead of rendering a PDF.
    #[arg(long, env = "URL2PDF_JSON")]
    json: bool,

    /// Run the HTTP API instead of converting a single URL.
    #[arg(long, env = "URL2PDF_SERVE", conflicts_with = "url")]
    serve: bool,

    /// Address the HTTP API listens on.
    #[arg(long, env = "URL2PDF_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Fetch timeout in seconds.
    #[arg(long, env = "URL2PDF_TIMEOUT", default_value_t = 15)]
    timeout: u64,

    /// Largest accepted page, in bytes.
    #[arg(long, env = "URL2PDF_MAX_BODY_BYTES", default_value_t = 5 * 1024 * 1024)]
    max_body_bytes: u64,

    /// Paper size.
    #[arg(long, env = "URL2PDF_PAPER", value_enum, default_value = "a4")]
    paper: PaperArg,

    /// Page margin in points.
    #[arg(long, env = "URL2PDF_MARGIN", default_value_t = 56.0)]
    margin: f32,

    /// Omit the "Page N of M" and source URL footer.
    #[arg(long, env = "URL2PDF_NO_FOOTER")]
    no_footer: bool,

    /// Accept only this host (and its subdomains). Repeatable.
    #[arg(long = "allow-host", env = "URL2PDF_ALLOW_HOSTS", value_delimiter = ',')]
    allow_hosts: Vec<String>,

    /// Override the User-Agent header.
    #[arg(long, env = "URL2PDF_USER_AGENT")]
    user_agent: Option<String>,

    /// Disable the progress spinner.
    #[arg(long, env = "URL2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "URL2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "URL2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PaperArg {
    A4,
    Letter,
}

impl From<PaperArg> for PaperSize {
    fn from(v: PaperArg) -> Self {
        match v {
            PaperArg::A4 => PaperSize::A4,
            PaperArg::Letter => PaperSize::Letter,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO logs for single conversions; the server
    // always logs requests.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.serve;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Server mode ──────────────────────────────────────────────────────
    if cli.serve {
        let config = build_config(&cli, None)?;
        let converter = Converter::with_http(config).context("Failed to build HTTP client")?;
        if !cli.quiet {
            eprintln!("{} listening on {}", cyan("◆"), bold(&format!("http://{}", cli.bind)));
        }
        server::serve(Arc::new(converter), cli.bind)
            .await
            .context("Server failed")?;
        return Ok(());
    }

    let url = cli.url.clone().context("A URL is required unless --serve is given")?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let converter = Converter::with_http(config).context("Failed to build HTTP client")?;

    // ── JSON mode: stop before rendering ─────────────────────────────────
    if cli.json {
        let document = converter.prepare(&url).await.context("Conversion failed")?;
        let json = serde_json::to_string_pretty(&document).context("Failed to serialise document")?;
        println!("{json}");
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    match cli.output.as_deref() {
        Some(path) if path.as_os_str() == "-" => {
            let pdf = converter.convert(&url).await.context("Conversion failed")?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(&pdf).context("Failed to write to stdout")?;
            handle.flush().context("Failed to write to stdout")?;
        }
        output => {
            let path = match output {
                Some(path) => path.to_path_buf(),
                None => default_output_path(&url, converter.config())?,
            };
            let stats = converter
                .convert_to_file(&url, &path)
                .await
                .context("Conversion failed")?;

            if !cli.quiet {
                eprintln!(
                    "{}  {} pages  {} blocks  {}ms  →  {}",
                    green("✔"),
                    stats.pages,
                    stats.blocks,
                    stats.total_duration_ms,
                    bold(&path.display().to_string()),
                );
                eprintln!(
                    "   {} fetched  /  {} written",
                    dim(&format!("{} bytes", stats.source_bytes)),
                    dim(&format!("{} bytes", stats.pdf_bytes)),
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .fetch_timeout_secs(cli.timeout)
        .max_body_bytes(cli.max_body_bytes)
        .paper(cli.paper.into())
        .margin_pt(cli.margin)
        .include_footer(!cli.no_footer)
        .allowed_hosts(cli.allow_hosts.iter().map(String::as_str));

    if let Some(ref ua) = cli.user_agent {
        builder = builder.user_agent(ua.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `<slug>.pdf` in the working directory. Validates `url` first so a bad
/// URL is reported before anything touches the network.
fn default_output_path(url: &str, config: &ConversionConfig) -> Result<PathBuf> {
    let validated = validate::validate(url, &ValidationPolicy::from_config(config))
        .context("Conversion failed")?;
    Ok(PathBuf::from(format!("{}.pdf", validated.slug())))
}
