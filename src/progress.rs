//! Progress-callback trait for per-stage conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as a conversion moves through the pipeline. The CLI forwards them
//! to a terminal spinner; a server could forward them to logs or a socket.
//!
//! # Example
//!
//! ```rust
//! use edgequake_url2pdf::{ConversionConfig, ConversionProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ConversionProgressCallback for Printer {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         eprintln!("{} done in {}ms", stage, elapsed_ms);
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Validate,
    Fetch,
    Cleanup,
    Strip,
    Normalize,
    Metadata,
    Render,
}

impl Stage {
    /// Every stage, in the order a conversion runs them.
    pub const ALL: [Stage; 7] = [
        Stage::Validate,
        Stage::Fetch,
        Stage::Cleanup,
        Stage::Strip,
        Stage::Normalize,
        Stage::Metadata,
        Stage::Render,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Fetch => "fetch",
            Stage::Cleanup => "platform cleanup",
            Stage::Strip => "strip ads",
            Stage::Normalize => "normalize",
            Stage::Metadata => "metadata",
            Stage::Render => "render",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Called by the conversion pipeline as it moves between stages.
///
/// Implementations must be `Send + Sync`: one config (and its callback) is
/// shared by every request a server handles. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before validation starts.
    fn on_conversion_start(&self, url: &str) {
        let _ = url;
    }

    /// Called just before a stage runs.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called after a stage finished successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called when a stage ends the conversion with an error.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once after the PDF bytes exist.
    ///
    /// * `pages` — number of PDF pages
    /// * `bytes` — size of the encoded PDF
    fn on_conversion_complete(&self, pages: usize, bytes: usize) {
        let _ = (pages, bytes);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        events: Mutex<Vec<String>>,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start:{stage}"));
        }

        fn on_stage_complete(&self, stage: Stage, _elapsed_ms: u64) {
            self.events.lock().unwrap().push(format!("done:{stage}"));
        }

        fn on_stage_error(&self, stage: Stage, _error: &str) {
            self.events.lock().unwrap().push(format!("error:{stage}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start("https://example.com");
        cb.on_stage_start(Stage::Fetch);
        cb.on_stage_complete(Stage::Fetch, 12);
        cb.on_stage_error(Stage::Render, "boom");
        cb.on_conversion_complete(2, 4096);
    }

    #[test]
    fn tracking_callback_receives_events_in_order() {
        let tracker = TrackingCallback::default();
        tracker.on_stage_start(Stage::Validate);
        tracker.on_stage_complete(Stage::Validate, 0);
        tracker.on_stage_start(Stage::Fetch);
        tracker.on_stage_error(Stage::Fetch, "timeout");

        let events = tracker.events.lock().unwrap();
        assert_eq!(
            *events,
            vec!["start:validate", "done:validate", "start:fetch", "error:fetch"]
        );
    }

    #[test]
    fn stages_are_ordered() {
        assert_eq!(Stage::ALL.first(), Some(&Stage::Validate));
        assert_eq!(Stage::ALL.last(), Some(&Stage::Render));
    }
}
