//! Progress-callback trait for per-request analysis events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalyzerConfigBuilder::progress_callback`] to follow a
//! request through its stages:
//!
//! ```text
//! Idle ─▶ Extracting ─▶ CallingService ─▶ Parsing ─┬─▶ Succeeded
//!                                                  └─▶ Failed
//! ```
//!
//! A failure in any stage jumps straight to `Failed`. The quote-repair pass
//! stays inside `Parsing` and is reported through
//! [`AnalysisProgressCallback::on_repair_attempt`].
//!
//! # Example
//!
//! ```rust
//! use resume2json::{AnalysisProgressCallback, AnalysisStage, AnalyzerConfig};
//! use std::sync::Arc;
//!
//! struct PrintStages;
//!
//! impl AnalysisProgressCallback for PrintStages {
//!     fn on_stage(&self, stage: AnalysisStage) {
//!         eprintln!("→ {stage}");
//!     }
//! }
//!
//! let config = AnalyzerConfig::builder()
//!     .progress_callback(Arc::new(PrintStages))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The stages of a single analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisStage {
    Idle,
    Extracting,
    CallingService,
    Parsing,
    Succeeded,
    Failed,
}

impl AnalysisStage {
    /// True for `Succeeded` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStage::Succeeded | AnalysisStage::Failed)
    }
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisStage::Idle => "idle",
            AnalysisStage::Extracting => "extracting text",
            AnalysisStage::CallingService => "calling generative service",
            AnalysisStage::Parsing => "parsing response",
            AnalysisStage::Succeeded => "succeeded",
            AnalysisStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as a request moves between stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called on every stage transition, including the terminal one.
    fn on_stage(&self, stage: AnalysisStage) {
        let _ = stage;
    }

    /// Called once text extraction finished.
    ///
    /// # Arguments
    /// * `chars` - number of characters extracted
    /// * `no_text_detected` - OCR found nothing; the analysis continues anyway
    fn on_extracted(&self, chars: usize, no_text_detected: bool) {
        let _ = (chars, no_text_detected);
    }

    /// Called when strict parsing failed and the quote-repair pass runs.
    fn on_repair_attempt(&self) {}

    /// Called once at the end of the request.
    fn on_complete(&self, success: bool) {
        let _ = success;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalyzerConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;

/// Fire a stage event on an optional callback.
pub(crate) fn notify(cb: &Option<ProgressCallback>, stage: AnalysisStage) {
    if let Some(cb) = cb {
        cb.on_stage(stage);
        if stage.is_terminal() {
            cb.on_complete(stage == AnalysisStage::Succeeded);
        }
    }
}
