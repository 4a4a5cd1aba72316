//! Result types returned by the analysis entry points.

use crate::pipeline::extract::ExtractedText;
use crate::record::ResumeRecord;
use serde::{Deserialize, Serialize};

/// Everything one analysis produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// The structured resume.
    pub record: ResumeRecord,

    /// Service output exactly as received.
    pub raw_response: String,

    /// Service output after fence and commentary stripping.
    pub cleaned_response: String,

    /// True when the single-quote repair was needed to parse the response.
    pub repaired: bool,

    /// The extraction result; `None` when text was supplied directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractedText>,

    pub stats: AnalysisStats,
}

/// Token usage and timings for one analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// Prompt tokens reported by the service (0 if not reported).
    pub input_tokens: u64,
    /// Completion tokens reported by the service (0 if not reported).
    pub output_tokens: u64,
    /// Time spent extracting text, in milliseconds.
    pub extract_duration_ms: u64,
    /// Time spent waiting for the service, in milliseconds.
    pub service_duration_ms: u64,
    /// Wall-clock time for the whole request, in milliseconds.
    pub total_duration_ms: u64,
}
