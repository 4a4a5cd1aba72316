//! Error types for the resume2json library.
//!
//! Failures are split by stage so callers can word them differently:
//!
//! * [`ExtractError`] - the document could not be turned into text
//!   (unsupported type, undecodable bytes, nothing to analyse).
//! * [`AnalysisError`] - the generative service could not be reached, or it
//!   answered with something that is not JSON even after the repair pass.
//! * [`ResumeError`] - fatal errors of the file-based entry points. Wraps the
//!   two stage errors and adds I/O and configuration failures.
//!
//! No variant carries a partial [`crate::record::ResumeRecord`]: an analysis
//! either produces a whole record or an error.

use crate::document::MediaType;
use std::path::PathBuf;
use thiserror::Error;

/// Text extraction failures.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The declared media type is not one of PDF, DOCX, plain text or JPEG.
    #[error("Unsupported file type '{media_type}'.\nSupported: PDF, DOCX, TXT, JPEG.")]
    UnsupportedFormat { media_type: String },

    /// The bytes could not be interpreted under the declared format.
    #[error("Could not read {format} document: {detail}")]
    DecodeError { format: MediaType, detail: String },

    /// Extraction worked but produced no usable text.
    #[error("No text could be extracted from the {format} document")]
    EmptyExtraction { format: MediaType },

    /// The OCR backend could not be run at all.
    #[error("OCR failed: {detail}")]
    OcrFailed { detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium (or pass --pdfium-lib) to use a specific copy,\n\
or install pdfium where the system loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    /// A blocking extraction task panicked or was cancelled.
    #[error("Internal extraction error: {0}")]
    Internal(String),
}

/// The broad reason a service call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceFailureKind {
    /// Connection refused, DNS failure, TLS error.
    Network,
    /// The call exceeded the configured timeout.
    Timeout,
    /// HTTP 401 / 403 or an invalid key message.
    Auth,
    /// HTTP 429 or an exhausted quota.
    Quota,
    /// Any other non-success answer from the API.
    Api,
}

impl std::fmt::Display for ServiceFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ServiceFailureKind::Network => "service unreachable",
            ServiceFailureKind::Timeout => "service timed out",
            ServiceFailureKind::Auth => "authentication rejected",
            ServiceFailureKind::Quota => "quota or rate limit exceeded",
            ServiceFailureKind::Api => "service error",
        };
        f.write_str(s)
    }
}

/// Failures of the resume analysis stage.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The generative service call itself failed.
    #[error("Generative service failed ({kind}): {detail}")]
    ServiceFailure {
        kind: ServiceFailureKind,
        detail: String,
    },

    /// No service could be built from the configuration.
    #[error("Generative service '{provider}' is not configured.\n{hint}")]
    ServiceNotConfigured { provider: String, hint: String },

    /// The response was not JSON, even after the quote-repair pass.
    ///
    /// `source` is the error of the *first* parse attempt; `cleaned` is the
    /// response text after fence stripping, kept for diagnostics.
    #[error("Malformed response from generative service: {source}\nResponse:\n{cleaned}")]
    ParseFailure {
        #[source]
        source: serde_json::Error,
        cleaned: String,
    },
}

impl AnalysisError {
    /// True for failures of the service call, false for malformed responses.
    pub fn is_service_failure(&self) -> bool {
        matches!(
            self,
            AnalysisError::ServiceFailure { .. } | AnalysisError::ServiceNotConfigured { .. }
        )
    }
}

/// Fatal errors returned by the top-level `analyze*` entry points.
#[derive(Debug, Error)]
pub enum ResumeError {
    /// Input file was not found at the given path.
    #[error("Resume file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Text extraction failed.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// The analysis stage failed.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_names_the_type() {
        let e = ExtractError::UnsupportedFormat {
            media_type: "image/gif".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("image/gif"), "got: {msg}");
        assert!(msg.contains("DOCX"));
    }

    #[test]
    fn service_failure_is_distinct_from_parse_failure() {
        let service = AnalysisError::ServiceFailure {
            kind: ServiceFailureKind::Network,
            detail: "connection refused".into(),
        };
        assert!(service.is_service_failure());
        assert!(service.to_string().contains("service unreachable"));

        let source = serde_json::from_str::<serde_json::Value>("nope").unwrap_err();
        let parse = AnalysisError::ParseFailure {
            source,
            cleaned: "nope".into(),
        };
        assert!(!parse.is_service_failure());
        assert!(parse.to_string().contains("Malformed response"));
        assert!(parse.to_string().contains("nope"));
    }

    #[test]
    fn stage_errors_convert_into_resume_error() {
        let e: ResumeError = ExtractError::EmptyExtraction {
            format: MediaType::Pdf,
        }
        .into();
        assert!(matches!(e, ResumeError::Extract(_)));
        assert!(e.to_string().contains("PDF"));
    }

    #[test]
    fn quota_display() {
        let e = AnalysisError::ServiceFailure {
            kind: ServiceFailureKind::Quota,
            detail: "HTTP 429".into(),
        };
        assert!(e.to_string().contains("quota"));
        assert!(e.to_string().contains("429"));
    }
}
