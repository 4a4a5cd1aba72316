//! # resume2json
//!
//! Turn a resume (PDF, DOCX, plain text or a JPEG scan) into structured JSON
//! with a generative language model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Input    read a local file, settle the media type, sniff PDFs
//!  ├─ 2. Extract  pdfium page text / DOCX runs / UTF-8 / OCR (spawn_blocking)
//!  ├─ 3. Prompt   fixed instruction embedding the text verbatim
//!  ├─ 4. Service  one call to Gemini or any edgequake-llm provider
//!  ├─ 5. Parse    strip fences, parse, one single-quote repair pass
//!  └─ 6. Output   ResumeRecord + Markdown report + pretty JSON export
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resume2json::{analyze_file, AnalyzerConfig, ExtractorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let analyzer = AnalyzerConfig::builder()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!     let output = analyze_file("resume.pdf", None, &ExtractorConfig::default(), &analyzer).await?;
//!     println!("{}", output.record.to_json_pretty()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `resume2json` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! resume2json = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! | Input | Needs |
//! |-------|-------|
//! | PDF   | libpdfium (system library or `ExtractorConfig::pdfium_library`) |
//! | JPEG  | `tesseract` on PATH, or a vision model with `OcrBackend::Vision` |
//! | DOCX, TXT | nothing |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{
    analyze_document, analyze_file, analyze_file_sync, analyze_to_file, analyze_with,
    extract_file, ResumeAnalyzer,
};
pub use config::{
    AnalyzerConfig, AnalyzerConfigBuilder, ExtractorConfig, ExtractorConfigBuilder, OcrBackend,
    PromptProfile,
};
pub use document::{MediaType, UploadedDocument};
pub use error::{AnalysisError, ExtractError, ResumeError, ServiceFailureKind};
pub use output::{AnalysisOutput, AnalysisStats};
pub use pipeline::extract::{ExtractedText, TextExtractor};
pub use pipeline::llm::{Completion, CompletionService, GenerationOptions};
pub use pipeline::ocr::OcrEngine;
pub use progress::{AnalysisProgressCallback, AnalysisStage, NoopProgressCallback};
pub use record::{ContactInformation, Education, Project, ResumeRecord, WorkExperience};
pub use report::render_markdown;
