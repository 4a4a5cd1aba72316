//! Resume analysis and the end-to-end entry points.
//!
//! [`ResumeAnalyzer`] owns the prompt → service → parse half of the
//! pipeline. The free functions chain it after a [`TextExtractor`]:
//!
//! | Function | Input | Output |
//! |----------|-------|--------|
//! | [`analyze_document`] | in-memory upload | [`AnalysisOutput`] |
//! | [`analyze_file`] | local path | [`AnalysisOutput`] |
//! | [`analyze_file_sync`] | local path, no runtime needed | [`AnalysisOutput`] |
//! | [`analyze_to_file`] | local path | JSON file on disk |
//! | [`extract_file`] | local path | [`ExtractedText`], no service call |
//!
//! Every request is independent: nothing is cached between calls, and the
//! same text sent twice reaches the service twice.

use crate::config::{AnalyzerConfig, ExtractorConfig};
use crate::document::{MediaType, UploadedDocument};
use crate::error::{AnalysisError, ResumeError, ServiceFailureKind};
use crate::output::{AnalysisOutput, AnalysisStats};
use crate::pipeline::extract::{ExtractedText, TextExtractor};
use crate::pipeline::llm::{resolve_service, CompletionService, GenerationOptions};
use crate::pipeline::{input, postprocess};
use crate::progress::{notify, AnalysisStage};
use crate::prompts::analysis_prompt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Sends resume text to a generative service and parses the answer.
pub struct ResumeAnalyzer {
    service: Arc<dyn CompletionService>,
    config: AnalyzerConfig,
}

impl ResumeAnalyzer {
    pub fn new(service: Arc<dyn CompletionService>, config: AnalyzerConfig) -> Self {
        Self { service, config }
    }

    /// Resolve the service from `config` (see [`resolve_service`]).
    pub fn from_config(config: AnalyzerConfig) -> Result<Self, AnalysisError> {
        let service = resolve_service(&config)?;
        Ok(Self::new(service, config))
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// The exact instruction sent for `resume_text`.
    pub fn prompt(&self, resume_text: &str) -> String {
        analysis_prompt(resume_text, self.config.prompt_profile)
    }

    /// Analyse extracted resume text.
    ///
    /// One service call, then cleanup and parsing with at most one
    /// quote-repair retry. The progress callback sees `CallingService`,
    /// `Parsing`, then `Succeeded` or `Failed`.
    ///
    /// # Errors
    /// * [`AnalysisError::ServiceFailure`] - the call failed or timed out
    /// * [`AnalysisError::ParseFailure`] - the answer is not a JSON object,
    ///   even after the repair pass
    pub async fn analyze(&self, resume_text: &str) -> Result<AnalysisOutput, AnalysisError> {
        let result = self.run(resume_text).await;
        let stage = if result.is_ok() {
            AnalysisStage::Succeeded
        } else {
            AnalysisStage::Failed
        };
        notify(&self.config.progress_callback, stage);
        result
    }

    async fn run(&self, resume_text: &str) -> Result<AnalysisOutput, AnalysisError> {
        let start = Instant::now();
        let cb = &self.config.progress_callback;

        // ── Step 1: Call the service ─────────────────────────────────────
        notify(cb, AnalysisStage::CallingService);
        let prompt = self.prompt(resume_text);
        let options = GenerationOptions::from_config(&self.config);
        info!(
            "Calling {} ({} chars of resume text)",
            self.service.describe(),
            resume_text.chars().count()
        );

        let timeout = Duration::from_secs(self.config.api_timeout_secs);
        let completion = tokio::time::timeout(timeout, self.service.complete(&prompt, &options))
            .await
            .map_err(|_| AnalysisError::ServiceFailure {
                kind: ServiceFailureKind::Timeout,
                detail: format!("no response within {}s", self.config.api_timeout_secs),
            })??;
        let service_duration_ms = start.elapsed().as_millis() as u64;
        debug!(
            "Service answered in {}ms: {} chars, {} in / {} out tokens",
            service_duration_ms,
            completion.text.chars().count(),
            completion.input_tokens,
            completion.output_tokens
        );

        // ── Step 2: Clean and parse ──────────────────────────────────────
        notify(cb, AnalysisStage::Parsing);
        let cleaned = postprocess::clean_response(&completion.text);
        let parsed = postprocess::parse_record(&cleaned, || {
            if let Some(cb) = cb {
                cb.on_repair_attempt();
            }
        })?;

        info!(
            "Analysis complete in {}ms{}",
            start.elapsed().as_millis(),
            if parsed.repaired { " (after quote repair)" } else { "" }
        );

        Ok(AnalysisOutput {
            record: parsed.record,
            raw_response: completion.text,
            cleaned_response: cleaned,
            repaired: parsed.repaired,
            extraction: None,
            stats: AnalysisStats {
                input_tokens: completion.input_tokens,
                output_tokens: completion.output_tokens,
                extract_duration_ms: 0,
                service_duration_ms,
                total_duration_ms: start.elapsed().as_millis() as u64,
            },
        })
    }
}

/// Extract and analyse with caller-supplied stages.
///
/// Useful when the extractor needs a custom OCR engine or the analyzer a
/// custom service; [`analyze_document`] builds both from configuration.
pub async fn analyze_with(
    extractor: &TextExtractor,
    analyzer: &ResumeAnalyzer,
    doc: &UploadedDocument,
) -> Result<AnalysisOutput, ResumeError> {
    let total_start = Instant::now();
    let cb = &analyzer.config().progress_callback;

    // ── Step 1: Extract text ─────────────────────────────────────────────
    notify(cb, AnalysisStage::Extracting);
    let extraction = match extractor.extract(doc).await {
        Ok(e) => e,
        Err(e) => {
            notify(cb, AnalysisStage::Failed);
            return Err(e.into());
        }
    };
    let extract_duration_ms = total_start.elapsed().as_millis() as u64;
    if let Some(cb) = cb {
        cb.on_extracted(extraction.char_count(), extraction.no_text_detected);
    }

    // ── Step 2: Analyse ──────────────────────────────────────────────────
    let mut output = analyzer.analyze(&extraction.text).await?;
    output.stats.extract_duration_ms = extract_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    output.extraction = Some(extraction);
    Ok(output)
}

/// Extract text from an upload and analyse it.
///
/// The service is resolved before extraction so a missing credential fails
/// before any OCR or PDF work is done.
pub async fn analyze_document(
    doc: &UploadedDocument,
    extractor_config: &ExtractorConfig,
    analyzer_config: &AnalyzerConfig,
) -> Result<AnalysisOutput, ResumeError> {
    let analyzer = match ResumeAnalyzer::from_config(analyzer_config.clone()) {
        Ok(a) => a,
        Err(e) => {
            notify(&analyzer_config.progress_callback, AnalysisStage::Failed);
            return Err(e.into());
        }
    };
    let extractor = TextExtractor::new(extractor_config.clone());
    analyze_with(&extractor, &analyzer, doc).await
}

/// Analyse a resume file on disk.
///
/// `media_type` overrides the guess from the file extension.
pub async fn analyze_file(
    path: impl AsRef<Path>,
    media_type: Option<MediaType>,
    extractor_config: &ExtractorConfig,
    analyzer_config: &AnalyzerConfig,
) -> Result<AnalysisOutput, ResumeError> {
    let path = path.as_ref();
    info!("Starting analysis: {}", path.display());
    let doc = input::load_document(path, media_type).await?;
    analyze_document(&doc, extractor_config, analyzer_config).await
}

/// Synchronous wrapper around [`analyze_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_file_sync(
    path: impl AsRef<Path>,
    media_type: Option<MediaType>,
    extractor_config: &ExtractorConfig,
    analyzer_config: &AnalyzerConfig,
) -> Result<AnalysisOutput, ResumeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ResumeError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze_file(path, media_type, extractor_config, analyzer_config))
}

/// Analyse a resume file and write the record as pretty JSON.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn analyze_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    media_type: Option<MediaType>,
    extractor_config: &ExtractorConfig,
    analyzer_config: &AnalyzerConfig,
) -> Result<AnalysisOutput, ResumeError> {
    let output = analyze_file(path, media_type, extractor_config, analyzer_config).await?;
    write_record_json(&output, output_path.as_ref()).await?;
    Ok(output)
}

/// Write `output.record` as pretty JSON to `path`, atomically.
pub async fn write_record_json(output: &AnalysisOutput, path: &Path) -> Result<(), ResumeError> {
    let json = output
        .record
        .to_json_pretty()
        .map_err(|e| ResumeError::Internal(format!("Failed to serialise record: {}", e)))?;
    let write_err = |e| ResumeError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Wrote {}", path.display());
    Ok(())
}

/// Extract text from a resume file without calling any service.
pub async fn extract_file(
    path: impl AsRef<Path>,
    media_type: Option<MediaType>,
    extractor_config: &ExtractorConfig,
) -> Result<ExtractedText, ResumeError> {
    let doc = input::load_document(path.as_ref(), media_type).await?;
    let extractor = TextExtractor::new(extractor_config.clone());
    Ok(extractor.extract(&doc).await?)
}
