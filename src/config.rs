//! Configuration types for extraction and analysis.
//!
//! The two stages take separate configuration values at construction time:
//! [`ExtractorConfig`] for the [`crate::TextExtractor`] and [`AnalyzerConfig`]
//! for the [`crate::ResumeAnalyzer`]. Nothing is read from process-wide state
//! by the library except the provider auto-detection fallback documented on
//! [`crate::pipeline::llm::resolve_service`].
//!
//! Both are built via builders so callers set only what they care about.

use crate::error::ResumeError;
use crate::pipeline::llm::CompletionService;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default Gemini model used when no model is named.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

// ── Extraction ───────────────────────────────────────────────────────────

/// Configuration for the [`crate::TextExtractor`].
///
/// # Example
/// ```rust
/// use resume2json::{ExtractorConfig, OcrBackend};
///
/// let config = ExtractorConfig::builder()
///     .ocr_backend(OcrBackend::Tesseract)
///     .tesseract_lang("eng+deu")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractorConfig {
    /// Engine used for image uploads. Default: [`OcrBackend::Tesseract`].
    pub ocr_backend: OcrBackend,

    /// Tesseract language code(s), e.g. `eng` or `eng+fra`. Default: `eng`.
    pub tesseract_lang: String,

    /// Tesseract executable name or path. Default: `tesseract`.
    pub tesseract_binary: PathBuf,

    /// Explicit path to libpdfium. If None, the system library is used.
    pub pdfium_library: Option<PathBuf>,

    /// PDF user password for encrypted resumes.
    pub password: Option<String>,

    /// Vision provider name for [`OcrBackend::Vision`] (e.g. "openai").
    /// If None, the provider is auto-detected from the environment.
    pub vision_provider: Option<String>,

    /// Vision model for [`OcrBackend::Vision`]. Default: provider default.
    pub vision_model: Option<String>,

    /// Per-call timeout for vision OCR, in seconds. Default: 60.
    pub ocr_timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ocr_backend: OcrBackend::default(),
            tesseract_lang: "eng".to_string(),
            tesseract_binary: PathBuf::from("tesseract"),
            pdfium_library: None,
            password: None,
            vision_provider: None,
            vision_model: None,
            ocr_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("ocr_backend", &self.ocr_backend)
            .field("tesseract_lang", &self.tesseract_lang)
            .field("tesseract_binary", &self.tesseract_binary)
            .field("pdfium_library", &self.pdfium_library)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("vision_provider", &self.vision_provider)
            .field("vision_model", &self.vision_model)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .finish()
    }
}

impl ExtractorConfig {
    /// Create a new builder for `ExtractorConfig`.
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractorConfig`].
#[derive(Debug)]
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl ExtractorConfigBuilder {
    pub fn ocr_backend(mut self, backend: OcrBackend) -> Self {
        self.config.ocr_backend = backend;
        self
    }

    pub fn tesseract_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.tesseract_lang = lang.into();
        self
    }

    pub fn tesseract_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_binary = path.into();
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn vision_provider(mut self, name: impl Into<String>) -> Self {
        self.config.vision_provider = Some(name.into());
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.config.vision_model = Some(model.into());
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractorConfig, ResumeError> {
        let c = &self.config;
        if c.tesseract_lang.trim().is_empty() {
            return Err(ResumeError::InvalidConfig(
                "Tesseract language must not be empty".into(),
            ));
        }
        if c.ocr_timeout_secs == 0 {
            return Err(ResumeError::InvalidConfig(
                "OCR timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Analysis ─────────────────────────────────────────────────────────────

/// Configuration for the [`crate::ResumeAnalyzer`].
///
/// # Example
/// ```rust
/// use resume2json::{AnalyzerConfig, PromptProfile};
///
/// let config = AnalyzerConfig::builder()
///     .api_key("AIza-test")
///     .model("gemini-1.5-flash")
///     .prompt_profile(PromptProfile::Extended)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// Model identifier. If None, [`DEFAULT_MODEL`] for Gemini and
    /// `gpt-4.1-nano` for any other named provider.
    pub model: Option<String>,

    /// edgequake-llm provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed service. Takes precedence over everything else.
    pub service: Option<Arc<dyn CompletionService>>,

    /// Pre-resolved Gemini API key. Used when no `service` is supplied and
    /// no `provider_name` is set.
    pub api_key: Option<String>,

    /// Gemini REST endpoint base. Default: the public v1beta endpoint.
    pub api_base: String,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    pub max_tokens: usize,

    /// Timeout for the single service call, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Which fields the prompt asks for. Default: [`PromptProfile::Standard`].
    pub prompt_profile: PromptProfile,

    /// Stage events for progress displays.
    pub progress_callback: Option<ProgressCallback>,
}

/// Public Gemini REST endpoint.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            service: None,
            api_key: None,
            api_base: GEMINI_API_BASE.to_string(),
            temperature: 0.2,
            max_tokens: 4096,
            api_timeout_secs: 60,
            prompt_profile: PromptProfile::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("service", &self.service.as_ref().map(|_| "<dyn CompletionService>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("prompt_profile", &self.prompt_profile)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn AnalysisProgressCallback>"),
            )
            .finish()
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn service(mut self, service: Arc<dyn CompletionService>) -> Self {
        self.config.service = Some(service);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn prompt_profile(mut self, profile: PromptProfile) -> Self {
        self.config.prompt_profile = profile;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzerConfig, ResumeError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(ResumeError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ResumeError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if matches!(c.api_key.as_deref(), Some(k) if k.trim().is_empty()) {
            return Err(ResumeError::InvalidConfig("API key is empty".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How text is recognised in image uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OcrBackend {
    /// Local `tesseract` executable. (default)
    #[default]
    Tesseract,
    /// A vision-capable LLM transcribes the image.
    Vision,
}

/// Which output fields the analysis prompt requests.
///
/// | Profile | Fields |
/// |---------|--------|
/// | Standard | name, contact (email/phone/linkedin), summary, work experience, education, skills, overall summary, suitability score |
/// | Extended | Standard + github/portfolio/address, locations, education details, projects, custom sections |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PromptProfile {
    /// The eight core fields. (default)
    #[default]
    Standard,
    /// Core fields plus projects, extra contact links and custom sections.
    Extended,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyzer_defaults() {
        let c = AnalyzerConfig::default();
        assert_eq!(c.temperature, 0.2);
        assert_eq!(c.max_tokens, 4096);
        assert_eq!(c.api_timeout_secs, 60);
        assert_eq!(c.prompt_profile, PromptProfile::Standard);
        assert!(c.service.is_none());
    }

    #[test]
    fn temperature_is_clamped() {
        let c = AnalyzerConfig::builder().temperature(7.5).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = AnalyzerConfig::builder().api_timeout_secs(0).build().unwrap_err();
        assert!(matches!(err, ResumeError::InvalidConfig(_)));
    }

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(AnalyzerConfig::builder().api_key("  ").build().is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let c = AnalyzerConfig::builder().api_key("AIza-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("AIza-secret"));
        assert!(dbg.contains("<redacted>"));

        let e = ExtractorConfig::builder().password("hunter2").build().unwrap();
        assert!(!format!("{e:?}").contains("hunter2"));
    }

    #[test]
    fn extractor_rejects_empty_lang() {
        assert!(ExtractorConfig::builder().tesseract_lang("").build().is_err());
    }
}
