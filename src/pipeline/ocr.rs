//! OCR for image uploads.
//!
//! Two engines implement [`OcrEngine`]:
//!
//! * [`TesseractOcr`] - runs the local `tesseract` executable on a PNG
//!   written to a temp file. Blocking; moved to `spawn_blocking`.
//! * [`VisionOcr`] - sends the image to a vision-capable model through
//!   edgequake-llm and asks for a plain transcription.
//!
//! An engine returning empty text is not an error here; the extractor turns
//! that into the "no text detected" advisory.

use crate::config::{ExtractorConfig, OcrBackend};
use crate::error::ExtractError;
use crate::pipeline::llm;
use crate::prompts::OCR_SYSTEM_PROMPT;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use image::DynamicImage;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default vision model when a provider is named without a model.
pub const DEFAULT_VISION_MODEL: &str = "gpt-4.1-nano";

/// Recognises text in a decoded image.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &DynamicImage) -> Result<String, ExtractError>;

    /// Engine name for logs.
    fn name(&self) -> &str;
}

/// Build the engine selected in `config`.
pub fn engine_from_config(config: &ExtractorConfig) -> Result<Arc<dyn OcrEngine>, ExtractError> {
    match config.ocr_backend {
        OcrBackend::Tesseract => Ok(Arc::new(TesseractOcr::from_config(config))),
        OcrBackend::Vision => Ok(Arc::new(VisionOcr::from_config(config)?)),
    }
}

/// Encode an image as PNG bytes.
///
/// PNG is lossless; JPEG artefacts on small print hurt recognition.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Wrap an image as base64 PNG for a multimodal request body.
pub fn encode_image_data(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let b64 = STANDARD.encode(encode_png(img)?);
    debug!("Encoded image → {} bytes base64", b64.len());
    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

// ── Tesseract ────────────────────────────────────────────────────────────

/// Local tesseract subprocess.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    lang: String,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<PathBuf>, lang: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            lang: lang.into(),
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(config.tesseract_binary.clone(), config.tesseract_lang.clone())
    }

    /// True when the configured binary answers `--version`.
    pub fn is_available(&self) -> bool {
        std::process::Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &DynamicImage) -> Result<String, ExtractError> {
        let png = encode_png(image).map_err(|e| ExtractError::OcrFailed {
            detail: format!("could not re-encode image: {e}"),
        })?;
        let binary = self.binary.clone();
        let lang = self.lang.clone();

        tokio::task::spawn_blocking(move || run_tesseract(&binary, &lang, &png))
            .await
            .map_err(|e| ExtractError::Internal(format!("OCR task panicked: {}", e)))?
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

fn run_tesseract(binary: &std::path::Path, lang: &str, png: &[u8]) -> Result<String, ExtractError> {
    let mut file = tempfile::Builder::new()
        .prefix("resume2json-ocr-")
        .suffix(".png")
        .tempfile()
        .map_err(|e| ExtractError::OcrFailed {
            detail: format!("temp file: {e}"),
        })?;
    file.write_all(png)
        .and_then(|_| file.flush())
        .map_err(|e| ExtractError::OcrFailed {
            detail: format!("temp file: {e}"),
        })?;

    info!("Running {} (lang={})", binary.display(), lang);
    let output = std::process::Command::new(binary)
        .arg(file.path())
        .arg("stdout")
        .arg("-l")
        .arg(lang)
        .output()
        .map_err(|e| {
            let detail = if e.kind() == std::io::ErrorKind::NotFound {
                format!(
                    "'{}' not found. Install tesseract-ocr or pass --tesseract-bin",
                    binary.display()
                )
            } else {
                format!("failed to run '{}': {e}", binary.display())
            };
            ExtractError::OcrFailed { detail }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractError::OcrFailed {
            detail: format!("tesseract exited with {}: {}", output.status, stderr.trim()),
        });
    }

    let text = String::from_utf8_lossy(&output.stdout).into_owned();
    debug!("tesseract → {} chars", text.chars().count());
    Ok(text)
}

// ── Vision model ─────────────────────────────────────────────────────────

/// Transcription by a vision-capable LLM.
pub struct VisionOcr {
    provider: Arc<dyn LLMProvider>,
    timeout: Duration,
}

impl VisionOcr {
    pub fn new(provider: Arc<dyn LLMProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Named provider from `config.vision_provider`, else auto-detected.
    pub fn from_config(config: &ExtractorConfig) -> Result<Self, ExtractError> {
        let provider = match config.vision_provider {
            Some(ref name) => {
                let model = config.vision_model.as_deref().unwrap_or(DEFAULT_VISION_MODEL);
                llm::create_provider(name, model)
            }
            None => llm::provider_from_env(),
        }
        .map_err(|e| ExtractError::OcrFailed {
            detail: e.to_string(),
        })?;
        Ok(Self::new(provider, Duration::from_secs(config.ocr_timeout_secs)))
    }
}

#[async_trait]
impl OcrEngine for VisionOcr {
    async fn recognize(&self, image: &DynamicImage) -> Result<String, ExtractError> {
        let image_data = encode_image_data(image).map_err(|e| ExtractError::OcrFailed {
            detail: format!("could not encode image: {e}"),
        })?;

        let messages = vec![
            ChatMessage::system(OCR_SYSTEM_PROMPT),
            ChatMessage::user_with_images("", vec![image_data]),
        ];
        let options = CompletionOptions {
            temperature: Some(0.0),
            ..Default::default()
        };

        let response = tokio::time::timeout(self.timeout, self.provider.chat(&messages, Some(&options)))
            .await
            .map_err(|_| ExtractError::OcrFailed {
                detail: format!("vision OCR timed out after {:?}", self.timeout),
            })?
            .map_err(|e| ExtractError::OcrFailed {
                detail: format!("vision OCR failed: {e}"),
            })?;

        if response.content.trim().is_empty() {
            warn!("Vision model returned no text");
        }
        debug!(
            "Vision OCR: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }

    fn name(&self) -> &str {
        "vision"
    }
}
