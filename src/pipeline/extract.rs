//! Text extraction: raw document bytes → plain text, dispatched by media type.

use crate::config::ExtractorConfig;
use crate::document::{MediaType, UploadedDocument};
use crate::error::ExtractError;
use crate::pipeline::ocr::{self, OcrEngine};
use crate::pipeline::{docx, pdf};
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Plain text recovered from one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    pub media_type: MediaType,
    /// Page count, for PDFs only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
    /// OCR ran but recognised nothing. `text` is empty in that case.
    #[serde(default)]
    pub no_text_detected: bool,
}

impl ExtractedText {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Turns an [`UploadedDocument`] into text.
///
/// Holds no per-document state; one extractor can serve any number of
/// documents, one after another or concurrently.
pub struct TextExtractor {
    config: ExtractorConfig,
    ocr: Option<Arc<dyn OcrEngine>>,
}

impl TextExtractor {
    /// The OCR engine is built from `config` the first time an image needs it.
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config, ocr: None }
    }

    /// Use a specific OCR engine instead of the configured backend.
    pub fn with_ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(engine);
        self
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract the document's text.
    ///
    /// # Errors
    /// * [`ExtractError::DecodeError`] - bytes don't match the declared type
    /// * [`ExtractError::EmptyExtraction`] - a PDF, DOCX or text file with
    ///   nothing but whitespace
    /// * [`ExtractError::OcrFailed`] - the OCR engine could not run
    ///
    /// An image where OCR finds nothing is *not* an error: the result has
    /// `no_text_detected = true` and empty text.
    pub async fn extract(&self, doc: &UploadedDocument) -> Result<ExtractedText, ExtractError> {
        let media_type = doc.media_type();
        info!("Extracting text from {} document ({} bytes)", media_type, doc.len());

        let mut extracted = ExtractedText {
            text: String::new(),
            media_type,
            pages: None,
            no_text_detected: false,
        };

        match media_type {
            MediaType::Pdf => {
                let pdf = pdf::extract_text(doc.bytes(), &self.config).await?;
                extracted.text = pdf.text;
                extracted.pages = Some(pdf.pages);
            }
            MediaType::Docx => extracted.text = docx::extract_text(doc.bytes())?,
            MediaType::PlainText => extracted.text = decode_plain_text(doc.bytes())?.to_string(),
            MediaType::Jpeg => {
                let text = self.ocr_image(doc.bytes()).await?;
                if text.trim().is_empty() {
                    warn!("No text detected in the image; continuing with empty text");
                    extracted.no_text_detected = true;
                } else {
                    extracted.text = text;
                }
            }
        }

        if media_type != MediaType::Jpeg && extracted.text.trim().is_empty() {
            return Err(ExtractError::EmptyExtraction { format: media_type });
        }

        debug!("Extracted {} chars", extracted.char_count());
        Ok(extracted)
    }

    /// First embedded image of a PDF document; `None` for other formats.
    ///
    /// Reads the bytes independently of [`extract`](Self::extract).
    pub async fn find_first_image(
        &self,
        doc: &UploadedDocument,
    ) -> Result<Option<DynamicImage>, ExtractError> {
        if doc.media_type() != MediaType::Pdf {
            debug!("Image lookup skipped for {} document", doc.media_type());
            return Ok(None);
        }
        pdf::find_first_image(doc.bytes(), &self.config).await
    }

    async fn ocr_image(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg).map_err(|e| {
            ExtractError::DecodeError {
                format: MediaType::Jpeg,
                detail: e.to_string(),
            }
        })?;
        debug!("Decoded image {}x{} px", image.width(), image.height());

        let engine = match self.ocr {
            Some(ref engine) => Arc::clone(engine),
            None => ocr::engine_from_config(&self.config)?,
        };
        info!("Running OCR with {}", engine.name());
        engine.recognize(&image).await
    }
}

/// Strict UTF-8 decode with a leading byte-order mark removed.
pub fn decode_plain_text(bytes: &[u8]) -> Result<&str, ExtractError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ExtractError::DecodeError {
        format: MediaType::PlainText,
        detail: format!("not valid UTF-8: {e}"),
    })?;
    Ok(text.strip_prefix('\u{FEFF}').unwrap_or(text))
}
