//! Uploaded documents and their declared media types.

use crate::error::ExtractError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

const MIME_PDF: &str = "application/pdf";
const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const MIME_MSWORD: &str = "application/msword";
const MIME_TEXT: &str = "text/plain";
const MIME_JPEG: &str = "image/jpeg";

/// The four document formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Pdf,
    /// Word documents. Legacy `application/msword` uploads land here too and
    /// fail to decode unless they are really OOXML.
    Docx,
    PlainText,
    Jpeg,
}

impl MediaType {
    /// Map a MIME string to a media type.
    ///
    /// Parameters such as `; charset=utf-8` are ignored.
    pub fn from_mime(mime: &str) -> Result<Self, ExtractError> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            MIME_PDF => Ok(MediaType::Pdf),
            MIME_DOCX | MIME_MSWORD => Ok(MediaType::Docx),
            MIME_TEXT => Ok(MediaType::PlainText),
            MIME_JPEG | "image/jpg" => Ok(MediaType::Jpeg),
            _ => Err(ExtractError::UnsupportedFormat {
                media_type: mime.to_string(),
            }),
        }
    }

    /// Map a file extension (without the dot) to a media type.
    pub fn from_extension(ext: &str) -> Result<Self, ExtractError> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Ok(MediaType::Pdf),
            "docx" | "doc" => Ok(MediaType::Docx),
            "txt" | "text" => Ok(MediaType::PlainText),
            "jpg" | "jpeg" => Ok(MediaType::Jpeg),
            _ => Err(ExtractError::UnsupportedFormat {
                media_type: format!(".{ext}"),
            }),
        }
    }

    /// Guess the media type from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ExtractError::UnsupportedFormat {
                media_type: path.display().to_string(),
            })?;
        Self::from_extension(ext)
    }

    /// Canonical MIME string.
    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Pdf => MIME_PDF,
            MediaType::Docx => MIME_DOCX,
            MediaType::PlainText => MIME_TEXT,
            MediaType::Jpeg => MIME_JPEG,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MediaType::Pdf => "PDF",
            MediaType::Docx => "DOCX",
            MediaType::PlainText => "plain-text",
            MediaType::Jpeg => "JPEG",
        };
        f.write_str(s)
    }
}

/// Raw bytes of an uploaded resume plus the media type it was declared as.
///
/// Fields are private so a document cannot change after it is received.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    bytes: Vec<u8>,
    media_type: MediaType,
}

impl UploadedDocument {
    pub fn new(bytes: impl Into<Vec<u8>>, media_type: MediaType) -> Self {
        Self {
            bytes: bytes.into(),
            media_type,
        }
    }

    /// Build a document from a MIME string, rejecting unsupported types.
    pub fn from_mime(bytes: impl Into<Vec<u8>>, mime: &str) -> Result<Self, ExtractError> {
        Ok(Self::new(bytes, MediaType::from_mime(mime)?))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
