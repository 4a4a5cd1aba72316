//! Input resolution: read a local resume file into an [`UploadedDocument`].
//!
//! The media type comes from an explicit override or the file extension.
//! PDFs are sniffed for the `%PDF` magic bytes before returning so callers
//! get a meaningful error rather than a pdfium load failure.

use crate::document::{MediaType, UploadedDocument};
use crate::error::{ExtractError, ResumeError};
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Read `path` and declare it as `media_type`, or guess from the extension.
pub async fn load_document(
    path: &Path,
    media_type: Option<MediaType>,
) -> Result<UploadedDocument, ResumeError> {
    let media_type = match media_type {
        Some(m) => m,
        None => MediaType::from_path(path)?,
    };

    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => ResumeError::FileNotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => ResumeError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ResumeError::Internal(format!("Failed to read '{}': {}", path.display(), e)),
    })?;

    if media_type == MediaType::Pdf {
        check_pdf_magic(&bytes)?;
    }

    debug!(
        "Loaded {} ({} bytes) as {}",
        path.display(),
        bytes.len(),
        media_type
    );
    Ok(UploadedDocument::new(bytes, media_type))
}

/// Reject bytes that do not start with `%PDF`.
pub fn check_pdf_magic(bytes: &[u8]) -> Result<(), ExtractError> {
    if bytes.starts_with(PDF_MAGIC) {
        return Ok(());
    }
    let head = &bytes[..bytes.len().min(4)];
    Err(ExtractError::DecodeError {
        format: MediaType::Pdf,
        detail: format!("missing %PDF header (starts with {:02x?})", head),
    })
}
