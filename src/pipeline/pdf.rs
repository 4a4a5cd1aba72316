//! PDF access via pdfium: page text and the first embedded image.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and must not be driven from async worker threads. Every entry point
//! here moves the work onto the blocking pool and opens its own document
//! handle, so text extraction and image location never share a pass over the
//! bytes. The `PdfDocument` is dropped at the end of each closure, on the
//! success and the error path alike.

use crate::config::ExtractorConfig;
use crate::document::MediaType;
use crate::error::ExtractError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Text of a whole PDF plus its page count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfText {
    pub text: String,
    pub pages: usize,
}

/// Concatenate every page's text in page order.
///
/// Each page's text is terminated by one `\n`; a page without a text layer
/// contributes just the newline.
pub async fn extract_text(bytes: &[u8], config: &ExtractorConfig) -> Result<PdfText, ExtractError> {
    let bytes = bytes.to_vec();
    let library = config.pdfium_library.clone();
    let password = config.password.clone();

    tokio::task::spawn_blocking(move || {
        extract_text_blocking(&bytes, library.as_deref(), password.as_deref())
    })
    .await
    .map_err(|e| ExtractError::Internal(format!("PDF text task panicked: {}", e)))?
}

fn extract_text_blocking(
    bytes: &[u8],
    library: Option<&Path>,
    password: Option<&str>,
) -> Result<PdfText, ExtractError> {
    let pdfium = bind_pdfium(library)?;
    let document = load_document(&pdfium, bytes, password)?;

    let pages = document.pages();
    let total = pages.len() as usize;
    info!("PDF loaded: {} pages", total);

    let mut page_texts = Vec::with_capacity(total);
    for (idx, page) in pages.iter().enumerate() {
        let text = page.text().map_err(|e| ExtractError::DecodeError {
            format: MediaType::Pdf,
            detail: format!("page {}: {:?}", idx + 1, e),
        })?;
        let text = text.all();
        debug!("Page {} → {} chars", idx + 1, text.chars().count());
        page_texts.push(text);
    }

    Ok(PdfText {
        text: join_pages(&page_texts),
        pages: total,
    })
}

/// Join page texts, terminating each with a single newline.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let capacity = pages.iter().map(|p| p.as_ref().len() + 1).sum();
    let mut out = String::with_capacity(capacity);
    for page in pages {
        out.push_str(page.as_ref());
        out.push('\n');
    }
    out
}

/// Return the first embedded image of a PDF, if any.
///
/// Pages are scanned in order and, within a page, objects in the order
/// pdfium lists them. Form XObjects are descended into (up to
/// `MAX_FORM_DEPTH` levels) where they appear; other containers are not.
/// The first image object's raw pixels are returned; `None` when no page
/// carries an image.
pub async fn find_first_image(
    bytes: &[u8],
    config: &ExtractorConfig,
) -> Result<Option<DynamicImage>, ExtractError> {
    let bytes = bytes.to_vec();
    let library = config.pdfium_library.clone();
    let password = config.password.clone();

    tokio::task::spawn_blocking(move || {
        find_first_image_blocking(&bytes, library.as_deref(), password.as_deref())
    })
    .await
    .map_err(|e| ExtractError::Internal(format!("PDF image task panicked: {}", e)))?
}

fn find_first_image_blocking(
    bytes: &[u8],
    library: Option<&Path>,
    password: Option<&str>,
) -> Result<Option<DynamicImage>, ExtractError> {
    let pdfium = bind_pdfium(library)?;
    let document = load_document(&pdfium, bytes, password)?;

    for (idx, page) in document.pages().iter().enumerate() {
        for object in page.objects().iter() {
            if let Some(image) = image_in_object(&object, idx + 1, 0)? {
                info!(
                    "First image found on page {} ({}x{} px)",
                    idx + 1,
                    image.width(),
                    image.height()
                );
                return Ok(Some(image));
            }
        }
    }

    debug!("No embedded image found");
    Ok(None)
}

/// Form XObject nesting followed before giving up on a branch.
const MAX_FORM_DEPTH: usize = 8;

fn image_in_object(
    object: &PdfPageObject<'_>,
    page: usize,
    depth: usize,
) -> Result<Option<DynamicImage>, ExtractError> {
    if let Some(image_object) = object.as_image_object() {
        let image = image_object
            .get_raw_image()
            .map_err(|e| ExtractError::DecodeError {
                format: MediaType::Pdf,
                detail: format!("image on page {}: {:?}", page, e),
            })?;
        return Ok(Some(image));
    }

    if let Some(form) = object.as_x_object_form_object() {
        if depth >= MAX_FORM_DEPTH {
            debug!("Page {}: form nesting deeper than {}, skipped", page, MAX_FORM_DEPTH);
            return Ok(None);
        }
        for child in form.iter() {
            if let Some(image) = image_in_object(&child, page, depth + 1)? {
                return Ok(Some(image));
            }
        }
    }

    Ok(None)
}

/// Bind to libpdfium: an explicit file or directory, else the system library.
fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium, ExtractError> {
    let bindings = match library {
        Some(path) => {
            let file: PathBuf = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(path)
            } else {
                path.to_path_buf()
            };
            debug!("Binding pdfium from {}", file.display());
            Pdfium::bind_to_library(&file)
                .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{}: {}", file.display(), e)))?
        }
        None => Pdfium::bind_to_system_library()
            .map_err(|e| ExtractError::PdfiumBindingFailed(e.to_string()))?,
    };
    Ok(Pdfium::new(bindings))
}

fn load_document<'a>(
    pdfium: &'a Pdfium,
    bytes: &'a [u8],
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, ExtractError> {
    pdfium.load_pdf_from_byte_slice(bytes, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        let detail = if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                "incorrect password".to_string()
            } else {
                "document is encrypted; a password is required".to_string()
            }
        } else {
            err_str
        };
        ExtractError::DecodeError {
            format: MediaType::Pdf,
            detail,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_newline_terminated_in_order() {
        let joined = join_pages(&["Jane Doe", "Experience", "Education"]);
        assert_eq!(joined, "Jane Doe\nExperience\nEducation\n");
    }

    #[test]
    fn page_without_text_contributes_a_newline() {
        assert_eq!(join_pages(&["A", "", "C"]), "A\n\nC\n");
    }

    #[test]
    fn no_pages_is_empty() {
        let none: [&str; 0] = [];
        assert_eq!(join_pages(&none), "");
    }
}
