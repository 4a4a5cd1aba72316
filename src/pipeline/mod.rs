//! Pipeline stages for resume analysis.
//!
//! Each submodule implements one transformation step and is testable on its
//! own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ llm ──▶ postprocess
//! (path)    (pdf/docx/   (service) (cleanup + parse)
//!            text/ocr)
//! ```
//!
//! 1. [`input`] - read a local file and settle its media type
//! 2. [`extract`] - dispatch by media type to [`pdf`], [`docx`], UTF-8
//!    decoding or [`ocr`]; pdfium and tesseract run in `spawn_blocking`
//! 3. [`llm`] - the single generative service call; the only stage with
//!    network I/O (vision OCR aside)
//! 4. [`postprocess`] - strip fences and commentary, parse, repair once

pub mod docx;
pub mod extract;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod pdf;
pub mod postprocess;
