//! DOCX text extraction: zip container → `word/document.xml` → text runs.
//!
//! Only the main document part is read. Formatting is discarded; paragraph
//! ends become `\n`, `<w:tab/>` becomes `\t`, `<w:br/>` and `<w:cr/>`
//! become `\n`. Headers, footers and text boxes are not included.

use crate::document::MediaType;
use crate::error::ExtractError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use tracing::debug;

const DOCUMENT_PART: &str = "word/document.xml";

/// Upper bound on the decompressed main document part.
const MAX_DOCUMENT_XML_BYTES: u64 = 32 * 1024 * 1024;

/// Extract the body text of a DOCX file held in memory.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let xml = read_document_part(bytes)?;
    let text = document_xml_to_text(&xml)?;
    debug!("DOCX: {} bytes of XML → {} chars", xml.len(), text.chars().count());
    Ok(text)
}

fn read_document_part(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| decode_error(format!("not a zip container: {e}")))?;

    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| decode_error(format!("missing {DOCUMENT_PART}: {e}")))?;

    let declared = part.size();
    read_bounded(&mut part, declared, MAX_DOCUMENT_XML_BYTES)
}

/// Read at most `limit` bytes of UTF-8. The entry's declared size only
/// seeds the buffer; it comes from the upload and is not trusted.
fn read_bounded(reader: impl Read, declared: u64, limit: u64) -> Result<String, ExtractError> {
    let mut xml = String::with_capacity(declared.min(limit) as usize);
    reader
        .take(limit + 1)
        .read_to_string(&mut xml)
        .map_err(|e| decode_error(format!("unreadable {DOCUMENT_PART}: {e}")))?;
    if xml.len() as u64 > limit {
        return Err(decode_error(format!(
            "{DOCUMENT_PART} is larger than {limit} bytes"
        )));
    }
    Ok(xml)
}

/// Walk WordprocessingML and collect the text of every `<w:t>` run.
pub(crate) fn document_xml_to_text(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:t" => in_text = true,
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| decode_error(format!("bad text run: {e}")))?;
                out.push_str(&text);
            }
            Ok(Event::CData(t)) if in_text => {
                out.push_str(&String::from_utf8_lossy(&t));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(decode_error(format!(
                    "malformed XML at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
    }

    Ok(out)
}

fn decode_error(detail: String) -> ExtractError {
    ExtractError::DecodeError {
        format: MediaType::Docx,
        detail,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// Build a minimal DOCX archive whose body is `body_xml`.
    pub(crate) fn docx_with_body(body_xml: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body_xml}</w:body></w:document>"#
        );
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let opts = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            zip.start_file("[Content_Types].xml", opts).unwrap();
            zip.write_all(b"<Types/>").unwrap();
            zip.start_file(DOCUMENT_PART, opts).unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn paragraphs_and_runs() {
        let bytes = docx_with_body(
            "<w:p><w:r><w:t>Jane</w:t></w:r><w:r><w:t xml:space=\"preserve\"> Doe</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Email: jane@x.com</w:t></w:r></w:p>",
        );
        assert_eq!(extract_text(&bytes).unwrap(), "Jane Doe\nEmail: jane@x.com\n");
    }

    #[test]
    fn tabs_breaks_and_entities() {
        let text = document_xml_to_text(
            "<w:p><w:r><w:t>Go</w:t><w:tab/><w:t>SQL &amp; Rust</w:t><w:br/><w:t>AWS</w:t></w:r></w:p>",
        )
        .unwrap();
        assert_eq!(text, "Go\tSQL & Rust\nAWS\n");
    }

    #[test]
    fn text_outside_runs_is_ignored() {
        let text = document_xml_to_text(
            "<w:p><w:pPr><w:pStyle w:val=\"Heading1\"/></w:pPr><w:r><w:t>Skills</w:t></w:r></w:p>",
        )
        .unwrap();
        assert_eq!(text, "Skills\n");
    }

    /// Rewrite the central directory entry of a single-file zip64 archive
    /// so it declares an uncompressed size of `u64::MAX - 1`.
    fn declare_huge_size(mut zip: Vec<u8>) -> Vec<u8> {
        const CENTRAL_HEADER: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
        let cd = zip
            .windows(4)
            .position(|w| w == CENTRAL_HEADER)
            .expect("central directory header");
        let name_len = u16::from_le_bytes([zip[cd + 28], zip[cd + 29]]) as usize;
        let extra_len = u16::from_le_bytes([zip[cd + 30], zip[cd + 31]]) as usize;
        zip[cd + 24..cd + 28].copy_from_slice(&u32::MAX.to_le_bytes());

        let mut at = cd + 46 + name_len;
        let end = at + extra_len;
        while at + 4 <= end {
            let id = u16::from_le_bytes([zip[at], zip[at + 1]]);
            let len = u16::from_le_bytes([zip[at + 2], zip[at + 3]]) as usize;
            if id == 0x0001 {
                zip[at + 4..at + 12].copy_from_slice(&(u64::MAX - 1).to_le_bytes());
                return zip;
            }
            at += 4 + len;
        }
        panic!("archive has no zip64 extra field");
    }

    #[test]
    fn declared_size_is_not_trusted() {
        let xml = r#"<w:document xmlns:w="x"><w:body><w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p></w:body></w:document>"#;
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let opts = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored)
                .large_file(true);
            zip.start_file(DOCUMENT_PART, opts).unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        let bytes = declare_huge_size(buf.into_inner());

        // Must return instead of aborting on the allocation.
        match extract_text(&bytes) {
            Ok(text) => assert_eq!(text, "Jane Doe\n"),
            Err(e) => assert!(
                matches!(e, ExtractError::DecodeError { format: MediaType::Docx, .. }),
                "unexpected error: {e:?}"
            ),
        }
    }

    #[test]
    fn oversized_part_is_a_decode_error() {
        let err = read_bounded(std::io::repeat(b'a').take(100), u64::MAX, 64).unwrap_err();
        assert!(err.to_string().contains("larger than 64 bytes"));

        let ok = read_bounded(Cursor::new(b"<w:t>ok</w:t>".to_vec()), u64::MAX, 64).unwrap();
        assert_eq!(ok, "<w:t>ok</w:t>");
    }

    #[test]
    fn non_zip_is_a_decode_error() {
        let err = extract_text(b"plain bytes, not a zip").unwrap_err();
        assert!(matches!(
            err,
            ExtractError::DecodeError {
                format: MediaType::Docx,
                ..
            }
        ));
    }

    #[test]
    fn archive_without_document_part_is_a_decode_error() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            zip.start_file("readme.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"hello").unwrap();
            zip.finish().unwrap();
        }
        let err = extract_text(&buf.into_inner()).unwrap_err();
        assert!(err.to_string().contains("word/document.xml"));
    }
}
