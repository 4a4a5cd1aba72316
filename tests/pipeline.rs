//! Integration tests for the extraction → analysis pipeline.
//!
//! The generative service and the OCR engine are replaced by in-process
//! stubs, so these tests need no network, no pdfium and no tesseract.

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use resume2json::{
    analyze_document, analyze_file, analyze_file_sync, analyze_to_file, analyze_with,
    extract_file, render_markdown, AnalysisError, AnalysisProgressCallback, AnalysisStage,
    AnalyzerConfig, Completion, CompletionService, ExtractError, ExtractorConfig,
    GenerationOptions, MediaType, OcrEngine, ResumeAnalyzer, ResumeError, ResumeRecord,
    ServiceFailureKind, TextExtractor, UploadedDocument,
};
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

const JANE_TEXT: &str = "Jane Doe\nEmail: jane@x.com\nSkills: Go, SQL\n";

const JANE_JSON: &str = r#"{"name":"Jane Doe","contact_information":{"email":"jane@x.com"},"skills":["Go","SQL"],"suitability_score":75}"#;

/// Canned service that records every prompt it receives.
struct StubService {
    reply: Result<String, ServiceFailureKind>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubService {
    fn replying(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.into()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing(kind: ServiceFailureKind) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(kind),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CompletionService for StubService {
    async fn complete(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Completion, AnalysisError> {
        assert!(options.json_mode, "analysis must request JSON output");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.reply {
            Ok(ref text) => Ok(Completion {
                text: text.clone(),
                input_tokens: 100,
                output_tokens: 50,
            }),
            Err(kind) => Err(AnalysisError::ServiceFailure {
                kind,
                detail: "stubbed failure".into(),
            }),
        }
    }

    fn describe(&self) -> String {
        "stub".into()
    }
}

/// OCR engine that returns a fixed string.
struct StubOcr(&'static str);

#[async_trait]
impl OcrEngine for StubOcr {
    async fn recognize(&self, _image: &DynamicImage) -> Result<String, ExtractError> {
        Ok(self.0.to_string())
    }

    fn name(&self) -> &str {
        "stub-ocr"
    }
}

/// Records stage transitions and callback events.
#[derive(Default)]
struct Recorder {
    stages: Mutex<Vec<AnalysisStage>>,
    repairs: AtomicUsize,
    extracted: Mutex<Option<(usize, bool)>>,
    completed: Mutex<Option<bool>>,
}

impl AnalysisProgressCallback for Recorder {
    fn on_stage(&self, stage: AnalysisStage) {
        self.stages.lock().unwrap().push(stage);
    }

    fn on_extracted(&self, chars: usize, no_text_detected: bool) {
        *self.extracted.lock().unwrap() = Some((chars, no_text_detected));
    }

    fn on_repair_attempt(&self) {
        self.repairs.fetch_add(1, Ordering::SeqCst);
    }

    fn on_complete(&self, success: bool) {
        *self.completed.lock().unwrap() = Some(success);
    }
}

fn analyzer_config(service: Arc<StubService>) -> AnalyzerConfig {
    AnalyzerConfig::builder()
        .service(service)
        .build()
        .expect("valid config")
}

fn text_doc(text: &str) -> UploadedDocument {
    UploadedDocument::new(text, MediaType::PlainText)
}

fn jpeg_bytes() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([250, 250, 250])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .expect("encode jpeg");
    buf
}

fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf.into_inner()
}

fn temp_file(suffix: &str, bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    f.write_all(bytes).unwrap();
    f
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn jane_doe_text_resume() {
    let service = StubService::replying(format!("```json\n{JANE_JSON}\n```"));
    let config = analyzer_config(service.clone());

    let out = analyze_document(&text_doc(JANE_TEXT), &ExtractorConfig::default(), &config)
        .await
        .expect("analysis should succeed");

    let r = &out.record;
    assert_eq!(r.name.as_deref(), Some("Jane Doe"));
    let contact = r.contact_information.as_ref().expect("contact present");
    assert_eq!(contact.email.as_deref(), Some("jane@x.com"));
    assert!(contact.phone.is_none());
    assert_eq!(r.skills.as_deref(), Some(&["Go".to_string(), "SQL".to_string()][..]));
    assert_eq!(r.suitability_score, Some(75));
    assert!(!out.repaired);

    let extraction = out.extraction.as_ref().expect("extraction recorded");
    assert_eq!(extraction.text, JANE_TEXT);
    assert_eq!(out.stats.input_tokens, 100);
    assert_eq!(out.stats.output_tokens, 50);

    // The resume text is embedded verbatim in the single prompt.
    assert_eq!(service.calls(), 1);
    let prompt = service.last_prompt();
    assert!(prompt.contains(JANE_TEXT));
    assert!(prompt.trim_end().ends_with("Respond only with a valid JSON object."));

    // Fields the model left out render as N/A.
    let md = render_markdown(r);
    assert!(md.starts_with("# Jane Doe\n"));
    assert!(md.contains("- Email: jane@x.com"));
    assert!(md.contains("- Phone: N/A"));
    assert!(md.contains("## Summary\n\nN/A"));
}

#[tokio::test]
async fn fenced_and_plain_responses_give_the_same_record() {
    let plain = StubService::replying(JANE_JSON);
    let fenced = StubService::replying(format!("```json\n{JANE_JSON}\n```"));

    let a = ResumeAnalyzer::new(plain, AnalyzerConfig::default())
        .analyze(JANE_TEXT)
        .await
        .unwrap();
    let b = ResumeAnalyzer::new(fenced, AnalyzerConfig::default())
        .analyze(JANE_TEXT)
        .await
        .unwrap();

    assert_eq!(a.record, b.record);
}

#[tokio::test]
async fn single_quoted_response_is_repaired_once() {
    let single = r#"{'name': 'Jane Doe', 'skills': ['Go', 'SQL'], 'suitability_score': 60}"#;
    let recorder = Arc::new(Recorder::default());
    let config = AnalyzerConfig::builder()
        .service(StubService::replying(single))
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let out = analyze_document(&text_doc(JANE_TEXT), &ExtractorConfig::default(), &config)
        .await
        .unwrap();

    assert!(out.repaired);
    assert_eq!(out.record.name.as_deref(), Some("Jane Doe"));
    assert_eq!(out.record.suitability_score, Some(60));
    assert_eq!(recorder.repairs.load(Ordering::SeqCst), 1);
    assert_eq!(
        *recorder.stages.lock().unwrap(),
        vec![
            AnalysisStage::Extracting,
            AnalysisStage::CallingService,
            AnalysisStage::Parsing,
            AnalysisStage::Succeeded,
        ]
    );
    assert_eq!(*recorder.completed.lock().unwrap(), Some(true));
}

#[tokio::test]
async fn non_json_response_is_a_parse_failure() {
    let recorder = Arc::new(Recorder::default());
    let config = AnalyzerConfig::builder()
        .service(StubService::replying("Sorry, I cannot help with that."))
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let err = analyze_document(&text_doc(JANE_TEXT), &ExtractorConfig::default(), &config)
        .await
        .unwrap_err();

    match err {
        ResumeError::Analysis(AnalysisError::ParseFailure { cleaned, .. }) => {
            assert_eq!(cleaned, "Sorry, I cannot help with that.");
        }
        other => panic!("expected ParseFailure, got {other:?}"),
    }
    assert_eq!(recorder.repairs.load(Ordering::SeqCst), 1);
    assert_eq!(
        recorder.stages.lock().unwrap().last(),
        Some(&AnalysisStage::Failed)
    );
    assert_eq!(*recorder.completed.lock().unwrap(), Some(false));
}

#[tokio::test]
async fn service_failure_is_distinct_from_parse_failure() {
    let service = StubService::failing(ServiceFailureKind::Network);
    let err = analyze_document(
        &text_doc(JANE_TEXT),
        &ExtractorConfig::default(),
        &analyzer_config(service.clone()),
    )
    .await
    .unwrap_err();

    match err {
        ResumeError::Analysis(ref e) => {
            assert!(e.is_service_failure());
            assert!(matches!(
                e,
                AnalysisError::ServiceFailure {
                    kind: ServiceFailureKind::Network,
                    ..
                }
            ));
        }
        ref other => panic!("expected a service failure, got {other:?}"),
    }
    assert_eq!(service.calls(), 1, "no retry on service failure");
}

#[tokio::test]
async fn no_caching_between_requests() {
    let service = StubService::replying(JANE_JSON);
    let config = analyzer_config(service.clone());
    let doc = text_doc(JANE_TEXT);

    analyze_document(&doc, &ExtractorConfig::default(), &config).await.unwrap();
    analyze_document(&doc, &ExtractorConfig::default(), &config).await.unwrap();

    assert_eq!(service.calls(), 2);
}

#[test]
fn unsupported_types_are_rejected() {
    let err = UploadedDocument::from_mime(b"GIF89a".to_vec(), "image/gif").unwrap_err();
    assert!(matches!(err, ExtractError::UnsupportedFormat { .. }));
    assert!(err.to_string().contains("image/gif"));

    assert!(MediaType::from_extension("png").is_err());
    assert_eq!(
        MediaType::from_mime("application/msword").unwrap(),
        MediaType::Docx
    );
}

#[tokio::test]
async fn empty_text_never_reaches_the_service() {
    let service = StubService::replying(JANE_JSON);
    let err = analyze_document(
        &text_doc("   \n  "),
        &ExtractorConfig::default(),
        &analyzer_config(service.clone()),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        ResumeError::Extract(ExtractError::EmptyExtraction {
            format: MediaType::PlainText
        })
    ));
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn blank_image_still_reaches_the_analyzer() {
    let service = StubService::replying("{}");
    let recorder = Arc::new(Recorder::default());
    let config = AnalyzerConfig::builder()
        .service(service.clone())
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    let extractor =
        TextExtractor::new(ExtractorConfig::default()).with_ocr_engine(Arc::new(StubOcr("\n  \n")));
    let analyzer = ResumeAnalyzer::new(service.clone(), config);
    let doc = UploadedDocument::new(jpeg_bytes(), MediaType::Jpeg);

    let out = analyze_with(&extractor, &analyzer, &doc)
        .await
        .expect("empty OCR is advisory, not fatal");

    assert!(out.record.is_empty());
    let extraction = out.extraction.unwrap();
    assert!(extraction.no_text_detected);
    assert_eq!(extraction.text, "");
    assert_eq!(*recorder.extracted.lock().unwrap(), Some((0, true)));
    assert_eq!(service.calls(), 1);
    assert!(service.last_prompt().contains("Resume:\n\n"));
}

#[tokio::test]
async fn scanned_resume_text_flows_through_ocr() {
    let service = StubService::replying(JANE_JSON);
    let extractor = TextExtractor::new(ExtractorConfig::default())
        .with_ocr_engine(Arc::new(StubOcr("Jane Doe\njane@x.com")));
    let analyzer = ResumeAnalyzer::new(service.clone(), AnalyzerConfig::default());
    let doc = UploadedDocument::from_mime(jpeg_bytes(), "image/jpeg").unwrap();

    let out = analyze_with(&extractor, &analyzer, &doc).await.unwrap();
    assert_eq!(out.record.name.as_deref(), Some("Jane Doe"));
    assert!(service.last_prompt().contains("Jane Doe\njane@x.com"));
}

#[tokio::test]
async fn docx_file_end_to_end() {
    let file = temp_file(".docx", &docx_bytes(&["Jane Doe", "Email: jane@x.com"]));
    let service = StubService::replying(JANE_JSON);

    let out = analyze_file(
        file.path(),
        None,
        &ExtractorConfig::default(),
        &analyzer_config(service.clone()),
    )
    .await
    .unwrap();

    assert_eq!(out.extraction.unwrap().text, "Jane Doe\nEmail: jane@x.com\n");
    assert!(service.last_prompt().contains("Jane Doe\nEmail: jane@x.com\n"));
}

#[tokio::test]
async fn json_export_round_trips() {
    let input = temp_file(".txt", JANE_TEXT.as_bytes());
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("jane.json");

    let out = analyze_to_file(
        input.path(),
        &out_path,
        None,
        &ExtractorConfig::default(),
        &analyzer_config(StubService::replying(JANE_JSON)),
    )
    .await
    .unwrap();

    let written = std::fs::read_to_string(&out_path).unwrap();
    assert!(written.starts_with("{\n  \"name\": \"Jane Doe\""));
    assert!(!written.contains("null"), "absent fields are omitted");

    let back: ResumeRecord = serde_json::from_str(&written).unwrap();
    assert_eq!(back, out.record);
}

#[tokio::test]
async fn extract_file_needs_no_service() {
    let input = temp_file(".txt", "\u{FEFF}Jane Doe\n".as_bytes());
    let extracted = extract_file(input.path(), None, &ExtractorConfig::default())
        .await
        .unwrap();
    assert_eq!(extracted.text, "Jane Doe\n");
    assert_eq!(extracted.media_type, MediaType::PlainText);
}

#[test]
fn sync_wrapper_runs_without_a_runtime() {
    let input = temp_file(".txt", JANE_TEXT.as_bytes());
    let out = analyze_file_sync(
        input.path(),
        Some(MediaType::PlainText),
        &ExtractorConfig::default(),
        &analyzer_config(StubService::replying(JANE_JSON)),
    )
    .unwrap();
    assert_eq!(out.record.name.as_deref(), Some("Jane Doe"));
}

#[test]
fn analyzer_can_be_driven_with_block_on() {
    let analyzer = ResumeAnalyzer::new(StubService::replying(JANE_JSON), AnalyzerConfig::default());
    let out = tokio_test::block_on(analyzer.analyze(JANE_TEXT)).unwrap();
    assert_eq!(out.record.suitability_score, Some(75));
    assert!(out.record.overall_summary.is_none());
}
