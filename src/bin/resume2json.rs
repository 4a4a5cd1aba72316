//! CLI binary for resume2json.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractorConfig` / `AnalyzerConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use resume2json::analyze::write_record_json;
use resume2json::pipeline::input::load_document;
use resume2json::{
    analyze_document, render_markdown, AnalysisProgressCallback, AnalysisStage, AnalyzerConfig,
    ExtractorConfig, MediaType, OcrBackend, PromptProfile, TextExtractor,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that follows the request through its stages.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("resume2json");
        bar.set_message("starting…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: AnalysisStage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_extracted(&self, chars: usize, no_text_detected: bool) {
        if no_text_detected {
            self.bar.println(format!(
                "  {} No text detected in the image; analysing anyway",
                yellow("⚠")
            ));
        } else {
            self.bar.println(format!(
                "  {} Extracted {}",
                green("✓"),
                dim(&format!("{chars} chars"))
            ));
        }
    }

    fn on_repair_attempt(&self) {
        self.bar.println(format!(
            "  {} Response was not valid JSON; retrying with quote repair",
            yellow("⚠")
        ));
    }

    fn on_complete(&self, success: bool) {
        self.bar.finish_and_clear();
        if success {
            eprintln!("{} Resume analysed", green("✔"));
        } else {
            eprintln!("{} Analysis failed", red("✘"));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Markdown report on stdout (Gemini key from the environment)
  GEMINI_API_KEY=AIza... resume2json resume.pdf

  # JSON export to a file
  resume2json resume.docx -o jane.json

  # JSON on stdout, extended field set
  resume2json --json --profile extended resume.pdf

  # A scanned resume through tesseract, French + English
  resume2json --tesseract-lang fra+eng scan.jpg

  # Another provider through edgequake-llm
  resume2json --provider openai --model gpt-4.1-mini resume.txt

  # Extracted text only (no API key needed)
  resume2json --text-only resume.pdf

  # Save the first embedded image of a PDF (e.g. a headshot)
  resume2json --first-image photo.png --text-only resume.pdf

SUPPORTED INPUTS:
  .pdf           application/pdf                 needs libpdfium
  .docx / .doc   application/vnd.openxmlformats-officedocument.wordprocessingml.document
  .txt           text/plain                      UTF-8
  .jpg / .jpeg   image/jpeg                      needs tesseract (or --ocr vision)

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (used when no provider is named)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Provider for auto-detection (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Model for auto-detection
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Overrides the log filter
"#;

/// Extract structured JSON from resumes using LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "resume2json",
    version,
    about = "Extract structured JSON from resumes (PDF, DOCX, TXT, JPEG) using LLMs",
    long_about = "Extract the text of a resume (PDF, DOCX, plain text, or a JPEG scan via OCR), \
send it to a generative language model with a fixed prompt, and print the structured result \
as a Markdown report or pretty JSON. Uses Google Gemini directly with an API key, or any \
provider supported by edgequake-llm.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Resume file (.pdf, .docx, .doc, .txt, .jpg, .jpeg).
    input: PathBuf,

    /// Write the JSON export to this file.
    #[arg(short, long, env = "RESUME2JSON_OUTPUT")]
    output: Option<PathBuf>,

    /// Print pretty JSON on stdout instead of the Markdown report.
    #[arg(long, env = "RESUME2JSON_JSON")]
    json: bool,

    /// Declared MIME type; overrides the file extension.
    #[arg(long, env = "RESUME2JSON_MEDIA_TYPE")]
    media_type: Option<String>,

    /// Print the extracted text and stop (no service call).
    #[arg(long)]
    text_only: bool,

    /// Save the first embedded image of a PDF as PNG.
    #[arg(long, value_name = "PNG")]
    first_image: Option<PathBuf>,

    /// edgequake-llm provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "RESUME2JSON_PROVIDER")]
    provider: Option<String>,

    /// Model ID. Default: gemini-1.5-flash.
    #[arg(long, env = "RESUME2JSON_MODEL")]
    model: Option<String>,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini REST endpoint base.
    #[arg(long, env = "RESUME2JSON_API_BASE")]
    api_base: Option<String>,

    /// Fields to request: standard or extended.
    #[arg(long, env = "RESUME2JSON_PROFILE", value_enum, default_value = "standard")]
    profile: ProfileArg,

    /// OCR engine for image uploads: tesseract or vision.
    #[arg(long, env = "RESUME2JSON_OCR", value_enum, default_value = "tesseract")]
    ocr: OcrArg,

    /// Tesseract language code(s), e.g. eng or eng+fra.
    #[arg(long, env = "RESUME2JSON_TESSERACT_LANG", default_value = "eng")]
    tesseract_lang: String,

    /// Tesseract executable.
    #[arg(long, env = "RESUME2JSON_TESSERACT_BIN", default_value = "tesseract")]
    tesseract_bin: PathBuf,

    /// Provider for --ocr vision.
    #[arg(long, env = "RESUME2JSON_VISION_PROVIDER")]
    vision_provider: Option<String>,

    /// Model for --ocr vision.
    #[arg(long, env = "RESUME2JSON_VISION_MODEL")]
    vision_model: Option<String>,

    /// Path to libpdfium (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// PDF user password for encrypted resumes.
    #[arg(long, env = "RESUME2JSON_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Max tokens the model may generate.
    #[arg(long, env = "RESUME2JSON_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "RESUME2JSON_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Service call timeout in seconds.
    #[arg(long, env = "RESUME2JSON_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Disable the progress spinner.
    #[arg(long, env = "RESUME2JSON_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RESUME2JSON_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "RESUME2JSON_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ProfileArg {
    Standard,
    Extended,
}

impl From<ProfileArg> for PromptProfile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Standard => PromptProfile::Standard,
            ProfileArg::Extended => PromptProfile::Extended,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OcrArg {
    Tesseract,
    Vision,
}

impl From<OcrArg> for OcrBackend {
    fn from(v: OcrArg) -> Self {
        match v {
            OcrArg::Tesseract => OcrBackend::Tesseract,
            OcrArg::Vision => OcrBackend::Vision,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries the user-facing feedback; library INFO logs are
    // only shown when it is off.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.text_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Load the document ────────────────────────────────────────────────
    let media_type = cli
        .media_type
        .as_deref()
        .map(MediaType::from_mime)
        .transpose()
        .context("Invalid --media-type")?;
    let doc = load_document(&cli.input, media_type)
        .await
        .with_context(|| format!("Failed to load {}", cli.input.display()))?;

    let extractor_config = build_extractor_config(&cli)?;

    // ── First embedded image ─────────────────────────────────────────────
    if let Some(ref png_path) = cli.first_image {
        let extractor = TextExtractor::new(extractor_config.clone());
        match extractor
            .find_first_image(&doc)
            .await
            .context("Failed to look for an embedded image")?
        {
            Some(img) => {
                img.save_with_format(png_path, image::ImageFormat::Png)
                    .with_context(|| format!("Failed to write {}", png_path.display()))?;
                if !cli.quiet {
                    eprintln!("{} First image → {}", green("✔"), bold(&png_path.display().to_string()));
                }
            }
            None => {
                if !cli.quiet {
                    eprintln!("{} No embedded image found", yellow("⚠"));
                }
            }
        }
    }

    // ── Text-only mode ───────────────────────────────────────────────────
    if cli.text_only {
        let extractor = TextExtractor::new(extractor_config);
        let extracted = extractor.extract(&doc).await.context("Text extraction failed")?;
        if extracted.no_text_detected && !cli.quiet {
            eprintln!("{} No text detected in the image", yellow("⚠"));
        }
        let mut handle = io::stdout().lock();
        handle
            .write_all(extracted.text.as_bytes())
            .context("Failed to write to stdout")?;
        if !extracted.text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
        return Ok(());
    }

    // ── Analyse ──────────────────────────────────────────────────────────
    let progress_cb = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };
    let analyzer_config = build_analyzer_config(&cli, progress_cb)?;

    let output = analyze_document(&doc, &extractor_config, &analyzer_config)
        .await
        .context("Resume analysis failed")?;

    if let Some(ref output_path) = cli.output {
        write_record_json(&output, output_path)
            .await
            .context("Failed to write JSON export")?;
        if !cli.quiet {
            eprintln!("{} JSON → {}", green("✔"), bold(&output_path.display().to_string()));
        }
    }

    if cli.json {
        let json = output
            .record
            .to_json_pretty()
            .context("Failed to serialise record")?;
        println!("{json}");
    } else if cli.output.is_none() {
        print!("{}", render_markdown(&output.record));
    }

    if !cli.quiet {
        if output.repaired {
            eprintln!("   {}", yellow("response needed quote repair"));
        }
        eprintln!(
            "   {} tokens in  /  {} tokens out  -  {}ms total",
            dim(&output.stats.input_tokens.to_string()),
            dim(&output.stats.output_tokens.to_string()),
            output.stats.total_duration_ms,
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractorConfig`.
fn build_extractor_config(cli: &Cli) -> Result<ExtractorConfig> {
    let mut builder = ExtractorConfig::builder()
        .ocr_backend(cli.ocr.clone().into())
        .tesseract_lang(&cli.tesseract_lang)
        .tesseract_binary(&cli.tesseract_bin)
        .ocr_timeout_secs(cli.api_timeout);

    if let Some(ref p) = cli.pdfium_lib {
        builder = builder.pdfium_library(p);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref name) = cli.vision_provider {
        builder = builder.vision_provider(name);
    }
    if let Some(ref model) = cli.vision_model {
        builder = builder.vision_model(model);
    }

    builder.build().context("Invalid extraction configuration")
}

/// Map CLI args to `AnalyzerConfig`.
fn build_analyzer_config(
    cli: &Cli,
    progress: Option<Arc<dyn AnalysisProgressCallback>>,
) -> Result<AnalyzerConfig> {
    let mut builder = AnalyzerConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .prompt_profile(cli.profile.clone().into());

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    } else if let Some(key) = cli.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        builder = builder.api_key(key);
    }
    if let Some(ref base) = cli.api_base {
        builder = builder.api_base(base);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid analysis configuration")
}
