//! Generative text service: the one stage with network I/O.
//!
//! The analyzer talks to a [`CompletionService`]. Two implementations ship
//! with the crate:
//!
//! * [`GeminiService`] - calls the Gemini `generateContent` REST endpoint
//!   directly with a pre-resolved API key and asks for
//!   `responseMimeType: application/json`.
//! * [`ProviderService`] - adapts any edgequake-llm [`LLMProvider`]
//!   (OpenAI, Anthropic, Ollama, …) and sets `response_format` to
//!   `json_object`; providers without a JSON mode fall back to the prompt.
//!
//! Tests and embedders can supply their own implementation through
//! [`crate::config::AnalyzerConfig::service`].
//!
//! There is no retry here. A failed call surfaces as
//! [`AnalysisError::ServiceFailure`] immediately.

use crate::config::{AnalyzerConfig, DEFAULT_MODEL};
use crate::error::{AnalysisError, ServiceFailureKind};
use crate::pipeline::ocr::DEFAULT_VISION_MODEL;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Sampling options for one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: usize,
    /// Ask the backend to constrain output to JSON where it can.
    pub json_mode: bool,
}

impl GenerationOptions {
    /// Options for a resume analysis call.
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            json_mode: true,
        }
    }
}

/// Text returned by a service plus token usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// A generative text service that answers a single user turn.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send `prompt` as the only user message and return the generated text.
    async fn complete(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Completion, AnalysisError>;

    /// Short label for logs, e.g. `gemini/gemini-1.5-flash`.
    fn describe(&self) -> String;
}

// ── Gemini REST ──────────────────────────────────────────────────────────

/// Direct client for the Gemini `generateContent` endpoint.
pub struct GeminiService {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiService {
    /// Build a client for `model` using an already-resolved `api_key`.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::ServiceNotConfigured {
                provider: "gemini".into(),
                hint: format!("HTTP client could not be built: {e}"),
            })?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate.
    fn into_completion(self) -> Result<Completion, AnalysisError> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        let text: Option<String> = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect());

        let text = text.ok_or_else(|| AnalysisError::ServiceFailure {
            kind: ServiceFailureKind::Api,
            detail: match block_reason {
                Some(reason) => format!("prompt blocked by the service ({reason})"),
                None => "response contained no candidates".to_string(),
            },
        })?;

        let (input_tokens, output_tokens) = self
            .usage_metadata
            .map(|u| (u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        Ok(Completion {
            text,
            input_tokens,
            output_tokens,
        })
    }
}

#[async_trait]
impl CompletionService for GeminiService {
    async fn complete(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Completion, AnalysisError> {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
                response_mime_type: options.json_mode.then_some("application/json"),
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiErrorEnvelope>(&raw)
                .map(|e| e.error.message)
                .unwrap_or(raw);
            return Err(AnalysisError::ServiceFailure {
                kind: classify_status(status.as_u16(), &message),
                detail: format!("HTTP {}: {}", status.as_u16(), message),
            });
        }

        let parsed: GeminiResponse =
            response
                .json()
                .await
                .map_err(|e| AnalysisError::ServiceFailure {
                    kind: ServiceFailureKind::Api,
                    detail: format!("unreadable response envelope: {e}"),
                })?;

        let completion = parsed.into_completion()?;
        debug!(
            "Gemini: {} input tokens, {} output tokens",
            completion.input_tokens, completion.output_tokens
        );
        Ok(completion)
    }

    fn describe(&self) -> String {
        format!("gemini/{}", self.model)
    }
}

fn classify_http_error(e: reqwest::Error) -> AnalysisError {
    let kind = if e.is_timeout() {
        ServiceFailureKind::Timeout
    } else {
        ServiceFailureKind::Network
    };
    AnalysisError::ServiceFailure {
        kind,
        detail: e.to_string(),
    }
}

/// Map an HTTP status (and body message) to a failure kind.
pub(crate) fn classify_status(status: u16, message: &str) -> ServiceFailureKind {
    match status {
        401 | 403 => ServiceFailureKind::Auth,
        429 => ServiceFailureKind::Quota,
        408 | 504 => ServiceFailureKind::Timeout,
        // Gemini answers 400 for a bad key.
        400 if message.contains("API key not valid") => ServiceFailureKind::Auth,
        _ => ServiceFailureKind::Api,
    }
}

// ── edgequake-llm providers ──────────────────────────────────────────────

/// Adapter from an edgequake-llm provider to [`CompletionService`].
pub struct ProviderService {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderService {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }
}

#[async_trait]
impl CompletionService for ProviderService {
    async fn complete(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Completion, AnalysisError> {
        let messages = vec![ChatMessage::user(prompt)];
        let opts = provider_options(options);

        let response = self
            .provider
            .chat(&messages, Some(&opts))
            .await
            .map_err(|e| {
                let detail = e.to_string();
                AnalysisError::ServiceFailure {
                    kind: classify_message(&detail),
                    detail,
                }
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );

        Ok(Completion {
            text: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// edgequake-llm request options for one analysis call.
fn provider_options(options: &GenerationOptions) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(options.temperature),
        max_tokens: Some(options.max_tokens),
        response_format: options.json_mode.then(|| "json_object".to_string()),
        ..Default::default()
    }
}

/// Best-effort classification of a provider error message.
pub(crate) fn classify_message(message: &str) -> ServiceFailureKind {
    let m = message.to_ascii_lowercase();
    if m.contains("401") || m.contains("403") || m.contains("unauthorized") || m.contains("api key")
    {
        ServiceFailureKind::Auth
    } else if m.contains("429") || m.contains("rate limit") || m.contains("quota") {
        ServiceFailureKind::Quota
    } else if m.contains("timed out") || m.contains("timeout") {
        ServiceFailureKind::Timeout
    } else if m.contains("connect") || m.contains("network") || m.contains("dns") {
        ServiceFailureKind::Network
    } else {
        ServiceFailureKind::Api
    }
}

/// Instantiate a named edgequake-llm provider with the given model.
pub(crate) fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, AnalysisError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        AnalysisError::ServiceNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Auto-detect an edgequake-llm provider from the known API key variables.
pub(crate) fn provider_from_env() -> Result<Arc<dyn LLMProvider>, AnalysisError> {
    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| AnalysisError::ServiceNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No generative service could be auto-detected.\n\
                Pass an API key (--api-key / GEMINI_API_KEY), or set OPENAI_API_KEY,\n\
                ANTHROPIC_API_KEY, or EDGEQUAKE_LLM_PROVIDER + EDGEQUAKE_MODEL.\n\
                Error: {e}"
            ),
        })?;
    Ok(llm_provider)
}

/// Resolve the completion service, from most-specific to least-specific:
///
/// 1. **Pre-built service** (`config.service`), used as-is.
/// 2. **Gemini key** (`config.api_key`) → [`GeminiService`] with
///    `config.model` or [`DEFAULT_MODEL`].
/// 3. **Named provider** (`config.provider_name`) → edgequake-llm factory;
///    the provider reads its own key variable.
/// 4. **Environment** → `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, then
///    `GEMINI_API_KEY`, then full auto-detection.
pub fn resolve_service(config: &AnalyzerConfig) -> Result<Arc<dyn CompletionService>, AnalysisError> {
    if let Some(ref service) = config.service {
        return Ok(Arc::clone(service));
    }

    if let Some(ref key) = config.api_key {
        return gemini_from_config(key, config);
    }

    if let Some(ref name) = config.provider_name {
        let model = config
            .model
            .as_deref()
            .unwrap_or_else(|| default_model_for(name));
        info!("Using provider {}/{}", name, model);
        let provider = create_provider(name, model)?;
        return Ok(Arc::new(ProviderService::new(provider, format!("{name}/{model}"))));
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            info!("Using provider {}/{} from environment", prov, model);
            let provider = create_provider(&prov, &model)?;
            return Ok(Arc::new(ProviderService::new(provider, format!("{prov}/{model}"))));
        }
    }

    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.trim().is_empty() {
            return gemini_from_config(&key, config);
        }
    }

    let provider = provider_from_env()?;
    info!("Using auto-detected provider");
    Ok(Arc::new(ProviderService::new(provider, "auto")))
}

/// Model used with a named provider when none is configured.
fn default_model_for(provider_name: &str) -> &'static str {
    if provider_name.eq_ignore_ascii_case("gemini") {
        DEFAULT_MODEL
    } else {
        DEFAULT_VISION_MODEL
    }
}

fn gemini_from_config(
    key: &str,
    config: &AnalyzerConfig,
) -> Result<Arc<dyn CompletionService>, AnalysisError> {
    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
    info!("Using Gemini model {}", model);
    let service = GeminiService::new(
        key,
        model,
        config.api_base.clone(),
        Duration::from_secs(config.api_timeout_secs),
    )?;
    Ok(Arc::new(service))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl CompletionService for Echo {
        async fn complete(
            &self,
            prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<Completion, AnalysisError> {
            Ok(Completion::text(prompt))
        }

        fn describe(&self) -> String {
            "echo".into()
        }
    }

    #[test]
    fn options_from_config() {
        let config = AnalyzerConfig::default();
        let opts = GenerationOptions::from_config(&config);
        assert_eq!(opts.temperature, 0.2);
        assert_eq!(opts.max_tokens, 4096);
        assert!(opts.json_mode);
    }

    #[test]
    fn prebuilt_service_wins() {
        let config = AnalyzerConfig::builder()
            .service(Arc::new(Echo))
            .api_key("AIza-ignored")
            .build()
            .unwrap();
        let service = resolve_service(&config).unwrap();
        assert_eq!(service.describe(), "echo");
    }

    #[test]
    fn api_key_selects_gemini() {
        let config = AnalyzerConfig::builder().api_key("AIza-test").build().unwrap();
        let service = resolve_service(&config).unwrap();
        assert_eq!(service.describe(), format!("gemini/{DEFAULT_MODEL}"));
    }

    #[test]
    fn provider_options_request_json() {
        let mut opts = GenerationOptions::from_config(&AnalyzerConfig::default());
        let built = provider_options(&opts);
        assert_eq!(built.response_format.as_deref(), Some("json_object"));
        assert_eq!(built.temperature, Some(0.2));
        assert_eq!(built.max_tokens, Some(4096));

        opts.json_mode = false;
        assert!(provider_options(&opts).response_format.is_none());
    }

    #[test]
    fn provider_default_models() {
        assert_eq!(default_model_for("Gemini"), DEFAULT_MODEL);
        assert_eq!(default_model_for("openai"), DEFAULT_VISION_MODEL);
    }

    #[test]
    fn gemini_request_asks_for_json() {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: "hi" }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.2,
                max_output_tokens: 128,
                response_mime_type: Some("application/json"),
            },
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(v["generationConfig"]["maxOutputTokens"], 128);
        assert_eq!(v["contents"][0]["parts"][0]["text"], "hi");
    }

    #[test]
    fn gemini_response_text_and_usage() {
        let raw = r#"{
            "candidates": [{"content": {"parts": [{"text": "{\"name\":"}, {"text": "\"A\"}"}]}}],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 5}
        }"#;
        let parsed: GeminiResponse = serde_json::from_str(raw).unwrap();
        let c = parsed.into_completion().unwrap();
        assert_eq!(c.text, r#"{"name":"A"}"#);
        assert_eq!((c.input_tokens, c.output_tokens), (12, 5));
    }

    #[test]
    fn blocked_prompt_is_a_service_failure() {
        let raw = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let parsed: GeminiResponse = serde_json::from_str(raw).unwrap();
        let err = parsed.into_completion().unwrap_err();
        assert!(err.is_service_failure());
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(401, ""), ServiceFailureKind::Auth);
        assert_eq!(classify_status(429, ""), ServiceFailureKind::Quota);
        assert_eq!(
            classify_status(400, "API key not valid. Please pass a valid API key."),
            ServiceFailureKind::Auth
        );
        assert_eq!(classify_status(400, "bad request"), ServiceFailureKind::Api);
        assert_eq!(classify_status(504, ""), ServiceFailureKind::Timeout);
    }

    #[test]
    fn message_classification() {
        assert_eq!(classify_message("HTTP 429 Too Many Requests"), ServiceFailureKind::Quota);
        assert_eq!(classify_message("invalid API key"), ServiceFailureKind::Auth);
        assert_eq!(classify_message("request timed out"), ServiceFailureKind::Timeout);
        assert_eq!(classify_message("error trying to connect"), ServiceFailureKind::Network);
        assert_eq!(classify_message("model overloaded"), ServiceFailureKind::Api);
    }

    #[tokio::test]
    async fn echo_service_returns_prompt() {
        let svc: Arc<dyn CompletionService> = Arc::new(Echo);
        let opts = GenerationOptions::from_config(&AnalyzerConfig::default());
        let c = svc.complete("hello", &opts).await.unwrap();
        assert_eq!(c.text, "hello");
    }
}
