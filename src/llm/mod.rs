//! Multi-provider inference layer: request types, routing, and retries.
//!
//! This is the network core of the crate. A uniform [`InferenceRequest`] is
//! routed by model-id family to one of two backend adapters ([`gemini`],
//! [`openai`]), each of which owns its provider's wire format and retry
//! policy. All prompt engineering lives in [`crate::prompts`] so it can be
//! changed without touching routing or error handling here.
//!
//! ## Failure contract
//!
//! [`InferenceClient::complete`] never fails: every error mode (missing
//! credential, unrecognised model id, exhausted retries) degrades to an
//! empty string, which is also what an empty model response produces. That
//! collapse is intentional — the pipeline treats "no text" uniformly — but
//! it conflates two distinct outcomes, so [`InferenceClient::try_complete`]
//! exposes the discriminated `Result<String, LlmError>` underneath.
//!
//! ## Routing
//!
//! Dispatch is case-insensitive substring matching on the model id, with
//! the Gemini family checked before the GPT family and no fallback across
//! providers. Substring dispatch is fragile for adversarial names, so a
//! request may carry an explicit [`ProviderKind`] tag that bypasses the
//! string match entirely.

pub mod gemini;
pub mod openai;

use crate::error::LlmError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, warn};

/// Retry attempts per provider call. Backoff sleeps run on the calling task
/// between attempts; see each adapter's `retry_delay`.
pub(crate) const MAX_ATTEMPTS: u32 = 3;

/// Output-token cap forced for extended-reasoning ("thinking") model
/// variants, overriding whatever the caller requested.
pub(crate) const THINKING_MAX_TOKENS: usize = 8192;

/// A base64-encoded image payload for a multimodal request.
///
/// The preprocessor always produces JPEG; the type carries the MIME type
/// anyway because the two providers embed it differently (Gemini as an
/// `inline_data` field, OpenAI inside a data URL).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    /// Base64-encoded image bytes (no data-URL prefix).
    pub data: String,
    /// MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
}

impl ImageData {
    /// Wrap already-encoded base64 JPEG data.
    pub fn jpeg(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: "image/jpeg".to_string(),
        }
    }

    /// Render as a base64 data URL (OpenAI wire form).
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// A uniform multimodal chat-completion request.
///
/// Immutable once constructed; the `with_*` methods consume and return the
/// value builder-style. Images are always placed before the text in the
/// user content, for both providers.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    /// System instruction for the model.
    pub system_prompt: String,
    /// User-turn text, placed after any images.
    pub user_text: String,
    /// Ordered image payloads (possibly empty).
    pub images: Vec<ImageData>,
    /// Model identifier, e.g. "gemini-2.5-flash" or "gpt-4o".
    pub model: String,
    /// Explicit provider tag. When `None`, the provider is detected from
    /// the model id.
    pub provider: Option<ProviderKind>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Requested output-token cap. "thinking" models override this to 8192.
    pub max_output_tokens: usize,
}

impl InferenceRequest {
    /// Create a text-only request with default generation parameters.
    pub fn new(
        system_prompt: impl Into<String>,
        user_text: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_text: user_text.into(),
            images: Vec::new(),
            model: model.into(),
            provider: None,
            temperature: 1.0,
            max_output_tokens: 4096,
        }
    }

    pub fn with_images(mut self, images: Vec<ImageData>) -> Self {
        self.images = images;
        self
    }

    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn with_max_output_tokens(mut self, n: usize) -> Self {
        self.max_output_tokens = n;
        self
    }
}

/// Provider family a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini (`generateContent` REST API).
    Gemini,
    /// OpenAI chat completions (and compatible gateways).
    OpenAi,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Gemini => write!(f, "gemini"),
            ProviderKind::OpenAi => write!(f, "openai"),
        }
    }
}

/// Detect the provider family from a model identifier.
///
/// Case-insensitive substring match; the Gemini family wins when both
/// families would match. Returns `None` for unrecognised ids — the router
/// logs and degrades, it never guesses.
pub fn detect_provider(model: &str) -> Option<ProviderKind> {
    let lower = model.to_ascii_lowercase();
    if lower.contains("gemini") {
        Some(ProviderKind::Gemini)
    } else if lower.contains("gpt") || lower.contains("o1") {
        Some(ProviderKind::OpenAi)
    } else {
        None
    }
}

/// Effective output-token cap for a model.
///
/// Extended-reasoning variants spend tokens on hidden reasoning before any
/// visible output, so their cap is hard-forced to [`THINKING_MAX_TOKENS`]
/// regardless of what the caller requested — larger or smaller.
pub fn effective_max_tokens(model: &str, requested: usize) -> usize {
    if model.contains("thinking") {
        THINKING_MAX_TOKENS
    } else {
        requested
    }
}

// ── Credentials ──────────────────────────────────────────────────────────

/// Gemini API credential and optional base-URL override.
#[derive(Clone)]
pub struct GeminiCredentials {
    pub api_key: String,
    /// Override for the API root; defaults to the public endpoint.
    pub base_url: Option<String>,
}

/// OpenAI API credential and optional base-URL override (proxies,
/// compatible gateways).
#[derive(Clone)]
pub struct OpenAiCredentials {
    pub api_key: String,
    pub base_url: Option<String>,
}

// Keys must never leak through debug formatting of configs or requests.
impl fmt::Debug for GeminiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiCredentials")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl fmt::Debug for OpenAiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCredentials")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Per-provider credentials, read once at startup and injected into the
/// [`InferenceClient`].
///
/// A `None` entry disables that provider's adapter entirely: requests
/// routed to it degrade to an empty result without network I/O. Absence of
/// every key is not an error either — the client still routes and logs.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub gemini: Option<GeminiCredentials>,
    pub openai: Option<OpenAiCredentials>,
}

impl Credentials {
    /// Read credentials from the environment.
    ///
    /// Recognised variables: `GEMINI_API_KEY`, `GEMINI_BASE_URL`,
    /// `OPENAI_API_KEY`, `OPENAI_BASE_URL`. Empty values count as unset.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| -> Option<String> {
            std::env::var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            gemini: non_empty("GEMINI_API_KEY").map(|api_key| GeminiCredentials {
                api_key,
                base_url: non_empty("GEMINI_BASE_URL"),
            }),
            openai: non_empty("OPENAI_API_KEY").map(|api_key| OpenAiCredentials {
                api_key,
                base_url: non_empty("OPENAI_BASE_URL"),
            }),
        }
    }
}

// ── Client ───────────────────────────────────────────────────────────────

/// Routes inference requests to the configured backend adapters.
///
/// Both adapters share one `reqwest::Client` (connection pool + per-call
/// timeout). The client is an immutable configuration object: construct it
/// once, share it by reference.
pub struct InferenceClient {
    gemini: Option<gemini::GeminiAdapter>,
    openai: Option<openai::OpenAiAdapter>,
}

impl InferenceClient {
    /// Build a client from explicit credentials.
    ///
    /// `timeout_secs` bounds every individual HTTP attempt (retries each
    /// get the full budget).
    pub fn new(credentials: Credentials, timeout_secs: u64) -> Result<Self, crate::error::PredictError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                crate::error::PredictError::Internal(format!("HTTP client construction failed: {e}"))
            })?;

        Ok(Self {
            gemini: credentials
                .gemini
                .map(|c| gemini::GeminiAdapter::new(http.clone(), c)),
            openai: credentials
                .openai
                .map(|c| openai::OpenAiAdapter::new(http.clone(), c)),
        })
    }

    /// Build a client from environment credentials with the given per-call
    /// timeout.
    pub fn from_env(timeout_secs: u64) -> Result<Self, crate::error::PredictError> {
        Self::new(Credentials::from_env(), timeout_secs)
    }

    /// True if at least one provider adapter is configured.
    pub fn has_any_provider(&self) -> bool {
        self.gemini.is_some() || self.openai.is_some()
    }

    /// Route and execute a request, returning the discriminated result.
    ///
    /// `Ok("")` means the provider answered with empty content; `Err(_)`
    /// means the call itself failed (no credential, unknown model, or
    /// retries exhausted).
    pub async fn try_complete(&self, request: &InferenceRequest) -> Result<String, LlmError> {
        let provider = match request.provider.or_else(|| detect_provider(&request.model)) {
            Some(p) => p,
            None => {
                return Err(LlmError::UnknownModel {
                    model: request.model.clone(),
                })
            }
        };

        match provider {
            ProviderKind::Gemini => match &self.gemini {
                Some(adapter) => adapter.invoke(request).await,
                None => Err(LlmError::NotConfigured {
                    provider,
                    hint: "GEMINI_API_KEY",
                }),
            },
            ProviderKind::OpenAi => match &self.openai {
                Some(adapter) => adapter.invoke(request).await,
                None => Err(LlmError::NotConfigured {
                    provider,
                    hint: "OPENAI_API_KEY",
                }),
            },
        }
    }

    /// Route and execute a request, degrading every failure to `""`.
    ///
    /// This is the pipeline-facing boundary: callers detect "no prediction
    /// was produced" by emptiness, and the failure itself is visible only in
    /// the log.
    pub async fn complete(&self, request: &InferenceRequest) -> String {
        match self.try_complete(request).await {
            Ok(text) => text,
            Err(e @ LlmError::UnknownModel { .. }) => {
                error!("{e}");
                String::new()
            }
            Err(e) => {
                warn!("{e}");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_gemini_family() {
        assert_eq!(detect_provider("gemini-2.5-flash"), Some(ProviderKind::Gemini));
        assert_eq!(detect_provider("GEMINI-2.0-PRO"), Some(ProviderKind::Gemini));
    }

    #[test]
    fn detects_openai_family() {
        assert_eq!(detect_provider("gpt-4o"), Some(ProviderKind::OpenAi));
        assert_eq!(detect_provider("o1-preview"), Some(ProviderKind::OpenAi));
        assert_eq!(detect_provider("GPT-4.1-nano"), Some(ProviderKind::OpenAi));
    }

    #[test]
    fn gemini_wins_when_both_match() {
        // First match wins; gemini is checked before gpt/o1.
        assert_eq!(detect_provider("gemini-gpt-hybrid"), Some(ProviderKind::Gemini));
    }

    #[test]
    fn unknown_model_is_none() {
        assert_eq!(detect_provider("unknown-model-x"), None);
        assert_eq!(detect_provider("claude-sonnet"), None);
        assert_eq!(detect_provider(""), None);
    }

    #[test]
    fn explicit_provider_tag_bypasses_detection() {
        let req = InferenceRequest::new("sys", "hi", "custom-gateway-model")
            .with_provider(ProviderKind::OpenAi);
        assert_eq!(req.provider, Some(ProviderKind::OpenAi));
        assert_eq!(detect_provider(&req.model), None);
    }

    #[test]
    fn thinking_override_is_hard() {
        assert_eq!(effective_max_tokens("gemini-2.0-flash-thinking-exp", 4096), 8192);
        // Forced even when the caller asked for more.
        assert_eq!(effective_max_tokens("gemini-2.0-flash-thinking-exp", 16384), 8192);
        assert_eq!(effective_max_tokens("gemini-2.5-flash", 4096), 4096);
    }

    #[test]
    fn data_url_shape() {
        let img = ImageData::jpeg("QUJD");
        assert_eq!(img.to_data_url(), "data:image/jpeg;base64,QUJD");
    }

    #[tokio::test]
    async fn unknown_model_returns_empty() {
        let client = InferenceClient::new(Credentials::default(), 5).unwrap();
        let req = InferenceRequest::new("sys", "question", "unknown-model-x");
        assert_eq!(client.complete(&req).await, "");
        assert!(matches!(
            client.try_complete(&req).await,
            Err(LlmError::UnknownModel { .. })
        ));
    }

    #[tokio::test]
    async fn unconfigured_provider_returns_empty() {
        let client = InferenceClient::new(Credentials::default(), 5).unwrap();
        let req = InferenceRequest::new("sys", "question", "gemini-2.5-flash");
        assert!(matches!(
            client.try_complete(&req).await,
            Err(LlmError::NotConfigured { provider: ProviderKind::Gemini, .. })
        ));
        assert_eq!(client.complete(&req).await, "");
    }
}
