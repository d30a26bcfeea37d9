//! Configuration types for the prediction pipeline.
//!
//! All pipeline behaviour is controlled through [`PredictionConfig`], built
//! via its [`PredictionConfigBuilder`]. Keeping every knob in one struct
//! makes it trivial to share configs, serialise the interesting parts for
//! logging, and diff two runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::error::PredictError;
use crate::llm::{Credentials, ProviderKind};
use crate::progress::PredictionProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Configuration for one prediction run.
///
/// Built via [`PredictionConfig::builder()`] or
/// [`PredictionConfig::default()`].
///
/// # Example
/// ```rust
/// use paper2verdict::PredictionConfig;
///
/// let config = PredictionConfig::builder()
///     .model("gemini-2.5-flash")
///     .temperature(0.8)
///     .page_limit(6)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PredictionConfig {
    /// Model identifier routed to a provider by family substring
    /// ("gemini…" vs "gpt…"/"o1…"). Default: "gemini-2.5-flash".
    pub model: String,

    /// Explicit provider tag. When set, routing skips the substring match
    /// on the model id entirely — the robust choice for gateway models
    /// whose names carry no family marker.
    pub provider: Option<ProviderKind>,

    /// Sampling temperature. Default: 1.0.
    ///
    /// The stages ask for judgement calls, not transcription, so the model
    /// keeps its default creativity. Lower it for more reproducible runs.
    pub temperature: f32,

    /// Output-token cap per stage call. Default: 4096.
    ///
    /// "thinking" model variants override this to 8192 — they burn tokens
    /// on hidden reasoning before any visible output appears.
    pub max_output_tokens: usize,

    /// Maximum rebuttal pages sent to stage 2. Default: 10.
    ///
    /// Rebuttals are short by rule (typically 1–2 pages); the cap guards
    /// against a full paper being passed by mistake, which would blow the
    /// request size limit and the token bill.
    pub page_limit: usize,

    /// Target width in pixels for rasterised rebuttal pages. Default: 1280.
    ///
    /// Wide enough for a vision model to read plot axes and table cells,
    /// small enough to keep each page under ~1 MB of base64.
    pub page_width_px: u32,

    /// PDF user password for encrypted rebuttals.
    pub password: Option<String>,

    /// Override for the stage-1 system prompt. If None, uses the built-in.
    pub review_prompt: Option<String>,

    /// Override for the stage-2 system prompt. If None, uses the built-in.
    pub rebuttal_prompt: Option<String>,

    /// Override for the stage-3 system prompt. If None, uses the built-in.
    pub decision_prompt: Option<String>,

    /// Provider credentials. If None, read from the environment
    /// (`GEMINI_API_KEY`, `OPENAI_API_KEY`, …) at pipeline start.
    pub credentials: Option<Credentials>,

    /// Optional per-stage progress callback.
    pub progress_callback: Option<Arc<dyn PredictionProgressCallback>>,

    /// Download timeout for URL rebuttal inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-inference-call HTTP timeout in seconds. Default: 60.
    ///
    /// Each retry attempt gets the full budget, so a stage's worst case is
    /// `3 * api_timeout_secs` plus backoff sleeps.
    pub api_timeout_secs: u64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            provider: None,
            temperature: 1.0,
            max_output_tokens: 4096,
            page_limit: 10,
            page_width_px: 1280,
            password: None,
            review_prompt: None,
            rebuttal_prompt: None,
            decision_prompt: None,
            credentials: None,
            progress_callback: None,
            download_timeout_secs: 120,
            api_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for PredictionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredictionConfig")
            .field("model", &self.model)
            .field("provider", &self.provider)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("page_limit", &self.page_limit)
            .field("page_width_px", &self.page_width_px)
            .field("credentials", &self.credentials.as_ref().map(|_| "<set>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn callback>"),
            )
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl PredictionConfig {
    /// Create a new builder for `PredictionConfig`.
    pub fn builder() -> PredictionConfigBuilder {
        PredictionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PredictionConfig`].
pub struct PredictionConfigBuilder {
    config: PredictionConfig,
}

impl PredictionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider(mut self, provider: ProviderKind) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn page_limit(mut self, n: usize) -> Self {
        self.config.page_limit = n.max(1);
        self
    }

    pub fn page_width_px(mut self, px: u32) -> Self {
        self.config.page_width_px = px.clamp(256, 4096);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn review_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.review_prompt = Some(prompt.into());
        self
    }

    pub fn rebuttal_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.rebuttal_prompt = Some(prompt.into());
        self
    }

    pub fn decision_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.decision_prompt = Some(prompt.into());
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = Some(credentials);
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn PredictionProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PredictionConfig, PredictError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(PredictError::InvalidConfig("Model id must not be empty".into()));
        }
        if c.max_output_tokens == 0 {
            return Err(PredictError::InvalidConfig(
                "max_output_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(PredictError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
