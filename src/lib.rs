//! # paper2verdict
//!
//! Predict a conference paper's accept/reject outcome from its peer
//! reviews and rebuttal PDF, using multimodal LLMs.
//!
//! ## Why this crate?
//!
//! Between the rebuttal deadline and the decision email sits weeks of
//! anxiety. The signal is already on the table: the scores, what the
//! expert reviewer actually flagged as fatal versus cosmetic, and whether
//! the rebuttal's new figures land. This crate runs that analysis the way
//! an area chair would — profile the reviewers, weigh the rebuttal's
//! visual evidence against the major concerns, then call the outcome.
//!
//! ## Pipeline Overview
//!
//! ```text
//! reviews.json ─▶ 1. Synthesize   profile reviewers, extract major concerns
//!                      │
//! rebuttal.pdf ─▶ 2. Analyze      rasterised pages + concerns → rebuttal impact
//!                      │
//!                 3. Decide       scores + both analyses → raw decision JSON
//!                      │
//!                 4. Recover      tolerant parse → normalized DecisionRecord
//! ```
//!
//! Stages 1–3 are sequential calls into a dual-provider inference layer
//! (Gemini / OpenAI, routed by model id, each with its own retry policy).
//! A failed stage degrades to an empty transcript entry and the pipeline
//! keeps going; a fully failed run comes back *undecided*, never as a
//! panic or error.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paper2verdict::{predict, PredictionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider picked from the model id; key from GEMINI_API_KEY / OPENAI_API_KEY
//!     let config = PredictionConfig::builder()
//!         .model("gemini-2.5-flash")
//!         .build()?;
//!     let output = predict("reviews.json", Some("rebuttal.pdf"), &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&output.decision)?);
//!     eprintln!("decided: {} in {}ms", output.is_decided(), output.stats.total_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper2verdict` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! paper2verdict = { version = "0.3", default-features = false }
//! ```
//!
//! ## Choosing a Model
//!
//! Any Gemini or GPT-family multimodal model works; the model id picks the
//! provider ("gemini…" → Gemini, "gpt…"/"o1…" → OpenAI). "thinking"
//! variants automatically get an 8192 output-token cap — they spend tokens
//! reasoning before any visible output. Stage 2 needs a vision-capable
//! model whenever a rebuttal PDF is supplied.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod decision;
pub mod error;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod predict;
pub mod progress;
pub mod prompts;
pub mod reviews;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PredictionConfig, PredictionConfigBuilder};
pub use decision::{parse_decision, DecisionRecord, DEFAULT_REASONING};
pub use error::{LlmError, PredictError};
pub use llm::{
    Credentials, GeminiCredentials, ImageData, InferenceClient, InferenceRequest,
    OpenAiCredentials, ProviderKind,
};
pub use output::{PredictionOutput, PredictionStats, StageTranscript};
pub use predict::{predict, predict_sync, predict_to_file};
pub use progress::{PredictionProgressCallback, PredictionStage};
pub use reviews::{format_reviews, load_reviews, FormattedReview};
