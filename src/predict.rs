//! Prediction entry points: the three-stage pipeline.
//!
//! The stages are strictly sequential — each one's raw output is
//! interpolated into the next one's question — so there is nothing to
//! parallelise; the pipeline is three awaited calls on one task. A failed
//! stage degrades to an empty transcript entry and the chain continues:
//! the decision stage still runs (the model simply sees less context) and
//! a fully failed run surfaces as an undecided [`PredictionOutput`], not
//! an `Err`.

use crate::config::PredictionConfig;
use crate::decision::{parse_decision, DecisionRecord};
use crate::error::PredictError;
use crate::llm::{Credentials, ImageData, InferenceClient, InferenceRequest};
use crate::output::{PredictionOutput, PredictionStats, StageTranscript};
use crate::pipeline::{encode, input, render};
use crate::progress::PredictionStage;
use crate::prompts;
use crate::reviews::{format_reviews, load_reviews};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Predict a paper's accept/reject outcome from its reviews and rebuttal.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `reviews_path` — path to the reviews JSON file (array of records)
/// * `rebuttal`     — local path or HTTP/HTTPS URL of the rebuttal PDF;
///   `None` runs the pipeline without visual evidence
/// * `config`       — pipeline configuration
///
/// # Returns
/// `Ok(PredictionOutput)` whenever the reviews file loads, even if every
/// inference stage failed — check [`PredictionOutput::is_decided`].
///
/// # Errors
/// Returns `Err(PredictError)` only for fatal problems: reviews file
/// missing or malformed, or an invalid configuration.
pub async fn predict(
    reviews_path: impl AsRef<Path>,
    rebuttal: Option<&str>,
    config: &PredictionConfig,
) -> Result<PredictionOutput, PredictError> {
    let total_start = Instant::now();
    let reviews_path = reviews_path.as_ref();
    info!("Starting prediction pipeline: {}", reviews_path.display());

    // ── Step 1: Load and shape the reviews ───────────────────────────────
    let raw_records = load_reviews(reviews_path)?;
    let reviews = format_reviews(&raw_records);
    info!("Loaded {} reviews", reviews.len());

    // ── Step 2: Build the inference client ───────────────────────────────
    let credentials = config
        .credentials
        .clone()
        .unwrap_or_else(Credentials::from_env);
    let client = InferenceClient::new(credentials, config.api_timeout_secs)?;
    if !client.has_any_provider() {
        warn!("No provider credentials configured; every stage will degrade to empty output");
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_pipeline_start(reviews.len());
    }

    // ── Step 3: Stage 1 — review synthesis ───────────────────────────────
    let review_prompt = config
        .review_prompt
        .as_deref()
        .unwrap_or(prompts::REVIEW_SYNTHESIZER_PROMPT);
    let (review_analysis, review_stage_ms) = run_stage(
        &client,
        config,
        PredictionStage::ReviewSynthesis,
        review_prompt,
        prompts::review_question(&reviews),
        Vec::new(),
    )
    .await;

    // ── Step 4: Preprocess the rebuttal PDF ──────────────────────────────
    let preprocess_start = Instant::now();
    let rebuttal_images = match rebuttal {
        Some(source) => preprocess_rebuttal(source, config).await,
        None => {
            warn!("No rebuttal provided; stage 2 runs without visual evidence");
            Vec::new()
        }
    };
    let preprocess_ms = preprocess_start.elapsed().as_millis() as u64;
    let rebuttal_pages = rebuttal_images.len();

    // ── Step 5: Stage 2 — rebuttal analysis ──────────────────────────────
    let rebuttal_prompt = config
        .rebuttal_prompt
        .as_deref()
        .unwrap_or(prompts::REBUTTAL_ANALYZER_PROMPT);
    let (rebuttal_analysis, rebuttal_stage_ms) = run_stage(
        &client,
        config,
        PredictionStage::RebuttalAnalysis,
        rebuttal_prompt,
        prompts::rebuttal_question(&review_analysis),
        rebuttal_images,
    )
    .await;

    // ── Step 6: Stage 3 — final decision ─────────────────────────────────
    let raw_scores: Vec<String> = reviews.iter().map(|r| r.recommendation.clone()).collect();
    let decision_prompt = config
        .decision_prompt
        .as_deref()
        .unwrap_or(prompts::DECISION_COORDINATOR_PROMPT);
    let (decision_raw, decision_stage_ms) = run_stage(
        &client,
        config,
        PredictionStage::DecisionCoordination,
        decision_prompt,
        prompts::decision_question(&review_analysis, &rebuttal_analysis, &raw_scores),
        Vec::new(),
    )
    .await;

    // ── Step 7: Recover the decision record ──────────────────────────────
    let decision: DecisionRecord = parse_decision(&decision_raw);

    let output = PredictionOutput {
        decision,
        transcript: StageTranscript {
            review_analysis,
            rebuttal_analysis,
            decision_raw,
        },
        stats: PredictionStats {
            review_count: reviews.len(),
            rebuttal_pages,
            preprocess_ms,
            review_stage_ms,
            rebuttal_stage_ms,
            decision_stage_ms,
            total_ms: total_start.elapsed().as_millis() as u64,
        },
    };

    if output.is_decided() {
        info!(
            "Prediction complete in {}ms: {}",
            output.stats.total_ms,
            output.decision.final_decision.as_deref().unwrap_or("")
        );
    } else {
        warn!(
            "Pipeline finished without a decision ({}ms); see stage logs",
            output.stats.total_ms
        );
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_pipeline_complete(output.is_decided());
    }

    Ok(output)
}

/// Predict and write the full output as pretty JSON to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn predict_to_file(
    reviews_path: impl AsRef<Path>,
    rebuttal: Option<&str>,
    output_path: impl AsRef<Path>,
    config: &PredictionConfig,
) -> Result<PredictionOutput, PredictError> {
    let output = predict(reviews_path, rebuttal, config).await?;
    let path = output_path.as_ref();

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| PredictError::Internal(format!("Output serialisation failed: {e}")))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PredictError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json)
        .await
        .map_err(|e| PredictError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| PredictError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(output)
}

/// Synchronous wrapper around [`predict`].
///
/// Creates a temporary tokio runtime internally.
pub fn predict_sync(
    reviews_path: impl AsRef<Path>,
    rebuttal: Option<&str>,
    config: &PredictionConfig,
) -> Result<PredictionOutput, PredictError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PredictError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(predict(reviews_path, rebuttal, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Run one inference stage, timing it and firing progress events.
///
/// Never fails: the `complete` boundary degrades every inference failure
/// to an empty string.
async fn run_stage(
    client: &InferenceClient,
    config: &PredictionConfig,
    stage: PredictionStage,
    system_prompt: &str,
    question: String,
    images: Vec<ImageData>,
) -> (String, u64) {
    info!(
        "Stage {}/{}: {}",
        stage.index(),
        PredictionStage::COUNT,
        stage
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }

    let request = InferenceRequest {
        system_prompt: system_prompt.to_string(),
        user_text: question,
        images,
        model: config.model.clone(),
        provider: config.provider,
        temperature: config.temperature,
        max_output_tokens: config.max_output_tokens,
    };

    let start = Instant::now();
    let text = client.complete(&request).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    if text.is_empty() {
        warn!("Stage '{stage}' produced no output ({elapsed_ms}ms)");
    }
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage, text.len());
    }

    (text, elapsed_ms)
}

/// Resolve, rasterise, and encode the rebuttal PDF.
///
/// Preprocessing problems are logged and degrade to zero images — a
/// missing or unreadable rebuttal should weaken the prediction, not abort
/// it.
async fn preprocess_rebuttal(rebuttal_input: &str, config: &PredictionConfig) -> Vec<ImageData> {
    let resolved = match input::resolve_pdf(rebuttal_input, config.download_timeout_secs).await {
        Ok(r) => r,
        Err(e) => {
            warn!("Rebuttal unavailable ({e}); continuing without visual evidence");
            return Vec::new();
        }
    };

    let pages = match render::render_pages(
        resolved.path(),
        config.password.as_deref(),
        config.page_limit,
        config.page_width_px,
    )
    .await
    {
        Ok(pages) => pages,
        Err(e) => {
            warn!("Rebuttal rendering failed ({e}); continuing without visual evidence");
            return Vec::new();
        }
    };

    match encode::encode_pages(&pages) {
        Ok(images) => {
            info!("Rebuttal preprocessed: {} pages", images.len());
            images
        }
        Err(e) => {
            warn!("Rebuttal encoding failed ({e}); continuing without visual evidence");
            Vec::new()
        }
    }
}
