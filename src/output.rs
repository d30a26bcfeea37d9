//! Output types: the parsed decision plus the run's transcripts and stats.

use crate::decision::DecisionRecord;
use serde::{Deserialize, Serialize};

/// Full result of one prediction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionOutput {
    /// The normalized decision record.
    pub decision: DecisionRecord,
    /// Raw per-stage model output, for inspection and audit.
    pub transcript: StageTranscript,
    /// Run statistics.
    pub stats: PredictionStats,
}

impl PredictionOutput {
    /// True when the pipeline recovered an actual decision.
    ///
    /// The degrade-to-empty contract means a fully failed run still returns
    /// `Ok(PredictionOutput)`; this is how callers detect that no
    /// prediction was produced.
    pub fn is_decided(&self) -> bool {
        self.decision.final_decision.is_some()
    }
}

/// Raw text produced by each stage. Empty strings mark degraded stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageTranscript {
    /// Stage 1: review synthesis.
    pub review_analysis: String,
    /// Stage 2: rebuttal analysis.
    pub rebuttal_analysis: String,
    /// Stage 3: raw decision output (pre-parsing).
    pub decision_raw: String,
}

/// Timing and size statistics for a prediction run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionStats {
    /// Number of review records fed to stage 1.
    pub review_count: usize,
    /// Number of rebuttal pages attached to stage 2 (0 = no rebuttal).
    pub rebuttal_pages: usize,
    /// Wall-clock time rasterising + encoding the rebuttal PDF.
    pub preprocess_ms: u64,
    /// Wall-clock time of the stage-1 call (including retries).
    pub review_stage_ms: u64,
    /// Wall-clock time of the stage-2 call (including retries).
    pub rebuttal_stage_ms: u64,
    /// Wall-clock time of the stage-3 call (including retries).
    pub decision_stage_ms: u64,
    /// Total pipeline wall-clock time.
    pub total_ms: u64,
}
