//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn PredictionProgressCallback>`] via
//! [`crate::config::PredictionConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline works through its three stages.
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a terminal spinner, a log record, or a WebSocket
//! without the library knowing how the host application communicates. All
//! methods have default no-op implementations so callers only override
//! what they care about. The pipeline is sequential, so events arrive in
//! order from a single task; `Send + Sync` is still required because the
//! callback is shared through the config.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three stages of the prediction pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionStage {
    /// Stage 1: synthesize the review set.
    ReviewSynthesis,
    /// Stage 2: analyze the rebuttal PDF against the concerns.
    RebuttalAnalysis,
    /// Stage 3: produce the final decision.
    DecisionCoordination,
}

impl PredictionStage {
    /// 1-based position in the pipeline.
    pub fn index(&self) -> usize {
        match self {
            PredictionStage::ReviewSynthesis => 1,
            PredictionStage::RebuttalAnalysis => 2,
            PredictionStage::DecisionCoordination => 3,
        }
    }

    /// Total number of stages.
    pub const COUNT: usize = 3;
}

impl fmt::Display for PredictionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionStage::ReviewSynthesis => write!(f, "review synthesis"),
            PredictionStage::RebuttalAnalysis => write!(f, "rebuttal analysis"),
            PredictionStage::DecisionCoordination => write!(f, "decision coordination"),
        }
    }
}

/// Called by the pipeline as it moves through the stages.
pub trait PredictionProgressCallback: Send + Sync {
    /// Called once before stage 1, after the reviews have loaded.
    ///
    /// `review_count` is the number of review records in play.
    fn on_pipeline_start(&self, review_count: usize) {
        let _ = review_count;
    }

    /// Called immediately before a stage's inference call.
    fn on_stage_start(&self, stage: PredictionStage) {
        let _ = stage;
    }

    /// Called when a stage's inference call returns.
    ///
    /// `output_len` is the raw output length in bytes; `0` means the stage
    /// degraded to an empty result (the pipeline continues regardless).
    fn on_stage_complete(&self, stage: PredictionStage, output_len: usize) {
        let _ = (stage, output_len);
    }

    /// Called once after the decision record has been parsed.
    ///
    /// `decided` is false when no `final_decision` was recovered.
    fn on_pipeline_complete(&self, decided: bool) {
        let _ = decided;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_indices_are_ordered() {
        assert_eq!(PredictionStage::ReviewSynthesis.index(), 1);
        assert_eq!(PredictionStage::RebuttalAnalysis.index(), 2);
        assert_eq!(PredictionStage::DecisionCoordination.index(), 3);
        assert_eq!(PredictionStage::COUNT, 3);
    }

    #[test]
    fn default_methods_are_noops() {
        struct Silent;
        impl PredictionProgressCallback for Silent {}
        let cb = Silent;
        cb.on_pipeline_start(3);
        cb.on_stage_start(PredictionStage::ReviewSynthesis);
        cb.on_stage_complete(PredictionStage::ReviewSynthesis, 0);
        cb.on_pipeline_complete(false);
    }
}
