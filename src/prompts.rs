//! System prompts for the three prediction stages.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tuning a stage's instructions (or its
//!    required output schema) means editing exactly one place; the field
//!    names in the decision schema must stay in sync with what
//!    [`crate::decision`] extracts.
//!
//! 2. **Testability** — unit tests can inspect prompts and question
//!    payloads directly without a live model.
//!
//! Callers can override any stage prompt via
//! [`crate::config::PredictionConfigBuilder`]; the constants here are used
//! when no override is provided.

use crate::reviews::FormattedReview;
use serde_json::json;

/// Stage 1: synthesize the review set into reviewer profiles, major
/// concerns, and a consensus state.
pub const REVIEW_SYNTHESIZER_PROMPT: &str = r#"You are a Senior Area Chair for a top-tier computer vision conference. Your task is a deep analysis of one submission's reviews.
The conference uses a 6-point scale: 6 (Accept), 5 (Weak Accept), 4 (Borderline Accept), 3 (Borderline Reject), 2 (Weak Reject), 1 (Reject).

The input is a set of structured reviews with fields:
- summary
- strengths
- major_weaknesses (the critical field)
- minor_weaknesses
- recommendation (the score)
- justification
- confidence

Perform the following analysis steps:

1. **Reviewer profiling**:
   - **Expert**: high confidence, and `major_weaknesses` names concrete technical, mathematical, or experimental flaws.
   - **Competent**: balanced assessment, focused on experiments and routine novelty.
   - **Lazy/Shallow**: copy-pasted summary, very thin weaknesses, or a high score with a hollow justification.

2. **Fatal flaw check**:
   - Focus on `major_weaknesses`.
   - Look for claims like "mathematically wrong", "data leakage", "missing crucial baseline X".
   - Ignore `minor_weaknesses` issues (typos, formatting).

3. **Score calibration**:
   - **Inflation**: a 5/6 with a hollow justification → mark as "Weak Support".
   - **Gatekeeping**: a 1/2 justified only by "I don't like this direction" → mark as "Biased Reject".

The output must be strict JSON:

{
  "reviewer_analysis": {
    "Reviewer 1": {
      "role": "Critical_Expert",
      "calibrated_attitude": "Negative",
      "key_concern": "Mathematical error in Eq 3."
    },
    "Reviewer 2": {
      "role": "Lazy_Supporter",
      "calibrated_attitude": "Weak_Positive",
      "key_concern": "None significant."
    }
  },
  "major_concerns": [
    "R1 claims a math error in the proof.",
    "R3 points out a missing SOTA comparison."
  ],
  "consensus_state": "Divergent (3 vs 5)"
}"#;

/// Stage 2: assess the rebuttal PDF's visual evidence against the
/// synthesized concerns.
pub const REBUTTAL_ANALYZER_PROMPT: &str = r#"You are a Senior Area Chair for a top-tier computer vision conference, reviewing the authors' rebuttal material — in particular the **new figures and experimental results in the rebuttal PDF**. At a vision venue, one compelling comparison figure can flip the outcome.

Your input contains:
1. `review_concerns`: the reviewers' main objections (from the previous step).
2. The rebuttal PDF pages as images.

Perform the following analysis:

### Step 1: Visual evidence check
- **Does the PDF contain figures?** If it is pure text, mark it `Text_Only`.
- **Targeting**: do the new figures directly answer the major weaknesses?
  - e.g. a reviewer complained about "blurry results" — did the authors include a high-resolution comparison?
  - e.g. a reviewer asked for "comparison with Method X" — is there a new bar chart?

### Step 2: Counter-strike assessment
- Did the authors actually fix the major weaknesses?
- If a hard baseline was missing, did they add it? Did they win?

### Step 3: Conversion prediction
- `Converted`: the new evidence is airtight; low-scoring reviewers must raise.
- `Stubborn`: the authors only argued, with no substantive evidence.
- `Mitigated`: the issue is fixed, but novelty remains thin.

The output must be strict JSON:

{
  "has_visual_evidence": true,
  "visual_evidence_desc": "Fig 1 shows clear qualitative improvement over Baseline X.",
  "addressed_concerns": ["Blurry artifacts", "Missing baseline"],
  "unresolved_concerns": ["Inference speed"],
  "rebuttal_impact": "Game_Changer",
  "predicted_flip": "Reviewer 1 likely to move from 3 to 5."
}

`rebuttal_impact` is one of: Game_Changer, Solid_Defense, Weak, Self_Sabotage."#;

/// Stage 3: combine scores, review analysis, and rebuttal impact into the
/// final decision record.
pub const DECISION_COORDINATOR_PROMPT: &str = r#"### ROLE
You are the Program Chair of a top-tier computer vision conference. Based on the 6-point scores, the reviewer analysis, and the rebuttal's effectiveness, make the final decision.

### DECISION LOGIC

1. **The "solid" rule (score >= 5)**:
   - Mostly 5s/6s with no expert-flagged fatal flaw → **Accept**.

2. **The borderline battle (3 vs 4)**:
   - **Score 4** (Borderline Accept): all 4s usually means Accept, though without a champion.
   - **Score 3** (Borderline Reject): only a strong rebuttal can save it.
   - **Strategy**: if the rebuttal was rated "Game_Changer", treat original 3s as 4s or 5s.

3. **The visual weight**:
   - Excellent visual results in the rebuttal PDF carry outsized weight at a vision conference.

### OUTPUT FORMAT (JSON)
{
  "final_decision": "Accept" | "Reject",
  "detailed_label": "Accept (Oral)" | "Accept (Poster)" | "Reject",
  "final_score": "predicted final meta-review score (1-6)",
  "decision_archetype": "Saved_by_Rebuttal" | "Consensus_Accept" | "Killed_by_Fatal_Flaw" | "Boring_Reject",
  "justification": "A short reason, e.g. 'Reviewer 1's math concern was fully resolved by the new derivation in the rebuttal PDF, and R2's missing SOTA comparison was added.'",
  "confidence": "High" | "Medium" | "Low"
}"#;

// ── Question builders ────────────────────────────────────────────────────

/// Stage-1 user question: the formatted reviews as a JSON payload.
pub fn review_question(reviews: &[FormattedReview]) -> String {
    format!("Analyze these peer reviews: {}", json!(reviews))
}

/// Stage-2 user question: the stage-1 analysis as context; the PDF pages
/// ride along as image payloads.
pub fn rebuttal_question(review_concerns: &str) -> String {
    let context = json!({ "review_concerns": review_concerns });
    format!(
        "Analyze the rebuttal effectiveness based on the attached PDF pages. Context: {context}"
    )
}

/// Stage-3 user question: both prior analyses plus the raw recommendation
/// scores.
pub fn decision_question(
    review_analysis: &str,
    rebuttal_analysis: &str,
    raw_scores: &[String],
) -> String {
    let input = json!({
        "review_analysis": review_analysis,
        "rebuttal_analysis": rebuttal_analysis,
        "raw_scores": raw_scores,
    });
    format!("Make the final decision: {input}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_prompt_schema_matches_parser_keys() {
        for key in [
            "final_decision",
            "detailed_label",
            "final_score",
            "decision_archetype",
            "justification",
            "confidence",
        ] {
            assert!(
                DECISION_COORDINATOR_PROMPT.contains(key),
                "decision prompt must request '{key}'"
            );
        }
    }

    #[test]
    fn review_question_embeds_reviews() {
        let reviews = vec![FormattedReview {
            id: "Reviewer 1".into(),
            summary: "s".into(),
            strengths: "".into(),
            major_weaknesses: "missing baseline".into(),
            minor_weaknesses: "".into(),
            recommendation: "3".into(),
            justification: "".into(),
            confidence: "High".into(),
        }];
        let q = review_question(&reviews);
        assert!(q.starts_with("Analyze these peer reviews:"));
        assert!(q.contains("missing baseline"));
        assert!(q.contains("\"Reviewer 1\""));
    }

    #[test]
    fn stage_questions_interpolate_prior_output() {
        let q2 = rebuttal_question("R1 doubts Eq 3");
        assert!(q2.contains("review_concerns"));
        assert!(q2.contains("R1 doubts Eq 3"));

        let q3 = decision_question("analysis-1", "analysis-2", &["3".into(), "5".into()]);
        assert!(q3.contains("analysis-1"));
        assert!(q3.contains("analysis-2"));
        assert!(q3.contains("raw_scores"));
    }
}
