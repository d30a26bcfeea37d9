//! Decision-output recovery: parse possibly-malformed model output into a
//! fixed-shape [`DecisionRecord`].
//!
//! ## Why is recovery necessary?
//!
//! The decision stage asks the model for strict JSON, and models usually
//! comply — wrapped in a ```json fence, or with prose bolted on, or
//! truncated mid-object. Rather than failing the whole pipeline on a
//! formatting quirk, parsing is an ordered fallback chain:
//!
//! 1. empty input → the normalized default record, nothing else attempted
//! 2. strip one layer of surrounding code-fence markup, trim
//! 3. strict JSON object parse → normalize
//! 4. targeted regex extraction of `final_decision` and `confidence`
//!    (quoted-JSON or loose `label: value` form, each field independent)
//! 5. one targeted pattern for a quoted `reasoning` field; failing that,
//!    a 500-char snippet of the raw text goes to the log as the diagnostic
//! 6. normalize whatever was assembled
//!
//! Normalization guarantees every key of the record is present regardless
//! of how much was recovered, and it is idempotent: re-normalizing an
//! already-normalized record is a no-op.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Reasoning text used when neither `reasoning` nor `justification` was
/// recovered.
pub const DEFAULT_REASONING: &str = "No reasoning provided.";

/// The normalized prediction produced once per pipeline run.
///
/// All six keys are always serialized (nulls are not skipped), so the JSON
/// shape is stable however little the parser recovered. `final_score`
/// passes through untyped — the model may emit it as a number or a string
/// and no range validation is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// "Accept" or "Reject" (free-form string as emitted by the model).
    pub final_decision: Option<String>,
    /// e.g. "Accept (Poster)" / "Accept (Oral)" / "Reject".
    pub detailed_label: Option<String>,
    /// Predicted meta-review score, passed through as-is.
    pub final_score: Option<Value>,
    /// e.g. "Saved_by_Rebuttal", "Consensus_Accept".
    pub decision_archetype: Option<String>,
    /// Model's justification; never absent — falls back to
    /// [`DEFAULT_REASONING`] — but stays null when the model explicitly
    /// emitted `"reasoning": null`.
    pub reasoning: Option<String>,
    /// "High" / "Medium" / "Low".
    pub confidence: Option<String>,
}

// ── Regexes ──────────────────────────────────────────────────────────────

static RE_CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\n?(.*?)\n?```\s*$").unwrap());

static RE_DECISION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"final_decision"\s*:\s*"([^"]+)"|final[_ ]?decision[:：]\s*(Accept|Reject)"#)
        .unwrap()
});

static RE_CONFIDENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"confidence"\s*:\s*"([^"]+)"|confidence[:：]\s*(High|Medium|Low)"#).unwrap()
});

static RE_REASONING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""reasoning"\s*:\s*"([^"]+)""#).unwrap());

// ── Parsing ──────────────────────────────────────────────────────────────

/// Recover a [`DecisionRecord`] from raw model output.
///
/// Never fails and never panics; worst case every field is null and
/// `reasoning` carries [`DEFAULT_REASONING`].
pub fn parse_decision(raw_output: &str) -> DecisionRecord {
    let trimmed = raw_output.trim();
    if trimmed.is_empty() {
        return normalize(&Map::new());
    }

    let cleaned = strip_code_fence(trimmed);

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(cleaned) {
        return normalize(&map);
    }

    // Strict parse failed — extract fields independently from the cleaned
    // text. Absence of one field does not block the others.
    let mut partial = Map::new();

    if let Some(caps) = RE_DECISION.captures(cleaned) {
        if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
            partial.insert(
                "final_decision".to_string(),
                Value::String(m.as_str().trim().to_string()),
            );
        }
    }

    if let Some(caps) = RE_CONFIDENCE.captures(cleaned) {
        if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
            partial.insert(
                "confidence".to_string(),
                Value::String(m.as_str().trim().to_string()),
            );
        }
    }

    if let Some(caps) = RE_REASONING.captures(cleaned) {
        if let Some(m) = caps.get(1) {
            partial.insert(
                "reasoning".to_string(),
                Value::String(m.as_str().to_string()),
            );
        }
    } else {
        warn!(
            "No structured decision recovered; raw output snippet: {}",
            snippet(cleaned)
        );
    }

    normalize(&partial)
}

/// Strip one layer of surrounding markdown code-fence markup, if present.
///
/// Handles fences opened with or without a language tag. A no-op on
/// unfenced input.
fn strip_code_fence(input: &str) -> &str {
    match RE_CODE_FENCE.captures(input) {
        Some(caps) => caps.get(1).map(|m| m.as_str().trim()).unwrap_or(input),
        None => input,
    }
}

/// First 500 characters of the text, ellipsis-marked, for log diagnostics.
fn snippet(text: &str) -> String {
    let head: String = text.chars().take(500).collect();
    format!("{head}...")
}

// ── Normalization ────────────────────────────────────────────────────────

/// Normalize an arbitrary key/value mapping into the fixed record shape.
///
/// String fields are trimmed and coerced to string-or-null. `reasoning`
/// falls back from an absent `reasoning` key to `justification` to
/// [`DEFAULT_REASONING`]; a key that is present but null stays null.
/// `final_score` passes through unmodified. Idempotent: normalizing a
/// serialized [`DecisionRecord`] reproduces it.
pub fn normalize(data: &Map<String, Value>) -> DecisionRecord {
    DecisionRecord {
        final_decision: clean_str(data.get("final_decision")),
        detailed_label: clean_str(data.get("detailed_label")),
        final_score: data
            .get("final_score")
            .filter(|v| !v.is_null())
            .cloned(),
        decision_archetype: clean_str(data.get("decision_archetype")),
        reasoning: reasoning_of(data),
        confidence: clean_str(data.get("confidence")),
    }
}

fn reasoning_of(data: &Map<String, Value>) -> Option<String> {
    match data.get("reasoning") {
        Some(Value::Null) => None,
        Some(v) => Some(value_text(v)),
        None => match data.get("justification") {
            Some(Value::Null) => None,
            Some(v) => Some(value_text(v)),
            None => Some(DEFAULT_REASONING.to_string()),
        },
    }
}

/// Null/missing → None; strings trimmed; other scalars coerced to their
/// JSON text.
fn clean_str(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(v) => Some(v.to_string().trim().to_string()),
    }
}

/// Like [`clean_str`] but without trimming — `reasoning` is kept verbatim.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        v => v.to_string(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(record: &DecisionRecord) -> Map<String, Value> {
        match serde_json::to_value(record).unwrap() {
            Value::Object(map) => map,
            other => panic!("record must serialize to an object, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_yields_default_record() {
        let rec = parse_decision("");
        assert_eq!(rec.final_decision, None);
        assert_eq!(rec.detailed_label, None);
        assert_eq!(rec.final_score, None);
        assert_eq!(rec.decision_archetype, None);
        assert_eq!(rec.confidence, None);
        assert_eq!(rec.reasoning.as_deref(), Some(DEFAULT_REASONING));
    }

    #[test]
    fn whitespace_only_input_yields_default_record() {
        assert_eq!(parse_decision("   \n\t  "), parse_decision(""));
    }

    #[test]
    fn fenced_json_matches_spec_vector() {
        let raw = "```json\n{\"final_decision\": \"Accept\", \"confidence\": \"High\"}\n```";
        let rec = parse_decision(raw);
        assert_eq!(rec.final_decision.as_deref(), Some("Accept"));
        assert_eq!(rec.confidence.as_deref(), Some("High"));
        assert_eq!(rec.reasoning.as_deref(), Some(DEFAULT_REASONING));
        assert_eq!(rec.detailed_label, None);
        assert_eq!(rec.final_score, None);
        assert_eq!(rec.decision_archetype, None);
    }

    #[test]
    fn fence_stripping_is_semantic_noop() {
        let bare = r#"{"final_decision": "Reject", "confidence": "Low"}"#;
        let fenced = format!("```json\n{bare}\n```");
        let untagged = format!("```\n{bare}\n```");
        assert_eq!(parse_decision(&fenced), parse_decision(bare));
        assert_eq!(parse_decision(&untagged), parse_decision(bare));
    }

    #[test]
    fn loose_labels_recovered_by_fallback() {
        let rec = parse_decision("final_decision: Reject, confidence: Low");
        assert_eq!(rec.final_decision.as_deref(), Some("Reject"));
        assert_eq!(rec.confidence.as_deref(), Some("Low"));
        assert_eq!(rec.reasoning.as_deref(), Some(DEFAULT_REASONING));
    }

    #[test]
    fn fallback_fields_are_independent() {
        let rec = parse_decision("after discussion, final decision: Accept");
        assert_eq!(rec.final_decision.as_deref(), Some("Accept"));
        assert_eq!(rec.confidence, None);
    }

    #[test]
    fn fallback_matches_quoted_fields_in_prose() {
        let raw = r#"Here is my verdict: "final_decision": "Accept", and "reasoning": "strong rebuttal" overall."#;
        let rec = parse_decision(raw);
        assert_eq!(rec.final_decision.as_deref(), Some("Accept"));
        assert_eq!(rec.reasoning.as_deref(), Some("strong rebuttal"));
    }

    #[test]
    fn fallback_is_case_insensitive() {
        let rec = parse_decision("FINAL_DECISION: reject\nCONFIDENCE: high");
        assert_eq!(rec.final_decision.as_deref(), Some("reject"));
        assert_eq!(rec.confidence.as_deref(), Some("high"));
    }

    #[test]
    fn truncated_fenced_json_recovers_via_fallback() {
        // Opening fence, no closing fence, JSON cut off mid-object: strict
        // parsing fails but the quoted field is still recoverable.
        let raw = "```json\n{\"final_decision\": \"Accept\", \"confiden";
        let rec = parse_decision(raw);
        assert_eq!(rec.final_decision.as_deref(), Some("Accept"));
        assert_eq!(rec.confidence, None);
    }

    #[test]
    fn gibberish_yields_default_record() {
        let rec = parse_decision("the model rambled about unrelated things");
        assert_eq!(rec.final_decision, None);
        assert_eq!(rec.confidence, None);
        assert_eq!(rec.reasoning.as_deref(), Some(DEFAULT_REASONING));
    }

    #[test]
    fn full_record_parses() {
        let raw = json!({
            "final_decision": "Accept",
            "detailed_label": "Accept (Poster)",
            "final_score": 5,
            "decision_archetype": "Saved_by_Rebuttal",
            "justification": "R1's math concern was resolved by the new derivation.",
            "confidence": "Medium",
        })
        .to_string();
        let rec = parse_decision(&raw);
        assert_eq!(rec.detailed_label.as_deref(), Some("Accept (Poster)"));
        assert_eq!(rec.final_score, Some(json!(5)));
        assert_eq!(rec.decision_archetype.as_deref(), Some("Saved_by_Rebuttal"));
        assert_eq!(
            rec.reasoning.as_deref(),
            Some("R1's math concern was resolved by the new derivation.")
        );
    }

    #[test]
    fn final_score_passes_through_untyped() {
        let num = parse_decision(r#"{"final_score": 5}"#);
        assert_eq!(num.final_score, Some(json!(5)));
        let s = parse_decision(r#"{"final_score": "4-5"}"#);
        assert_eq!(s.final_score, Some(json!("4-5")));
        // No range validation either.
        let wild = parse_decision(r#"{"final_score": 42}"#);
        assert_eq!(wild.final_score, Some(json!(42)));
    }

    #[test]
    fn string_fields_are_trimmed_and_coerced() {
        let rec = parse_decision(r#"{"final_decision": "  Accept  ", "confidence": 3}"#);
        assert_eq!(rec.final_decision.as_deref(), Some("Accept"));
        assert_eq!(rec.confidence.as_deref(), Some("3"));
    }

    #[test]
    fn reasoning_prefers_reasoning_over_justification() {
        let rec = parse_decision(r#"{"reasoning": "a", "justification": "b"}"#);
        assert_eq!(rec.reasoning.as_deref(), Some("a"));
    }

    #[test]
    fn explicit_null_reasoning_stays_null() {
        let rec = parse_decision(r#"{"final_decision": "Reject", "reasoning": null}"#);
        assert_eq!(rec.reasoning, None);
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "",
            "final_decision: Reject, confidence: Low",
            r#"{"final_decision": "Accept", "final_score": "5", "reasoning": null}"#,
            r#"{"justification": "  spaced  ", "confidence": " High "}"#,
        ];
        for input in inputs {
            let once = parse_decision(input);
            let twice = normalize(&as_map(&once));
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn record_serializes_with_all_keys_present() {
        let map = as_map(&parse_decision("nonsense"));
        for key in [
            "final_decision",
            "detailed_label",
            "final_score",
            "decision_archetype",
            "reasoning",
            "confidence",
        ] {
            assert!(map.contains_key(key), "missing key {key}");
        }
        assert_eq!(map["final_decision"], Value::Null);
    }

    #[test]
    fn non_object_json_falls_through_to_extraction() {
        // A top-level array is valid JSON but not a record; the fallback
        // still recovers nothing and must not panic.
        let rec = parse_decision("[1, 2, 3]");
        assert_eq!(rec.final_decision, None);
        assert_eq!(rec.reasoning.as_deref(), Some(DEFAULT_REASONING));
    }

    #[test]
    fn snippet_is_char_safe() {
        let long = "é".repeat(600);
        let s = snippet(&long);
        assert!(s.ends_with("..."));
        assert_eq!(s.chars().count(), 503);
    }
}
