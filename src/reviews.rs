//! Reviews input: load the reviews JSON file and shape it for the
//! synthesizer stage.
//!
//! The input format is whatever the conference's export produces — a JSON
//! array of objects keyed by human-readable column names ("Paper Summary",
//! "Major Weaknesses", …). Loading is deliberately tolerant: unrecognized
//! keys are ignored, missing keys default to an empty string, and scalar
//! values that are not strings (a numeric recommendation score, say) are
//! coerced to their JSON text. A file that is missing or not a JSON array
//! is the one fatal case — there is no pipeline without reviews.

use crate::error::PredictError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// Recognized source keys, in the conference export's naming.
const KEY_SUMMARY: &str = "Paper Summary";
const KEY_STRENGTHS: &str = "Paper Strengths";
const KEY_MAJOR_WEAKNESSES: &str = "Major Weaknesses";
const KEY_MINOR_WEAKNESSES: &str = "Minor Weaknesses";
const KEY_RECOMMENDATION: &str = "Preliminary Recommendation";
const KEY_JUSTIFICATION: &str = "Justification For Recommendation And Suggestions For Rebuttal";
const KEY_CONFIDENCE: &str = "Confidence Level";

/// One reviewer's record, reshaped for prompt consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedReview {
    /// Positional id, "Reviewer 1" onward.
    pub id: String,
    pub summary: String,
    pub strengths: String,
    pub major_weaknesses: String,
    pub minor_weaknesses: String,
    pub recommendation: String,
    pub justification: String,
    pub confidence: String,
}

/// Load the raw review records from a JSON file.
///
/// # Errors
/// Fatal: file missing/unreadable, or content not a JSON array of objects.
pub fn load_reviews(path: impl AsRef<Path>) -> Result<Vec<Map<String, Value>>, PredictError> {
    let path = path.as_ref();

    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PredictError::ReviewsNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PredictError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(PredictError::InvalidReviews {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })
        }
    };

    let value: Value =
        serde_json::from_str(&text).map_err(|e| PredictError::InvalidReviews {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    let records = match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                other => Err(PredictError::InvalidReviews {
                    path: path.to_path_buf(),
                    detail: format!("expected review objects, found {}", type_name(&other)),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?,
        other => {
            return Err(PredictError::InvalidReviews {
                path: path.to_path_buf(),
                detail: format!("expected a JSON array, found {}", type_name(&other)),
            })
        }
    };

    debug!("Loaded {} review records from {}", records.len(), path.display());
    Ok(records)
}

/// Reshape raw review records into [`FormattedReview`]s, extracting the
/// recognized keys and assigning positional reviewer ids.
pub fn format_reviews(records: &[Map<String, Value>]) -> Vec<FormattedReview> {
    records
        .iter()
        .enumerate()
        .map(|(idx, record)| FormattedReview {
            id: format!("Reviewer {}", idx + 1),
            summary: field(record, KEY_SUMMARY),
            strengths: field(record, KEY_STRENGTHS),
            major_weaknesses: field(record, KEY_MAJOR_WEAKNESSES),
            minor_weaknesses: field(record, KEY_MINOR_WEAKNESSES),
            recommendation: field(record, KEY_RECOMMENDATION),
            justification: field(record, KEY_JUSTIFICATION),
            confidence: field(record, KEY_CONFIDENCE),
        })
        .collect()
}

/// Extract a field as text: missing/null → "", strings as-is, other
/// scalars as their JSON text.
fn field(record: &Map<String, Value>, key: &str) -> String {
    match record.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
