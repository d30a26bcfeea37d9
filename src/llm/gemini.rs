//! Gemini backend adapter (`generateContent` REST API).
//!
//! ## Retry Strategy
//!
//! Gemini free-tier quotas surface as HTTP 429 / `RESOURCE_EXHAUSTED`
//! errors that clear on their own once the window rolls over, so quota
//! signals get exponential backoff (`5 * 2^attempt` seconds: 5 s → 10 s →
//! 20 s) while every other error class sleeps a flat 2 s. Quota detection
//! is pattern matching on the error text — the REST error body carries the
//! `RESOURCE_EXHAUSTED` status string even when the HTTP code is a generic
//! 400-family one.

use super::{effective_max_tokens, GeminiCredentials, InferenceRequest, ProviderKind, MAX_ATTEMPTS};
use crate::error::LlmError;
use serde_json::{json, Value};
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Wraps one Gemini credential and the shared HTTP client.
pub struct GeminiAdapter {
    http: reqwest::Client,
    credentials: GeminiCredentials,
}

impl GeminiAdapter {
    pub fn new(http: reqwest::Client, credentials: GeminiCredentials) -> Self {
        Self { http, credentials }
    }

    /// Execute a request with retries.
    ///
    /// `Ok("")` is a soft failure (the model answered with no text) and is
    /// returned immediately without retrying; only transport and API errors
    /// consume attempts.
    pub async fn invoke(&self, request: &InferenceRequest) -> Result<String, LlmError> {
        let mut last_error = String::new();

        for attempt in 0..MAX_ATTEMPTS {
            match self.call_once(request).await {
                Ok(text) => {
                    debug!(
                        "Gemini responded on attempt {} ({} chars)",
                        attempt + 1,
                        text.len()
                    );
                    return Ok(text);
                }
                Err(err_text) => {
                    let delay = retry_delay(&err_text, attempt);
                    if is_quota_signal(&err_text) {
                        warn!(
                            "Gemini quota exceeded (attempt {}), retrying in {}s",
                            attempt + 1,
                            delay.as_secs()
                        );
                    } else {
                        warn!(
                            "Gemini error (attempt {}): {} — retrying in {}s",
                            attempt + 1,
                            err_text,
                            delay.as_secs()
                        );
                    }
                    sleep(delay).await;
                    last_error = err_text;
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            provider: ProviderKind::Gemini,
            attempts: MAX_ATTEMPTS,
            last_error,
        })
    }

    /// One HTTP round trip. Errors are stringified so the retry loop can
    /// pattern-match quota markers regardless of where they originated.
    async fn call_once(&self, request: &InferenceRequest) -> Result<String, String> {
        let url = self.endpoint(&request.model);
        let body = build_request_body(request);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.credentials.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("transport error: {e}"))?;

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|e| format!("HTTP {status}: body read failed: {e}"))?;

        if !status.is_success() {
            return Err(format!("HTTP {}: {}", status.as_u16(), payload));
        }

        let parsed: Value =
            serde_json::from_str(&payload).map_err(|e| format!("malformed response JSON: {e}"))?;
        Ok(extract_text(&parsed))
    }

    fn endpoint(&self, model: &str) -> String {
        let base = self
            .credentials
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!("{base}/v1beta/models/{model}:generateContent")
    }
}

/// Build the `generateContent` request body.
///
/// Images come before the text in the user parts, matching the multimodal
/// ordering used by both adapters.
fn build_request_body(request: &InferenceRequest) -> Value {
    let mut parts: Vec<Value> = request
        .images
        .iter()
        .map(|img| {
            json!({
                "inline_data": {
                    "mime_type": img.mime_type,
                    "data": img.data,
                }
            })
        })
        .collect();
    parts.push(json!({ "text": request.user_text }));

    json!({
        "system_instruction": {
            "parts": [{ "text": request.system_prompt }]
        },
        "contents": [{
            "role": "user",
            "parts": parts,
        }],
        "generationConfig": {
            "temperature": request.temperature,
            "maxOutputTokens": effective_max_tokens(&request.model, request.max_output_tokens),
        },
    })
}

/// Concatenate the text parts of the first candidate; empty when the
/// response carries no text (blocked, truncated to zero, or malformed).
fn extract_text(response: &Value) -> String {
    response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

/// Quota / rate-limit detection over the stringified error.
fn is_quota_signal(err_text: &str) -> bool {
    err_text.contains("429") || err_text.contains("RESOURCE_EXHAUSTED")
}

/// Backoff before the next attempt: exponential for quota signals, flat
/// 2 s otherwise.
fn retry_delay(err_text: &str, attempt: u32) -> Duration {
    if is_quota_signal(err_text) {
        Duration::from_secs(5 * 2u64.pow(attempt))
    } else {
        Duration::from_secs(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ImageData;

    fn sample_request() -> InferenceRequest {
        InferenceRequest::new("be a reviewer", "judge this", "gemini-2.5-flash")
            .with_images(vec![ImageData::jpeg("AAAA"), ImageData::jpeg("BBBB")])
            .with_temperature(0.7)
            .with_max_output_tokens(2048)
    }

    #[test]
    fn body_places_images_before_text() {
        let body = build_request_body(&sample_request());
        let parts = body.pointer("/contents/0/parts").unwrap().as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(
            parts[0].pointer("/inline_data/data").unwrap().as_str(),
            Some("AAAA")
        );
        assert_eq!(
            parts[1].pointer("/inline_data/mime_type").unwrap().as_str(),
            Some("image/jpeg")
        );
        assert_eq!(parts[2].get("text").unwrap().as_str(), Some("judge this"));
    }

    #[test]
    fn body_carries_system_instruction_and_config() {
        let body = build_request_body(&sample_request());
        assert_eq!(
            body.pointer("/system_instruction/parts/0/text").unwrap().as_str(),
            Some("be a reviewer")
        );
        assert_eq!(
            body.pointer("/generationConfig/maxOutputTokens").unwrap().as_u64(),
            Some(2048)
        );
    }

    #[test]
    fn thinking_model_forces_token_cap() {
        let mut req = sample_request();
        req.model = "gemini-2.0-flash-thinking-exp".to_string();
        req.max_output_tokens = 1024;
        let body = build_request_body(&req);
        assert_eq!(
            body.pointer("/generationConfig/maxOutputTokens").unwrap().as_u64(),
            Some(8192)
        );
    }

    #[test]
    fn extracts_candidate_text() {
        let response = serde_json::json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "text": "Accept" }, { "text": " (Poster)" }]
                }
            }]
        });
        assert_eq!(extract_text(&response), "Accept (Poster)");
    }

    #[test]
    fn empty_or_blocked_response_extracts_empty() {
        assert_eq!(extract_text(&serde_json::json!({})), "");
        let blocked = serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert_eq!(extract_text(&blocked), "");
    }

    #[test]
    fn quota_backoff_sequence() {
        let err = "HTTP 429: rate limited";
        assert_eq!(retry_delay(err, 0), Duration::from_secs(5));
        assert_eq!(retry_delay(err, 1), Duration::from_secs(10));
        assert_eq!(retry_delay(err, 2), Duration::from_secs(20));
    }

    #[test]
    fn resource_exhausted_marker_counts_as_quota() {
        assert!(is_quota_signal("HTTP 400: status RESOURCE_EXHAUSTED"));
        assert!(is_quota_signal("HTTP 429: too many requests"));
        assert!(!is_quota_signal("HTTP 500: internal"));
    }

    #[test]
    fn non_quota_backoff_is_flat() {
        assert_eq!(retry_delay("HTTP 500: boom", 0), Duration::from_secs(2));
        assert_eq!(retry_delay("transport error: timeout", 2), Duration::from_secs(2));
    }

    #[test]
    fn endpoint_respects_base_url_override() {
        let adapter = GeminiAdapter::new(
            reqwest::Client::new(),
            GeminiCredentials {
                api_key: "k".into(),
                base_url: Some("https://proxy.example/".into()),
            },
        );
        assert_eq!(
            adapter.endpoint("gemini-2.5-flash"),
            "https://proxy.example/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
