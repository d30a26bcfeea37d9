//! OpenAI backend adapter (`chat/completions` API).
//!
//! Also covers OpenAI-compatible gateways via the base-URL override —
//! anything that accepts the same request shape and bearer auth.
//!
//! ## Retry Strategy
//!
//! Unlike [`super::gemini`], this adapter does not special-case quota
//! errors: every failure class sleeps a flat 2 s between attempts. OpenAI
//! 429s usually clear within a couple of seconds, and the per-call timeout
//! already bounds the slow cases.

use super::{effective_max_tokens, InferenceRequest, OpenAiCredentials, ProviderKind, MAX_ATTEMPTS};
use crate::error::LlmError;
use serde_json::{json, Value};
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Flat backoff between attempts, every error class.
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Wraps one OpenAI credential and the shared HTTP client.
pub struct OpenAiAdapter {
    http: reqwest::Client,
    credentials: OpenAiCredentials,
}

impl OpenAiAdapter {
    pub fn new(http: reqwest::Client, credentials: OpenAiCredentials) -> Self {
        Self { http, credentials }
    }

    /// Execute a request with retries.
    ///
    /// `Ok("")` is a soft failure (empty completion content) and returns
    /// immediately; only transport and API errors consume attempts.
    pub async fn invoke(&self, request: &InferenceRequest) -> Result<String, LlmError> {
        let mut last_error = String::new();

        for attempt in 0..MAX_ATTEMPTS {
            match self.call_once(request).await {
                Ok(text) => {
                    debug!(
                        "OpenAI responded on attempt {} ({} chars)",
                        attempt + 1,
                        text.len()
                    );
                    return Ok(text);
                }
                Err(err_text) => {
                    warn!(
                        "OpenAI error (attempt {}): {} — retrying in {}s",
                        attempt + 1,
                        err_text,
                        RETRY_DELAY.as_secs()
                    );
                    sleep(RETRY_DELAY).await;
                    last_error = err_text;
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            provider: ProviderKind::OpenAi,
            attempts: MAX_ATTEMPTS,
            last_error,
        })
    }

    async fn call_once(&self, request: &InferenceRequest) -> Result<String, String> {
        let url = self.endpoint();
        let body = build_request_body(request);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.credentials.api_key)
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

    fn endpoint(&self) -> String {
        let base = self
            .credentials
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!("{base}/chat/completions")
    }
}

/// Build the `chat/completions` request body.
///
/// The user content is an array of `image_url` parts (base64 data URLs,
/// `detail: "high"` so fine print in rebuttal figures survives tiling)
/// followed by one `text` part — images strictly before text.
fn build_request_body(request: &InferenceRequest) -> Value {
    let mut content: Vec<Value> = request
        .images
        .iter()
        .map(|img| {
            json!({
                "type": "image_url",
                "image_url": {
                    "url": img.to_data_url(),
                    "detail": "high",
                }
            })
        })
        .collect();
    content.push(json!({ "type": "text", "text": request.user_text }));

    json!({
        "model": request.model,
        "messages": [
            { "role": "system", "content": request.system_prompt },
            { "role": "user", "content": content },
        ],
        "temperature": request.temperature,
        "max_tokens": effective_max_tokens(&request.model, request.max_output_tokens),
    })
}

/// First choice's message content; empty when missing or null.
fn extract_text(response: &Value) -> String {
    response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ImageData;

    fn sample_request() -> InferenceRequest {
        InferenceRequest::new("be a chair", "decide", "gpt-4o")
            .with_images(vec![ImageData::jpeg("QUJD")])
            .with_temperature(1.0)
            .with_max_output_tokens(4096)
    }

    #[test]
    fn body_places_images_before_text() {
        let body = build_request_body(&sample_request());
        let content = body.pointer("/messages/1/content").unwrap().as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0].get("type").unwrap().as_str(), Some("image_url"));
        assert_eq!(
            content[0].pointer("/image_url/url").unwrap().as_str(),
            Some("data:image/jpeg;base64,QUJD")
        );
        assert_eq!(
            content[0].pointer("/image_url/detail").unwrap().as_str(),
            Some("high")
        );
        assert_eq!(content[1].get("text").unwrap().as_str(), Some("decide"));
    }

    #[test]
    fn system_message_comes_first() {
        let body = build_request_body(&sample_request());
        assert_eq!(
            body.pointer("/messages/0/role").unwrap().as_str(),
            Some("system")
        );
        assert_eq!(
            body.pointer("/messages/0/content").unwrap().as_str(),
            Some("be a chair")
        );
        assert_eq!(body.get("max_tokens").unwrap().as_u64(), Some(4096));
    }

    #[test]
    fn text_only_request_has_single_text_part() {
        let req = InferenceRequest::new("sys", "q", "gpt-4o");
        let body = build_request_body(&req);
        let content = body.pointer("/messages/1/content").unwrap().as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0].get("type").unwrap().as_str(), Some("text"));
    }

    #[test]
    fn extracts_choice_content() {
        let response = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "Reject" } }]
        });
        assert_eq!(extract_text(&response), "Reject");
    }

    #[test]
    fn null_or_missing_content_extracts_empty() {
        let null_content = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": null } }]
        });
        assert_eq!(extract_text(&null_content), "");
        assert_eq!(extract_text(&serde_json::json!({})), "");
    }
}
