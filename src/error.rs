//! Error types for the paper2verdict library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PredictError`] — **Fatal**: the prediction cannot proceed at all
//!   (reviews file missing or malformed, invalid configuration, output file
//!   not writable). Returned as `Err(PredictError)` from the top-level
//!   `predict*` functions.
//!
//! * [`LlmError`] — **Degrading**: an inference call could not produce text
//!   (provider not configured, unrecognised model id, retries exhausted).
//!   These never cross the [`crate::llm::InferenceClient::complete`]
//!   boundary — there they collapse to an empty string so a failed stage
//!   degrades the pipeline instead of aborting it. Callers who need to tell
//!   "model returned nothing" from "call failed" use
//!   [`crate::llm::InferenceClient::try_complete`] and match on this type.

use crate::llm::ProviderKind;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the paper2verdict library.
///
/// Stage-level inference failures use [`LlmError`] and degrade to empty
/// stage output rather than propagating here.
#[derive(Debug, Error)]
pub enum PredictError {
    // ── Reviews input errors ──────────────────────────────────────────────
    /// Reviews JSON file was not found at the given path.
    #[error("Reviews file not found: '{path}'\nCheck the path exists and is readable.")]
    ReviewsNotFound { path: PathBuf },

    /// Process does not have read permission on the reviews file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The reviews file exists but is not a JSON array of review records.
    #[error("Invalid reviews file '{path}': {detail}\nExpected a JSON array of review objects.")]
    InvalidReviews { path: PathBuf, detail: String },

    // ── Rebuttal input errors ─────────────────────────────────────────────
    /// The rebuttal input string is not a valid file path or URL.
    #[error("Invalid rebuttal input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failed inference call.
///
/// Produced by [`crate::llm::InferenceClient::try_complete`]. The
/// `complete` convenience wrapper maps every variant to an empty string,
/// preserving the degrade-to-empty contract of the pipeline.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// The provider's credential was absent at construction; the adapter is
    /// disabled and no network I/O was attempted.
    #[error("Provider '{provider}' is not configured.\nSet {hint} to enable it.")]
    NotConfigured {
        provider: ProviderKind,
        hint: &'static str,
    },

    /// The model identifier matched no known provider family.
    #[error("Unknown model type: '{model}'. Use a 'gemini…' or 'gpt…'/'o1…' model id, or set an explicit provider.")]
    UnknownModel { model: String },

    /// All retry attempts failed; `last_error` is the final attempt's error text.
    #[error("Provider '{provider}' failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        provider: ProviderKind,
        attempts: u32,
        last_error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reviews_not_found_display() {
        let e = PredictError::ReviewsNotFound {
            path: PathBuf::from("reviews.json"),
        };
        assert!(e.to_string().contains("reviews.json"));
    }

    #[test]
    fn invalid_reviews_display() {
        let e = PredictError::InvalidReviews {
            path: PathBuf::from("r.json"),
            detail: "expected value at line 1".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("r.json"));
        assert!(msg.contains("line 1"));
    }

    #[test]
    fn not_configured_display() {
        let e = LlmError::NotConfigured {
            provider: ProviderKind::Gemini,
            hint: "GEMINI_API_KEY",
        };
        let msg = e.to_string();
        assert!(msg.contains("gemini"));
        assert!(msg.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn retries_exhausted_display() {
        let e = LlmError::RetriesExhausted {
            provider: ProviderKind::OpenAi,
            attempts: 3,
            last_error: "HTTP 500".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("HTTP 500"));
    }

    #[test]
    fn unknown_model_display() {
        let e = LlmError::UnknownModel {
            model: "unknown-model-x".into(),
        };
        assert!(e.to_string().contains("unknown-model-x"));
    }
}
