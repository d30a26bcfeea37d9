//! Preprocessing stages for the rebuttal PDF.
//!
//! Each submodule implements exactly one transformation step, kept
//! separate so each is independently testable and replaceable.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode
//! (URL/path) (pdfium)  (JPEG base64)
//! ```
//!
//! 1. [`input`]  — canonicalise the user-supplied path or URL to a local
//!    PDF file
//! 2. [`render`] — rasterise the first N pages; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`encode`] — JPEG-encode and base64-wrap each page for the
//!    multimodal request body
//!
//! Failures here are fatal to preprocessing but not to the pipeline: the
//! orchestrator logs them and proceeds with zero rebuttal images, the same
//! degradation the inference layer applies to its own failures.

pub mod encode;
pub mod input;
pub mod render;
