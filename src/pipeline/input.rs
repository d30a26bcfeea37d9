//! Rebuttal input resolution: normalise a path or URL to a local PDF.
//!
//! pdfium requires a file-system path — it cannot stream from a byte
//! buffer — so URL inputs are downloaded into a `TempDir` whose lifetime
//! is tied to the returned value; cleanup happens automatically when it
//! drops, even on panic. The `%PDF` magic bytes are validated up front so
//! callers get a meaningful error rather than a pdfium failure deep in
//! rasterisation.

use crate::error::PredictError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// The resolved rebuttal — either a local path or a downloaded temp file.
pub enum ResolvedPdf {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the PDF lives in a temp directory that is cleaned
    /// up when this value drops.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedPdf {
    /// Path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedPdf::Local(p) => p,
            ResolvedPdf::Downloaded { path, .. } => path,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the rebuttal input to a local, magic-validated PDF file.
pub async fn resolve_pdf(input: &str, timeout_secs: u64) -> Result<ResolvedPdf, PredictError> {
    if is_url(input) {
        download_pdf(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

fn resolve_local(path_str: &str) -> Result<ResolvedPdf, PredictError> {
    let path = PathBuf::from(path_str);

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PredictError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(PredictError::InvalidInput {
                input: path_str.to_string(),
            });
        }
    };

    use std::io::Read;
    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
        return Err(PredictError::NotAPdf { path, magic });
    }

    debug!("Resolved local rebuttal PDF: {}", path.display());
    Ok(ResolvedPdf::Local(path))
}

async fn download_pdf(url: &str, timeout_secs: u64) -> Result<ResolvedPdf, PredictError> {
    info!("Downloading rebuttal PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PredictError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            PredictError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PredictError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(PredictError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PredictError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let temp_dir = TempDir::new().map_err(|e| PredictError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join("rebuttal.pdf");

    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(PredictError::NotAPdf {
            path: file_path,
            magic,
        });
    }

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| PredictError::Internal(format!("Failed to write temp file: {e}")))?;

    info!("Downloaded to: {}", file_path.display());

    Ok(ResolvedPdf::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/rebuttal.pdf"));
        assert!(is_url("http://example.com/rebuttal.pdf"));
        assert!(!is_url("/tmp/rebuttal.pdf"));
        assert!(!is_url("rebuttal.pdf"));
        assert!(!is_url(""));
    }

    #[tokio::test]
    async fn missing_local_file_is_invalid_input() {
        let err = resolve_pdf("/nonexistent/rebuttal.pdf", 5).await.unwrap_err();
        assert!(matches!(err, PredictError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn non_pdf_magic_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"<html>not a pdf</html>").unwrap();
        let err = resolve_pdf(f.path().to_str().unwrap(), 5).await.unwrap_err();
        assert!(matches!(err, PredictError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn pdf_magic_is_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n%stub").unwrap();
        let resolved = resolve_pdf(f.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.path(), f.path());
    }
}
