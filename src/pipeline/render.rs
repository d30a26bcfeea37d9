//! PDF rasterisation: render the leading rebuttal pages to `DynamicImage`
//! via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the work onto the
//! blocking thread pool so the runtime's worker threads don't stall during
//! CPU-heavy rendering.
//!
//! ## Why a page cap?
//!
//! Rebuttals are short by conference rule; anything past the first few
//! pages is either supplementary or a mis-supplied full paper. Capping at
//! `page_limit` bounds both rendering time and the multimodal request
//! size.

use crate::error::PredictError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Rasterise the first `page_limit` pages of a PDF at `target_width` px.
///
/// Runs inside `spawn_blocking` since pdfium operations are CPU-bound.
/// Pages come back in document order.
pub async fn render_pages(
    pdf_path: &Path,
    password: Option<&str>,
    page_limit: usize,
    target_width: u32,
) -> Result<Vec<DynamicImage>, PredictError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || {
        render_pages_blocking(&path, pwd.as_deref(), page_limit, target_width)
    })
    .await
    .map_err(|e| PredictError::Internal(format!("Render task panicked: {e}")))?
}

fn render_pages_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    page_limit: usize,
    target_width: u32,
) -> Result<Vec<DynamicImage>, PredictError> {
    let pdfium = Pdfium::default();

    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{e:?}");
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                PredictError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                PredictError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            PredictError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    let rendered_count = total_pages.min(page_limit);
    info!(
        "Rebuttal PDF loaded: {} pages, rendering first {}",
        total_pages, rendered_count
    );

    let render_config = PdfRenderConfig::new().set_target_width(target_width as i32);

    let mut results = Vec::with_capacity(rendered_count);

    for idx in 0..rendered_count {
        let page = pages
            .get(idx as u16)
            .map_err(|e| PredictError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| PredictError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered rebuttal page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        results.push(image);
    }

    Ok(results)
}
