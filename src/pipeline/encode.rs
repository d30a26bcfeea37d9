//! Image encoding: `DynamicImage` → base64 JPEG wrapped in [`ImageData`].
//!
//! JPEG rather than PNG: rebuttal pages are figure-heavy and a
//! quality-90 JPEG is 5–10× smaller than the lossless PNG while keeping
//! plot labels legible, which matters when up to ten pages ride in one
//! request body. pdfium bitmaps carry an alpha channel, so pages are
//! flattened to RGB first — the JPEG format has no alpha.

use crate::error::PredictError;
use crate::llm::ImageData;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// JPEG quality for rasterised pages.
const JPEG_QUALITY: u8 = 90;

/// Encode a rasterised page as base64 JPEG ready for the multimodal API.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, PredictError> {
    let rgb = img.to_rgb8();

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    encoder
        .encode_image(&rgb)
        .map_err(|e| PredictError::Internal(format!("JPEG encoding failed: {e}")))?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page → {} bytes base64", b64.len());

    Ok(ImageData::jpeg(b64))
}

/// Encode every rendered page, preserving order.
pub fn encode_pages(pages: &[DynamicImage]) -> Result<Vec<ImageData>, PredictError> {
    pages.iter().map(encode_page).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let data = encode_page(&img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/jpeg");
        assert!(!data.data.is_empty());

        // Valid base64 and a JPEG SOI marker underneath.
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn encode_pages_preserves_order_and_count() {
        let a = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])));
        let b = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255])));
        let encoded = encode_pages(&[a, b]).unwrap();
        assert_eq!(encoded.len(), 2);
        assert_ne!(encoded[0].data, encoded[1].data);
    }
}
