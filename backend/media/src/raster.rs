//! Image loading and binarization shared by the grid detector and the
//! shape pre-filter.

use std::io::Cursor;
use std::path::Path;

use bendline_core::BendlineError;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use tracing::debug;

use crate::mime_detect::{detect_mime_type, is_image, is_vision_safe};

fn unreadable(path: &Path, reason: impl ToString) -> BendlineError {
    BendlineError::ImageUnreadable {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Decode an image file.
pub fn load_image(path: &Path) -> Result<DynamicImage, BendlineError> {
    image::open(path).map_err(|e| unreadable(path, e))
}

/// Read an image file for upload, returning its bytes and MIME type.
///
/// Fails unless the file exists, has an image extension, and decodes.
/// Formats the providers cannot take inline (TIFF, BMP) are re-encoded
/// as PNG.
pub async fn read_image_bytes(path: &Path) -> Result<(Vec<u8>, &'static str), BendlineError> {
    let mime = detect_mime_type(path);
    if !is_image(mime) {
        return Err(unreadable(path, format!("not an image ({mime})")));
    }
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| unreadable(path, e))?;
    let decoded = image::load_from_memory(&bytes).map_err(|e| unreadable(path, e))?;
    if is_vision_safe(mime) {
        debug!(path = %path.display(), bytes = bytes.len(), mime, "Read image");
        return Ok((bytes, mime));
    }

    let mut png = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| unreadable(path, format!("re-encoding {mime} as PNG failed: {e}")))?;
    debug!(path = %path.display(), from = mime, bytes = png.len(), "Re-encoded image as PNG");
    Ok((png, "image/png"))
}

/// Foreground mask: ink (darker than `threshold`) becomes 255, paper 0.
pub fn ink_mask(gray: &GrayImage, threshold: u8) -> GrayImage {
    let mut mask = GrayImage::new(gray.width(), gray.height());
    for (x, y, p) in gray.enumerate_pixels() {
        if p[0] < threshold {
            mask.put_pixel(x, y, Luma([255u8]));
        }
    }
    mask
}
