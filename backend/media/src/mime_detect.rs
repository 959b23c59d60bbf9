//! MIME type detection for scanned orders and catalog drawings.

use std::path::Path;

/// Detect MIME type by file extension.
pub fn detect_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tiff" | "tif" => "image/tiff",
        "pdf" => "application/pdf",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

pub fn is_image(mime: &str) -> bool {
    mime.starts_with("image/")
}

pub fn is_pdf(mime: &str) -> bool {
    mime == "application/pdf"
}

/// Formats every supported vision provider accepts inline.
pub fn is_vision_safe(mime: &str) -> bool {
    matches!(mime, "image/jpeg" | "image/png" | "image/webp" | "image/gif")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_scan_formats() {
        assert_eq!(detect_mime_type(&PathBuf::from("order_17.JPG")), "image/jpeg");
        assert_eq!(detect_mime_type(&PathBuf::from("page-1.png")), "image/png");
        assert!(is_pdf(detect_mime_type(&PathBuf::from("order.pdf"))));
    }

    #[test]
    fn tiff_is_image_but_not_inline() {
        let mime = detect_mime_type(&PathBuf::from("scan.tif"));
        assert!(is_image(mime));
        assert!(!is_vision_safe(mime));
    }

    #[test]
    fn unknown_extension_fallback() {
        assert_eq!(detect_mime_type(&PathBuf::from("file.xyz")), "application/octet-stream");
    }
}
