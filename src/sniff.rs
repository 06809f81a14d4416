//! Content-based image format detection.
//!
//! Archive entry names are not trusted: a `.png` may hold a JPEG and many
//! assets have no extension at all, so the kind is read from the magic
//! number in the first four bytes.

use image::ImageFormat;
use std::fmt;

/// Image kinds recognised from a 4-byte magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Png,
    Gif,
    Jpeg,
    Webp,
    Unknown,
}

impl ImageKind {
    /// MIME type equivalent, `"unknown"` for unrecognised content.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Webp => "image/webp",
            ImageKind::Unknown => "unknown",
        }
    }

    /// Decoder to use for this kind, if it is a known one.
    pub fn image_format(&self) -> Option<ImageFormat> {
        match self {
            ImageKind::Png => Some(ImageFormat::Png),
            ImageKind::Gif => Some(ImageFormat::Gif),
            ImageKind::Jpeg => Some(ImageFormat::Jpeg),
            ImageKind::Webp => Some(ImageFormat::WebP),
            ImageKind::Unknown => None,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Classify a blob by its leading bytes. Inputs shorter than four bytes
/// are `Unknown`.
pub fn sniff(bytes: &[u8]) -> ImageKind {
    match bytes {
        [0x89, 0x50, 0x4E, 0x47, ..] => ImageKind::Png,
        [0x47, 0x49, 0x46, 0x38, ..] => ImageKind::Gif,
        [0xFF, 0xD8, 0xFF, 0xE0 | 0xE1 | 0xE2 | 0xE3 | 0xE8, ..] => ImageKind::Jpeg,
        [0x52, 0x49, 0x46, 0x46, ..] => ImageKind::Webp,
        _ => ImageKind::Unknown,
    }
}
