//! Re-encoding of archive images as WebP.

use image::{DynamicImage, ImageError, ImageFormat};
use std::io::Cursor;

use crate::error::{ImportError, Result};
use crate::path::webp_file_name;
use crate::sniff::ImageKind;

/// An image read from the archive, tagged with its sniffed kind.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub file_name: String,
    pub kind: ImageKind,
    pub bytes: Vec<u8>,
}

/// A WebP file ready to be handed to an upload sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ConvertedImage {
    pub const MIME_TYPE: &'static str = "image/webp";

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Convert `source` to WebP.
///
/// WebP input is passed through untouched apart from its name. Everything
/// else is decoded on the blocking pool, drawn onto an RGBA surface of the
/// same dimensions and encoded as WebP.
pub async fn convert(source: SourceImage) -> Result<ConvertedImage> {
    let file_name = webp_file_name(&source.file_name);

    if source.kind == ImageKind::Webp {
        return Ok(ConvertedImage {
            file_name,
            bytes: source.bytes,
        });
    }

    let SourceImage { bytes, kind, .. } = source;
    let encoded = tokio::task::spawn_blocking(move || encode_webp(&bytes, kind))
        .await
        .map_err(|e| ImportError::Decode(format!("conversion task failed: {}", e)))?
        .map_err(|e| ImportError::Decode(e.to_string()))?;

    Ok(ConvertedImage {
        file_name,
        bytes: encoded,
    })
}

fn encode_webp(bytes: &[u8], kind: ImageKind) -> std::result::Result<Vec<u8>, ImageError> {
    let decoded = match kind.image_format() {
        Some(format) => image::load_from_memory_with_format(bytes, format)?,
        // Unrecognised header: let the decoder try its own detection.
        None => image::load_from_memory(bytes)?,
    };

    let surface = DynamicImage::ImageRgba8(decoded.to_rgba8());
    let mut out = Cursor::new(Vec::new());
    surface.write_to(&mut out, ImageFormat::WebP)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sniff::sniff;
    use image::{Rgba, RgbaImage};

    fn encoded(format: ImageFormat) -> Vec<u8> {
        let img = RgbaImage::from_pixel(3, 2, Rgba([200, 30, 60, 255]));
        let img = match format {
            // JPEG cannot carry alpha.
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).to_rgb8()),
            _ => DynamicImage::ImageRgba8(img),
        };
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    fn source(name: &str, bytes: Vec<u8>) -> SourceImage {
        SourceImage {
            file_name: name.to_string(),
            kind: sniff(&bytes),
            bytes,
        }
    }

    #[tokio::test]
    async fn png_becomes_webp_with_same_dimensions() {
        let converted = convert(source("Data/ship.png", encoded(ImageFormat::Png)))
            .await
            .unwrap();

        assert_eq!(converted.file_name, "ship.webp");
        assert_eq!(sniff(&converted.bytes), ImageKind::Webp);
        let back = image::load_from_memory_with_format(&converted.bytes, ImageFormat::WebP).unwrap();
        assert_eq!((back.width(), back.height()), (3, 2));
    }

    #[tokio::test]
    async fn jpeg_and_gif_convert() {
        for format in [ImageFormat::Jpeg, ImageFormat::Gif] {
            let converted = convert(source("img", encoded(format))).await.unwrap();
            assert_eq!(converted.file_name, "img.webp");
            assert_eq!(sniff(&converted.bytes), ImageKind::Webp);
        }
    }

    #[tokio::test]
    async fn webp_passes_through_byte_identical() {
        let webp = encoded(ImageFormat::WebP);
        let converted = convert(source("a/b/token.WEBP", webp.clone())).await.unwrap();
        assert_eq!(converted.bytes, webp);
        assert_eq!(converted.file_name, "token.webp");
    }

    #[tokio::test]
    async fn corrupt_bytes_fail_with_decode_error() {
        let mut bytes = vec![0x89, 0x50, 0x4E, 0x47];
        bytes.extend_from_slice(b"definitely not the rest of a png");

        let err = convert(source("broken.png", bytes)).await.unwrap_err();
        assert!(matches!(err, ImportError::Decode(_)));
    }

    #[tokio::test]
    async fn unknown_header_still_tries_to_decode() {
        let err = convert(source("notes.txt", b"plain text".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Decode(_)));
    }
}
