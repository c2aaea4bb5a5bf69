//! Header-only image metadata extraction

use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use pixgate_core::{ImageFormatKind, ImageMetadata, RejectionKind};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("unsupported image format")]
    UnsupportedFormat { detected: Option<String> },

    #[error("corrupt image: {0}")]
    CorruptImage(String),
}

impl ProbeError {
    pub fn rejection_kind(&self) -> RejectionKind {
        match self {
            ProbeError::UnsupportedFormat { .. } => RejectionKind::UnsupportedFormat,
            ProbeError::CorruptImage(_) => RejectionKind::CorruptImage,
        }
    }
}

/// Reads width and height from the container header without decoding pixel data.
///
/// Only JPEG, PNG, GIF and WebP are accepted. Containers recognised by magic bytes
/// but outside that set are reported as unsupported, not corrupt.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataProbe;

impl MetadataProbe {
    pub fn new() -> Self {
        Self
    }

    pub fn probe(&self, bytes: &[u8]) -> Result<ImageMetadata, ProbeError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ProbeError::CorruptImage(e.to_string()))?;

        let detected = reader.format();
        let format = match detected.and_then(supported_kind) {
            Some(format) => format,
            None => {
                return Err(ProbeError::UnsupportedFormat {
                    detected: detected.map(|f| format!("{:?}", f)),
                })
            }
        };

        let (width_px, height_px) = reader
            .into_dimensions()
            .map_err(|e| ProbeError::CorruptImage(e.to_string()))?;

        if width_px == 0 || height_px == 0 {
            return Err(ProbeError::CorruptImage(format!(
                "header declares {}x{} pixels",
                width_px, height_px
            )));
        }

        tracing::trace!(
            format = %format,
            width = width_px,
            height = height_px,
            size_bytes = bytes.len(),
            "Probed image header"
        );

        Ok(ImageMetadata {
            width_px,
            height_px,
            size_bytes: bytes.len() as u64,
            format,
        })
    }
}

fn supported_kind(format: ImageFormat) -> Option<ImageFormatKind> {
    match format {
        ImageFormat::Jpeg => Some(ImageFormatKind::Jpeg),
        ImageFormat::Png => Some(ImageFormatKind::Png),
        ImageFormat::Gif => Some(ImageFormatKind::Gif),
        ImageFormat::WebP => Some(ImageFormatKind::Webp),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage, RgbaImage};

    fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let image = match format {
            ImageFormat::Gif | ImageFormat::WebP => {
                DynamicImage::ImageRgba8(RgbaImage::new(width, height))
            }
            _ => DynamicImage::ImageRgb8(RgbImage::new(width, height)),
        };
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_probe_png() {
        let bytes = encode(320, 240, ImageFormat::Png);
        let metadata = MetadataProbe::new().probe(&bytes).unwrap();
        assert_eq!(metadata.width_px, 320);
        assert_eq!(metadata.height_px, 240);
        assert_eq!(metadata.size_bytes, bytes.len() as u64);
        assert_eq!(metadata.format, ImageFormatKind::Png);
    }

    #[test]
    fn test_probe_jpeg_gif_webp() {
        let probe = MetadataProbe::new();
        for (format, kind) in [
            (ImageFormat::Jpeg, ImageFormatKind::Jpeg),
            (ImageFormat::Gif, ImageFormatKind::Gif),
            (ImageFormat::WebP, ImageFormatKind::Webp),
        ] {
            let metadata = probe.probe(&encode(64, 48, format)).unwrap();
            assert_eq!((metadata.width_px, metadata.height_px), (64, 48));
            assert_eq!(metadata.format, kind);
        }
    }

    #[test]
    fn test_size_includes_trailing_bytes() {
        let mut bytes = encode(32, 32, ImageFormat::Png);
        bytes.resize(bytes.len() + 10_000, 0);
        let metadata = MetadataProbe::new().probe(&bytes).unwrap();
        assert_eq!(metadata.size_bytes, bytes.len() as u64);
    }

    #[test]
    fn test_unrecognised_bytes_are_unsupported() {
        let err = MetadataProbe::new()
            .probe(b"<html><body>not an image</body></html>")
            .unwrap_err();
        assert_eq!(err.rejection_kind(), RejectionKind::UnsupportedFormat);

        let err = MetadataProbe::new().probe(&[]).unwrap_err();
        assert_eq!(err.rejection_kind(), RejectionKind::UnsupportedFormat);
    }

    #[test]
    fn test_recognised_but_unsupported_container() {
        // BMP magic followed by junk
        let err = MetadataProbe::new().probe(b"BM\x00\x00\x00\x00junk").unwrap_err();
        assert!(matches!(err, ProbeError::UnsupportedFormat { detected: Some(_) }));
    }

    #[test]
    fn test_truncated_header_is_corrupt() {
        let bytes = encode(100, 100, ImageFormat::Png);
        let err = MetadataProbe::new().probe(&bytes[..12]).unwrap_err();
        assert_eq!(err.rejection_kind(), RejectionKind::CorruptImage);
    }
}
