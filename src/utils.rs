//! Utility functions and helpers for image input handling

use std::io::Cursor;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use image::ImageFormat;

use crate::error::{AppError, Result};

/// An uploaded image that has been checked to be a supported format.
#[derive(Debug, Clone)]
pub struct ImageInput {
    bytes: Bytes,
    format: ImageFormat,
    dimensions: (u32, u32),
}

impl ImageInput {
    /// Sniff the format and read the header dimensions.
    ///
    /// Only JPEG, PNG, WebP and GIF are accepted.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(AppError::InvalidInput("image is empty".to_string()));
        }

        let format = image::guess_format(&bytes)?;
        if mime_for(format).is_none() {
            return Err(AppError::InvalidInput(format!(
                "unsupported image format: {:?}",
                format
            )));
        }

        let dimensions = image::io::Reader::with_format(Cursor::new(&bytes[..]), format)
            .into_dimensions()?;

        Ok(Self {
            bytes,
            format,
            dimensions,
        })
    }

    /// Decode a base64 payload, tolerating a `data:<mime>;base64,` prefix
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let payload = match encoded.split_once(',') {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => encoded,
        };
        let bytes = STANDARD.decode(payload.trim())?;
        Self::from_bytes(bytes)
    }

    /// Raw image bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// MIME type matching the sniffed format
    pub fn mime(&self) -> &'static str {
        mime_for(self.format).unwrap_or("image/jpeg")
    }

    /// Width and height in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }
}

fn mime_for(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        _ => None,
    }
}

/// Validate that a file has an allowed extension
#[cfg_attr(not(feature = "web"), allow(dead_code))]
pub(crate) fn validate_file_extension(filename: &str, allowed_extensions: &[String]) -> bool {
    if let Some(ext) = Path::new(filename).extension() {
        if let Some(ext_str) = ext.to_str() {
            return allowed_extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(ext_str));
        }
    }
    false
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, RgbImage};

    /// A 2x2 PNG
    pub(crate) fn tiny_png() -> Vec<u8> {
        let mut imgbuf = RgbImage::new(2, 2);
        for (x, y, pixel) in imgbuf.enumerate_pixels_mut() {
            *pixel = image::Rgb([(x * 127) as u8, (y * 127) as u8, 128]);
        }

        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(imgbuf)
            .write_to(&mut out, ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_image_input_sniffs_png() {
        let image = ImageInput::from_bytes(tiny_png()).unwrap();
        assert_eq!(image.mime(), "image/png");
        assert_eq!(image.dimensions(), (2, 2));
    }

    #[test]
    fn test_image_input_rejects_garbage() {
        assert!(ImageInput::from_bytes(Vec::new()).is_err());
        assert!(ImageInput::from_bytes(b"not an image at all".to_vec()).is_err());
    }

    #[test]
    fn test_from_base64_accepts_data_url() {
        let encoded = STANDARD.encode(tiny_png());
        assert!(ImageInput::from_base64(&encoded).is_ok());

        let data_url = format!("data:image/png;base64,{}", encoded);
        assert!(ImageInput::from_base64(&data_url).is_ok());

        assert!(matches!(
            ImageInput::from_base64("%%%"),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_file_extension() {
        let allowed: Vec<String> = vec!["jpg".into(), "jpeg".into(), "png".into()];
        assert!(validate_file_extension("test.jpg", &allowed));
        assert!(validate_file_extension("test.JPEG", &allowed));
        assert!(!validate_file_extension("test.txt", &allowed));
        assert!(!validate_file_extension("test", &allowed));
    }
}
