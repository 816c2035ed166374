//! Turning caller-supplied bytes into images.

use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use emotune_vision::{Error, Result};
use image::DynamicImage;

pub fn from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| Error::DecodeFailure(e.to_string()))
}

pub fn from_path(path: impl AsRef<Path>) -> Result<DynamicImage> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| Error::DecodeFailure(format!("{}: {e}", path.display())))?;
    from_bytes(&bytes)
}

/// Decode a base64 frame. A `data:image/...;base64,` prefix is accepted
/// and dropped.
pub fn from_base64(frame: &str) -> Result<DynamicImage> {
    let payload = match frame.split_once(',') {
        Some((_, data)) => data,
        None => frame,
    };
    let bytes = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::DecodeFailure(format!("invalid base64: {e}")))?;
    from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgb, RgbImage};

    use super::*;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(12, 8, Rgb([200, 10, 10])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_plain_base64() {
        let encoded = general_purpose::STANDARD.encode(png_bytes());
        let img = from_base64(&encoded).unwrap();
        assert_eq!((img.width(), img.height()), (12, 8));
    }

    #[test]
    fn test_data_url_prefix_is_stripped() {
        let encoded = format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(png_bytes())
        );
        let img = from_base64(&encoded).unwrap();
        assert_eq!(img.width(), 12);
    }

    #[test]
    fn test_garbage_is_decode_failure() {
        assert!(matches!(from_base64("!!not base64!!"), Err(Error::DecodeFailure(_))));

        let not_an_image = general_purpose::STANDARD.encode(b"hello world");
        let err = from_base64(&not_an_image).unwrap_err();
        assert!(matches!(err, Error::DecodeFailure(_)));
        assert!(err.is_bad_input());
    }

    #[test]
    fn test_missing_file() {
        let err = from_path("/nonexistent/face.png").unwrap_err();
        assert!(matches!(err, Error::DecodeFailure(_)));
    }
}
