//! JPEG and data-URL encoding of frames.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::error::{ParameterError, ParameterErrorKind};
use image::{ExtendedColorType, ImageError};

use crate::camera::Frame;

/// Default JPEG quality for streamed frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Encode an RGB frame as a baseline JPEG.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, ImageError> {
    // The encoder panics on a length mismatch
    if frame.data.len() != frame.expected_len() {
        return Err(ImageError::Parameter(ParameterError::from_kind(
            ParameterErrorKind::DimensionMismatch,
        )));
    }
    let mut out = Vec::with_capacity(frame.data.len() / 8);
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    encoder.encode(
        &frame.data,
        frame.width,
        frame.height,
        ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

/// `data:image/jpeg;base64,...` URL for embedding a JPEG in an API request.
pub fn jpeg_data_url(jpeg: &[u8]) -> String {
    let mut url = String::with_capacity(DATA_URL_PREFIX.len() + jpeg.len() * 4 / 3 + 4);
    url.push_str(DATA_URL_PREFIX);
    STANDARD.encode_string(jpeg, &mut url);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_jpeg_has_soi_and_eoi_markers() {
        let frame = Frame::filled(16, 8, [200, 10, 10]);
        let jpeg = encode_jpeg(&frame, DEFAULT_JPEG_QUALITY).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_encode_jpeg_rejects_short_buffer() {
        let mut frame = Frame::filled(4, 4, [0, 0, 0]);
        frame.data.truncate(10);
        assert!(encode_jpeg(&frame, 90).is_err());
    }

    #[test]
    fn test_data_url() {
        assert_eq!(jpeg_data_url(b"abc"), "data:image/jpeg;base64,YWJj");
        assert_eq!(jpeg_data_url(&[]), "data:image/jpeg;base64,");
    }
}
