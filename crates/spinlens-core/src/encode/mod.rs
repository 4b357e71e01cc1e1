//! Image encoding to transport formats.
//!
//! The pipeline hands encoded bytes (not pixel buffers) back to the
//! presentation layer and to the artifact store. JPEG is used for the
//! photographic outputs, PNG for the histogram charts where lossy
//! compression would smear the thin plot lines.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::ExtendedColorType;
use image::ImageEncoder;
use std::io::Cursor;
use thiserror::Error;

use crate::decode::PixelBuffer;

/// Errors that can occur during image encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 3), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The underlying encoder failed
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),
}

/// Transport format for encoded output.
///
/// The quality parameter only exists for lossy formats; PNG is always
/// lossless. Encoding is deterministic for identical input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EncodeFormat {
    /// JPEG with quality 1-100 (values outside the range are clamped).
    Jpeg { quality: u8 },
    /// Lossless PNG.
    Png,
}

impl Default for EncodeFormat {
    fn default() -> Self {
        EncodeFormat::Jpeg { quality: 90 }
    }
}

/// Encode a pixel buffer to the requested transport format.
///
/// # Arguments
///
/// * `buffer` - RGB pixel buffer to encode
/// * `format` - Target format and (for JPEG) quality
///
/// # Returns
///
/// Encoded bytes on success, or an error if the buffer is malformed or the
/// encoder fails.
///
/// # Quality Guidelines (JPEG)
///
/// * 90-100: High quality, suitable for archival
/// * 80-90: Good quality, recommended default
/// * Below 60: Visible artifacts
pub fn encode_image(buffer: &PixelBuffer, format: EncodeFormat) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = (buffer.width, buffer.height);

    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected_len = (width as usize) * (height as usize) * 3;
    if buffer.pixels.len() != expected_len {
        return Err(EncodeError::InvalidPixelData {
            expected: expected_len,
            actual: buffer.pixels.len(),
        });
    }

    let mut out = Cursor::new(Vec::new());

    match format {
        EncodeFormat::Jpeg { quality } => {
            let quality = quality.clamp(1, 100);
            let encoder = JpegEncoder::new_with_quality(&mut out, quality);
            encoder
                .write_image(&buffer.pixels, width, height, ExtendedColorType::Rgb8)
                .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;
        }
        EncodeFormat::Png => {
            let encoder = PngEncoder::new(&mut out);
            encoder
                .write_image(&buffer.pixels, width, height, ExtendedColorType::Rgb8)
                .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;
        }
    }

    Ok(out.into_inner())
}


// ============================================================================
// Property-Based Tests
// ============================================================================
