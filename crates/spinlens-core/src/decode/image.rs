//! Upload decoding with EXIF orientation handling.
//!
//! Accepts whatever bytes the presentation layer hands over, guesses the
//! format from content, and always lands in the canonical 3-channel RGB
//! layout. Grayscale and palette images are expanded; RGBA alpha is dropped
//! (not pre-multiplied).

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::DynamicImage;
use image::ImageReader;

use super::{DecodeError, Orientation, PixelBuffer};

/// Decode an uploaded image from bytes, applying EXIF orientation correction.
///
/// # Arguments
///
/// * `bytes` - Raw upload bytes (JPEG, PNG, or anything the format guesser
///   recognizes)
///
/// # Returns
///
/// A `PixelBuffer` with RGB pixel data and correct orientation applied.
///
/// # Errors
///
/// Returns `DecodeError::CorruptedFile` if the bytes cannot be decoded and
/// `DecodeError::EmptyImage` if decoding produces a zero-sized image.
pub fn decode_image(bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
    // Extract EXIF orientation before decoding; decoding consumes the reader.
    let orientation = extract_orientation(bytes);

    let cursor = Cursor::new(bytes);
    let reader = ImageReader::new(cursor)
        .with_guessed_format()
        .map_err(|e| DecodeError::IoError(e.to_string()))?;

    let img = reader
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    let oriented_img = apply_orientation(img, orientation);

    // Canonical layout: RGB8, alpha dropped.
    let rgb_img = oriented_img.into_rgb8();
    if rgb_img.width() == 0 || rgb_img.height() == 0 {
        return Err(DecodeError::EmptyImage);
    }
    Ok(PixelBuffer::from_rgb_image(rgb_img))
}

/// Extract EXIF orientation from image bytes.
///
/// Returns `Orientation::Normal` if no EXIF data is found or orientation
/// cannot be determined.
fn extract_orientation(bytes: &[u8]) -> Orientation {
    let exif_reader = Reader::new();
    let mut cursor = Cursor::new(bytes);

    match exif_reader.read_from_container(&mut cursor) {
        Ok(exif) => {
            if let Some(field) = exif.get_field(Tag::Orientation, In::PRIMARY) {
                if let Some(value) = field.value.get_uint(0) {
                    return Orientation::from(value);
                }
            }
            Orientation::Normal
        }
        Err(_) => Orientation::Normal,
    }
}

/// Apply EXIF orientation transformation to an image.
fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}

/// Extract the EXIF orientation value from image bytes (for external use).
pub fn get_orientation(bytes: &[u8]) -> Orientation {
    extract_orientation(bytes)
}
