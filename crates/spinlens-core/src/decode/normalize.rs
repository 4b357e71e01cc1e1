//! Size normalization for uploaded images.
//!
//! Uploads can be arbitrarily large; the pipeline bounds them to a maximum
//! dimension before doing any per-pixel work. All functions return new
//! `PixelBuffer` instances without modifying the input.

use super::{DecodeError, PixelBuffer};

/// Resize a buffer to exact dimensions.
///
/// Used by the classifier preprocessing, which needs the model's fixed
/// input resolution regardless of aspect ratio.
///
/// # Arguments
///
/// * `buffer` - The source buffer to resize
/// * `width` - Target width in pixels
/// * `height` - Target height in pixels
///
/// # Errors
///
/// Returns `DecodeError::EmptyImage` for zero target dimensions and
/// `DecodeError::CorruptedFile` if the source buffer is malformed.
pub fn resize_exact(
    buffer: &PixelBuffer,
    width: u32,
    height: u32,
) -> Result<PixelBuffer, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyImage);
    }

    // Fast path: if dimensions match, just clone
    if buffer.width == width && buffer.height == height {
        return Ok(buffer.clone());
    }

    let rgb_image = buffer
        .to_rgb_image()
        .ok_or_else(|| DecodeError::CorruptedFile("Failed to create RgbImage".to_string()))?;

    let resized = image::imageops::resize(
        &rgb_image,
        width,
        height,
        image::imageops::FilterType::Triangle,
    );

    Ok(PixelBuffer::from_rgb_image(resized))
}

/// Bound a buffer so its larger dimension does not exceed `max_dim`.
///
/// If either dimension exceeds `max_dim`, both are scaled down by the same
/// factor so the larger dimension equals `max_dim`, preserving aspect ratio
/// (fractional pixel counts round down, minimum 1). Images already within
/// bounds are returned unchanged. Never upscales.
///
/// # Errors
///
/// Returns `DecodeError::EmptyImage` if `max_dim` is zero.
pub fn bound_to_max(buffer: &PixelBuffer, max_dim: u32) -> Result<PixelBuffer, DecodeError> {
    if max_dim == 0 {
        return Err(DecodeError::EmptyImage);
    }

    let (src_width, src_height) = (buffer.width, buffer.height);

    // If already fits, just clone
    if src_width <= max_dim && src_height <= max_dim {
        return Ok(buffer.clone());
    }

    let (new_width, new_height) = bounded_dimensions(src_width, src_height, max_dim);

    resize_exact(buffer, new_width, new_height)
}

/// Calculate dimensions fitting within `max_dim`, preserving aspect ratio.
///
/// The larger dimension becomes exactly `max_dim`; the other scales by the
/// same factor, rounded down (floor) with a floor of 1 pixel.
fn bounded_dimensions(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }

    if width >= height {
        let scale = f64::from(max_dim) / f64::from(width);
        let new_height = (f64::from(height) * scale).floor() as u32;
        (max_dim, new_height.max(1))
    } else {
        let scale = f64::from(max_dim) / f64::from(height);
        let new_width = (f64::from(width) * scale).floor() as u32;
        (new_width.max(1), max_dim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_buffer(width: u32, height: u32) -> PixelBuffer {
        // Simple gradient pattern
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(((x * 255) / width.max(1)) as u8); // R
                pixels.push(((y * 255) / height.max(1)) as u8); // G
                pixels.push(128); // B
            }
        }
        PixelBuffer::new(width, height, pixels)
    }

    #[test]
    fn test_resize_exact_basic() {
        let buf = create_test_buffer(100, 50);
        let resized = resize_exact(&buf, 50, 25).unwrap();

        assert_eq!(resized.width, 50);
        assert_eq!(resized.height, 25);
        assert_eq!(resized.pixels.len(), 50 * 25 * 3);
    }

    #[test]
    fn test_resize_exact_same_dimensions() {
        let buf = create_test_buffer(100, 50);
        let resized = resize_exact(&buf, 100, 50).unwrap();

        assert_eq!(resized, buf);
    }

    #[test]
    fn test_resize_exact_zero_dimensions_error() {
        let buf = create_test_buffer(100, 50);

        assert!(resize_exact(&buf, 0, 50).is_err());
        assert!(resize_exact(&buf, 50, 0).is_err());
    }

    #[test]
    fn test_bound_to_max_landscape() {
        // Scenario from the contract: 1000x800 with max_dim 800 -> 800x640
        let buf = create_test_buffer(1000, 800);
        let bounded = bound_to_max(&buf, 800).unwrap();

        assert_eq!(bounded.width, 800);
        assert_eq!(bounded.height, 640);
    }

    #[test]
    fn test_bound_to_max_portrait() {
        let buf = create_test_buffer(800, 1000);
        let bounded = bound_to_max(&buf, 800).unwrap();

        assert_eq!(bounded.width, 640);
        assert_eq!(bounded.height, 800);
    }

    #[test]
    fn test_bound_to_max_never_upscales() {
        let buf = create_test_buffer(100, 50);
        let bounded = bound_to_max(&buf, 800).unwrap();

        assert_eq!(bounded.width, 100);
        assert_eq!(bounded.height, 50);
        assert_eq!(bounded, buf);
    }

    #[test]
    fn test_bound_to_max_square() {
        let buf = create_test_buffer(900, 900);
        let bounded = bound_to_max(&buf, 300).unwrap();

        assert_eq!(bounded.width, 300);
        assert_eq!(bounded.height, 300);
    }

    #[test]
    fn test_bound_to_max_rounds_down() {
        // 999x500 bounded to 100: height = floor(500 * 100/999) = floor(50.05) = 50
        let buf = create_test_buffer(999, 500);
        let bounded = bound_to_max(&buf, 100).unwrap();

        assert_eq!(bounded.width, 100);
        assert_eq!(bounded.height, 50);
    }

    #[test]
    fn test_bound_to_max_extreme_aspect_ratio() {
        // Extremely wide image must not collapse to zero height
        let buf = create_test_buffer(1000, 2);
        let bounded = bound_to_max(&buf, 100).unwrap();

        assert_eq!(bounded.width, 100);
        assert!(bounded.height >= 1);
    }

    #[test]
    fn test_bound_to_max_zero_max_dim_error() {
        let buf = create_test_buffer(100, 50);
        assert!(bound_to_max(&buf, 0).is_err());
    }

    #[test]
    fn test_bounded_dimensions_landscape() {
        let (w, h) = bounded_dimensions(1000, 800, 800);
        assert_eq!(w, 800);
        assert_eq!(h, 640);
    }

    #[test]
    fn test_bounded_dimensions_portrait() {
        let (w, h) = bounded_dimensions(4000, 6000, 2560);
        assert_eq!(w, 1706); // floor(4000 * 2560/6000) = floor(1706.67)
        assert_eq!(h, 2560);
    }

    #[test]
    fn test_bounded_dimensions_zero_input() {
        let (w, h) = bounded_dimensions(0, 0, 256);
        assert_eq!(w, 0);
        assert_eq!(h, 0);
    }
}
