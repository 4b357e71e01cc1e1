//! Arbitrary-angle image rotation with canvas expansion.
//!
//! # Algorithm
//!
//! The rotation uses inverse mapping: for each pixel in the output image,
//! we calculate which source pixel(s) contribute to it and interpolate
//! their values bilinearly. Output pixels whose source coordinates fall
//! outside the original image take the caller-supplied fill color.
//!
//! For rotation by angle θ, the inverse transform is:
//! ```text
//! src_x = (dst_x - cx) * cos(-θ) - (dst_y - cy) * sin(-θ) + src_cx
//! src_y = (dst_x - cx) * sin(-θ) + (dst_y - cy) * cos(-θ) + src_cy
//! ```
//!
//! # Conventions
//!
//! - Positive angles rotate counter-clockwise; negative angles clockwise.
//! - Angles are normalized modulo 360 before computing geometry, so 0, 360
//!   and 720 degrees are all the identity transform.
//! - Exact quarter turns (90/180/270) take a lossless remap path with no
//!   interpolation.

use crate::decode::PixelBuffer;

/// Tolerance for treating an angle as an exact special case.
const ANGLE_EPSILON: f64 = 0.001;

/// Compute the dimensions of the bounding box for a rotated image.
///
/// When an image is rotated, the corners extend beyond the original bounds.
/// This function calculates the minimum bounding box that contains the
/// entire rotated image:
/// `new_w = ceil(|w·cosθ| + |h·sinθ|)`, `new_h = ceil(|w·sinθ| + |h·cosθ|)`.
///
/// # Arguments
///
/// * `width` - Original image width
/// * `height` - Original image height
/// * `angle_degrees` - Rotation angle in degrees (positive = counter-clockwise)
///
/// # Returns
///
/// Tuple of (new_width, new_height) for the rotated bounding box.
pub fn compute_rotated_bounds(width: u32, height: u32, angle_degrees: f64) -> (u32, u32) {
    let angle = normalize_angle(angle_degrees);

    // Fast paths: identity and exact quarter turns need no geometry.
    if angle.abs() < ANGLE_EPSILON || (360.0 - angle).abs() < ANGLE_EPSILON {
        return (width, height);
    }
    if (angle - 90.0).abs() < ANGLE_EPSILON || (angle - 270.0).abs() < ANGLE_EPSILON {
        return (height, width);
    }
    if (angle - 180.0).abs() < ANGLE_EPSILON {
        return (width, height);
    }

    let angle_rad = angle.to_radians();
    let cos = angle_rad.cos().abs();
    let sin = angle_rad.sin().abs();

    let w = f64::from(width);
    let h = f64::from(height);

    // Round up so no corner is ever clipped; the epsilon guards against
    // floating point pushing an exact integer over the ceiling.
    let new_w = (w * cos + h * sin - 1e-9).ceil() as u32;
    let new_h = (w * sin + h * cos - 1e-9).ceil() as u32;

    (new_w.max(1), new_h.max(1))
}

/// Normalize an angle into [0, 360).
fn normalize_angle(angle_degrees: f64) -> f64 {
    angle_degrees.rem_euclid(360.0)
}

/// Rotate a buffer about its center, expanding the canvas to fit.
///
/// The output canvas grows to the bounding box of the rotated rectangle so
/// no source content is clipped. Corner area newly exposed by the expansion
/// takes the `fill` color (the pipeline uses opaque black).
///
/// Rotation by any multiple of 360 degrees returns the input unchanged;
/// exact quarter turns are lossless.
///
/// # Arguments
///
/// * `buffer` - Source buffer to rotate
/// * `angle_degrees` - Rotation angle in degrees (positive = counter-clockwise)
/// * `fill` - RGB color for pixels outside the rotated source
pub fn rotate(buffer: &PixelBuffer, angle_degrees: f64, fill: [u8; 3]) -> PixelBuffer {
    let angle = normalize_angle(angle_degrees);

    // Identity fast path
    if angle.abs() < ANGLE_EPSILON || (360.0 - angle).abs() < ANGLE_EPSILON {
        return buffer.clone();
    }

    // Lossless quarter-turn paths. Positive is counter-clockwise, so a
    // 90-degree rotation maps to the image crate's 270-degree clockwise turn.
    if let Some(img) = buffer.to_rgb_image() {
        if (angle - 90.0).abs() < ANGLE_EPSILON {
            return PixelBuffer::from_rgb_image(image::imageops::rotate270(&img));
        }
        if (angle - 180.0).abs() < ANGLE_EPSILON {
            return PixelBuffer::from_rgb_image(image::imageops::rotate180(&img));
        }
        if (angle - 270.0).abs() < ANGLE_EPSILON {
            return PixelBuffer::from_rgb_image(image::imageops::rotate90(&img));
        }
    }

    let (src_w, src_h) = (f64::from(buffer.width), f64::from(buffer.height));
    let (dst_w, dst_h) = compute_rotated_bounds(buffer.width, buffer.height, angle_degrees);

    // Negate the angle for inverse mapping so a positive angle rotates the
    // visible content counter-clockwise.
    let angle_rad = -angle.to_radians();
    let cos = angle_rad.cos();
    let sin = angle_rad.sin();

    let src_cx = src_w / 2.0;
    let src_cy = src_h / 2.0;
    let dst_cx = f64::from(dst_w) / 2.0;
    let dst_cy = f64::from(dst_h) / 2.0;

    let mut output = vec![0u8; (dst_w as usize) * (dst_h as usize) * 3];

    for dst_y in 0..dst_h {
        for dst_x in 0..dst_w {
            let dx = f64::from(dst_x) - dst_cx;
            let dy = f64::from(dst_y) - dst_cy;

            // Inverse rotation back into source coordinates
            let src_x = dx * cos - dy * sin + src_cx;
            let src_y = dx * sin + dy * cos + src_cy;

            let dst_idx = ((dst_y * dst_w + dst_x) * 3) as usize;
            let pixel = sample_bilinear(buffer, src_x, src_y, fill);

            output[dst_idx] = pixel[0];
            output[dst_idx + 1] = pixel[1];
            output[dst_idx + 2] = pixel[2];
        }
    }

    PixelBuffer {
        width: dst_w,
        height: dst_h,
        pixels: output,
    }
}

/// Get a pixel as [f64; 3] at the given coordinates.
#[inline]
fn get_pixel_f64(buffer: &PixelBuffer, px: usize, py: usize) -> [f64; 3] {
    let idx = (py * buffer.width as usize + px) * 3;
    [
        buffer.pixels[idx] as f64,
        buffer.pixels[idx + 1] as f64,
        buffer.pixels[idx + 2] as f64,
    ]
}

/// Sample a pixel using bilinear interpolation, falling back to `fill`
/// outside the source bounds.
fn sample_bilinear(buffer: &PixelBuffer, x: f64, y: f64, fill: [u8; 3]) -> [u8; 3] {
    let (w, h) = (i64::from(buffer.width), i64::from(buffer.height));

    if x < 0.0 || x >= (w - 1) as f64 || y < 0.0 || y >= (h - 1) as f64 {
        return fill;
    }

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = x0 + 1;
    let y1 = y0 + 1;

    // Fractional distances
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = get_pixel_f64(buffer, x0, y0);
    let p10 = get_pixel_f64(buffer, x1, y0);
    let p01 = get_pixel_f64(buffer, x0, y1);
    let p11 = get_pixel_f64(buffer, x1, y1);

    let mut result = [0u8; 3];
    for i in 0..3 {
        let v = p00[i] * (1.0 - fx) * (1.0 - fy)
            + p10[i] * fx * (1.0 - fy)
            + p01[i] * (1.0 - fx) * fy
            + p11[i] * fx * fy;
        result[i] = v.clamp(0.0, 255.0).round() as u8;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: [u8; 3] = [0, 0, 0];

    /// Create a simple test image with a gradient pattern.
    fn test_buffer(width: u32, height: u32) -> PixelBuffer {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = ((x + y) * 8) as u8;
                pixels.push(v); // R
                pixels.push(v); // G
                pixels.push(v); // B
            }
        }
        PixelBuffer {
            width,
            height,
            pixels,
        }
    }

    #[test]
    fn test_zero_rotation_is_identity() {
        let buf = test_buffer(100, 50);
        let result = rotate(&buf, 0.0, BLACK);

        assert_eq!(result, buf);
    }

    #[test]
    fn test_360_rotation_is_identity() {
        let buf = test_buffer(50, 50);

        let result = rotate(&buf, 360.0, BLACK);
        assert_eq!(result, buf);

        let result = rotate(&buf, -720.0, BLACK);
        assert_eq!(result, buf);
    }

    #[test]
    fn test_90_degree_rotation_bounds() {
        let (w, h) = compute_rotated_bounds(100, 50, 90.0);
        assert_eq!(w, 50);
        assert_eq!(h, 100);
    }

    #[test]
    fn test_180_degree_rotation_bounds() {
        let (w, h) = compute_rotated_bounds(100, 50, 180.0);
        assert_eq!(w, 100);
        assert_eq!(h, 50);
    }

    #[test]
    fn test_45_degree_rotation_bounds() {
        let (w, h) = compute_rotated_bounds(100, 100, 45.0);
        // Diagonal of a 100x100 square is ~141.4, ceil to 142
        assert_eq!(w, 142);
        assert_eq!(h, 142);
    }

    #[test]
    fn test_negative_rotation_bounds() {
        // Negative and positive rotations should give same bounds
        let (w1, h1) = compute_rotated_bounds(100, 50, 30.0);
        let (w2, h2) = compute_rotated_bounds(100, 50, -30.0);
        assert_eq!(w1, w2);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_bounds_formula_general() {
        for angle in [7.0, 23.0, 45.0, 60.0, 113.0, 205.0, 331.0] {
            let (w, h) = compute_rotated_bounds(120, 80, angle);
            let rad = (angle as f64).to_radians();
            let expect_w = 120.0 * rad.cos().abs() + 80.0 * rad.sin().abs();
            let expect_h = 120.0 * rad.sin().abs() + 80.0 * rad.cos().abs();
            assert!(
                (f64::from(w) - expect_w).abs() <= 1.0,
                "width {} vs formula {} at angle {}",
                w,
                expect_w,
                angle
            );
            assert!(
                (f64::from(h) - expect_h).abs() <= 1.0,
                "height {} vs formula {} at angle {}",
                h,
                expect_h,
                angle
            );
        }
    }

    #[test]
    fn test_quarter_turn_is_lossless() {
        // 2x1 image: red left, green right
        let buf = PixelBuffer::new(2, 1, vec![255, 0, 0, 0, 255, 0]);

        // 90 CCW: right edge becomes the top. The red pixel (left) moves
        // to the bottom, green (right) to the top.
        let result = rotate(&buf, 90.0, BLACK);
        assert_eq!(result.width, 1);
        assert_eq!(result.height, 2);
        assert_eq!(result.get(0, 0), [0, 255, 0]);
        assert_eq!(result.get(0, 1), [255, 0, 0]);

        // 180 reverses the row
        let result = rotate(&buf, 180.0, BLACK);
        assert_eq!(result.get(0, 0), [0, 255, 0]);
        assert_eq!(result.get(1, 0), [255, 0, 0]);

        // -90 (= 270) is the opposite of 90
        let result = rotate(&buf, -90.0, BLACK);
        assert_eq!(result.get(0, 0), [255, 0, 0]);
        assert_eq!(result.get(0, 1), [0, 255, 0]);
    }

    #[test]
    fn test_rotation_expands_canvas() {
        let buf = test_buffer(100, 100);
        let result = rotate(&buf, 45.0, BLACK);

        assert_eq!(result.width, 142);
        assert_eq!(result.height, 142);
    }

    #[test]
    fn test_corner_fill_color() {
        let buf = PixelBuffer::filled(40, 40, [255, 255, 255]);
        let fill = [7, 11, 13];
        let result = rotate(&buf, 45.0, fill);

        // The four canvas corners lie outside the rotated square.
        assert_eq!(result.get(0, 0), fill);
        assert_eq!(result.get(result.width - 1, 0), fill);
        assert_eq!(result.get(0, result.height - 1), fill);
        assert_eq!(result.get(result.width - 1, result.height - 1), fill);

        // The center is still source content.
        assert_eq!(
            result.get(result.width / 2, result.height / 2),
            [255, 255, 255]
        );
    }

    #[test]
    fn test_large_rotation_angles() {
        // 720 degrees = 2 full rotations
        let (w, h) = compute_rotated_bounds(100, 50, 720.0);
        assert_eq!(w, 100);
        assert_eq!(h, 50);

        // 450 degrees = 360 + 90
        let (w, h) = compute_rotated_bounds(100, 50, 450.0);
        assert_eq!(w, 50);
        assert_eq!(h, 100);
    }

    #[test]
    fn test_1x1_rotation() {
        let buf = PixelBuffer::new(1, 1, vec![128, 128, 128]);

        let result = rotate(&buf, 45.0, BLACK);
        assert!(result.width >= 1);
        assert!(result.height >= 1);
    }

    #[test]
    fn test_thin_image_rotation() {
        let buf = test_buffer(100, 1);
        let result = rotate(&buf, 45.0, BLACK);

        assert!(result.width > 0);
        assert!(result.height > 0);
    }

    #[test]
    fn test_opposite_rotations_same_bounds() {
        let (w1, h1) = compute_rotated_bounds(100, 80, 30.0);
        let (w2, h2) = compute_rotated_bounds(100, 80, -30.0);

        assert_eq!(w1, w2);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_interpolation_produces_valid_pixels() {
        let buf = test_buffer(50, 50);

        let result = rotate(&buf, 37.0, BLACK);

        assert_eq!(
            result.pixels.len(),
            (result.width as usize) * (result.height as usize) * 3
        );
    }

    #[test]
    fn test_rotation_center_preservation() {
        // Bright 3x3 block at the center should stay near the center.
        let size = 21;
        let mut buf = PixelBuffer::filled(size, size, [0, 0, 0]);
        let center = size / 2;
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                buf.set(
                    (center as i32 + dx) as u32,
                    (center as i32 + dy) as u32,
                    [255, 255, 255],
                );
            }
        }

        let result = rotate(&buf, 30.0, BLACK);

        let cx = result.width / 2;
        let cy = result.height / 2;
        let mut found_bright = false;
        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                let px = (cx as i32 + dx).max(0) as u32;
                let py = (cy as i32 + dy).max(0) as u32;
                if px < result.width && py < result.height && result.get(px, py)[0] > 50 {
                    found_bright = true;
                }
            }
        }

        assert!(
            found_bright,
            "Center region should contain bright pixels after rotation"
        );
    }

    #[test]
    fn test_bounds_never_zero() {
        for angle in [1.0, 15.0, 45.0, 89.0, 90.0, 135.0, 179.0, 180.0, 270.0, 359.0] {
            let (w, h) = compute_rotated_bounds(10, 10, angle);
            assert!(w > 0, "Width should be > 0 for angle {}", angle);
            assert!(h > 0, "Height should be > 0 for angle {}", angle);
        }
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: Rotating by 0 (mod 360) is the identity.
        #[test]
        fn prop_identity_law(
            (width, height) in (1u32..=30, 1u32..=30),
            turns in -3i32..=3,
        ) {
            let buf = PixelBuffer::filled(width, height, [90, 60, 30]);
            let result = rotate(&buf, f64::from(turns) * 360.0, [0, 0, 0]);
            prop_assert_eq!(result, buf);
        }

        /// Property: Output dimensions satisfy the bounding-box formula
        /// within one pixel of rounding.
        #[test]
        fn prop_bounding_box_formula(
            (width, height) in (2u32..=60, 2u32..=60),
            angle in -720.0f64..720.0,
        ) {
            let (w, h) = compute_rotated_bounds(width, height, angle);
            let rad = angle.to_radians();
            let expect_w = f64::from(width) * rad.cos().abs() + f64::from(height) * rad.sin().abs();
            let expect_h = f64::from(width) * rad.sin().abs() + f64::from(height) * rad.cos().abs();

            prop_assert!((f64::from(w) - expect_w).abs() <= 1.0);
            prop_assert!((f64::from(h) - expect_h).abs() <= 1.0);
        }

        /// Property: The rotated buffer is always well-formed.
        #[test]
        fn prop_output_well_formed(
            (width, height) in (1u32..=30, 1u32..=30),
            angle in -360.0f64..360.0,
        ) {
            let buf = PixelBuffer::filled(width, height, [1, 2, 3]);
            let result = rotate(&buf, angle, [0, 0, 0]);

            prop_assert!(result.width > 0);
            prop_assert!(result.height > 0);
            prop_assert_eq!(
                result.pixels.len(),
                (result.width as usize) * (result.height as usize) * 3
            );
        }
    }
}
