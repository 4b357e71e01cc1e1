//! Minimal text rasterization.
//!
//! Two renderers share this module: the watermark compositor (which prefers
//! a real TrueType font when one can be resolved) and the histogram chart
//! titles (which always use the built-in glyphs for deterministic output).
//! The built-in 5x7 bitmap font is the guaranteed final fallback of the
//! watermark font chain - it has no external inputs and cannot fail.

mod builtin;

pub use builtin::{builtin_text_height, builtin_text_width, draw_builtin_text};

use crate::decode::PixelBuffer;

/// Alpha-blend a single pixel into the buffer. Out-of-bounds coordinates
/// are ignored so callers can draw partially clipped glyphs.
#[inline]
pub(crate) fn blend_pixel(buffer: &mut PixelBuffer, x: i64, y: i64, color: [u8; 3], alpha: f32) {
    if x < 0 || y < 0 || x >= i64::from(buffer.width) || y >= i64::from(buffer.height) {
        return;
    }
    let alpha = alpha.clamp(0.0, 1.0);
    let (x, y) = (x as u32, y as u32);
    let dst = buffer.get(x, y);
    let mut out = [0u8; 3];
    for i in 0..3 {
        let v = f32::from(dst[i]) * (1.0 - alpha) + f32::from(color[i]) * alpha;
        out[i] = v.clamp(0.0, 255.0).round() as u8;
    }
    buffer.set(x, y, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_pixel_full_alpha_replaces() {
        let mut buf = PixelBuffer::filled(4, 4, [0, 0, 0]);
        blend_pixel(&mut buf, 1, 1, [200, 100, 50], 1.0);
        assert_eq!(buf.get(1, 1), [200, 100, 50]);
    }

    #[test]
    fn test_blend_pixel_half_alpha_mixes() {
        let mut buf = PixelBuffer::filled(4, 4, [0, 0, 0]);
        blend_pixel(&mut buf, 2, 2, [200, 100, 50], 0.5);
        assert_eq!(buf.get(2, 2), [100, 50, 25]);
    }

    #[test]
    fn test_blend_pixel_out_of_bounds_ignored() {
        let mut buf = PixelBuffer::filled(4, 4, [9, 9, 9]);
        blend_pixel(&mut buf, -1, 0, [255, 255, 255], 1.0);
        blend_pixel(&mut buf, 0, 100, [255, 255, 255], 1.0);
        assert!(buf.pixels.iter().all(|&p| p == 9));
    }

    #[test]
    fn test_blend_pixel_zero_alpha_noop() {
        let mut buf = PixelBuffer::filled(2, 2, [40, 40, 40]);
        blend_pixel(&mut buf, 0, 0, [255, 255, 255], 0.0);
        assert_eq!(buf.get(0, 0), [40, 40, 40]);
    }
}
