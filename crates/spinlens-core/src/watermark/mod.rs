//! Watermark compositing.
//!
//! Overlays translucent label text anchored to the bottom-right corner: a
//! dark shadow copy offset by (2, 2) px first, then the light main text, so
//! the label stays legible over both bright and dark backgrounds.
//!
//! Font selection is an ordered list of resolution strategies tried in
//! sequence: a configured TrueType path, then well-known system font paths,
//! then the built-in bitmap glyphs. The last strategy has no failure mode,
//! so watermarking can never fail the pipeline.

use std::path::{Path, PathBuf};

use ab_glyph::{point, Font, FontVec, Glyph, PxScale, ScaleFont};

use crate::decode::PixelBuffer;
use crate::text::{blend_pixel, builtin_text_height, builtin_text_width, draw_builtin_text};

/// Distance from the bottom-right corner to the text, in pixels.
const MARGIN: u32 = 20;

/// Shadow offset relative to the main text.
const SHADOW_OFFSET: (i64, i64) = (2, 2);

const SHADOW_COLOR: [u8; 3] = [0, 0, 0];
const SHADOW_ALPHA: f32 = 0.45;
const TEXT_COLOR: [u8; 3] = [255, 255, 255];
const TEXT_ALPHA: f32 = 0.7;

/// System locations probed when no configured font resolves.
const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// A resolved watermark font: either a parsed TrueType face or the
/// built-in bitmap glyphs.
pub enum WatermarkFont {
    /// TrueType face loaded from disk.
    Truetype(FontVec),
    /// Built-in 5x7 glyphs; always available.
    Builtin,
}

impl std::fmt::Debug for WatermarkFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatermarkFont::Truetype(_) => f.write_str("WatermarkFont::Truetype"),
            WatermarkFont::Builtin => f.write_str("WatermarkFont::Builtin"),
        }
    }
}

impl WatermarkFont {
    /// Resolve a font through the strategy chain: `preferred` path first,
    /// then known system paths, then the built-in glyphs.
    ///
    /// Never fails; the built-in fallback is always returned when nothing
    /// else loads.
    pub fn resolve(preferred: Option<&Path>) -> Self {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(p) = preferred {
            candidates.push(p.to_path_buf());
        }
        candidates.extend(SYSTEM_FONT_PATHS.iter().map(PathBuf::from));

        for path in candidates {
            match try_load_truetype(&path) {
                Some(font) => {
                    tracing::debug!(path = %path.display(), "watermark font resolved");
                    return WatermarkFont::Truetype(font);
                }
                None => continue,
            }
        }

        tracing::debug!("no TrueType font found, using built-in glyphs");
        WatermarkFont::Builtin
    }

    /// The guaranteed fallback, for deterministic output in tests.
    pub fn builtin() -> Self {
        WatermarkFont::Builtin
    }
}

fn try_load_truetype(path: &Path) -> Option<FontVec> {
    let bytes = std::fs::read(path).ok()?;
    FontVec::try_from_vec(bytes).ok()
}

/// Overlay translucent `text` near the bottom-right corner of the buffer.
///
/// Returns a new buffer; the input is left untouched. Empty text is a
/// no-op clone. Text wider than the image is clipped at the left edge
/// rather than failing.
pub fn apply_watermark(buffer: &PixelBuffer, text: &str, font: &WatermarkFont) -> PixelBuffer {
    let mut out = buffer.clone();
    if text.is_empty() || out.is_empty() {
        return out;
    }

    // Label height scales with the smaller image dimension.
    let target_px = (out.width.min(out.height) / 12).clamp(14, 72);

    match font {
        WatermarkFont::Truetype(face) => {
            let scale = PxScale::from(target_px as f32);
            let (text_w, text_h) = measure_truetype(face, scale, text);
            let x = out.width as f32 - MARGIN as f32 - text_w;
            let y = out.height as f32 - MARGIN as f32 - text_h;

            draw_truetype(
                &mut out,
                face,
                scale,
                text,
                x + SHADOW_OFFSET.0 as f32,
                y + SHADOW_OFFSET.1 as f32,
                SHADOW_COLOR,
                SHADOW_ALPHA,
            );
            draw_truetype(&mut out, face, scale, text, x, y, TEXT_COLOR, TEXT_ALPHA);
        }
        WatermarkFont::Builtin => {
            let glyph_scale = (target_px / 10).max(1);
            let text_w = builtin_text_width(text, glyph_scale);
            let text_h = builtin_text_height(glyph_scale);
            let x = i64::from(out.width) - i64::from(MARGIN) - i64::from(text_w);
            let y = i64::from(out.height) - i64::from(MARGIN) - i64::from(text_h);

            draw_builtin_text(
                &mut out,
                text,
                x + SHADOW_OFFSET.0,
                y + SHADOW_OFFSET.1,
                glyph_scale,
                SHADOW_COLOR,
                SHADOW_ALPHA,
            );
            draw_builtin_text(&mut out, text, x, y, glyph_scale, TEXT_COLOR, TEXT_ALPHA);
        }
    }

    out
}

/// Measure rendered text dimensions for a TrueType face.
fn measure_truetype(face: &FontVec, scale: PxScale, text: &str) -> (f32, f32) {
    let scaled = face.as_scaled(scale);
    let mut width = 0.0;
    let mut prev = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(p) = prev {
            width += scaled.kern(p, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    (width, scaled.ascent() - scaled.descent())
}

/// Rasterize text with a TrueType face at (x, y) top-left, alpha-blended.
fn draw_truetype(
    buffer: &mut PixelBuffer,
    face: &FontVec,
    scale: PxScale,
    text: &str,
    x: f32,
    y: f32,
    color: [u8; 3],
    alpha: f32,
) {
    let scaled = face.as_scaled(scale);
    let baseline = y + scaled.ascent();
    let mut caret = x;
    let mut prev = None;

    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(p) = prev {
            caret += scaled.kern(p, id);
        }
        let glyph: Glyph = id.with_scale_and_position(scale, point(caret, baseline));
        caret += scaled.h_advance(id);
        prev = Some(id);

        if let Some(outlined) = face.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                blend_pixel(
                    buffer,
                    bounds.min.x as i64 + i64::from(gx),
                    bounds.min.y as i64 + i64::from(gy),
                    color,
                    alpha * coverage,
                );
            });
        }
    }
}
