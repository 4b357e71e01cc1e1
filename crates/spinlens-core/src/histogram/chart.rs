//! Histogram chart rendering.
//!
//! Draws one polyline per channel on a fixed-size canvas with a light grid,
//! axes and a title, then encodes the canvas as PNG. The renderer only uses
//! the built-in glyph font, so identical histograms always produce
//! byte-identical charts.

use crate::decode::PixelBuffer;
use crate::encode::{encode_image, EncodeError, EncodeFormat};
use crate::text::{blend_pixel, builtin_text_width, draw_builtin_text};

use super::{Channel, ColorHistogram};

/// Chart canvas width in pixels.
pub const CHART_WIDTH: u32 = 640;

/// Chart canvas height in pixels.
pub const CHART_HEIGHT: u32 = 400;

const MARGIN_LEFT: u32 = 40;
const MARGIN_RIGHT: u32 = 16;
const MARGIN_TOP: u32 = 36;
const MARGIN_BOTTOM: u32 = 28;

const BACKGROUND: [u8; 3] = [255, 255, 255];
const GRID: [u8; 3] = [225, 225, 225];
const AXIS: [u8; 3] = [96, 96, 96];
const TITLE: [u8; 3] = [32, 32, 32];

const SERIES_ALPHA: f32 = 0.7;

fn series_color(channel: Channel) -> [u8; 3] {
    match channel {
        Channel::Red => [214, 48, 48],
        Channel::Green => [40, 158, 64],
        Channel::Blue => [48, 80, 214],
    }
}

/// Render a histogram as a PNG chart artifact.
///
/// One semi-transparent curve per channel over the bin axis, scaled to the
/// largest series value; `title` is drawn centered above the plot area.
///
/// # Errors
///
/// Only fails if PNG encoding of the finished canvas fails.
pub fn render_chart(histogram: &ColorHistogram, title: &str) -> Result<Vec<u8>, EncodeError> {
    let mut canvas = PixelBuffer::filled(CHART_WIDTH, CHART_HEIGHT, BACKGROUND);

    let plot_left = MARGIN_LEFT;
    let plot_right = CHART_WIDTH - MARGIN_RIGHT - 1;
    let plot_top = MARGIN_TOP;
    let plot_bottom = CHART_HEIGHT - MARGIN_BOTTOM - 1;
    let plot_w = plot_right - plot_left;
    let plot_h = plot_bottom - plot_top;

    // Grid: quarter lines in both directions
    for i in 1..4 {
        let y = plot_top + plot_h * i / 4;
        draw_hline(&mut canvas, plot_left, plot_right, y, GRID);
        let x = plot_left + plot_w * i / 4;
        draw_vline(&mut canvas, x, plot_top, plot_bottom, GRID);
    }

    // Axes
    draw_hline(&mut canvas, plot_left, plot_right, plot_bottom, AXIS);
    draw_vline(&mut canvas, plot_left, plot_top, plot_bottom, AXIS);

    // Scale to the tallest series value; flat-zero histograms draw a baseline.
    let max_value = Channel::ALL
        .iter()
        .flat_map(|&c| histogram.series(c))
        .fold(0.0f64, f64::max)
        .max(f64::MIN_POSITIVE);

    for channel in Channel::ALL {
        let series = histogram.series(channel);
        if series.is_empty() {
            continue;
        }
        let color = series_color(channel);
        let n = series.len();

        let point = |i: usize| -> (i64, i64) {
            let x = if n == 1 {
                plot_left + plot_w / 2
            } else {
                plot_left + (plot_w as usize * i / (n - 1)) as u32
            };
            let frac = (series[i] / max_value).clamp(0.0, 1.0);
            let y = plot_bottom - (frac * f64::from(plot_h)).round() as u32;
            (i64::from(x), i64::from(y))
        };

        let mut prev = point(0);
        for i in 1..n {
            let next = point(i);
            draw_line(&mut canvas, prev, next, color, SERIES_ALPHA);
            prev = next;
        }
        if n == 1 {
            draw_line(&mut canvas, prev, prev, color, SERIES_ALPHA);
        }
    }

    // Title, centered over the plot area at 2x glyph scale
    let title_w = builtin_text_width(title, 2);
    let title_x = i64::from(CHART_WIDTH / 2) - i64::from(title_w / 2);
    draw_builtin_text(&mut canvas, title, title_x, 8, 2, TITLE, 1.0);

    encode_image(&canvas, EncodeFormat::Png)
}

fn draw_hline(canvas: &mut PixelBuffer, x0: u32, x1: u32, y: u32, color: [u8; 3]) {
    for x in x0..=x1 {
        canvas.set(x, y, color);
    }
}

fn draw_vline(canvas: &mut PixelBuffer, x: u32, y0: u32, y1: u32, color: [u8; 3]) {
    for y in y0..=y1 {
        canvas.set(x, y, color);
    }
}

/// Draw a line segment with alpha blending (simple DDA).
fn draw_line(canvas: &mut PixelBuffer, from: (i64, i64), to: (i64, i64), color: [u8; 3], alpha: f32) {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let steps = dx.abs().max(dy.abs()).max(1);

    for step in 0..=steps {
        let t = step as f64 / steps as f64;
        let x = (from.0 as f64 + dx as f64 * t).round() as i64;
        let y = (from.1 as f64 + dy as f64 * t).round() as i64;
        blend_pixel(canvas, x, y, color, alpha);
    }
}
