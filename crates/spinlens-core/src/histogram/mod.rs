//! Per-channel color distribution analysis.
//!
//! This module computes equal-width binned histograms over the 0-255 value
//! range for each RGB channel, and renders them as a chart artifact for the
//! side-by-side original/rotated comparison.
//!
//! Two aggregation modes exist: raw bin counts (the default, used for both
//! images of one run so the comparison is fair) and density-normalized
//! values (`count / total_pixels`). Raw per-value counts are the counts
//! mode with 256 bins.

mod chart;

pub use chart::{render_chart, CHART_HEIGHT, CHART_WIDTH};

use serde::{Deserialize, Serialize};

use crate::decode::PixelBuffer;

/// How bin values are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HistogramMode {
    /// Raw pixel counts per bin (default).
    #[default]
    Counts,
    /// Counts divided by total pixel count; one channel sums to 1.0.
    Density,
}

/// Histogram aggregation options.
///
/// One options value is used for both the original and the rotated image in
/// a pipeline run, so the rendered comparison uses identical binning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramOptions {
    /// Number of equal-width bins over the 0-255 range (1 to 256).
    pub bin_count: usize,
    /// Output mode for `series` and the chart rendering.
    pub mode: HistogramMode,
}

impl Default for HistogramOptions {
    fn default() -> Self {
        Self {
            bin_count: 50,
            mode: HistogramMode::Counts,
        }
    }
}

impl HistogramOptions {
    /// Raw per-value counts: 256 discrete bins, counts mode.
    pub fn per_value() -> Self {
        Self {
            bin_count: 256,
            mode: HistogramMode::Counts,
        }
    }
}

/// RGB channel index for histogram accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// All channels in chart drawing order.
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];
}

/// Per-channel binned color distribution of one pixel buffer.
///
/// Invariant: for each channel, the bin counts sum to the total pixel count
/// of the source buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorHistogram {
    /// Red channel bin counts.
    pub red: Vec<u32>,
    /// Green channel bin counts.
    pub green: Vec<u32>,
    /// Blue channel bin counts.
    pub blue: Vec<u32>,
    /// Total pixels in the source buffer.
    pub total_pixels: u64,
    /// The mode declared for reporting (charts, `series`).
    pub mode: HistogramMode,
}

impl ColorHistogram {
    /// Number of bins per channel.
    pub fn bin_count(&self) -> usize {
        self.red.len()
    }

    /// Raw counts for one channel.
    pub fn counts(&self, channel: Channel) -> &[u32] {
        match channel {
            Channel::Red => &self.red,
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
        }
    }

    /// Bin values for one channel with the declared mode applied.
    pub fn series(&self, channel: Channel) -> Vec<f64> {
        let counts = self.counts(channel);
        match self.mode {
            HistogramMode::Counts => counts.iter().map(|&c| f64::from(c)).collect(),
            HistogramMode::Density => {
                let total = self.total_pixels.max(1) as f64;
                counts.iter().map(|&c| f64::from(c) / total).collect()
            }
        }
    }

    /// Largest raw count across all three channels (for chart scaling).
    pub fn max_count(&self) -> u32 {
        let max_r = self.red.iter().max().copied().unwrap_or(0);
        let max_g = self.green.iter().max().copied().unwrap_or(0);
        let max_b = self.blue.iter().max().copied().unwrap_or(0);
        max_r.max(max_g).max(max_b)
    }
}

/// Compute the per-channel histogram of a buffer.
///
/// For each channel independently, the 0-255 value range is partitioned
/// into `options.bin_count` equal-width bins and pixel occurrences are
/// counted per bin. Deterministic for identical buffers.
///
/// # Example
/// ```ignore
/// let hist = compute_color_histogram(&buffer, HistogramOptions::default());
/// assert_eq!(hist.red.iter().map(|&c| u64::from(c)).sum::<u64>(), buffer.pixel_count());
/// ```
pub fn compute_color_histogram(buffer: &PixelBuffer, options: HistogramOptions) -> ColorHistogram {
    let bin_count = options.bin_count.clamp(1, 256);

    let mut hist = ColorHistogram {
        red: vec![0; bin_count],
        green: vec![0; bin_count],
        blue: vec![0; bin_count],
        total_pixels: buffer.pixel_count(),
        mode: options.mode,
    };

    // Single pass; bin index maps 0-255 onto bin_count equal-width bins.
    for chunk in buffer.pixels.chunks_exact(3) {
        hist.red[bin_index(chunk[0], bin_count)] += 1;
        hist.green[bin_index(chunk[1], bin_count)] += 1;
        hist.blue[bin_index(chunk[2], bin_count)] += 1;
    }

    hist
}

/// Map a channel value onto its bin.
#[inline]
fn bin_index(value: u8, bin_count: usize) -> usize {
    (value as usize * bin_count) / 256
}


// ============================================================================
// Property-Based Tests
// ============================================================================
