//! Request-scoped processing pipeline.
//!
//! One upload travels through decode, size normalization, rotation,
//! histogram analysis, optional watermarking, optional classification and
//! best-effort persistence, producing a [`PipelineResult`] bundle. Each run
//! is independent and synchronous; the pipeline holds no per-request state.
//!
//! Failures split into two classes: user-correctable input problems
//! (undecodable upload, unverified submission) and internal faults tagged
//! with the stage that produced them. Classification and persistence never
//! fail a run; they degrade to placeholders or a shorter artifact list.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::{ClassificationResult, ClassifierService};
use crate::decode::{bound_to_max, decode_image, DecodeError, PixelBuffer};
use crate::encode::{encode_image, EncodeFormat};
use crate::histogram::{compute_color_histogram, render_chart, ColorHistogram, HistogramOptions};
use crate::store::{ArtifactRecord, ArtifactStore};
use crate::transform::rotate;
use crate::watermark::{apply_watermark, WatermarkFont};

/// Pipeline stages, used to tag internal errors and stage-level logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Normalize,
    Transform,
    Analyze,
    Encode,
    Watermark,
    Classify,
    Persist,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Decode => "decode",
            Stage::Normalize => "normalize",
            Stage::Transform => "transform",
            Stage::Analyze => "analyze",
            Stage::Encode => "encode",
            Stage::Watermark => "watermark",
            Stage::Classify => "classify",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// Pipeline failure, split by who can fix it.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The upload could not be decoded; the user can submit a valid image.
    #[error("Invalid upload: {0}")]
    InvalidInput(#[from] DecodeError),

    /// The submission was not human-verified.
    #[error("Submission is not human-verified")]
    NotVerified,

    /// A system fault in one of the stages.
    #[error("Stage '{stage}' failed: {source}")]
    Internal {
        stage: Stage,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl PipelineError {
    fn internal<E>(stage: Stage, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal {
            stage,
            source: Box::new(source),
        }
    }

    /// True when the failure is correctable by the submitter rather than a
    /// system fault.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::NotVerified)
    }
}

/// Static pipeline configuration; one value shared across requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Uploads are downscaled so neither dimension exceeds this.
    pub max_dimension: u32,
    /// JPEG quality for the encoded outputs.
    pub jpeg_quality: u8,
    /// Binning used for both the original and the rotated histogram.
    pub histogram: HistogramOptions,
    /// Label composited when a request asks for a watermark.
    pub watermark_text: String,
    /// Preferred TrueType font path for the watermark; the built-in glyphs
    /// are the guaranteed fallback.
    pub font_path: Option<PathBuf>,
    /// Corner fill for rotated canvases.
    pub rotation_fill: [u8; 3],
    /// Whether to run the classifier on the original/rotated pair.
    pub classify: bool,
    /// Artifact directory size cap enforced after each run.
    pub retention_cap: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1600,
            jpeg_quality: 90,
            histogram: HistogramOptions::default(),
            watermark_text: "spinlens".to_string(),
            font_path: None,
            rotation_fill: [0, 0, 0],
            classify: true,
            retention_cap: 10,
        }
    }
}

/// One user submission. Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Raw upload bytes in any format the decoder can guess.
    pub bytes: Vec<u8>,
    /// Rotation in degrees, positive counter-clockwise, any range.
    pub angle_degrees: f64,
    /// Whether to composite the watermark onto the rotated image.
    pub watermark: bool,
    /// Result of the upstream human-verification check. Unverified
    /// submissions are rejected before any decoding work.
    pub human_verified: bool,
}

/// A histogram together with its rendered chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramArtifact {
    pub histogram: ColorHistogram,
    /// PNG rendering of the histogram.
    pub chart_png: Vec<u8>,
}

/// Classifier output for the original/rotated pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedPair {
    pub original: ClassificationResult,
    pub rotated: ClassificationResult,
}

/// Everything one run produces. Transient; persistence of the encoded
/// outputs is best-effort via the artifact store.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Normalized original, JPEG encoded.
    pub original_jpeg: Vec<u8>,
    /// Rotated image, JPEG encoded.
    pub rotated_jpeg: Vec<u8>,
    /// Histogram and chart of the normalized original.
    pub original_histogram: HistogramArtifact,
    /// Histogram and chart of the rotated image.
    pub rotated_histogram: HistogramArtifact,
    /// Watermarked copy of the original, present when the request asked
    /// for it.
    pub watermarked_jpeg: Option<Vec<u8>>,
    /// Classification of the pair, present when classification is enabled.
    pub classifications: Option<ClassifiedPair>,
    /// Artifacts that were successfully persisted this run.
    pub artifacts: Vec<ArtifactRecord>,
}

/// The pipeline orchestrator.
///
/// Construction is explicit: configuration, a classifier service (possibly
/// disabled) and an optional artifact store. No global state.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    classifier: ClassifierService,
    store: Option<ArtifactStore>,
    font: WatermarkFont,
}

impl Pipeline {
    /// Build a pipeline; resolves the watermark font once, up front.
    pub fn new(
        config: PipelineConfig,
        classifier: ClassifierService,
        store: Option<ArtifactStore>,
    ) -> Self {
        let font = WatermarkFont::resolve(config.font_path.as_deref());
        Self {
            config,
            classifier,
            store,
            font,
        }
    }

    /// Process one submission end to end.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::NotVerified`] for unverified submissions
    /// - [`PipelineError::InvalidInput`] when the upload cannot be decoded
    /// - [`PipelineError::Internal`] for stage faults past decoding
    ///
    /// Classification and persistence failures do not surface here; they
    /// degrade the result instead.
    pub fn run(&self, request: &PipelineRequest) -> Result<PipelineResult, PipelineError> {
        if !request.human_verified {
            return Err(PipelineError::NotVerified);
        }

        tracing::info!(
            bytes = request.bytes.len(),
            angle = request.angle_degrees,
            watermark = request.watermark,
            "pipeline run started"
        );

        let decoded = decode_image(&request.bytes)?;
        tracing::debug!(width = decoded.width, height = decoded.height, "decoded");

        let original = bound_to_max(&decoded, self.config.max_dimension)
            .map_err(|e| PipelineError::internal(Stage::Normalize, e))?;
        tracing::debug!(width = original.width, height = original.height, "normalized");

        let rotated = rotate(&original, request.angle_degrees, self.config.rotation_fill);
        tracing::debug!(width = rotated.width, height = rotated.height, "rotated");

        let original_histogram = self.analyze(&original, "original")?;
        let rotated_histogram = self.analyze(&rotated, "rotated")?;

        let jpeg = EncodeFormat::Jpeg {
            quality: self.config.jpeg_quality,
        };
        let original_jpeg =
            encode_image(&original, jpeg).map_err(|e| PipelineError::internal(Stage::Encode, e))?;
        let rotated_jpeg =
            encode_image(&rotated, jpeg).map_err(|e| PipelineError::internal(Stage::Encode, e))?;

        // The watermark goes on the original, not the rotated variant.
        let watermarked_jpeg = if request.watermark {
            let marked = apply_watermark(&original, &self.config.watermark_text, &self.font);
            Some(
                encode_image(&marked, jpeg)
                    .map_err(|e| PipelineError::internal(Stage::Watermark, e))?,
            )
        } else {
            None
        };

        let classifications = if self.config.classify {
            // Buffers are no longer needed past this point; batch them into
            // one classifier call.
            let batch = [original, rotated];
            let mut results = self.classifier.classify_all(&batch);
            let rotated_result = results.pop();
            let original_result = results.pop();
            match (original_result, rotated_result) {
                (Some(original), Some(rotated)) => Some(ClassifiedPair { original, rotated }),
                _ => None,
            }
        } else {
            None
        };

        let artifacts = self.persist_outputs(
            &original_jpeg,
            &rotated_jpeg,
            &original_histogram,
            &rotated_histogram,
            watermarked_jpeg.as_deref(),
        );

        tracing::info!(artifacts = artifacts.len(), "pipeline run completed");

        Ok(PipelineResult {
            original_jpeg,
            rotated_jpeg,
            original_histogram,
            rotated_histogram,
            watermarked_jpeg,
            classifications,
            artifacts,
        })
    }

    fn analyze(
        &self,
        buffer: &PixelBuffer,
        label: &str,
    ) -> Result<HistogramArtifact, PipelineError> {
        let histogram = compute_color_histogram(buffer, self.config.histogram);
        let chart_png = render_chart(&histogram, label)
            .map_err(|e| PipelineError::internal(Stage::Analyze, e))?;
        Ok(HistogramArtifact {
            histogram,
            chart_png,
        })
    }

    /// Write the encoded outputs to the artifact store and enforce the
    /// retention cap. Best-effort throughout; failures shrink the returned
    /// list instead of failing the run.
    fn persist_outputs(
        &self,
        original_jpeg: &[u8],
        rotated_jpeg: &[u8],
        original_histogram: &HistogramArtifact,
        rotated_histogram: &HistogramArtifact,
        watermarked_jpeg: Option<&[u8]>,
    ) -> Vec<ArtifactRecord> {
        let Some(store) = &self.store else {
            return Vec::new();
        };

        let mut outputs: Vec<(&[u8], &str, &str)> = vec![
            (original_jpeg, "original", "jpg"),
            (rotated_jpeg, "rotated", "jpg"),
            (&original_histogram.chart_png, "original-histogram", "png"),
            (&rotated_histogram.chart_png, "rotated-histogram", "png"),
        ];
        if let Some(marked) = watermarked_jpeg {
            outputs.push((marked, "watermarked", "jpg"));
        }

        let mut records = Vec::with_capacity(outputs.len());
        for (bytes, stem, ext) in outputs {
            match store.persist(bytes, stem, ext) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(stem, error = %e, "artifact persistence skipped");
                }
            }
        }

        store.prune(self.config.retention_cap);
        records
    }
}
