//! Image classification with a pretrained model.
//!
//! Classification is a best-effort enrichment of the pipeline output, never
//! a hard dependency: a service whose model failed to load answers every
//! call with a fixed placeholder, and a failing inference degrades to error
//! placeholders instead of propagating.
//!
//! Backends implement [`ImageClassifier`]; the real ONNX Runtime backend
//! lives behind the `onnx-classifier` feature so the default build carries
//! no inference runtime.

#[cfg(feature = "onnx-classifier")]
mod onnx;

#[cfg(feature = "onnx-classifier")]
pub use onnx::OnnxClassifier;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::{resize_exact, PixelBuffer};

/// Default model input resolution (square), matching common ImageNet models.
pub const MODEL_INPUT_DIM: u32 = 224;

/// Label reported when no model is loaded.
pub const UNAVAILABLE_LABEL: &str = "unavailable";

/// Label reported when inference failed for an input.
pub const ERROR_LABEL: &str = "error";

/// ImageNet per-channel mean, in RGB order, for [0, 1] scaled input.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet per-channel standard deviation, in RGB order.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Error types for classifier loading and inference.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// A required model file is missing.
    #[error("Model file not found: {0}")]
    ModelNotFound(PathBuf),

    /// The inference runtime failed to initialize.
    #[error("Model initialization failed: {0}")]
    ModelInit(String),

    /// Input preprocessing failed.
    #[error("Preprocessing failed: {0}")]
    Preprocess(String),

    /// Inference itself failed.
    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Top-1 classification outcome for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Predicted label.
    pub label: String,
    /// Confidence in [0, 1].
    pub confidence: f32,
}

impl ClassificationResult {
    /// The fixed placeholder returned when no model is loaded.
    pub fn unavailable() -> Self {
        Self {
            label: UNAVAILABLE_LABEL.to_string(),
            confidence: 0.0,
        }
    }

    /// The placeholder returned when inference failed for an input.
    pub fn failed() -> Self {
        Self {
            label: ERROR_LABEL.to_string(),
            confidence: 0.0,
        }
    }

    /// True for either placeholder variant.
    pub fn is_placeholder(&self) -> bool {
        self.confidence == 0.0 && (self.label == UNAVAILABLE_LABEL || self.label == ERROR_LABEL)
    }
}

/// A pretrained top-1 image classifier.
///
/// Implementations must be safe to share across threads; if the underlying
/// runtime needs exclusive access for inference, serialize internally (the
/// ONNX backend holds its session behind a `Mutex`).
pub trait ImageClassifier: Send + Sync {
    /// Classify a batch of buffers, one result per input, order-preserving.
    fn classify(&self, images: &[PixelBuffer]) -> Result<Vec<ClassificationResult>, ClassifyError>;
}

/// Shared, read-only classification service.
///
/// Holds an optional backend; construct with [`ClassifierService::disabled`]
/// when model loading failed at startup. The service itself is infallible:
/// failures become placeholders.
pub struct ClassifierService {
    backend: Option<Box<dyn ImageClassifier>>,
}

impl ClassifierService {
    /// Service with a loaded backend.
    pub fn new(backend: Box<dyn ImageClassifier>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Service without a model; every call returns the fixed placeholder.
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// Whether a model is loaded.
    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Classify a batch of buffers.
    ///
    /// Always returns exactly one result per input, in input order. Never
    /// fails: a missing model yields `unavailable` placeholders, a failed
    /// inference yields `error` placeholders.
    pub fn classify_all(&self, images: &[PixelBuffer]) -> Vec<ClassificationResult> {
        let Some(backend) = &self.backend else {
            return images
                .iter()
                .map(|_| ClassificationResult::unavailable())
                .collect();
        };

        match backend.classify(images) {
            Ok(results) if results.len() == images.len() => results,
            Ok(results) => {
                tracing::warn!(
                    expected = images.len(),
                    got = results.len(),
                    "classifier returned wrong result count, padding with placeholders"
                );
                let mut results = results;
                results.truncate(images.len());
                while results.len() < images.len() {
                    results.push(ClassificationResult::failed());
                }
                results
            }
            Err(e) => {
                tracing::warn!(error = %e, "classification degraded to placeholders");
                images
                    .iter()
                    .map(|_| ClassificationResult::failed())
                    .collect()
            }
        }
    }
}

impl std::fmt::Debug for ClassifierService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierService")
            .field("available", &self.is_available())
            .finish()
    }
}

/// Resize a buffer to the model resolution and lay it out as a normalized
/// CHW `f32` plane: scaled to [0, 1], then ImageNet mean/variance
/// normalized per channel. The normalization must match the model's
/// training preprocessing; a mismatch degrades accuracy silently.
pub fn preprocess_chw(buffer: &PixelBuffer, input_dim: u32) -> Result<Vec<f32>, ClassifyError> {
    let resized =
        resize_exact(buffer, input_dim, input_dim).map_err(|e| ClassifyError::Preprocess(e.to_string()))?;

    let plane = (input_dim as usize) * (input_dim as usize);
    let mut chw = vec![0.0f32; plane * 3];

    for (i, chunk) in resized.pixels.chunks_exact(3).enumerate() {
        for c in 0..3 {
            let v = f32::from(chunk[c]) / 255.0;
            chw[c * plane + i] = (v - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    Ok(chw)
}

/// Deterministic classifier used in tests and demos: labels each image by
/// its dominant channel, confidence from that channel's mean intensity.
pub struct MockClassifier;

impl ImageClassifier for MockClassifier {
    fn classify(&self, images: &[PixelBuffer]) -> Result<Vec<ClassificationResult>, ClassifyError> {
        Ok(images
            .iter()
            .map(|buf| {
                let mut sums = [0u64; 3];
                for chunk in buf.pixels.chunks_exact(3) {
                    sums[0] += u64::from(chunk[0]);
                    sums[1] += u64::from(chunk[1]);
                    sums[2] += u64::from(chunk[2]);
                }
                let (idx, &max_sum) = sums
                    .iter()
                    .enumerate()
                    .max_by_key(|&(_, &s)| s)
                    .unwrap_or((0, &0));
                let label = ["red", "green", "blue"][idx].to_string();
                let total = buf.pixel_count().max(1) * 255;
                let confidence = (max_sum as f64 / total as f64).clamp(0.0, 1.0) as f32;
                ClassificationResult { label, confidence }
            })
            .collect())
    }
}
