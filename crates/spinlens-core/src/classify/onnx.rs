//! ONNX Runtime classification backend.
//!
//! Loads a pretrained image classifier exported to ONNX. Requires two files
//! in the model directory:
//! - `model.onnx` - the model weights, taking NCHW `f32` input and
//!   producing one logit row per image
//! - `labels.txt` - one class label per line, in output order
//!
//! The session lives behind a `Mutex` because `ort::Session::run` requires
//! `&mut self` while the classifier is shared read-only across requests;
//! concurrent callers serialize on inference.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;

use super::{preprocess_chw, ClassificationResult, ClassifyError, ImageClassifier, MODEL_INPUT_DIM};
use crate::decode::PixelBuffer;

/// ONNX Runtime backed top-1 classifier.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    labels: Vec<String>,
    input_dim: u32,
}

impl OnnxClassifier {
    /// Load the classifier from a directory containing `model.onnx` and
    /// `labels.txt`.
    pub fn load(model_dir: &Path) -> Result<Self, ClassifyError> {
        Self::load_with_input_dim(model_dir, MODEL_INPUT_DIM)
    }

    /// Load with a non-default model input resolution.
    pub fn load_with_input_dim(model_dir: &Path, input_dim: u32) -> Result<Self, ClassifyError> {
        let model_path = model_dir.join("model.onnx");
        let labels_path = model_dir.join("labels.txt");

        if !model_path.exists() {
            return Err(ClassifyError::ModelNotFound(model_path));
        }
        if !labels_path.exists() {
            return Err(ClassifyError::ModelNotFound(labels_path));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| ClassifyError::ModelInit(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e: ort::Error| ClassifyError::ModelInit(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| ClassifyError::ModelInit(format!("ONNX load failed: {e}")))?;

        let labels = std::fs::read_to_string(&labels_path)
            .map_err(|e| ClassifyError::ModelInit(format!("Labels load failed: {e}")))?
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>();

        if labels.is_empty() {
            return Err(ClassifyError::ModelInit(
                "labels.txt contains no labels".to_string(),
            ));
        }

        tracing::info!(
            model = %model_path.display(),
            classes = labels.len(),
            "ONNX classifier loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            labels,
            input_dim,
        })
    }

    /// Preprocess all inputs into one NCHW batch and run a single
    /// inference call.
    fn infer(&self, images: &[PixelBuffer]) -> Result<Vec<ClassificationResult>, ClassifyError> {
        use ort::value::TensorRef;

        if images.is_empty() {
            return Ok(Vec::new());
        }

        let dim = self.input_dim as usize;
        let plane = dim * dim;

        let mut batch = Vec::with_capacity(images.len() * 3 * plane);
        for image in images {
            batch.extend(preprocess_chw(image, self.input_dim)?);
        }

        let input = ndarray::Array4::from_shape_vec((images.len(), 3, dim, dim), batch)
            .map_err(|e| ClassifyError::Preprocess(e.to_string()))?;

        let input_tensor = TensorRef::from_array_view(&input)
            .map_err(|e| ClassifyError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifyError::Inference("Session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| ClassifyError::Inference(format!("ONNX inference failed: {e}")))?;

        // Output shape: [n, num_classes] logits
        let (shape, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifyError::Inference(format!("Output extraction: {e}")))?;

        if shape.len() != 2 || shape[0] as usize != images.len() {
            return Err(ClassifyError::Inference(format!(
                "Unexpected output shape: {shape:?}, expected [{}, num_classes]",
                images.len()
            )));
        }

        let num_classes = shape[1] as usize;
        let mut results = Vec::with_capacity(images.len());

        for row in 0..images.len() {
            let logits_row = &logits[row * num_classes..(row + 1) * num_classes];
            let (idx, confidence) = softmax_top1(logits_row);
            let label = self
                .labels
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("class-{idx}"));
            results.push(ClassificationResult { label, confidence });
        }

        Ok(results)
    }
}

impl ImageClassifier for OnnxClassifier {
    fn classify(&self, images: &[PixelBuffer]) -> Result<Vec<ClassificationResult>, ClassifyError> {
        self.infer(images)
    }
}

/// Softmax over one logit row, returning the argmax index and its
/// probability. The max-logit shift keeps exp() from overflowing.
fn softmax_top1(logits: &[f32]) -> (usize, f32) {
    if logits.is_empty() {
        return (0, 0.0);
    }

    let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    let mut best_idx = 0;
    let mut best_exp = 0.0f32;

    for (i, &logit) in logits.iter().enumerate() {
        let e = (logit - max_logit).exp();
        sum += e;
        if e > best_exp {
            best_exp = e;
            best_idx = i;
        }
    }

    if sum > 0.0 {
        (best_idx, (best_exp / sum).clamp(0.0, 1.0))
    } else {
        (best_idx, 0.0)
    }
}
