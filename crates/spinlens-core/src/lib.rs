//! Spinlens Core - Image processing pipeline library
//!
//! This crate implements a request-scoped image pipeline: decoding uploads,
//! bounding their size, rotating with canvas expansion, per-channel histogram
//! analysis with chart rendering, watermark compositing, optional pretrained
//! classification and bounded artifact retention.
//!
//! [`pipeline::Pipeline`] is the main entry point; the stage modules are
//! public so each piece can be used on its own.

pub mod classify;
pub mod decode;
pub mod encode;
pub mod histogram;
pub mod pipeline;
pub mod store;
pub mod text;
pub mod transform;
pub mod watermark;

pub use classify::{ClassificationResult, ClassifierService, ImageClassifier};
pub use decode::{decode_image, DecodeError, PixelBuffer};
pub use encode::{encode_image, EncodeError, EncodeFormat};
pub use histogram::{compute_color_histogram, render_chart, ColorHistogram, HistogramOptions};
pub use pipeline::{
    Pipeline, PipelineConfig, PipelineError, PipelineRequest, PipelineResult, Stage,
};
pub use store::{ArtifactRecord, ArtifactStore, PersistError};
pub use transform::{compute_rotated_bounds, rotate};
pub use watermark::{apply_watermark, WatermarkFont};
