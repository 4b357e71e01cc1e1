//! Input decoding and size normalization.
//!
//! This module provides functionality for:
//! - Decoding uploaded image bytes into the canonical RGB layout
//! - Applying EXIF orientation so phone photos come out upright
//! - Bounding oversized uploads to a maximum dimension
//!
//! # Architecture
//!
//! Decoding is the first pipeline stage and the only one whose failures are
//! user-input errors rather than internal faults: whatever the presentation
//! layer accepted as an upload lands here unparsed.

mod image;
mod normalize;
mod types;

pub use image::{decode_image, get_orientation};
pub use normalize::{bound_to_max, resize_exact};
pub use types::{DecodeError, Orientation, PixelBuffer};
