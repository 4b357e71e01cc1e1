//! Geometric transform operations.
//!
//! The only transform the pipeline performs is arbitrary-angle rotation
//! with expand-on-rotate semantics: the output canvas grows to the bounding
//! box of the rotated rectangle so nothing is clipped.
//!
//! # Coordinate System
//!
//! - Rotation angles are in degrees, positive = counter-clockwise
//! - Origin is top-left corner

mod rotation;

pub use rotation::{compute_rotated_bounds, rotate};
