//! Core types for image decoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for image decoding operations.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file format is not recognized or supported.
    #[error("Invalid or unsupported image format")]
    InvalidFormat,

    /// The image file is corrupted or incomplete.
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),

    /// The decoded image has no pixels.
    #[error("Image has zero width or height")]
    EmptyImage,

    /// I/O error during reading.
    #[error("I/O error: {0}")]
    IoError(String),
}

/// EXIF orientation values (1-8).
/// See: https://exiftool.org/TagNames/EXIF.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    /// Normal (no transformation needed).
    #[default]
    Normal = 1,
    /// Horizontal flip.
    FlipHorizontal = 2,
    /// Rotate 180 degrees.
    Rotate180 = 3,
    /// Vertical flip.
    FlipVertical = 4,
    /// Transpose (flip horizontal + rotate 270 CW).
    Transpose = 5,
    /// Rotate 90 degrees clockwise.
    Rotate90CW = 6,
    /// Transverse (flip horizontal + rotate 90 CW).
    Transverse = 7,
    /// Rotate 270 degrees clockwise (90 CCW).
    Rotate270CW = 8,
}

impl From<u32> for Orientation {
    fn from(value: u32) -> Self {
        match value {
            1 => Orientation::Normal,
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}

/// Canonical in-memory image representation: 8-bit RGB pixel data.
///
/// Every pipeline stage consumes and produces `PixelBuffer` values. Stages
/// never mutate a buffer in place; transformations return a new buffer so
/// earlier stages (e.g. the pre-rotation histogram) keep a valid source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// RGB pixel data in row-major order (3 bytes per pixel).
    /// Length is always width * height * 3.
    pub pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Create a new PixelBuffer with the given dimensions and pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            (width as usize) * (height as usize) * 3,
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create a buffer filled with a single color.
    pub fn filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let count = (width as usize) * (height as usize);
        let mut pixels = Vec::with_capacity(count * 3);
        for _ in 0..count {
            pixels.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create a PixelBuffer from an image::RgbImage.
    pub fn from_rgb_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let pixels = img.into_raw();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Convert to an image::RgbImage for further processing.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Get the RGB value at (x, y).
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = ((y * self.width + x) * 3) as usize;
        [self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2]]
    }

    /// Set the RGB value at (x, y).
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: [u8; 3]) {
        let idx = ((y * self.width + x) * 3) as usize;
        self.pixels[idx] = color[0];
        self.pixels[idx + 1] = color[1];
        self.pixels[idx + 2] = color[2];
    }

    /// Check if this is an empty/invalid image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }
}
