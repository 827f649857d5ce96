//! Core types and utilities for 96-well MIC plate reading.
//!
//! This crate is intentionally small: RGB image views, HSV conversion on the
//! OpenCV scale, a 4-point homography with a perspective warp, and a few
//! robust statistics. It knows nothing about grids or classification.

mod color;
mod homography;
mod image;
mod logger;
mod stats;

pub use color::{
    circular_hue_distance, circular_mean_hue, is_well_colored, Hsv, WellPixelThresholds,
};
pub use homography::{homography_from_4pt, warp_perspective_rgb, Homography};
pub use image::{ImageError, PixelRect, RgbImage, RgbImageView};
pub use stats::{coefficient_of_variation, mean, median};

#[cfg(feature = "tracing")]
pub use logger::{init_tracing, init_tracing_with_level};

pub use logger::init_with_level;

/// Plate layout constants for a standard 96-well plate.
pub mod layout {
    /// Number of well rows (A..H).
    pub const ROWS: usize = 8;
    /// Number of well columns (1..12).
    pub const COLS: usize = 12;
    /// Total wells on the plate.
    pub const WELL_COUNT: usize = ROWS * COLS;
    /// Landscape aspect ratio of a correctly photographed plate (127.76 x 85.48 mm).
    pub const PLATE_ASPECT: f32 = 1.5;

    /// Row label (`'A'..='H'`) for a zero-based row index.
    pub fn row_label(row: usize) -> char {
        (b'A' + (row.min(25) as u8)) as char
    }
}
