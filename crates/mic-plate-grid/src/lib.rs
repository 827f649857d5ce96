//! Well-lattice recovery for 96-well plates.
//!
//! Input is a cropped plate image (or an unordered set of candidate centres);
//! output is a [`GridStructure`]: per-axis step, origin and the measured
//! row/column centre lines, plus a [`GridQuality`] diagnostic.
//!
//! ## Pipeline
//!
//! 1. Candidates from an external [`CircleDetector`] (strict radius pass, then
//!    a looser one), cleaned by [`postprocess_circles`]. With fewer than
//!    `min_circles` results the colour-blob finder [`find_blob_centers`] is
//!    used instead.
//! 2. Per-axis step: median of unit steps between points sharing a row or
//!    column. Implausible `step_x / step_y` ratios are averaged.
//! 3. Origin: exhaustive search over back-projected candidates, scored by the
//!    number of distinct slots matched.
//! 4. Least-squares refinement of origin and step per axis.
//! 5. 1-D clustering of the matched points gives the row and column lines.
//!
//! ## Quickstart
//!
//! ```
//! use mic_plate_grid::GridFitter;
//! use nalgebra::Point2;
//!
//! let mut pts = Vec::new();
//! for r in 0..8 {
//!     for c in 0..12 {
//!         pts.push(Point2::new(50.0 + 100.0 * c as f32, 50.0 + 100.0 * r as f32));
//!     }
//! }
//! let grid = GridFitter::default().fit_points(&pts, 1200.0, 800.0).unwrap();
//! assert_eq!((grid.rows, grid.cols), (8, 12));
//! ```

mod blob;
mod circle;
mod cluster;
mod fitter;
mod lattice;
mod origin;
mod params;
mod quality;
mod refine;
mod step;

pub use blob::find_blob_centers;
pub use circle::{postprocess_circles, CircleDetector, DetectedCircle, HoughParams, NoCircleDetector};
pub use fitter::{GridFit, GridFitter, GridStructure};
pub use lattice::Lattice;
pub use params::GridFitParams;
pub use quality::{GridQuality, ACCEPTABLE_SCORE, MANUAL_REVIEW_SCORE};
