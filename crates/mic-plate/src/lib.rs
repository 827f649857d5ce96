//! Read antifungal MIC values from photographs of 96-well plates.
//!
//! The plate is a colorimetric broth-microdilution panel: eight drug rows,
//! twelve two-fold dilutions each. A pink well grew, a purple well was
//! inhibited, and the MIC of a row is the concentration of its first purple
//! well.
//!
//! ## Pipeline
//!
//! 1. [`PlateLocator`]: crop the well area out of the photo.
//! 2. [`grid::GridFitter`]: recover the 8x12 lattice from circle candidates
//!    (external [`grid::CircleDetector`] or colour blobs).
//! 3. [`WellExtractor`]: sample colour statistics per well.
//! 4. [`WellClassifier`]: score, resolve and make each row monotone.
//! 5. [`MicCalculator`]: read one MIC per drug row.
//!
//! [`PlateAnalyzer`] runs all of it. Every stage degrades instead of failing;
//! only invalid input images and panels are errors.
//!
//! ## Quickstart
//!
//! ```no_run
//! use mic_plate::{load_rgb, PlateAnalyzer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = load_rgb("plate.jpg")?;
//! let analysis = PlateAnalyzer::default().analyze(&img.view())?;
//! for r in &analysis.mic.results {
//!     println!("{}: {}", r.drug, r.display_value());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//! - `image` (default): [`load_rgb`] and friends on top of the `image` crate.
//! - `cli` (default): the `mic-plate` binary.
//! - `tracing`: spans on the hot stages and a `tracing-subscriber` setup.

pub use mic_plate_core as core;
pub use mic_plate_grid as grid;

mod classify;
mod extract;
mod io;
mod locate;
mod mic;
mod panel;
mod pipeline;
mod well;

#[cfg(feature = "image")]
mod load;

pub use classify::{ClassifierParams, ClassifyError, WellClassifier};
pub use extract::{ExtractParams, WellExtractor};
pub use io::{AnalysisReport, AnalyzerConfig, IoError};
pub use locate::{LocateStrategy, LocatorParams, PlateLocation, PlateLocator, PlateNormalizer};
pub use mic::{MicCalculator, MicReport, MicResult, MIN_CONTROL_SCORE};
pub use panel::{DrugPanel, DrugRow, PanelError, WellPosition};
pub use pipeline::{AnalyzeError, PlateAnalysis, PlateAnalyzer};
pub use well::{Confidence, WellColor, WellData, WellResult};

#[cfg(feature = "image")]
pub use load::{from_dynamic, load_rgb, rgb_view};
