use crate::circle::HoughParams;
use mic_plate_core::WellPixelThresholds;
use serde::{Deserialize, Serialize};

/// Tunables for [`crate::GridFitter`].
///
/// All ratios are relative to the expected well pitch (`image size / count`)
/// or to the current step estimate, as noted per field. The defaults were
/// tuned on phone photographs of 7005 MIC YST plates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridFitParams {
    pub rows: usize,
    pub cols: usize,

    /// Fewer points than this and fitting is abandoned.
    pub min_points: usize,
    /// Fewer detector circles than this triggers the colour-blob fallback.
    pub min_circles: usize,

    /// Expected well radius as a fraction of the smaller expected pitch.
    pub radius_ratio: f32,
    /// Radius bounds of the high-recall detector pass, times expected radius.
    pub strict_radius_range: (f32, f32),
    /// Radius bounds of the second, looser pass.
    pub loose_radius_range: (f32, f32),
    /// Detector minimum centre distance, times the smaller expected pitch.
    pub min_dist_ratio: f32,
    pub hough: HoughParams,

    /// Two centres share a row (column) if their other coordinate differs by
    /// less than this fraction of the expected pitch.
    pub same_line_tol: f32,
    /// Pairs closer than this fraction of the expected pitch are ignored.
    pub min_pair_ratio: f32,
    /// Unit-step samples are kept inside this window around the expected pitch.
    pub unit_step_window: (f32, f32),
    pub min_step_samples: usize,
    /// `step_x / step_y` outside this range gets both steps averaged.
    pub step_ratio_bounds: (f32, f32),

    /// Origin candidates must lie in `[lo, hi] * step`.
    pub origin_window: (f32, f32),
    /// Slot match tolerance, times the larger step.
    pub assign_tol: f32,
    pub refine_iterations: usize,
    /// Refinement stops once fewer points than this are assigned.
    pub min_refine_points: usize,

    /// 1-D clustering threshold, times the step.
    pub cluster_threshold: f32,
    /// Adjacent clusters are merged while their gap is below this fraction of
    /// the mean gap and there are more clusters than expected.
    pub merge_gap_ratio: f32,

    /// Circle-to-slot tolerance for extraction, times the larger step.
    pub slot_assign_tol: f32,

    /// Blob bin size, times the smaller expected pitch.
    pub blob_bin_ratio: f32,
    pub blob_min_pixels: usize,
    /// Blob centroids closer than this fraction of the pitch are merged.
    pub blob_merge_ratio: f32,
    /// Border band ignored by the blob scan, fraction of the image size.
    pub blob_margin: f32,
    pub blob_stride: usize,
    pub blob_thresholds: WellPixelThresholds,
}

impl Default for GridFitParams {
    fn default() -> Self {
        Self {
            rows: mic_plate_core::layout::ROWS,
            cols: mic_plate_core::layout::COLS,
            min_points: 10,
            min_circles: 20,
            radius_ratio: 0.42,
            strict_radius_range: (0.5, 1.3),
            loose_radius_range: (0.35, 1.6),
            min_dist_ratio: 0.65,
            hough: HoughParams::default(),
            same_line_tol: 0.4,
            min_pair_ratio: 0.5,
            unit_step_window: (0.7, 1.3),
            min_step_samples: 5,
            step_ratio_bounds: (0.85, 1.15),
            origin_window: (-0.3, 1.5),
            assign_tol: 0.35,
            refine_iterations: 3,
            min_refine_points: 20,
            cluster_threshold: 0.5,
            merge_gap_ratio: 0.6,
            slot_assign_tol: 0.45,
            blob_bin_ratio: 0.7,
            blob_min_pixels: 5,
            blob_merge_ratio: 0.5,
            blob_margin: 0.03,
            blob_stride: 2,
            blob_thresholds: WellPixelThresholds::blob(),
        }
    }
}

impl GridFitParams {
    /// Expected `(pitch_x, pitch_y)` for an image of the given size.
    pub fn expected_pitch(&self, width: f32, height: f32) -> (f32, f32) {
        (
            width / self.cols.max(1) as f32,
            height / self.rows.max(1) as f32,
        )
    }

    pub fn expected_count(&self) -> usize {
        self.rows * self.cols
    }
}
