use crate::fitter::GridStructure;
use crate::lattice::best_per_slot;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

const W_COVERAGE: f32 = 0.40;
const W_ALIGNMENT: f32 = 0.35;
const W_SPACING: f32 = 0.25;

pub const ACCEPTABLE_SCORE: f32 = 0.7;
pub const MANUAL_REVIEW_SCORE: f32 = 0.5;

/// Diagnostics of a grid fit, surfaced to the caller as data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridQuality {
    pub circle_count: usize,
    pub expected_count: usize,
    /// Distinct lattice slots matched by a point, over the expected count.
    pub coverage_ratio: f32,
    /// Match ratio times the mean `1 - error / tol` of matched points.
    pub alignment_score: f32,
    /// `1 - 2 * CV` of adjacent row and column gaps, floored at 0.
    pub spacing_consistency: f32,
    pub overall_score: f32,
    pub warnings: Vec<String>,
}

fn axis_spacing(centers: &[f32]) -> f32 {
    let gaps: Vec<f32> = centers.windows(2).map(|w| w[1] - w[0]).collect();
    match gaps.len() {
        0 => 0.0,
        1 => 1.0,
        _ => mic_plate_core::coefficient_of_variation(&gaps)
            .map_or(0.0, |cv| (1.0 - 2.0 * cv).max(0.0)),
    }
}

impl GridQuality {
    /// Score `points` against the fitted structure. `tol` is the slot match
    /// distance in pixels.
    pub fn evaluate(
        points: &[Point2<f32>],
        grid: &GridStructure,
        expected_rows: usize,
        expected_cols: usize,
        tol: f32,
    ) -> Self {
        let expected_count = expected_rows * expected_cols;
        let lattice = grid.lattice();

        let unique = best_per_slot(points, &lattice, expected_rows, expected_cols, tol).len();
        let coverage_ratio = if expected_count == 0 {
            0.0
        } else {
            (unique as f32 / expected_count as f32).min(1.0)
        };

        let errors: Vec<f32> = points
            .iter()
            .map(|&p| lattice.nearest_slot(p, expected_rows, expected_cols).2)
            .filter(|&e| e <= tol)
            .collect();
        let alignment_score = if points.is_empty() || errors.is_empty() || tol <= 0.0 {
            0.0
        } else {
            let match_ratio = errors.len() as f32 / points.len() as f32;
            let mean_fit =
                errors.iter().map(|e| 1.0 - e / tol).sum::<f32>() / errors.len() as f32;
            match_ratio * mean_fit
        };

        let spacing_consistency =
            0.5 * (axis_spacing(&grid.row_centers) + axis_spacing(&grid.col_centers));

        let overall_score = (W_COVERAGE * coverage_ratio
            + W_ALIGNMENT * alignment_score
            + W_SPACING * spacing_consistency)
            .clamp(0.0, 1.0);

        let mut warnings = Vec::new();
        if grid.rows != expected_rows || grid.cols != expected_cols {
            warnings.push(format!(
                "detected {}x{} grid, expected {}x{}",
                grid.rows, grid.cols, expected_rows, expected_cols
            ));
        }
        if coverage_ratio < 0.5 {
            warnings.push(format!(
                "low well coverage: {unique}/{expected_count} slots matched"
            ));
        }
        if spacing_consistency < 0.5 {
            warnings.push("irregular row/column spacing".to_string());
        }

        Self {
            circle_count: points.len(),
            expected_count,
            coverage_ratio,
            alignment_score,
            spacing_consistency,
            overall_score,
            warnings,
        }
    }

    /// Quality record for a run that fell back to the equal-division grid.
    pub fn fallback(circle_count: usize, expected_count: usize, reason: &str) -> Self {
        Self {
            circle_count,
            expected_count,
            coverage_ratio: 0.0,
            alignment_score: 0.0,
            spacing_consistency: 0.0,
            overall_score: 0.0,
            warnings: vec![reason.to_string()],
        }
    }

    pub fn is_acceptable(&self) -> bool {
        self.overall_score >= ACCEPTABLE_SCORE
    }

    pub fn needs_manual_review(&self) -> bool {
        self.overall_score < MANUAL_REVIEW_SCORE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perfect(step: f32) -> (Vec<Point2<f32>>, GridStructure) {
        let grid = GridStructure::naive(12.0 * step, 8.0 * step, 8, 12);
        let mut pts = Vec::new();
        for r in 0..8 {
            for c in 0..12 {
                pts.push(grid.cell_center(r, c));
            }
        }
        (pts, grid)
    }

    #[test]
    fn perfect_grid_scores_one() {
        let (pts, grid) = perfect(50.0);
        let q = GridQuality::evaluate(&pts, &grid, 8, 12, 17.5);
        assert!((q.overall_score - 1.0).abs() < 1e-4, "{q:?}");
        assert!(q.is_acceptable());
        assert!(!q.needs_manual_review());
        assert!(q.warnings.is_empty());
    }

    #[test]
    fn sparse_points_need_review() {
        let (pts, grid) = perfect(50.0);
        let few: Vec<_> = pts.into_iter().step_by(8).collect();
        let q = GridQuality::evaluate(&few, &grid, 8, 12, 17.5);
        assert_eq!(q.circle_count, 12);
        assert!((q.coverage_ratio - 0.125).abs() < 1e-6);
        assert!(!q.is_acceptable());
        assert!(q.warnings.iter().any(|w| w.contains("coverage")));
    }

    #[test]
    fn fallback_quality_needs_review() {
        let q = GridQuality::fallback(3, 96, "grid fit failed");
        assert!(q.needs_manual_review());
        assert_eq!(q.warnings, vec!["grid fit failed".to_string()]);
    }
}
