use crate::params::GridFitParams;
use nalgebra::Point2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct StepEstimate {
    pub step_x: f32,
    pub step_y: f32,
    /// Both steps were replaced by their mean because the ratio was implausible.
    pub ratio_corrected: bool,
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

impl Axis {
    #[inline]
    fn split(self, p: Point2<f32>) -> (f32, f32) {
        match self {
            Axis::X => (p.x, p.y),
            Axis::Y => (p.y, p.x),
        }
    }
}

/// Unit-step samples along `axis` from pairs lying on a common row/column.
fn unit_step_samples(
    points: &[Point2<f32>],
    axis: Axis,
    expected_along: f32,
    expected_across: f32,
    params: &GridFitParams,
) -> Vec<f32> {
    let across_tol = params.same_line_tol * expected_across;
    let min_diff = params.min_pair_ratio * expected_along;
    let max_n = params.rows.max(params.cols) as f32;
    let (lo, hi) = params.unit_step_window;

    let mut samples = Vec::new();
    for (i, &a) in points.iter().enumerate() {
        let (a_along, a_across) = axis.split(a);
        for &b in &points[i + 1..] {
            let (b_along, b_across) = axis.split(b);
            if (a_across - b_across).abs() > across_tol {
                continue;
            }
            let diff = (a_along - b_along).abs();
            if diff < min_diff {
                continue;
            }
            let n = (diff / expected_along).round().clamp(1.0, max_n);
            let unit = diff / n;
            if unit > lo * expected_along && unit < hi * expected_along {
                samples.push(unit);
            }
        }
    }
    samples
}

fn axis_step(
    points: &[Point2<f32>],
    axis: Axis,
    expected_along: f32,
    expected_across: f32,
    params: &GridFitParams,
) -> f32 {
    let samples = unit_step_samples(points, axis, expected_along, expected_across, params);
    if samples.len() < params.min_step_samples {
        log::debug!(
            "only {} step samples, using expected pitch {:.1}",
            samples.len(),
            expected_along
        );
        return expected_along;
    }
    mic_plate_core::median(&samples).unwrap_or(expected_along)
}

/// Robust per-axis well pitch from an unordered point set.
pub(crate) fn estimate_steps(
    points: &[Point2<f32>],
    expected: (f32, f32),
    params: &GridFitParams,
) -> StepEstimate {
    let (ex, ey) = expected;
    let mut step_x = axis_step(points, Axis::X, ex, ey, params);
    let mut step_y = axis_step(points, Axis::Y, ey, ex, params);

    let ratio = step_x / step_y;
    let (lo, hi) = params.step_ratio_bounds;
    let ratio_corrected = !(lo..=hi).contains(&ratio);
    if ratio_corrected {
        let avg = 0.5 * (step_x + step_y);
        log::warn!(
            "step ratio {:.3} outside [{lo}, {hi}], averaging {:.1}/{:.1} to {:.1}",
            ratio,
            step_x,
            step_y,
            avg
        );
        step_x = avg;
        step_y = avg;
    }

    StepEstimate {
        step_x,
        step_y,
        ratio_corrected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn grid(step_x: f32, step_y: f32, missing: &[(usize, usize)]) -> Vec<Point2<f32>> {
        let mut out = Vec::new();
        for r in 0..8 {
            for c in 0..12 {
                if missing.contains(&(r, c)) {
                    continue;
                }
                out.push(Point2::new(
                    40.0 + c as f32 * step_x,
                    30.0 + r as f32 * step_y,
                ));
            }
        }
        out
    }

    #[test]
    fn recovers_pitch_despite_gaps() {
        let pts = grid(92.0, 90.0, &[(0, 1), (3, 4), (3, 5), (7, 11)]);
        let est = estimate_steps(&pts, (100.0, 100.0), &GridFitParams::default());
        assert_abs_diff_eq!(est.step_x, 92.0, epsilon = 1e-3);
        assert_abs_diff_eq!(est.step_y, 90.0, epsilon = 1e-3);
        assert!(!est.ratio_corrected);
    }

    #[test]
    fn too_few_points_fall_back_to_expected() {
        let pts = [Point2::new(10.0, 10.0), Point2::new(110.0, 10.0)];
        let est = estimate_steps(&pts, (100.0, 90.0), &GridFitParams::default());
        assert_abs_diff_eq!(est.step_x, 100.0);
        assert_abs_diff_eq!(est.step_y, 90.0);
        assert!(!est.ratio_corrected);
    }

    #[test]
    fn implausible_ratio_is_averaged() {
        let pts = grid(100.0, 75.0, &[]);
        let est = estimate_steps(&pts, (100.0, 75.0), &GridFitParams::default());
        assert!(est.ratio_corrected);
        assert_abs_diff_eq!(est.step_x, 87.5, epsilon = 1e-3);
        assert_abs_diff_eq!(est.step_y, 87.5, epsilon = 1e-3);
    }
}
