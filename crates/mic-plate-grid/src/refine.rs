use crate::lattice::{best_per_slot, Lattice};
use crate::params::GridFitParams;
use nalgebra::Point2;

/// Ordinary least squares fit of `value = origin + index * step`.
///
/// `None` when fewer than two distinct indices are present.
fn fit_line(samples: impl Iterator<Item = (f32, f32)>) -> Option<(f32, f32)> {
    let mut n = 0.0f64;
    let (mut sx, mut sy, mut sxx, mut sxy) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    for (i, v) in samples {
        let (i, v) = (i as f64, v as f64);
        n += 1.0;
        sx += i;
        sy += v;
        sxx += i * i;
        sxy += i * v;
    }
    let denom = n * sxx - sx * sx;
    if n < 2.0 || denom.abs() < 1e-9 {
        return None;
    }
    let step = (n * sxy - sx * sy) / denom;
    let origin = (sy - step * sx) / n;
    Some((origin as f32, step as f32))
}

/// Alternate slot assignment and per-axis least squares.
///
/// Each axis keeps its previous estimate when its fit is degenerate or the
/// new step leaves `[0.5, 2] *` the previous one.
pub(crate) fn refine_lattice(
    points: &[Point2<f32>],
    initial: Lattice,
    params: &GridFitParams,
) -> Lattice {
    let (rows, cols) = (params.rows, params.cols);
    let mut lattice = initial;
    for iter in 0..params.refine_iterations {
        let tol = params.assign_tol * lattice.max_step();
        let matches = best_per_slot(points, &lattice, rows, cols, tol);
        if matches.len() < params.min_refine_points {
            log::debug!(
                "refinement stopped at iteration {iter}: {} assigned points",
                matches.len()
            );
            break;
        }

        let fx = fit_line(matches.iter().map(|m| (m.col as f32, points[m.point].x)));
        let fy = fit_line(matches.iter().map(|m| (m.row as f32, points[m.point].y)));

        let plausible =
            |new: f32, old: f32| new.is_finite() && new >= 0.5 * old && new <= 2.0 * old;
        if let Some((ox, sx)) = fx.filter(|&(_, s)| plausible(s, lattice.step_x)) {
            lattice.origin_x = ox;
            lattice.step_x = sx;
        }
        if let Some((oy, sy)) = fy.filter(|&(_, s)| plausible(s, lattice.step_y)) {
            lattice.origin_y = oy;
            lattice.step_y = sy;
        }
    }
    lattice
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn line_fit_is_exact_on_clean_samples() {
        let (o, s) = fit_line([(0.0, 10.0), (1.0, 30.0), (3.0, 70.0)].into_iter()).expect("fit");
        assert_abs_diff_eq!(o, 10.0, epsilon = 1e-4);
        assert_abs_diff_eq!(s, 20.0, epsilon = 1e-4);
        assert!(fit_line([(2.0, 5.0), (2.0, 6.0)].into_iter()).is_none());
    }

    #[test]
    fn pulls_coarse_lattice_onto_points() {
        let mut pts = Vec::new();
        for r in 0..8 {
            for c in 0..12 {
                pts.push(Point2::new(51.0 + c as f32 * 98.0, 47.0 + r as f32 * 101.0));
            }
        }
        let coarse = Lattice {
            origin_x: 55.0,
            origin_y: 50.0,
            step_x: 100.0,
            step_y: 100.0,
        };
        let l = refine_lattice(&pts, coarse, &GridFitParams::default());
        assert_abs_diff_eq!(l.origin_x, 51.0, epsilon = 1e-2);
        assert_abs_diff_eq!(l.step_x, 98.0, epsilon = 1e-3);
        assert_abs_diff_eq!(l.origin_y, 47.0, epsilon = 1e-2);
        assert_abs_diff_eq!(l.step_y, 101.0, epsilon = 1e-3);
    }
}
