use crate::lattice::Lattice;
use crate::params::GridFitParams;
use nalgebra::Point2;
use std::collections::HashSet;

/// Candidate origins on one axis, in discovery order.
///
/// Every point is projected back by every integer offset; projections
/// outside `window * step` are skipped and near-duplicates (same value at
/// 0.1 px resolution) keep their first occurrence. `step / 2` is always
/// offered last.
fn axis_candidates(
    coords: impl Iterator<Item = f32>,
    count: usize,
    step: f32,
    window: (f32, f32),
) -> Vec<f32> {
    let lo = window.0 * step;
    let hi = window.1 * step;
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut push = |v: f32| {
        if seen.insert((v * 10.0).round() as i64) {
            out.push(v);
        }
    };
    for c in coords {
        for k in 0..count {
            let o = c - k as f32 * step;
            if o >= lo && o <= hi {
                push(o);
            }
        }
    }
    push(0.5 * step);
    out
}

/// Number of distinct slots hit by a point within `tol` of the slot centre.
fn score(
    points: &[Point2<f32>],
    lattice: &Lattice,
    rows: usize,
    cols: usize,
    tol: f32,
    hit: &mut [bool],
) -> usize {
    hit.fill(false);
    let mut n = 0;
    for &p in points {
        let (r, c, err) = lattice.nearest_slot(p, rows, cols);
        if err < tol && !hit[r * cols + c] {
            hit[r * cols + c] = true;
            n += 1;
        }
    }
    n
}

/// Exhaustive origin search for fixed steps.
///
/// Returns the best lattice and its score. Ties keep the first candidate
/// found, so the result depends only on the point order.
pub(crate) fn search_origin(
    points: &[Point2<f32>],
    step_x: f32,
    step_y: f32,
    params: &GridFitParams,
) -> (Lattice, usize) {
    let (rows, cols) = (params.rows, params.cols);
    let xs = axis_candidates(points.iter().map(|p| p.x), cols, step_x, params.origin_window);
    let ys = axis_candidates(points.iter().map(|p| p.y), rows, step_y, params.origin_window);
    let tol = params.assign_tol * step_x.max(step_y);

    let mut best = Lattice {
        origin_x: 0.5 * step_x,
        origin_y: 0.5 * step_y,
        step_x,
        step_y,
    };
    let mut best_score = 0;
    let mut hit = vec![false; rows * cols];
    for &oy in &ys {
        for &ox in &xs {
            let cand = Lattice {
                origin_x: ox,
                origin_y: oy,
                step_x,
                step_y,
            };
            let s = score(points, &cand, rows, cols, tol, &mut hit);
            if s > best_score {
                best_score = s;
                best = cand;
            }
        }
    }
    log::debug!(
        "origin search: {}x{} candidates, best ({:.1}, {:.1}) hits {}",
        xs.len(),
        ys.len(),
        best.origin_x,
        best.origin_y,
        best_score
    );
    (best, best_score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn finds_origin_with_interior_gaps() {
        let mut pts = Vec::new();
        for r in 0..8 {
            for c in 0..12 {
                if (r + c) % 5 == 3 && c > 0 && c < 11 {
                    continue;
                }
                pts.push(Point2::new(35.0 + c as f32 * 80.0, 42.0 + r as f32 * 80.0));
            }
        }
        let expected = pts.len();
        let (lattice, score) = search_origin(&pts, 80.0, 80.0, &GridFitParams::default());
        assert_eq!(score, expected);
        assert_abs_diff_eq!(lattice.origin_x, 35.0, epsilon = 1e-3);
        assert_abs_diff_eq!(lattice.origin_y, 42.0, epsilon = 1e-3);
    }

    #[test]
    fn candidates_are_deduplicated_in_order() {
        let c = axis_candidates([50.0, 150.02, 250.0].into_iter(), 3, 100.0, (-0.3, 1.5));
        assert_eq!(c[0], 50.0);
        assert_eq!(c[1], 150.0);
        assert_eq!(c.len(), 2);
    }
}
