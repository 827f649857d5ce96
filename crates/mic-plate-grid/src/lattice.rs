use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Regular lattice `p(row, col) = origin + (col * step_x, row * step_y)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    pub origin_x: f32,
    pub origin_y: f32,
    pub step_x: f32,
    pub step_y: f32,
}

/// A point matched to a lattice slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SlotMatch {
    pub row: usize,
    pub col: usize,
    /// Index into the point slice.
    pub point: usize,
    pub error: f32,
}

impl Lattice {
    #[inline]
    pub fn slot_center(&self, row: usize, col: usize) -> Point2<f32> {
        Point2::new(
            self.origin_x + col as f32 * self.step_x,
            self.origin_y + row as f32 * self.step_y,
        )
    }

    /// Nearest slot inside `rows x cols` and the distance to its centre.
    #[inline]
    pub fn nearest_slot(&self, p: Point2<f32>, rows: usize, cols: usize) -> (usize, usize, f32) {
        let col = ((p.x - self.origin_x) / self.step_x)
            .round()
            .clamp(0.0, cols.saturating_sub(1) as f32) as usize;
        let row = ((p.y - self.origin_y) / self.step_y)
            .round()
            .clamp(0.0, rows.saturating_sub(1) as f32) as usize;
        let c = self.slot_center(row, col);
        (row, col, (p - c).norm())
    }

    pub fn max_step(&self) -> f32 {
        self.step_x.max(self.step_y)
    }
}

/// Match points to slots, keeping only the closest point per slot.
///
/// Points farther than `tol` from their nearest slot centre are ignored.
/// The result is ordered by slot (row-major).
pub(crate) fn best_per_slot(
    points: &[Point2<f32>],
    lattice: &Lattice,
    rows: usize,
    cols: usize,
    tol: f32,
) -> Vec<SlotMatch> {
    let mut best: Vec<Option<SlotMatch>> = vec![None; rows * cols];
    for (i, &p) in points.iter().enumerate() {
        let (row, col, error) = lattice.nearest_slot(p, rows, cols);
        if error > tol {
            continue;
        }
        let slot = &mut best[row * cols + col];
        if slot.is_none_or(|m| error < m.error) {
            *slot = Some(SlotMatch {
                row,
                col,
                point: i,
                error,
            });
        }
    }
    best.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_slot_clamps_to_grid() {
        let l = Lattice {
            origin_x: 50.0,
            origin_y: 50.0,
            step_x: 100.0,
            step_y: 100.0,
        };
        assert_eq!(l.nearest_slot(Point2::new(260.0, 140.0), 8, 12).0, 1);
        assert_eq!(l.nearest_slot(Point2::new(260.0, 140.0), 8, 12).1, 2);
        let (r, c, e) = l.nearest_slot(Point2::new(-80.0, 50.0), 8, 12);
        assert_eq!((r, c), (0, 0));
        assert!((e - 130.0).abs() < 1e-4);
    }

    #[test]
    fn keeps_closest_point_per_slot() {
        let l = Lattice {
            origin_x: 0.0,
            origin_y: 0.0,
            step_x: 10.0,
            step_y: 10.0,
        };
        let pts = [
            Point2::new(1.0, 1.0),
            Point2::new(0.2, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(5.0, 5.0),
        ];
        let m = best_per_slot(&pts, &l, 2, 2, 3.5);
        assert_eq!(m.len(), 2);
        assert_eq!((m[0].point, m[0].col), (1, 0));
        assert_eq!((m[1].point, m[1].col), (2, 1));
    }
}
