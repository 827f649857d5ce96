use crate::blob::find_blob_centers;
use crate::circle::{postprocess_circles, CircleDetector, DetectedCircle, HoughParams};
use crate::cluster::cluster_1d;
use crate::lattice::{best_per_slot, Lattice};
use crate::origin::search_origin;
use crate::params::GridFitParams;
use crate::quality::GridQuality;
use crate::refine::refine_lattice;
use crate::step::estimate_steps;
use mic_plate_core::RgbImageView;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Fitted well lattice.
///
/// `rows`/`cols` and the centre lists come from clustering the matched
/// points and may differ from the nominal 8x12 on degraded input; cell
/// positions always come from the regular lattice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridStructure {
    pub rows: usize,
    pub cols: usize,
    /// Strictly increasing.
    pub row_centers: Vec<f32>,
    /// Strictly increasing.
    pub col_centers: Vec<f32>,
    pub step_x: f32,
    pub step_y: f32,
    pub origin_x: f32,
    pub origin_y: f32,
}

impl GridStructure {
    /// Equal-division grid: `step = size / count`, first centre at `step / 2`.
    pub fn naive(width: f32, height: f32, rows: usize, cols: usize) -> Self {
        let step_x = width / cols.max(1) as f32;
        let step_y = height / rows.max(1) as f32;
        let lattice = Lattice {
            origin_x: 0.5 * step_x,
            origin_y: 0.5 * step_y,
            step_x,
            step_y,
        };
        Self::from_lattice(&lattice, rows, cols)
    }

    fn from_lattice(l: &Lattice, rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            row_centers: (0..rows).map(|r| l.slot_center(r, 0).y).collect(),
            col_centers: (0..cols).map(|c| l.slot_center(0, c).x).collect(),
            step_x: l.step_x,
            step_y: l.step_y,
            origin_x: l.origin_x,
            origin_y: l.origin_y,
        }
    }

    pub fn lattice(&self) -> Lattice {
        Lattice {
            origin_x: self.origin_x,
            origin_y: self.origin_y,
            step_x: self.step_x,
            step_y: self.step_y,
        }
    }

    #[inline]
    pub fn cell_center(&self, row: usize, col: usize) -> Point2<f32> {
        self.lattice().slot_center(row, col)
    }
}

/// Grid plus the evidence it was fitted from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridFit {
    pub grid: GridStructure,
    /// Candidates the fit was computed from.
    pub circles: Vec<DetectedCircle>,
    /// Row-major `rows x cols` nominal slots; the closest circle within
    /// `slot_assign_tol` of each slot, if any.
    pub slots: Vec<Option<DetectedCircle>>,
    pub rows: usize,
    pub cols: usize,
    pub quality: GridQuality,
}

impl GridFit {
    pub fn slot(&self, row: usize, col: usize) -> Option<&DetectedCircle> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.slots.get(row * self.cols + col).and_then(Option::as_ref)
    }
}

/// Recovers the well lattice from a cropped plate image.
#[derive(Clone, Debug, Default)]
pub struct GridFitter {
    params: GridFitParams,
}

impl GridFitter {
    pub fn new(params: GridFitParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &GridFitParams {
        &self.params
    }

    /// Gather well candidates: detector passes first, colour blobs if the
    /// detector is unavailable or finds fewer than `min_circles`.
    pub fn collect_candidates(
        &self,
        img: &RgbImageView<'_>,
        detector: &dyn CircleDetector,
    ) -> Vec<DetectedCircle> {
        let p = &self.params;
        let (px, py) = p.expected_pitch(img.width as f32, img.height as f32);
        let pitch = px.min(py);
        let expected_r = p.radius_ratio * pitch;

        let mut hough = p.hough.clone();
        if hough.min_dist <= 0.0 {
            hough.min_dist = p.min_dist_ratio * pitch;
        }

        let mut circles = Vec::new();
        if detector.is_available() {
            for (pass, (lo, hi)) in [p.strict_radius_range, p.loose_radius_range]
                .into_iter()
                .enumerate()
            {
                let found =
                    self.detector_pass(img, detector, lo * expected_r, hi * expected_r, &hough);
                log::debug!("circle pass {pass}: {} circles", found.len());
                if found.len() > circles.len() {
                    circles = found;
                }
                if circles.len() >= p.min_circles {
                    return circles;
                }
            }
        } else {
            log::debug!("circle detector unavailable");
        }

        let blobs = find_blob_centers(img, p);
        log::debug!(
            "falling back to colour blobs: {} blobs vs {} circles",
            blobs.len(),
            circles.len()
        );
        if blobs.len() > circles.len() {
            blobs
        } else {
            circles
        }
    }

    fn detector_pass(
        &self,
        img: &RgbImageView<'_>,
        detector: &dyn CircleDetector,
        min_r: f32,
        max_r: f32,
        hough: &HoughParams,
    ) -> Vec<DetectedCircle> {
        match detector.detect(img, min_r, max_r, hough) {
            Some(raw) => postprocess_circles(&raw, hough.min_dist, img.width, img.height),
            None => Vec::new(),
        }
    }

    /// Full fit on an image: candidates, lattice, slot assignment, quality.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, img, detector), fields(width = img.width, height = img.height))
    )]
    pub fn fit_plate(
        &self,
        img: &RgbImageView<'_>,
        detector: &dyn CircleDetector,
    ) -> Option<GridFit> {
        let circles = self.collect_candidates(img, detector);
        self.fit_circles(&circles, img.width as f32, img.height as f32)
    }

    /// Fit from circle candidates already in hand.
    pub fn fit_circles(
        &self,
        circles: &[DetectedCircle],
        width: f32,
        height: f32,
    ) -> Option<GridFit> {
        let p = &self.params;
        let centers: Vec<Point2<f32>> = circles.iter().map(|c| c.center).collect();
        let grid = self.fit_points(&centers, width, height)?;
        let lattice = grid.lattice();

        let mut slots = vec![None; p.rows * p.cols];
        let slot_tol = p.slot_assign_tol * lattice.max_step();
        for m in best_per_slot(&centers, &lattice, p.rows, p.cols, slot_tol) {
            slots[m.row * p.cols + m.col] = Some(circles[m.point]);
        }

        let tol = p.assign_tol * lattice.max_step();
        let quality = GridQuality::evaluate(&centers, &grid, p.rows, p.cols, tol);
        log::info!(
            "grid {}x{} step ({:.1}, {:.1}) origin ({:.1}, {:.1}) quality {:.2}",
            grid.rows,
            grid.cols,
            grid.step_x,
            grid.step_y,
            grid.origin_x,
            grid.origin_y,
            quality.overall_score
        );

        Some(GridFit {
            grid,
            circles: circles.to_vec(),
            slots,
            rows: p.rows,
            cols: p.cols,
            quality,
        })
    }

    /// Fit a lattice to an unordered point set in a `width x height` image.
    ///
    /// Returns `None` with fewer than `min_points` points. The result is a
    /// pure function of the input (no randomness).
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, points), fields(points = points.len()))
    )]
    pub fn fit_points(
        &self,
        points: &[Point2<f32>],
        width: f32,
        height: f32,
    ) -> Option<GridStructure> {
        let p = &self.params;
        if points.len() < p.min_points {
            log::debug!(
                "grid fit needs {} points, got {}",
                p.min_points,
                points.len()
            );
            return None;
        }

        let expected = p.expected_pitch(width, height);
        let steps = estimate_steps(points, expected, p);
        let (coarse, hits) = search_origin(points, steps.step_x, steps.step_y, p);
        if hits == 0 {
            log::debug!("origin search matched no points");
            return None;
        }
        let lattice = refine_lattice(points, coarse, p);

        let tol = p.assign_tol * lattice.max_step();
        let inliers: Vec<Point2<f32>> = best_per_slot(points, &lattice, p.rows, p.cols, tol)
            .into_iter()
            .map(|m| points[m.point])
            .collect();

        let xs: Vec<f32> = inliers.iter().map(|q| q.x).collect();
        let ys: Vec<f32> = inliers.iter().map(|q| q.y).collect();
        let mut col_centers = cluster_1d(
            &xs,
            p.cluster_threshold * lattice.step_x,
            p.cols,
            p.merge_gap_ratio,
        );
        let mut row_centers = cluster_1d(
            &ys,
            p.cluster_threshold * lattice.step_y,
            p.rows,
            p.merge_gap_ratio,
        );
        let nominal = GridStructure::from_lattice(&lattice, p.rows, p.cols);
        if col_centers.is_empty() {
            col_centers = nominal.col_centers;
        }
        if row_centers.is_empty() {
            row_centers = nominal.row_centers;
        }
        if row_centers.len() != p.rows || col_centers.len() != p.cols {
            log::debug!(
                "clustered {}x{} lines, expected {}x{}",
                row_centers.len(),
                col_centers.len(),
                p.rows,
                p.cols
            );
        }

        Some(GridStructure {
            rows: row_centers.len(),
            cols: col_centers.len(),
            row_centers,
            col_centers,
            step_x: lattice.step_x,
            step_y: lattice.step_y,
            origin_x: lattice.origin_x,
            origin_y: lattice.origin_y,
        })
    }
}
