use mic_plate_core::RgbImageView;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A circular well candidate in plate-image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedCircle {
    pub center: Point2<f32>,
    pub radius: f32,
}

impl DetectedCircle {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self {
            center: Point2::new(x, y),
            radius,
        }
    }
}

/// Parameters handed to a Hough-style circle detector.
///
/// The detector runs one pass per `(blur_size, accumulator_threshold)` pair
/// and is expected to pool the results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughParams {
    /// Inverse accumulator resolution.
    pub dp: f32,
    /// Minimum distance between circle centres in pixels. Values `<= 0` are
    /// replaced by `min_dist_ratio * cell` by the grid fitter.
    pub min_dist: f32,
    /// Upper Canny threshold.
    pub canny_high: f32,
    pub accumulator_thresholds: Vec<f32>,
    /// Median blur kernel sizes (odd).
    pub blur_sizes: Vec<u32>,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            dp: 1.0,
            min_dist: 0.0,
            canny_high: 50.0,
            accumulator_thresholds: vec![22.0, 28.0, 35.0],
            blur_sizes: vec![7, 9, 11],
        }
    }
}

/// External circle finder (typically a native Hough transform).
///
/// `detect` returns `None` when the backend is unavailable, which routes the
/// grid fitter to its colour-blob fallback.
pub trait CircleDetector {
    fn is_available(&self) -> bool {
        true
    }

    fn detect(
        &self,
        img: &RgbImageView<'_>,
        min_radius: f32,
        max_radius: f32,
        params: &HoughParams,
    ) -> Option<Vec<DetectedCircle>>;
}

/// Detector used when no native backend is linked.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCircleDetector;

impl CircleDetector for NoCircleDetector {
    fn is_available(&self) -> bool {
        false
    }

    fn detect(
        &self,
        _img: &RgbImageView<'_>,
        _min_radius: f32,
        _max_radius: f32,
        _params: &HoughParams,
    ) -> Option<Vec<DetectedCircle>> {
        None
    }
}

impl<F> CircleDetector for F
where
    F: Fn(&RgbImageView<'_>, f32, f32, &HoughParams) -> Option<Vec<DetectedCircle>>,
{
    fn detect(
        &self,
        img: &RgbImageView<'_>,
        min_radius: f32,
        max_radius: f32,
        params: &HoughParams,
    ) -> Option<Vec<DetectedCircle>> {
        self(img, min_radius, max_radius, params)
    }
}

/// Clean up raw detector output.
///
/// 1. Centres closer than `0.5 * min_dist` are merged (x, y and r averaged).
/// 2. Radii outside `[0.6, 1.4] * median` are dropped.
/// 3. Centres within `0.5 * median radius` of the image border are dropped.
pub fn postprocess_circles(
    raw: &[DetectedCircle],
    min_dist: f32,
    width: usize,
    height: usize,
) -> Vec<DetectedCircle> {
    let merge_dist = 0.5 * min_dist;

    // (sum_x, sum_y, sum_r, n)
    let mut groups: Vec<(f32, f32, f32, f32)> = Vec::new();
    for c in raw {
        let hit = groups.iter_mut().find(|g| {
            let gx = g.0 / g.3;
            let gy = g.1 / g.3;
            ((c.center.x - gx).powi(2) + (c.center.y - gy).powi(2)).sqrt() < merge_dist
        });
        match hit {
            Some(g) => {
                g.0 += c.center.x;
                g.1 += c.center.y;
                g.2 += c.radius;
                g.3 += 1.0;
            }
            None => groups.push((c.center.x, c.center.y, c.radius, 1.0)),
        }
    }
    let merged: Vec<DetectedCircle> = groups
        .into_iter()
        .map(|(sx, sy, sr, n)| DetectedCircle::new(sx / n, sy / n, sr / n))
        .collect();

    let radii: Vec<f32> = merged.iter().map(|c| c.radius).collect();
    let Some(median_r) = mic_plate_core::median(&radii) else {
        return merged;
    };

    let margin = 0.5 * median_r;
    let (w, h) = (width as f32, height as f32);
    merged
        .into_iter()
        .filter(|c| c.radius >= 0.6 * median_r && c.radius <= 1.4 * median_r)
        .filter(|c| {
            c.center.x >= margin
                && c.center.y >= margin
                && c.center.x <= w - margin
                && c.center.y <= h - margin
        })
        .collect()
}
