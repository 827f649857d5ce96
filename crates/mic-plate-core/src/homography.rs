use crate::{RgbImage, RgbImageView};
use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};

/// Planar projective transform, `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

/// Translate the quad to its centroid and scale it to mean distance sqrt(2).
fn conditioning(pts: &[Point2<f32>; 4]) -> Matrix3<f64> {
    let cx = pts.iter().map(|p| p.x as f64).sum::<f64>() / 4.0;
    let cy = pts.iter().map(|p| p.y as f64).sum::<f64>() / 4.0;
    let mean_dist = pts
        .iter()
        .map(|p| ((p.x as f64 - cx).powi(2) + (p.y as f64 - cy).powi(2)).sqrt())
        .sum::<f64>()
        / 4.0;
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn condition(t: &Matrix3<f64>, p: Point2<f32>) -> (f64, f64) {
    let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
    (v[0], v[1])
}

/// Exact homography from four correspondences (`dst ~ H * src`).
///
/// Corner order must match between `src` and `dst`. Returns `None` for
/// degenerate (collinear) configurations.
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    let t_src = conditioning(src);
    let t_dst = conditioning(dst);

    // Unknowns h11..h32 with h33 = 1.
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for k in 0..4 {
        let (x, y) = condition(&t_src, src[k]);
        let (u, v) = condition(&t_dst, dst[k]);
        let r = 2 * k;
        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -u * x;
        a[(r, 7)] = -u * y;
        b[r] = u;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -v * x;
        a[(r + 1, 7)] = -v * y;
        b[r + 1] = v;
    }

    let x = a.lu().solve(&b)?;
    let hn = Matrix3::new(x[0], x[1], x[2], x[3], x[4], x[5], x[6], x[7], 1.0);

    let h = t_dst.try_inverse()? * hn * t_src;
    let scale = h[(2, 2)];
    if scale.abs() < 1e-12 || !h.iter().all(|v| v.is_finite()) {
        return None;
    }
    Some(Homography::new(h / scale))
}

/// Resample `src` into an `out_w x out_h` image, mapping every output pixel
/// centre through `h_src_from_dst` and sampling bilinearly.
pub fn warp_perspective_rgb(
    src: &RgbImageView<'_>,
    h_src_from_dst: &Homography,
    out_w: usize,
    out_h: usize,
) -> RgbImage {
    let mut out = RgbImage::filled(out_w, out_h, [0, 0, 0]);
    for y in 0..out_h {
        for x in 0..out_w {
            let p = h_src_from_dst.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
            let s = src.sample_bilinear(p.x - 0.5, p.y - 0.5);
            out.put_pixel(
                x,
                y,
                [
                    s[0].round().clamp(0.0, 255.0) as u8,
                    s[1].round().clamp(0.0, 255.0) as u8,
                    s[2].round().clamp(0.0, 255.0) as u8,
                ],
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn recovers_known_projective_map() {
        let truth = Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ));
        let rect = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(180.0, 0.0),
            Point2::new(180.0, 120.0),
            Point2::new(0.0, 120.0),
        ];
        let img = rect.map(|p| truth.apply(p));
        let est = homography_from_4pt(&rect, &img).expect("solvable");
        for p in [Point2::new(30.0_f32, 40.0), Point2::new(150.0, 100.0)] {
            let a = est.apply(p);
            let b = truth.apply(p);
            assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-2);
            assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-2);
        }
    }

    #[test]
    fn collinear_points_fail() {
        let line = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
            Point2::new(3.0, 3.0),
        ];
        assert!(homography_from_4pt(&line, &line).is_none());
    }

    #[test]
    fn identity_warp_copies_pixels() {
        let mut img = RgbImage::filled(6, 4, [10, 20, 30]);
        img.put_pixel(2, 1, [200, 100, 50]);
        let out = warp_perspective_rgb(&img.view(), &Homography::identity(), 6, 4);
        assert_eq!(out, img);
    }
}
