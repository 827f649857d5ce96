//! Plate corners from the well-colour mask and a rectifying warp.

use mic_plate_core::layout::{COLS, PLATE_ASPECT, ROWS};
use mic_plate_core::{homography_from_4pt, warp_perspective_rgb, RgbImage, RgbImageView};
use nalgebra::Point2;

/// Outer corners of a point cloud, ordered TL, TR, BR, BL.
pub(crate) fn extreme_corners(points: &[Point2<f32>]) -> Option<[Point2<f32>; 4]> {
    let first = *points.first()?;
    let (mut tl, mut tr, mut br, mut bl) = (first, first, first, first);
    for &p in points {
        if p.x + p.y < tl.x + tl.y {
            tl = p;
        }
        if p.x + p.y > br.x + br.y {
            br = p;
        }
        if p.x - p.y > tr.x - tr.y {
            tr = p;
        }
        if p.x - p.y < bl.x - bl.y {
            bl = p;
        }
    }
    Some([tl, tr, br, bl])
}

/// Shoelace area of a quad.
pub(crate) fn quad_area(q: &[Point2<f32>; 4]) -> f32 {
    let mut acc = 0.0;
    for i in 0..4 {
        let a = q[i];
        let b = q[(i + 1) % 4];
        acc += a.x * b.y - b.x * a.y;
    }
    0.5 * acc.abs()
}

/// Largest distance between a corner and the matching corner of the quad's
/// bounding box, relative to the bounding box diagonal. Zero for an
/// axis-aligned rectangle.
pub(crate) fn skew(q: &[Point2<f32>; 4]) -> f32 {
    let x0 = q.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
    let x1 = q.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);
    let y0 = q.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
    let y1 = q.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);
    let diag = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
    if diag <= f32::EPSILON {
        return 0.0;
    }
    let bbox = [
        Point2::new(x0, y0),
        Point2::new(x1, y0),
        Point2::new(x1, y1),
        Point2::new(x0, y1),
    ];
    q.iter()
        .zip(bbox.iter())
        .map(|(a, b)| (a - b).norm())
        .fold(0.0, f32::max)
        / diag
}

/// Warp the quad `corners` (TL, TR, BR, BL) onto a 1.5:1 rectangle at most
/// `max_width` wide, padded by `padding` of one cell on every side.
pub(crate) fn rectify(
    img: &RgbImageView<'_>,
    corners: &[Point2<f32>; 4],
    max_width: f32,
    padding: f32,
) -> Option<RgbImage> {
    let [tl, tr, br, bl] = *corners;
    let top = (tr - tl).norm();
    let bottom = (br - bl).norm();
    let w = (0.5 * (top + bottom)).min(max_width);
    let h = w / PLATE_ASPECT;
    if w < COLS as f32 * 2.0 {
        return None;
    }
    let pad_x = padding * w / COLS as f32;
    let pad_y = padding * h / ROWS as f32;

    let dst = [
        Point2::new(pad_x, pad_y),
        Point2::new(pad_x + w, pad_y),
        Point2::new(pad_x + w, pad_y + h),
        Point2::new(pad_x, pad_y + h),
    ];
    let h_src_from_dst = homography_from_4pt(&dst, corners)?;
    let out_w = (w + 2.0 * pad_x).round() as usize;
    let out_h = (h + 2.0 * pad_y).round() as usize;
    Some(warp_perspective_rgb(img, &h_src_from_dst, out_w, out_h))
}
