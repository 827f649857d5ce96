//! Plate bounds from gradient projections.

use mic_plate_core::{PixelRect, RgbImageView};

/// Block-averaged grayscale copy whose larger side is at most `max_dim`.
/// Returns the buffer, its size and the integer downscale factor.
fn downscale_gray(img: &RgbImageView<'_>, max_dim: usize) -> (Vec<f32>, usize, usize, usize) {
    let k = img.width.max(img.height).div_ceil(max_dim.max(1)).max(1);
    let w = img.width / k;
    let h = img.height / k;
    let mut out = vec![0.0f32; w * h];
    let norm = 1.0 / (k * k) as f32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for yy in y * k..(y + 1) * k {
                for xx in x * k..(x + 1) * k {
                    let [r, g, b] = img.pixel(xx, yy);
                    acc += 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
                }
            }
            out[y * w + x] = acc * norm;
        }
    }
    (out, w, h, k)
}

/// Separable box blur with clamped borders.
fn box_blur(src: &[f32], w: usize, h: usize, radius: usize) -> Vec<f32> {
    let n = (2 * radius + 1) as f32;
    let mut tmp = vec![0.0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for d in 0..=2 * radius {
                let xx = (x + d).saturating_sub(radius).min(w - 1);
                acc += src[y * w + xx];
            }
            tmp[y * w + x] = acc / n;
        }
    }
    let mut out = vec![0.0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for d in 0..=2 * radius {
                let yy = (y + d).saturating_sub(radius).min(h - 1);
                acc += tmp[yy * w + x];
            }
            out[y * w + x] = acc / n;
        }
    }
    out
}

/// Per-column and per-row sums of the Sobel magnitude `|gx| + |gy|`.
fn sobel_projections(g: &[f32], w: usize, h: usize) -> (Vec<f32>, Vec<f32>) {
    let mut cols = vec![0.0f32; w];
    let mut rows = vec![0.0f32; h];
    let at = |x: usize, y: usize| g[y * w + x];
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let gx = (at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1));
            let gy = (at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1));
            let m = gx.abs() + gy.abs();
            cols[x] += m;
            rows[y] += m;
        }
    }
    (cols, rows)
}

/// First and last index whose value reaches `ratio * max`.
fn crossings(profile: &[f32], ratio: f32) -> Option<(usize, usize)> {
    let max = profile.iter().copied().fold(0.0f32, f32::max);
    if max <= 0.0 {
        return None;
    }
    let t = ratio * max;
    let first = profile.iter().position(|&v| v >= t)?;
    let last = profile.iter().rposition(|&v| v >= t)?;
    (last > first).then_some((first, last))
}

/// Rectangle spanned by the strongest vertical and horizontal edges.
pub(crate) fn edge_bounds(img: &RgbImageView<'_>, max_dim: usize, threshold: f32) -> Option<PixelRect> {
    let (gray, w, h, k) = downscale_gray(img, max_dim);
    if w < 8 || h < 8 {
        return None;
    }
    let blurred = box_blur(&gray, w, h, 2);
    let (cols, rows) = sobel_projections(&blurred, w, h);
    let (x0, x1) = crossings(&cols, threshold)?;
    let (y0, y1) = crossings(&rows, threshold)?;
    let rect = PixelRect::from_bounds_clamped(
        (x0 * k) as i64,
        (y0 * k) as i64,
        ((x1 + 1) * k) as i64,
        ((y1 + 1) * k) as i64,
        img.width,
        img.height,
    );
    (!rect.is_empty()).then_some(rect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mic_plate_core::RgbImage;

    #[test]
    fn finds_bright_plate_on_dark_background() {
        let mut img = RgbImage::filled(800, 600, [40, 40, 40]);
        for y in 100..500 {
            for x in 100..700 {
                img.put_pixel(x, y, [220, 220, 220]);
            }
        }
        let rect = edge_bounds(&img.view(), 400, 0.35).expect("edges");
        // Downscaled by 2 and blurred; edges land within a few pixels.
        assert!((rect.x as i64 - 100).abs() <= 8, "{rect:?}");
        assert!((rect.y as i64 - 100).abs() <= 8, "{rect:?}");
        assert!(((rect.x + rect.width) as i64 - 700).abs() <= 8, "{rect:?}");
        assert!(((rect.y + rect.height) as i64 - 500).abs() <= 8, "{rect:?}");
    }

    #[test]
    fn flat_image_has_no_edges() {
        let img = RgbImage::filled(200, 100, [128, 128, 128]);
        assert!(edge_bounds(&img.view(), 400, 0.35).is_none());
    }

    #[test]
    fn crossings_pick_outermost() {
        let p = [0.0, 1.0, 10.0, 2.0, 9.0, 0.5];
        assert_eq!(crossings(&p, 0.35), Some((2, 4)));
    }
}
