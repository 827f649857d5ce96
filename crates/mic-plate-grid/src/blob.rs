use crate::circle::DetectedCircle;
use crate::params::GridFitParams;
use mic_plate_core::{is_well_colored, RgbImageView};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Default)]
struct Accum {
    sum_x: f64,
    sum_y: f64,
    n: usize,
}

impl Accum {
    fn center(&self) -> (f32, f32) {
        (
            (self.sum_x / self.n as f64) as f32,
            (self.sum_y / self.n as f64) as f32,
        )
    }

    fn absorb(&mut self, other: &Accum) {
        self.sum_x += other.sum_x;
        self.sum_y += other.sum_y;
        self.n += other.n;
    }
}

/// Detector-free well finder.
///
/// Well-coloured pixels (pink or purple) are binned on a coarse grid whose
/// cells are `blob_bin_ratio` of the expected pitch; bins with at least
/// `blob_min_pixels` samples contribute their centroid, and centroids closer
/// than `blob_merge_ratio` of the pitch are merged, weighted by pixel count.
///
/// Returned circles carry the expected well radius.
pub fn find_blob_centers(img: &RgbImageView<'_>, params: &GridFitParams) -> Vec<DetectedCircle> {
    let (w, h) = (img.width as f32, img.height as f32);
    let (px, py) = params.expected_pitch(w, h);
    let pitch = px.min(py);
    if pitch <= 1.0 {
        return Vec::new();
    }
    let bin = (params.blob_bin_ratio * pitch).max(1.0);
    let stride = params.blob_stride.max(1);
    let x0 = (params.blob_margin * w) as usize;
    let y0 = (params.blob_margin * h) as usize;
    let x1 = img.width.saturating_sub(x0);
    let y1 = img.height.saturating_sub(y0);

    let mut bins: BTreeMap<(usize, usize), Accum> = BTreeMap::new();
    for y in (y0..y1).step_by(stride) {
        for x in (x0..x1).step_by(stride) {
            if !is_well_colored(img.pixel(x, y), &params.blob_thresholds) {
                continue;
            }
            let key = ((y as f32 / bin) as usize, (x as f32 / bin) as usize);
            let a = bins.entry(key).or_default();
            a.sum_x += x as f64;
            a.sum_y += y as f64;
            a.n += 1;
        }
    }

    let mut seeds: Vec<Accum> = bins
        .into_values()
        .filter(|a| a.n >= params.blob_min_pixels)
        .collect();
    // Heaviest bins seed the merged blobs; the sort is stable so equal
    // weights keep raster order.
    seeds.sort_by(|a, b| b.n.cmp(&a.n));

    let merge_dist = params.blob_merge_ratio * pitch;
    let mut blobs: Vec<Accum> = Vec::new();
    for s in &seeds {
        let (sx, sy) = s.center();
        let hit = blobs.iter_mut().find(|b| {
            let (bx, by) = b.center();
            ((sx - bx).powi(2) + (sy - by).powi(2)).sqrt() < merge_dist
        });
        match hit {
            Some(b) => b.absorb(s),
            None => blobs.push(*s),
        }
    }

    let radius = params.radius_ratio * pitch;
    log::debug!(
        "blob finder: {} seed bins -> {} blobs (pitch {:.1}px)",
        seeds.len(),
        blobs.len(),
        pitch
    );
    blobs
        .iter()
        .map(|b| {
            let (x, y) = b.center();
            DetectedCircle::new(x, y, radius)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mic_plate_core::RgbImage;

    fn paint_disc(img: &mut RgbImage, cx: f32, cy: f32, r: f32, rgb: [u8; 3]) {
        for y in 0..img.height {
            for x in 0..img.width {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r * r {
                    img.put_pixel(x, y, rgb);
                }
            }
        }
    }

    #[test]
    fn finds_one_blob_per_disc() {
        let mut img = RgbImage::filled(600, 400, [210, 210, 210]);
        let wells = [(75.0, 75.0), (225.0, 75.0), (375.0, 225.0), (525.0, 325.0)];
        for (i, &(x, y)) in wells.iter().enumerate() {
            let rgb = if i % 2 == 0 {
                [230, 190, 205]
            } else {
                [120, 80, 170]
            };
            paint_disc(&mut img, x, y, 20.0, rgb);
        }
        let params = GridFitParams {
            rows: 4,
            cols: 4,
            ..GridFitParams::default()
        };
        let blobs = find_blob_centers(&img.view(), &params);
        assert_eq!(blobs.len(), wells.len());
        for &(x, y) in &wells {
            assert!(
                blobs
                    .iter()
                    .any(|b| (b.center.x - x).abs() < 3.0 && (b.center.y - y).abs() < 3.0),
                "no blob near ({x}, {y})"
            );
        }
    }

    #[test]
    fn plain_plate_has_no_blobs() {
        let img = RgbImage::filled(300, 200, [200, 200, 200]);
        assert!(find_blob_centers(&img.view(), &GridFitParams::default()).is_empty());
    }
}
