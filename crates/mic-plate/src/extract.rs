//! Per-well colour sampling.

use crate::well::WellData;
use mic_plate_core::layout::{COLS, ROWS};
use mic_plate_core::{circular_mean_hue, Hsv, RgbImageView};
use mic_plate_grid::{DetectedCircle, GridStructure, Lattice};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractParams {
    /// Sampling disc radius as a fraction of the well radius.
    pub sample_radius_ratio: f32,
    /// Expected well radius as a fraction of `min(step_x, step_y)`.
    pub well_radius_ratio: f32,
    /// Pixels with V at or above this are specular highlights.
    pub specular_value: f32,
    /// Pixels with S below this are background.
    pub min_saturation: f32,
    /// Fewer filtered pixels than this triggers an unfiltered resample.
    pub min_pixels: usize,
    /// Extra inward shift applied when the lattice overflows the image.
    pub boundary_margin: f32,
}

impl Default for ExtractParams {
    fn default() -> Self {
        Self {
            sample_radius_ratio: 0.45,
            well_radius_ratio: 0.42,
            specular_value: 245.0,
            min_saturation: 15.0,
            min_pixels: 10,
            boundary_margin: 2.0,
        }
    }
}

/// Samples representative colour for each of the 96 cells.
#[derive(Clone, Debug, Default)]
pub struct WellExtractor {
    params: ExtractParams,
}

struct DiscStats {
    rgb: [f64; 3],
    hues: Vec<f32>,
    sat: f64,
    val: f64,
}

impl DiscStats {
    fn new() -> Self {
        Self {
            rgb: [0.0; 3],
            hues: Vec::new(),
            sat: 0.0,
            val: 0.0,
        }
    }

    fn push(&mut self, px: [u8; 3], hsv: Hsv) {
        for (acc, &c) in self.rgb.iter_mut().zip(px.iter()) {
            *acc += c as f64;
        }
        self.hues.push(hsv.h);
        self.sat += hsv.s as f64;
        self.val += hsv.v as f64;
    }

    fn count(&self) -> usize {
        self.hues.len()
    }
}

impl WellExtractor {
    pub fn new(params: ExtractParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ExtractParams {
        &self.params
    }

    /// Shift the lattice inward when the last row or column would sample
    /// outside the image.
    fn correct_boundary(&self, mut l: Lattice, sample_r: f32, width: f32, height: f32) -> Lattice {
        let margin = self.params.boundary_margin;
        let last = l.slot_center(ROWS - 1, COLS - 1);
        let over_x = last.x + sample_r - (width - 1.0);
        if over_x > 0.0 {
            log::debug!("lattice overflows right edge by {over_x:.1}px, shifting");
            l.origin_x -= over_x + margin;
        }
        let over_y = last.y + sample_r - (height - 1.0);
        if over_y > 0.0 {
            log::debug!("lattice overflows bottom edge by {over_y:.1}px, shifting");
            l.origin_y -= over_y + margin;
        }
        l
    }

    fn sample_disc(
        &self,
        img: &RgbImageView<'_>,
        cx: f32,
        cy: f32,
        r: f32,
        filtered: bool,
    ) -> DiscStats {
        let p = &self.params;
        let mut stats = DiscStats::new();
        let x0 = (cx - r).floor().max(0.0) as usize;
        let y0 = (cy - r).floor().max(0.0) as usize;
        let x1 = ((cx + r).ceil().max(0.0) as usize).min(img.width.saturating_sub(1));
        let y1 = ((cy + r).ceil().max(0.0) as usize).min(img.height.saturating_sub(1));
        let r2 = r * r;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                if dx * dx + dy * dy > r2 {
                    continue;
                }
                let px = img.pixel(x, y);
                let hsv = Hsv::from_rgb(px);
                if filtered && (hsv.v >= p.specular_value || hsv.s < p.min_saturation) {
                    continue;
                }
                stats.push(px, hsv);
            }
        }
        stats
    }

    /// Sample all cells of `grid`. `slots` holds detected circles in
    /// row-major order (may be empty); a present circle overrides the lattice
    /// position and radius of its cell.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, img, grid, slots), fields(width = img.width, height = img.height))
    )]
    pub fn extract_wells(
        &self,
        img: &RgbImageView<'_>,
        grid: &GridStructure,
        slots: &[Option<DetectedCircle>],
    ) -> Vec<WellData> {
        let p = &self.params;
        let well_r = p.well_radius_ratio * grid.step_x.min(grid.step_y);
        let lattice = self.correct_boundary(
            grid.lattice(),
            p.sample_radius_ratio * well_r,
            img.width as f32,
            img.height as f32,
        );

        let mut wells = Vec::with_capacity(ROWS * COLS);
        let mut resampled = 0;
        for row in 0..ROWS {
            for col in 0..COLS {
                let detected = slots.get(row * COLS + col).copied().flatten();
                let (center, radius) = match detected {
                    Some(c) => (c.center, c.radius),
                    None => (lattice.slot_center(row, col), well_r),
                };
                let sample_r = (p.sample_radius_ratio * radius).max(1.0);

                let mut stats = self.sample_disc(img, center.x, center.y, sample_r, true);
                if stats.count() < p.min_pixels {
                    resampled += 1;
                    stats = self.sample_disc(img, center.x, center.y, sample_r, false);
                }
                if stats.count() == 0 {
                    let x = (center.x.round().max(0.0) as usize).min(img.width - 1);
                    let y = (center.y.round().max(0.0) as usize).min(img.height - 1);
                    let px = img.pixel(x, y);
                    stats.push(px, Hsv::from_rgb(px));
                }

                let n = stats.count() as f64;
                wells.push(WellData {
                    row,
                    col,
                    cx: center.x,
                    cy: center.y,
                    radius,
                    r_mean: (stats.rgb[0] / n) as f32,
                    g_mean: (stats.rgb[1] / n) as f32,
                    b_mean: (stats.rgb[2] / n) as f32,
                    hue: circular_mean_hue(stats.hues.iter().copied()),
                    saturation: (stats.sat / n) as f32,
                    value: (stats.val / n) as f32,
                    detected: detected.is_some(),
                    pixel_count: stats.count(),
                });
            }
        }
        if resampled > 0 {
            log::debug!("{resampled} wells resampled without colour filtering");
        }
        wells
    }
}
