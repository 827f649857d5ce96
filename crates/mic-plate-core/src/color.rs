//! HSV colour on the OpenCV 8-bit scale (H in [0, 180), S and V in [0, 255]).
//!
//! All thresholds in this workspace are expressed on that scale, so the
//! conversion here must stay bit-compatible with the calibration data.

use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Full hue circle on the OpenCV scale.
const HUE_PERIOD: f32 = 180.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hsv {
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

impl Hsv {
    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        Self::from_rgb_f32([rgb[0] as f32, rgb[1] as f32, rgb[2] as f32])
    }

    /// Convert from floating point RGB in `[0, 255]`.
    pub fn from_rgb_f32(rgb: [f32; 3]) -> Self {
        let r = rgb[0] / 255.0;
        let g = rgb[1] / 255.0;
        let b = rgb[2] / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let v = max * 255.0;
        let s = if max <= 0.0 { 0.0 } else { delta / max * 255.0 };

        let mut h_deg = if delta <= 0.0 {
            0.0
        } else if max == r {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        if h_deg < 0.0 {
            h_deg += 360.0;
        }

        Self {
            h: (h_deg / 2.0) % HUE_PERIOD,
            s,
            v,
        }
    }
}

/// Shortest angular distance between two hues on the 0..180 scale.
pub fn circular_hue_distance(h1: f32, h2: f32) -> f32 {
    let d = (h1 - h2).abs() % HUE_PERIOD;
    d.min(HUE_PERIOD - d)
}

/// Circular mean of hues on the 0..180 scale. Returns 0 for an empty input.
pub fn circular_mean_hue<I>(hues: I) -> f32
where
    I: IntoIterator<Item = f32>,
{
    let mut sum_sin = 0.0f64;
    let mut sum_cos = 0.0f64;
    let mut n = 0usize;
    for h in hues {
        let a = (h as f64) * (TAU as f64) / HUE_PERIOD as f64;
        sum_sin += a.sin();
        sum_cos += a.cos();
        n += 1;
    }
    if n == 0 {
        return 0.0;
    }
    let mean = sum_sin.atan2(sum_cos) * HUE_PERIOD as f64 / TAU as f64;
    (mean.rem_euclid(HUE_PERIOD as f64)) as f32
}

/// Per-pixel thresholds deciding whether a pixel looks like a pink (growth)
/// or purple (inhibition) well.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WellPixelThresholds {
    /// Pixels at or above this V are treated as glare.
    pub max_value: f32,
    /// Pixels below this V are treated as shadow.
    pub min_value: f32,
    /// Global saturation floor applied before the pink/purple tests.
    pub min_saturation: f32,
    /// Pink: saturation must lie strictly inside this range.
    pub pink_saturation: (f32, f32),
    /// Pink: `r > g * pink_rg_ratio`.
    pub pink_rg_ratio: f32,
    /// Pink: `r > b * pink_rb_ratio`.
    pub pink_rb_ratio: f32,
    /// Pink: minimum red channel.
    pub pink_min_red: f32,
    /// Purple: minimum saturation.
    pub purple_min_saturation: f32,
    /// Purple: inclusive hue band.
    pub purple_hue: (f32, f32),
    /// Purple: minimum V.
    pub purple_min_value: f32,
}

impl WellPixelThresholds {
    /// Coarse thresholds used for locating the plate in the full photo.
    pub const fn locator() -> Self {
        Self {
            max_value: 250.0,
            min_value: 50.0,
            min_saturation: 0.0,
            pink_saturation: (15.0, 100.0),
            pink_rg_ratio: 0.9,
            pink_rb_ratio: 0.8,
            pink_min_red: 130.0,
            purple_min_saturation: 50.0,
            purple_hue: (115.0, 178.0),
            purple_min_value: 60.0,
        }
    }

    /// Thresholds used by the colour-blob well finder on a cropped plate.
    pub const fn blob() -> Self {
        Self {
            max_value: 240.0,
            min_value: 50.0,
            min_saturation: 25.0,
            pink_saturation: (25.0, 120.0),
            pink_rg_ratio: 0.85,
            pink_rb_ratio: 0.75,
            pink_min_red: 100.0,
            purple_min_saturation: 35.0,
            purple_hue: (105.0, 178.0),
            purple_min_value: 45.0,
        }
    }
}

impl Default for WellPixelThresholds {
    fn default() -> Self {
        Self::blob()
    }
}

/// True if the pixel looks like well content (pink or purple).
pub fn is_well_colored(rgb: [u8; 3], t: &WellPixelThresholds) -> bool {
    let hsv = Hsv::from_rgb(rgb);
    if hsv.v > t.max_value || hsv.v < t.min_value || hsv.s < t.min_saturation {
        return false;
    }
    let r = rgb[0] as f32;
    let g = rgb[1] as f32;
    let b = rgb[2] as f32;

    let pink = hsv.s > t.pink_saturation.0
        && hsv.s < t.pink_saturation.1
        && r > g * t.pink_rg_ratio
        && r > b * t.pink_rb_ratio
        && r > t.pink_min_red;
    let purple = hsv.s > t.purple_min_saturation
        && hsv.h >= t.purple_hue.0
        && hsv.h <= t.purple_hue.1
        && hsv.v > t.purple_min_value;
    pink || purple
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn primaries_map_to_opencv_hues() {
        assert_abs_diff_eq!(Hsv::from_rgb([255, 0, 0]).h, 0.0);
        assert_abs_diff_eq!(Hsv::from_rgb([0, 255, 0]).h, 60.0);
        assert_abs_diff_eq!(Hsv::from_rgb([0, 0, 255]).h, 120.0);
        let gray = Hsv::from_rgb([128, 128, 128]);
        assert_abs_diff_eq!(gray.s, 0.0);
        assert_abs_diff_eq!(gray.v, 128.0);
    }

    #[test]
    fn pink_and_purple_fixtures() {
        let pink = Hsv::from_rgb([230, 190, 205]);
        assert!(pink.h > 165.0 && pink.s < 50.0);
        let purple = Hsv::from_rgb([120, 80, 170]);
        assert_abs_diff_eq!(purple.h, 133.33, epsilon = 0.01);
        assert!(purple.s > 130.0);
    }

    #[test]
    fn hue_distance_wraps() {
        assert_abs_diff_eq!(circular_hue_distance(175.0, 5.0), 10.0);
        assert_abs_diff_eq!(circular_hue_distance(30.0, 100.0), 70.0);
    }

    #[test]
    fn mean_hue_wraps_across_zero() {
        let m = circular_mean_hue([178.0, 2.0]);
        assert!(!(1.0..=179.0).contains(&m), "mean = {m}");
        assert_abs_diff_eq!(circular_mean_hue(std::iter::empty()), 0.0);
    }

    #[test]
    fn classifies_well_pixels() {
        let t = WellPixelThresholds::blob();
        assert!(is_well_colored([230, 190, 205], &t));
        assert!(is_well_colored([120, 80, 170], &t));
        assert!(!is_well_colored([90, 90, 90], &t));
        assert!(!is_well_colored([250, 250, 250], &t));
        assert!(is_well_colored([230, 190, 205], &WellPixelThresholds::locator()));
    }
}
