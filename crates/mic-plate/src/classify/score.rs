//! Phase 1 colour scoring: 1.0 looks like growth, 0.0 like inhibition.

use super::ClassifierParams;
use crate::well::WellData;
use mic_plate_core::{circular_hue_distance, median};

/// Saturation medians of wells that unambiguously look like growth and
/// inhibition on this plate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Calibration {
    pub growth_sat: f32,
    pub inhibition_sat: f32,
    pub growth_wells: usize,
    pub inhibition_wells: usize,
}

impl Calibration {
    pub fn from_wells(wells: &[&WellData], p: &ClassifierParams) -> Self {
        let growth: Vec<f32> = wells
            .iter()
            .filter(|w| {
                w.saturation < p.calib_growth_max_sat && w.r_mean - w.b_mean > p.calib_growth_min_rb
            })
            .map(|w| w.saturation)
            .collect();
        let inhibition: Vec<f32> = wells
            .iter()
            .filter(|w| {
                w.saturation > p.calib_inhibition_min_sat
                    && w.hue >= p.calib_inhibition_hue.0
                    && w.hue <= p.calib_inhibition_hue.1
            })
            .map(|w| w.saturation)
            .collect();
        Self {
            growth_sat: median(&growth).unwrap_or(p.fallback_growth_sat),
            inhibition_sat: median(&inhibition).unwrap_or(p.fallback_inhibition_sat),
            growth_wells: growth.len(),
            inhibition_wells: inhibition.len(),
        }
    }
}

/// `(R - B) / max(R, B)`, in `[-1, 1]`.
pub(crate) fn rb_ratio(rgb: [f32; 3]) -> f32 {
    let m = rgb[0].max(rgb[2]);
    if m <= 1e-3 {
        return 0.0;
    }
    (rgb[0] - rgb[2]) / m
}

/// Similarity to the control well, normalised by the plate calibration.
pub(crate) fn relative_score(
    well: &WellData,
    control: &WellData,
    cal: &Calibration,
    p: &ClassifierParams,
) -> f32 {
    let sat_range = (cal.inhibition_sat - cal.growth_sat).max(p.min_sat_range);
    let sat_score = 1.0 - ((well.saturation - cal.growth_sat) / sat_range).clamp(0.0, 1.0);

    let hue_dist = circular_hue_distance(well.hue, control.hue);
    let hue_score = (1.0 - hue_dist / p.hue_tolerance).max(0.0);

    let w_rb = rb_ratio(well.rgb());
    let c_rb = rb_ratio(control.rgb());
    let rb_score = if c_rb.abs() > p.min_control_rb {
        (w_rb / c_rb).clamp(0.0, 1.0)
    } else if w_rb > 0.0 {
        1.0
    } else {
        0.0
    };

    (p.w_saturation * sat_score + p.w_hue * hue_score + p.w_rb * rb_score).clamp(0.0, 1.0)
}

/// Hand-tuned additive model on the well's own colour.
/// Purple wells show green well below both red and blue.
fn green_depressed(well: &WellData, p: &ClassifierParams) -> bool {
    let (vs_red, vs_blue) = p.green_depression_ratio;
    well.g_mean < vs_red * well.r_mean
        && well.g_mean < vs_blue * well.b_mean
        && well.saturation > p.green_depression_min_sat
}

pub(crate) fn absolute_score(well: &WellData, p: &ClassifierParams) -> f32 {
    let mut score = 0.5;

    // Red/blue balance dominates.
    let rb = rb_ratio(well.rgb());
    score += (rb / p.rb_full_scale).clamp(-1.0, 1.0) * p.rb_weight;

    let h = well.hue;
    if h >= p.reddish_hue.0 || h <= p.reddish_hue.1 {
        score += p.hue_adjust;
    } else if h >= p.purple_hue.0 && h < p.purple_hue.1 {
        score -= p.hue_adjust;
    }

    if green_depressed(well, p) {
        score -= p.green_depression_penalty;
    }

    if well.saturation < p.calib_growth_max_sat {
        score += p.saturation_nudge;
    } else if well.saturation > p.calib_inhibition_min_sat {
        score -= p.saturation_nudge;
    }

    score.clamp(0.0, 1.0)
}
