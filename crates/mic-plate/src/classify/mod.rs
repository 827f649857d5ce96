//! Growth/inhibition classification of sampled wells.
//!
//! Three phases:
//! 1. each well gets a blended score (`0.65 * relative + 0.35 * absolute`)
//!    and a label from the high-confidence thresholds;
//! 2. wells left uncertain are resolved from their phase-1 neighbours;
//! 3. each row is made monotone (inhibition persists to the right).
//!
//! The control well is forced to growth with high confidence throughout.

mod neighbors;
mod score;

use crate::panel::DrugPanel;
use crate::well::{Confidence, WellColor, WellData, WellResult};
use mic_plate_core::layout::{COLS, ROWS, WELL_COUNT};
use neighbors::{enforce_monotonic, resolve_uncertain};
use score::{absolute_score, relative_score, Calibration};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Classifier tunables. Defaults are calibrated against the reference plate
/// photographs and should only change together with a labelled dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierParams {
    pub relative_weight: f32,
    pub absolute_weight: f32,
    /// Scores above this are growth (high confidence).
    pub growth_threshold: f32,
    /// Scores below this are inhibition (high confidence).
    pub inhibition_threshold: f32,
    /// Split used when neighbours cannot decide.
    pub fallback_threshold: f32,

    // Calibration bands for "unambiguous" wells.
    pub calib_growth_max_sat: f32,
    pub calib_growth_min_rb: f32,
    pub calib_inhibition_min_sat: f32,
    pub calib_inhibition_hue: (f32, f32),
    pub fallback_growth_sat: f32,
    pub fallback_inhibition_sat: f32,
    pub min_sat_range: f32,

    // Relative score.
    pub w_saturation: f32,
    pub w_hue: f32,
    pub w_rb: f32,
    /// Hue distance from the control at which the hue term reaches zero.
    pub hue_tolerance: f32,
    /// Control `(R-B)/max(R,B)` below this magnitude is treated as neutral.
    pub min_control_rb: f32,

    // Absolute score.
    /// `(R-B)/max(R,B)` at which the red/blue term saturates.
    pub rb_full_scale: f32,
    pub rb_weight: f32,
    /// Hues at or above `.0` or at or below `.1` count as reddish.
    pub reddish_hue: (f32, f32),
    /// Half-open purple band `[.0, .1)`.
    pub purple_hue: (f32, f32),
    pub hue_adjust: f32,
    /// Green is "depressed" below `.0 * R` and `.1 * B`.
    pub green_depression_ratio: (f32, f32),
    /// Minimum saturation for the green-depression check.
    pub green_depression_min_sat: f32,
    pub green_depression_penalty: f32,
    pub saturation_nudge: f32,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            relative_weight: 0.65,
            absolute_weight: 0.35,
            growth_threshold: 0.50,
            inhibition_threshold: 0.30,
            fallback_threshold: 0.40,
            calib_growth_max_sat: 35.0,
            calib_growth_min_rb: 10.0,
            calib_inhibition_min_sat: 80.0,
            calib_inhibition_hue: (140.0, 165.0),
            fallback_growth_sat: 27.0,
            fallback_inhibition_sat: 186.0,
            min_sat_range: 20.0,
            w_saturation: 0.40,
            w_hue: 0.25,
            w_rb: 0.35,
            hue_tolerance: 35.0,
            min_control_rb: 0.02,
            rb_full_scale: 0.2,
            rb_weight: 0.30,
            reddish_hue: (165.0, 12.0),
            purple_hue: (100.0, 160.0),
            hue_adjust: 0.10,
            green_depression_ratio: (0.7, 0.8),
            green_depression_min_sat: 50.0,
            green_depression_penalty: 0.10,
            saturation_nudge: 0.05,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("control well {0} missing from the sampled wells")]
    MissingControlWell(String),
    #[error("well at row {row}, column {col} missing from the sampled wells")]
    MissingWell { row: usize, col: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Label {
    Growth,
    Inhibition,
    Uncertain,
}

#[derive(Clone, Debug, Default)]
pub struct WellClassifier {
    params: ClassifierParams,
}

impl WellClassifier {
    pub fn new(params: ClassifierParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ClassifierParams {
        &self.params
    }

    fn blended_score(&self, well: &WellData, control: &WellData, cal: &Calibration) -> f32 {
        let p = &self.params;
        let rel = relative_score(well, control, cal, p);
        let abs = absolute_score(well, p);
        (p.relative_weight * rel + p.absolute_weight * abs).clamp(0.0, 1.0)
    }

    fn label(&self, score: f32) -> (Label, Confidence) {
        if score > self.params.growth_threshold {
            (Label::Growth, Confidence::High)
        } else if score < self.params.inhibition_threshold {
            (Label::Inhibition, Confidence::High)
        } else {
            (Label::Uncertain, Confidence::Low)
        }
    }

    /// Classify the 96 sampled wells. Output is row-major and holds exactly
    /// one result per plate position.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, wells, panel), fields(wells = wells.len()))
    )]
    pub fn classify(
        &self,
        wells: &[WellData],
        panel: &DrugPanel,
    ) -> Result<Vec<WellResult>, ClassifyError> {
        let mut grid: Vec<Option<&WellData>> = vec![None; WELL_COUNT];
        for w in wells {
            if w.row < ROWS && w.col < COLS {
                grid[w.row * COLS + w.col] = Some(w);
            }
        }
        let ctrl = panel.control;
        let control = grid
            .get(ctrl.row * COLS + ctrl.col)
            .copied()
            .flatten()
            .ok_or_else(|| ClassifyError::MissingControlWell(ctrl.label()))?;
        let ordered = grid
            .iter()
            .enumerate()
            .map(|(i, w)| {
                w.ok_or(ClassifyError::MissingWell {
                    row: i / COLS,
                    col: i % COLS,
                })
            })
            .collect::<Result<Vec<&WellData>, _>>()?;

        let cal = Calibration::from_wells(&ordered, &self.params);
        log::debug!(
            "calibration: growth S {:.1} ({} wells), inhibition S {:.1} ({} wells)",
            cal.growth_sat,
            cal.growth_wells,
            cal.inhibition_sat,
            cal.inhibition_wells
        );

        // Phase 1.
        let scores: Vec<f32> = ordered
            .iter()
            .map(|w| self.blended_score(w, control, &cal))
            .collect();
        let mut labels: Vec<(Label, Confidence)> = scores.iter().map(|&s| self.label(s)).collect();
        let ctrl_idx = ctrl.row * COLS + ctrl.col;
        labels[ctrl_idx] = (Label::Growth, Confidence::High);

        // Phase 2 reads phase-1 labels only.
        let phase1 = labels.clone();
        let mut resolved = 0usize;
        for row in 0..ROWS {
            for col in 0..COLS {
                let i = row * COLS + col;
                if phase1[i].0 != Label::Uncertain {
                    continue;
                }
                let left = (col > 0).then(|| phase1[i - 1].0);
                let right = (col + 1 < COLS).then(|| phase1[i + 1].0);
                labels[i] = resolve_uncertain(
                    left,
                    right,
                    scores[i],
                    panel.inhibition_threshold(row),
                    self.params.growth_threshold,
                    self.params.fallback_threshold,
                );
                resolved += 1;
            }
        }

        // Phase 3.
        let mut forced = 0usize;
        for (row, chunk) in labels.chunks_mut(COLS).enumerate() {
            let skip = (row == ctrl.row).then_some(ctrl.col);
            forced += enforce_monotonic(chunk, skip);
        }
        labels[ctrl_idx] = (Label::Growth, Confidence::High);

        let low = labels
            .iter()
            .filter(|(_, c)| *c == Confidence::Low)
            .count();
        log::info!("classified {WELL_COUNT} wells: {resolved} from neighbours, {forced} by monotonicity, {low} low confidence");
        if low > 0 {
            log::warn!("{low} wells need manual review");
        }

        Ok(ordered
            .iter()
            .zip(scores.iter())
            .zip(labels.iter())
            .map(|((w, &score), &(label, confidence))| WellResult {
                row: w.row,
                column: w.col,
                color: match label {
                    Label::Inhibition => WellColor::Purple,
                    _ => WellColor::Pink,
                },
                growth_score: score,
                manually_edited: false,
                confidence: Some(confidence),
                r: w.r_mean,
                g: w.g_mean,
                b: w.b_mean,
                h: w.hue,
                s: w.saturation,
                v: w.value,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mic_plate_core::Hsv;

    const PINK: [u8; 3] = [230, 190, 205];
    const PURPLE: [u8; 3] = [120, 80, 170];

    fn wells(color_of: impl Fn(usize, usize) -> [u8; 3]) -> Vec<WellData> {
        let mut out = Vec::new();
        for row in 0..ROWS {
            for col in 0..COLS {
                let rgb = color_of(row, col);
                let hsv = Hsv::from_rgb(rgb);
                out.push(WellData {
                    row,
                    col,
                    cx: col as f32 * 10.0,
                    cy: row as f32 * 10.0,
                    radius: 4.0,
                    r_mean: rgb[0] as f32,
                    g_mean: rgb[1] as f32,
                    b_mean: rgb[2] as f32,
                    hue: hsv.h,
                    saturation: hsv.s,
                    value: hsv.v,
                    detected: false,
                    pixel_count: 40,
                });
            }
        }
        out
    }

    fn staircase(row: usize, col: usize) -> [u8; 3] {
        if col >= 3 + row / 2 {
            PURPLE
        } else {
            PINK
        }
    }

    #[test]
    fn clean_plate_is_high_confidence() {
        let out = WellClassifier::default()
            .classify(&wells(staircase), &DrugPanel::mic_yst())
            .expect("classify");
        assert_eq!(out.len(), 96);
        for r in &out {
            let expected = if staircase(r.row, r.column) == PURPLE {
                WellColor::Purple
            } else {
                WellColor::Pink
            };
            assert_eq!(r.color, expected, "{}", r.label());
            assert_eq!(r.confidence, Some(Confidence::High));
        }
    }

    #[test]
    fn control_is_always_growth() {
        let out = WellClassifier::default()
            .classify(&wells(|_, _| PURPLE), &DrugPanel::mic_yst())
            .expect("classify");
        let ctrl = &out[7 * COLS];
        assert_eq!(ctrl.color, WellColor::Pink);
        assert_eq!(ctrl.confidence, Some(Confidence::High));
        // The computed score is kept for the control validity check.
        assert!(ctrl.growth_score < 0.5);
    }

    #[test]
    fn stray_growth_after_inhibition_is_forced() {
        let out = WellClassifier::default()
            .classify(
                &wells(|row, col| {
                    if row == 0 && (col == 4 || col >= 8) {
                        PURPLE
                    } else {
                        PINK
                    }
                }),
                &DrugPanel::mic_yst(),
            )
            .expect("classify");
        let row0 = &out[..COLS];
        assert_eq!(row0[3].color, WellColor::Pink);
        assert!(row0[4..].iter().all(|r| r.color == WellColor::Purple));
        assert_eq!(row0[5].confidence, Some(Confidence::Medium));
        assert_eq!(row0[4].confidence, Some(Confidence::High));
    }

    #[test]
    fn missing_control_is_an_error() {
        let mut ws = wells(staircase);
        ws.retain(|w| !(w.row == 7 && w.col == 0));
        let err = WellClassifier::default()
            .classify(&ws, &DrugPanel::mic_yst())
            .unwrap_err();
        assert_eq!(err, ClassifyError::MissingControlWell("H1".into()));

        let mut ws = wells(staircase);
        ws.pop();
        let err = WellClassifier::default()
            .classify(&ws, &DrugPanel::mic_yst())
            .unwrap_err();
        assert_eq!(err, ClassifyError::MissingWell { row: 7, col: 11 });
    }
}
