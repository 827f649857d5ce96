use mic_plate_core::layout::row_label;
use serde::{Deserialize, Serialize};

/// Colour statistics sampled from one grid cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WellData {
    pub row: usize,
    pub col: usize,
    /// Sampling centre in plate-image pixels.
    pub cx: f32,
    pub cy: f32,
    /// Well radius the sampling disc was derived from.
    pub radius: f32,
    pub r_mean: f32,
    pub g_mean: f32,
    pub b_mean: f32,
    /// Circular mean hue, OpenCV scale (0..180).
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
    /// Centre came from a detected circle rather than the lattice.
    pub detected: bool,
    /// Pixels that contributed to the statistics.
    pub pixel_count: usize,
}

impl WellData {
    pub fn rgb(&self) -> [f32; 3] {
        [self.r_mean, self.g_mean, self.b_mean]
    }
}

/// Final well colour. `Pink` is growth, `Purple` is inhibition; `Partial` is
/// only produced by manual edits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WellColor {
    Pink,
    Purple,
    Partial,
}

impl WellColor {
    pub fn is_growth(self) -> bool {
        self == WellColor::Pink
    }

    pub fn is_inhibition(self) -> bool {
        self == WellColor::Purple
    }
}

/// How a well's colour was decided.
///
/// `High`: decisive colour signal or the control well. `Medium`: resolved from
/// neighbours or by monotonicity. `Low`: threshold fallback, needs review.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Classified well.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WellResult {
    pub row: usize,
    pub column: usize,
    pub color: WellColor,
    /// Blended growth score in `[0, 1]`.
    pub growth_score: f32,
    pub manually_edited: bool,
    /// `None` after a manual edit.
    pub confidence: Option<Confidence>,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

impl WellResult {
    /// Plate label such as `"C7"`.
    pub fn label(&self) -> String {
        format!("{}{}", row_label(self.row), self.column + 1)
    }

    /// Override the colour by hand. MIC values must be recomputed afterwards.
    pub fn set_manual_color(&mut self, color: WellColor) {
        log::info!("{} manually set to {:?}", self.label(), color);
        self.color = color;
        self.manually_edited = true;
        self.confidence = None;
    }
}
