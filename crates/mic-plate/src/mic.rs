//! MIC read-out from classified wells.

use crate::panel::DrugPanel;
use crate::well::{WellColor, WellResult};
use mic_plate_core::layout::{COLS, ROWS, WELL_COUNT};
use mic_plate_core::median;
use serde::{Deserialize, Serialize};

/// Control wells scoring below this did not grow; the run should be repeated.
pub const MIN_CONTROL_SCORE: f32 = 0.40;
/// Last-column median saturation below this hints at an edge artifact.
const EDGE_MAX_SATURATION: f32 = 25.0;
/// ... provided the neighbouring column is this much more saturated.
const EDGE_CONTRAST: f32 = 1.5;
const EDGE_NOTE: &str = " (possible column 12 edge artifact)";

/// MIC of one drug row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MicResult {
    pub drug_row: usize,
    /// Short drug code, e.g. `"FLU"`.
    pub drug: String,
    pub drug_name: String,
    /// mg/L; `None` when no inhibition was read.
    pub mic_value: Option<f64>,
    pub mic_column: Option<usize>,
    /// `"≤c"`, `">c"` or `"Undetermined"`.
    pub note: Option<String>,
    /// Growth score per column.
    pub well_scores: Vec<Option<f32>>,
    pub inhibition_threshold: f32,
}

impl MicResult {
    /// Display form: the note if present, else the value.
    pub fn display_value(&self) -> String {
        match (&self.note, self.mic_value) {
            (Some(note), _) => note.clone(),
            (None, Some(v)) => format!("{v}"),
            (None, None) => "-".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MicReport {
    pub results: Vec<MicResult>,
    pub control_valid: bool,
    pub control_score: Option<f32>,
    /// Column 12 looks washed out relative to column 11.
    pub edge_artifact: bool,
    pub warnings: Vec<String>,
}

/// Stateless MIC calculator over a drug panel. Re-run it whenever a well
/// result changes.
#[derive(Clone, Debug, Default)]
pub struct MicCalculator {
    panel: DrugPanel,
}

impl MicCalculator {
    pub fn new(panel: DrugPanel) -> Self {
        Self { panel }
    }

    pub fn panel(&self) -> &DrugPanel {
        &self.panel
    }

    pub fn calculate(&self, wells: &[WellResult]) -> MicReport {
        let mut grid: Vec<Option<&WellResult>> = vec![None; WELL_COUNT];
        for w in wells {
            if w.row < ROWS && w.column < COLS {
                grid[w.row * COLS + w.column] = Some(w);
            }
        }

        let mut warnings = Vec::new();
        let ctrl = self.panel.control;
        let control_score = grid
            .get(ctrl.row * COLS + ctrl.col)
            .copied()
            .flatten()
            .map(|w| w.growth_score);
        let control_valid = control_score.is_some_and(|s| s >= MIN_CONTROL_SCORE);
        if !control_valid {
            let msg = match control_score {
                Some(s) => format!(
                    "control well {} shows weak growth (score {s:.2}); repeat the test",
                    ctrl.label()
                ),
                None => format!("control well {} missing", ctrl.label()),
            };
            log::warn!("{msg}");
            warnings.push(msg);
        }

        let edge_artifact = edge_artifact(&grid);
        if edge_artifact {
            log::debug!("column 12 saturation is suspiciously low");
        }

        let results = (0..ROWS)
            .map(|row| self.row_mic(row, &grid[row * COLS..(row + 1) * COLS], edge_artifact))
            .collect();

        MicReport {
            results,
            control_valid,
            control_score,
            edge_artifact,
            warnings,
        }
    }

    fn row_mic(&self, row: usize, cells: &[Option<&WellResult>], edge_artifact: bool) -> MicResult {
        let drug = self.panel.row(row);
        let mut out = MicResult {
            drug_row: row,
            drug: drug.map(|d| d.code.clone()).unwrap_or_default(),
            drug_name: drug.map(|d| d.name.clone()).unwrap_or_default(),
            mic_value: None,
            mic_column: None,
            note: None,
            well_scores: cells.iter().map(|w| w.map(|w| w.growth_score)).collect(),
            inhibition_threshold: self.panel.inhibition_threshold(row),
        };

        let tested: Vec<(usize, f64)> = (0..COLS)
            .filter(|&c| !self.panel.is_control(row, c))
            .filter_map(|c| self.panel.concentration(row, c).map(|conc| (c, conc)))
            .collect();
        let Some(&(first_col, _)) = tested.first() else {
            out.note = Some("Undetermined".to_string());
            return out;
        };

        let colors: Vec<Option<WellColor>> = tested
            .iter()
            .map(|&(c, _)| cells.get(c).copied().flatten().map(|w| w.color))
            .collect();

        if let Some(i) = colors.iter().position(|c| *c == Some(WellColor::Purple)) {
            let (col, conc) = tested[i];
            out.mic_value = Some(conc);
            out.mic_column = Some(col);
            if col == first_col {
                out.note = Some(format!("≤{conc}"));
            }
            return out;
        }

        if colors.iter().all(|c| *c == Some(WellColor::Pink)) {
            let max = tested.iter().map(|&(_, c)| c).fold(f64::MIN, f64::max);
            let mut note = format!(">{max}");
            if edge_artifact {
                note.push_str(EDGE_NOTE);
            }
            out.note = Some(note);
        } else {
            out.note = Some("Undetermined".to_string());
        }
        out
    }
}

fn column_median_saturation(grid: &[Option<&WellResult>], col: usize) -> Option<f32> {
    let sats: Vec<f32> = (0..ROWS)
        .filter_map(|r| grid[r * COLS + col].map(|w| w.s))
        .collect();
    median(&sats)
}

fn edge_artifact(grid: &[Option<&WellResult>]) -> bool {
    let (Some(last), Some(prev)) = (
        column_median_saturation(grid, COLS - 1),
        column_median_saturation(grid, COLS - 2),
    ) else {
        return false;
    };
    last < EDGE_MAX_SATURATION && prev > EDGE_CONTRAST * last
}
