//! Drug layout and concentration table of a MIC plate.

use mic_plate_core::layout::{row_label, COLS, ROWS};
use serde::{Deserialize, Serialize};

/// Zero-based well position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WellPosition {
    pub row: usize,
    pub col: usize,
}

impl WellPosition {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Plate label such as `"H1"`.
    pub fn label(&self) -> String {
        format!("{}{}", row_label(self.row), self.col + 1)
    }
}

/// One drug row of the panel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrugRow {
    /// Short code, e.g. `"AMB"`.
    pub code: String,
    pub name: String,
    /// mg/L per column; `None` for non-test wells such as the growth control.
    pub concentrations: Vec<Option<f64>>,
    /// Required inhibition for a well to count as the MIC (0.5 or 0.9).
    ///
    /// Rows at or above 0.9 resolve borderline transition wells to
    /// inhibition.
    pub inhibition_threshold: f32,
}

impl DrugRow {
    fn new(code: &str, name: &str, concentrations: Vec<Option<f64>>, threshold: f32) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            concentrations,
            inhibition_threshold: threshold,
        }
    }

    /// First column carrying a concentration.
    pub fn first_tested_column(&self) -> Option<usize> {
        self.concentrations.iter().position(Option::is_some)
    }

    pub fn max_concentration(&self) -> Option<f64> {
        self.concentrations
            .iter()
            .flatten()
            .copied()
            .reduce(f64::max)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PanelError {
    #[error("panel has {got} drug rows, expected {expected}")]
    RowCount { expected: usize, got: usize },
    #[error("row {row} has {got} concentrations, expected {expected}")]
    ColumnCount {
        row: usize,
        expected: usize,
        got: usize,
    },
    #[error("control well {0} lies outside the plate")]
    ControlOutOfRange(String),
}

/// Static concentration table consumed by the classifier and MIC calculator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrugPanel {
    pub name: String,
    pub rows: Vec<DrugRow>,
    /// Positive growth control ("K").
    pub control: WellPosition,
}

const STANDARD_SERIES: [f64; 12] = [
    0.004, 0.008, 0.016, 0.032, 0.064, 0.125, 0.25, 0.5, 1.0, 2.0, 4.0, 8.0,
];
const FLUCONAZOLE_SERIES: [f64; 12] = [
    0.064, 0.125, 0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0,
];

impl DrugPanel {
    /// 7005 MIC YST layout. H1 is the growth control; amphotericin B is read
    /// at 90% inhibition, all other drugs at 50%.
    pub fn mic_yst() -> Self {
        let standard = || STANDARD_SERIES.iter().map(|&c| Some(c)).collect::<Vec<_>>();
        let mut amb: Vec<Option<f64>> = vec![None];
        amb.extend(STANDARD_SERIES[1..].iter().map(|&c| Some(c)));

        Self {
            name: "MIC YST 7005".to_string(),
            rows: vec![
                DrugRow::new("AND", "Anidulafungin", standard(), 0.50),
                DrugRow::new("MIF", "Micafungin", standard(), 0.50),
                DrugRow::new("CAS", "Caspofungin", standard(), 0.50),
                DrugRow::new("POS", "Posaconazole", standard(), 0.50),
                DrugRow::new("VOR", "Voriconazole", standard(), 0.50),
                DrugRow::new("ITR", "Itraconazole", standard(), 0.50),
                DrugRow::new(
                    "FLU",
                    "Fluconazole",
                    FLUCONAZOLE_SERIES.iter().map(|&c| Some(c)).collect(),
                    0.50,
                ),
                DrugRow::new("AMB", "Amphotericin B", amb, 0.90),
            ],
            control: WellPosition::new(7, 0),
        }
    }

    /// Check the panel matches the 8x12 plate.
    pub fn validate(&self) -> Result<(), PanelError> {
        if self.rows.len() != ROWS {
            return Err(PanelError::RowCount {
                expected: ROWS,
                got: self.rows.len(),
            });
        }
        for (i, r) in self.rows.iter().enumerate() {
            if r.concentrations.len() != COLS {
                return Err(PanelError::ColumnCount {
                    row: i,
                    expected: COLS,
                    got: r.concentrations.len(),
                });
            }
        }
        if self.control.row >= ROWS || self.control.col >= COLS {
            return Err(PanelError::ControlOutOfRange(self.control.label()));
        }
        Ok(())
    }

    pub fn row(&self, row: usize) -> Option<&DrugRow> {
        self.rows.get(row)
    }

    pub fn concentration(&self, row: usize, col: usize) -> Option<f64> {
        self.rows.get(row)?.concentrations.get(col).copied().flatten()
    }

    /// Inhibition threshold of a row; 0.5 for rows outside the panel.
    pub fn inhibition_threshold(&self, row: usize) -> f32 {
        self.rows.get(row).map_or(0.5, |r| r.inhibition_threshold)
    }

    pub fn is_control(&self, row: usize, col: usize) -> bool {
        self.control == WellPosition::new(row, col)
    }
}

impl Default for DrugPanel {
    fn default() -> Self {
        Self::mic_yst()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_panel_layout() {
        let p = DrugPanel::mic_yst();
        assert!(p.validate().is_ok());
        assert_eq!(p.rows[6].code, "FLU");
        assert_eq!(p.concentration(6, 11), Some(128.0));
        assert_eq!(p.concentration(0, 0), Some(0.004));
        assert_eq!(p.concentration(7, 0), None);
        assert_eq!(p.rows[7].first_tested_column(), Some(1));
        assert_eq!(p.rows[7].max_concentration(), Some(8.0));
        assert_eq!(p.inhibition_threshold(7), 0.90);
        assert!(p.is_control(7, 0));
        assert_eq!(p.control.label(), "H1");
    }

    #[test]
    fn validate_rejects_short_rows() {
        let mut p = DrugPanel::mic_yst();
        p.rows[2].concentrations.pop();
        assert_eq!(
            p.validate(),
            Err(PanelError::ColumnCount {
                row: 2,
                expected: 12,
                got: 11
            })
        );
    }
}
