//! JSON configuration and report helpers.

use crate::classify::ClassifierParams;
use crate::extract::ExtractParams;
use crate::locate::{LocateStrategy, LocatorParams};
use crate::mic::MicResult;
use crate::panel::DrugPanel;
use crate::pipeline::{AnalyzeError, PlateAnalysis};
use crate::well::WellResult;
use mic_plate_grid::{GridFitParams, GridQuality, GridStructure};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Analyzer configuration. Every section is optional in JSON and falls back
/// to its defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub panel: DrugPanel,
    pub locator: LocatorParams,
    pub grid: GridFitParams,
    pub extract: ExtractParams,
    pub classifier: ClassifierParams,
    /// Report path used when none is given on the command line.
    pub output_path: Option<String>,
}

impl AnalyzerConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output report path for `image_path`: the configured
    /// path, else `<image stem>_mic.json` next to the image.
    pub fn output_path(&self, image_path: &Path) -> PathBuf {
        self.output_path.as_ref().map(PathBuf::from).unwrap_or_else(|| {
            let stem = image_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "plate".to_string());
            image_path.with_file_name(format!("{stem}_mic.json"))
        })
    }
}

/// Serializable summary of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub image_path: String,
    #[serde(default)]
    pub config_path: Option<String>,
    pub panel: String,
    #[serde(default)]
    pub plate_width: usize,
    #[serde(default)]
    pub plate_height: usize,
    #[serde(default)]
    pub strategy: Option<LocateStrategy>,
    #[serde(default)]
    pub rotated: bool,
    #[serde(default)]
    pub naive_grid: bool,
    #[serde(default)]
    pub grid: Option<GridStructure>,
    #[serde(default)]
    pub quality: Option<GridQuality>,
    #[serde(default)]
    pub wells: Vec<WellResult>,
    #[serde(default)]
    pub mic: Vec<MicResult>,
    #[serde(default)]
    pub control_valid: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AnalysisReport {
    /// Empty report for an input image.
    pub fn new(image_path: &Path, config_path: Option<&Path>, cfg: &AnalyzerConfig) -> Self {
        Self {
            image_path: image_path.to_string_lossy().into_owned(),
            config_path: config_path.map(|p| p.to_string_lossy().into_owned()),
            panel: cfg.panel.name.clone(),
            plate_width: 0,
            plate_height: 0,
            strategy: None,
            rotated: false,
            naive_grid: false,
            grid: None,
            quality: None,
            wells: Vec::new(),
            mic: Vec::new(),
            control_valid: false,
            warnings: Vec::new(),
            error: None,
        }
    }

    /// Populate report fields from a finished analysis.
    pub fn set_analysis(&mut self, a: &PlateAnalysis) {
        self.plate_width = a.location.image.width;
        self.plate_height = a.location.image.height;
        self.strategy = Some(a.location.strategy);
        self.rotated = a.location.rotated;
        self.naive_grid = a.naive_grid;
        self.grid = Some(a.grid.clone());
        self.quality = Some(a.quality.clone());
        self.wells = a.wells.clone();
        self.mic = a.mic.results.clone();
        self.control_valid = a.mic.control_valid;
        self.warnings = a
            .quality
            .warnings
            .iter()
            .chain(a.mic.warnings.iter())
            .cloned()
            .collect();
        self.error = None;
    }

    /// Record an analysis error.
    pub fn set_error(&mut self, err: &AnalyzeError) {
        self.error = Some(err.to_string());
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
