//! End-to-end plate analysis: locate, fit, extract, classify, read MICs.

use crate::classify::{ClassifyError, WellClassifier};
use crate::extract::WellExtractor;
use crate::io::AnalyzerConfig;
use crate::locate::{PlateLocation, PlateLocator, PlateNormalizer};
use crate::mic::{MicCalculator, MicReport};
use crate::panel::PanelError;
use crate::well::WellResult;
use mic_plate_core::layout::{COLS, ROWS, WELL_COUNT};
use mic_plate_core::{ImageError, RgbImageView};
use mic_plate_grid::{CircleDetector, GridFitter, GridQuality, GridStructure, NoCircleDetector};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors that stop an analysis run. Low-quality input is never an error;
/// it shows up as fallbacks, quality scores and confidence tiers instead.
#[derive(thiserror::Error, Debug)]
pub enum AnalyzeError {
    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Panel(#[from] PanelError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[cfg(feature = "image")]
    #[error("failed to decode image: {0}")]
    Decode(#[from] ::image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Everything one run produces.
#[derive(Clone, Debug)]
pub struct PlateAnalysis {
    pub location: PlateLocation,
    pub grid: GridStructure,
    pub quality: GridQuality,
    /// The equal-division grid was used instead of the fitted one.
    pub naive_grid: bool,
    /// Wells whose sampling centre came from a detected circle.
    pub detected_wells: usize,
    /// 96 results, row-major.
    pub wells: Vec<WellResult>,
    pub mic: MicReport,
}

impl PlateAnalysis {
    pub fn well(&self, row: usize, col: usize) -> Option<&WellResult> {
        if row >= ROWS || col >= COLS {
            return None;
        }
        self.wells.get(row * COLS + col)
    }

    /// Wells that a human should look at.
    pub fn low_confidence_wells(&self) -> impl Iterator<Item = &WellResult> {
        self.wells
            .iter()
            .filter(|w| w.confidence == Some(crate::well::Confidence::Low))
    }
}

/// Plate reader wiring the stages together.
///
/// Collaborators are optional: without a circle detector the grid comes
/// from colour blobs, without a normaliser the locator starts at the
/// perspective stage.
pub struct PlateAnalyzer {
    config: AnalyzerConfig,
    detector: Box<dyn CircleDetector + Send + Sync>,
    normalizer: Option<Box<dyn PlateNormalizer + Send + Sync>>,
}

impl Default for PlateAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl PlateAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            detector: Box::new(NoCircleDetector),
            normalizer: None,
        }
    }

    pub fn with_detector(mut self, detector: impl CircleDetector + Send + Sync + 'static) -> Self {
        self.detector = Box::new(detector);
        self
    }

    pub fn with_normalizer(
        mut self,
        normalizer: impl PlateNormalizer + Send + Sync + 'static,
    ) -> Self {
        self.normalizer = Some(Box::new(normalizer));
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Run the full pipeline on a decoded image.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, img), fields(width = img.width, height = img.height))
    )]
    pub fn analyze(&self, img: &RgbImageView<'_>) -> Result<PlateAnalysis, AnalyzeError> {
        RgbImageView::new(img.width, img.height, img.data)?;
        let cfg = &self.config;
        cfg.panel.validate()?;

        let normalizer = self
            .normalizer
            .as_deref()
            .map(|n| n as &dyn PlateNormalizer);
        let location = PlateLocator::new(cfg.locator.clone()).locate(img, normalizer);
        let plate = location.image.view();
        let (w, h) = (plate.width as f32, plate.height as f32);

        let fitter = GridFitter::new(cfg.grid.clone());
        let detector: &dyn CircleDetector = self.detector.as_ref();
        let (grid, slots, quality, naive_grid) = match fitter.fit_plate(&plate, detector) {
            Some(fit) if !fit.quality.needs_manual_review() => {
                (fit.grid, fit.slots, fit.quality, false)
            }
            Some(fit) => {
                log::warn!(
                    "grid quality {:.2} too low, using equal-division grid",
                    fit.quality.overall_score
                );
                let mut quality = fit.quality;
                quality
                    .warnings
                    .push("low grid quality: equal-division grid used".to_string());
                (GridStructure::naive(w, h, ROWS, COLS), Vec::new(), quality, true)
            }
            None => {
                log::warn!("grid fit failed, using equal-division grid");
                (
                    GridStructure::naive(w, h, ROWS, COLS),
                    Vec::new(),
                    GridQuality::fallback(0, WELL_COUNT, "grid fit failed: equal-division grid used"),
                    true,
                )
            }
        };

        let data = WellExtractor::new(cfg.extract.clone()).extract_wells(&plate, &grid, &slots);
        let detected_wells = data.iter().filter(|d| d.detected).count();
        let wells = WellClassifier::new(cfg.classifier.clone()).classify(&data, &cfg.panel)?;
        let mic = MicCalculator::new(cfg.panel.clone()).calculate(&wells);

        Ok(PlateAnalysis {
            location,
            grid,
            quality,
            naive_grid,
            detected_wells,
            wells,
            mic,
        })
    }

    /// Recompute MICs after manual well edits.
    pub fn recompute_mic(&self, wells: &[WellResult]) -> MicReport {
        MicCalculator::new(self.config.panel.clone()).calculate(wells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mic_plate_core::RgbImage;

    #[test]
    fn zero_size_image_is_rejected() {
        let view = RgbImageView {
            width: 0,
            height: 10,
            data: &[],
        };
        let err = PlateAnalyzer::default().analyze(&view).unwrap_err();
        assert!(matches!(err, AnalyzeError::Image(_)), "{err}");
    }

    #[test]
    fn invalid_panel_is_rejected() {
        let mut cfg = AnalyzerConfig::default();
        cfg.panel.rows.pop();
        let img = RgbImage::filled(30, 20, [128, 128, 128]);
        let err = PlateAnalyzer::new(cfg).analyze(&img.view()).unwrap_err();
        assert!(matches!(err, AnalyzeError::Panel(_)), "{err}");
    }

    #[test]
    fn featureless_image_still_completes() {
        let img = RgbImage::filled(300, 200, [128, 128, 128]);
        let out = PlateAnalyzer::default().analyze(&img.view()).expect("analysis");
        assert!(out.naive_grid);
        assert_eq!(out.wells.len(), 96);
        assert_eq!(out.mic.results.len(), 8);
        let ctrl = out.well(7, 0).expect("control");
        assert!(ctrl.color.is_growth());
    }
}
