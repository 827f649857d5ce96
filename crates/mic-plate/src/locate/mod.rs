//! Plate localisation: find the 96-well area in a raw photograph.
//!
//! Strategies are tried in order, each only when the previous one fails or
//! produces an implausible crop:
//!
//! 1. external normalisation ([`PlateNormalizer`]), when supplied;
//! 2. perspective rectification from the corners of the well-colour mask;
//! 3. padded bounding box of well-coloured pixels;
//! 4. bounding box of the strongest gradient projections;
//! 5. a fixed centre crop, which always succeeds.
//!
//! The locator never fails; the chosen strategy is reported in
//! [`PlateLocation`].

mod color_box;
mod edges;
mod perspective;

use mic_plate_core::layout::PLATE_ASPECT;
use mic_plate_core::{PixelRect, RgbImage, RgbImageView, WellPixelThresholds};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorParams {
    /// Images whose width/height is below this are rotated 90 degrees.
    pub rotate_below_aspect: f32,
    /// Pixel lattice stride for the colour scan.
    pub pixel_stride: usize,
    pub thresholds: WellPixelThresholds,
    /// Minimum well-coloured samples before colour strategies are tried.
    pub min_color_pixels: usize,
    /// Padding around the colour bounds, in estimated cells.
    pub bbox_padding: f32,
    /// Inward trim after the colour crop, as fractions of width and height.
    pub light_margin: (f32, f32),
    /// Accepted crop aspect ratio, exclusive bounds.
    pub aspect_range: (f32, f32),
    pub perspective: bool,
    /// Skew below this is not worth a warp.
    pub min_skew: f32,
    pub max_warp_width: f32,
    /// Minimum corner-quad area as a fraction of the image area.
    pub min_quad_area: f32,
    /// Working resolution of the edge strategy.
    pub edge_max_dim: usize,
    /// Projection threshold as a fraction of the peak.
    pub edge_threshold: f32,
    /// Inward trim from the plate outline to the well area (edge and
    /// centre-crop strategies).
    pub well_area_margin: (f32, f32),
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self {
            rotate_below_aspect: 1.2,
            pixel_stride: 3,
            thresholds: WellPixelThresholds::locator(),
            min_color_pixels: 100,
            bbox_padding: 0.3,
            light_margin: (0.02, 0.03),
            aspect_range: (1.1, 2.0),
            perspective: true,
            min_skew: 0.02,
            max_warp_width: 1200.0,
            min_quad_area: 0.1,
            edge_max_dim: 400,
            edge_threshold: 0.35,
            well_area_margin: (0.08, 0.10),
        }
    }
}

/// External plate normaliser (contrast enhancement plus perspective
/// correction), e.g. a native library wrapper.
pub trait PlateNormalizer {
    fn normalize(&self, img: &RgbImageView<'_>) -> Option<RgbImage>;
}

impl<F> PlateNormalizer for F
where
    F: Fn(&RgbImageView<'_>) -> Option<RgbImage>,
{
    fn normalize(&self, img: &RgbImageView<'_>) -> Option<RgbImage> {
        self(img)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocateStrategy {
    Normalized,
    Perspective,
    ColorBounds,
    EdgeBounds,
    CenterCrop,
}

/// Cropped plate image plus how it was obtained.
#[derive(Clone, Debug)]
pub struct PlateLocation {
    pub image: RgbImage,
    pub strategy: LocateStrategy,
    /// Input was rotated 90 degrees clockwise first.
    pub rotated: bool,
    /// Crop rectangle in the (rotated) input, for crop strategies.
    pub region: Option<PixelRect>,
    /// Plate corners (TL, TR, BR, BL) in the (rotated) input, for the
    /// perspective strategy.
    pub corners: Option<[Point2<f32>; 4]>,
}

#[derive(Clone, Debug, Default)]
pub struct PlateLocator {
    params: LocatorParams,
}

impl PlateLocator {
    pub fn new(params: LocatorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LocatorParams {
        &self.params
    }

    fn plausible(&self, width: usize, height: usize) -> bool {
        if height == 0 {
            return false;
        }
        let a = width as f32 / height as f32;
        a > self.params.aspect_range.0 && a < self.params.aspect_range.1
    }

    /// Locate the well area in `img`.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            name = "locate_plate",
            level = "info",
            skip(self, img, normalizer),
            fields(width = img.width, height = img.height)
        )
    )]
    pub fn locate(
        &self,
        img: &RgbImageView<'_>,
        normalizer: Option<&dyn PlateNormalizer>,
    ) -> PlateLocation {
        let rotated = img.height > img.width || img.aspect() < self.params.rotate_below_aspect;
        let turned = rotated.then(|| img.rotate90_cw());
        let view = turned.as_ref().map_or(*img, RgbImage::view);
        if rotated {
            log::debug!("rotated {}x{} input to landscape", img.width, img.height);
        }

        let (image, strategy, region, corners) = self.run_chain(&view, normalizer);
        log::info!(
            "plate located by {:?}: {}x{}",
            strategy,
            image.width,
            image.height
        );
        PlateLocation {
            image,
            strategy,
            rotated,
            region,
            corners,
        }
    }

    #[allow(clippy::type_complexity)]
    fn run_chain(
        &self,
        view: &RgbImageView<'_>,
        normalizer: Option<&dyn PlateNormalizer>,
    ) -> (
        RgbImage,
        LocateStrategy,
        Option<PixelRect>,
        Option<[Point2<f32>; 4]>,
    ) {
        let p = &self.params;

        if let Some(n) = normalizer {
            match n.normalize(view) {
                Some(out) if self.plausible(out.width, out.height) => {
                    return (out, LocateStrategy::Normalized, None, None);
                }
                Some(out) => log::debug!(
                    "normaliser output {}x{} rejected by aspect check",
                    out.width,
                    out.height
                ),
                None => log::debug!("normaliser unavailable"),
            }
        }

        let pixels = color_box::well_pixels(view, p.pixel_stride, &p.thresholds);
        if pixels.len() >= p.min_color_pixels {
            if p.perspective {
                if let Some((out, quad)) = self.try_perspective(view, &pixels) {
                    return (out, LocateStrategy::Perspective, None, Some(quad));
                }
            }
            if let Some((out, rect)) = self.try_color_bounds(view, &pixels) {
                return (out, LocateStrategy::ColorBounds, Some(rect), None);
            }
        } else {
            log::debug!(
                "only {} well-coloured samples, skipping colour strategies",
                pixels.len()
            );
        }

        if let Some((out, rect)) = self.try_edge_bounds(view) {
            return (out, LocateStrategy::EdgeBounds, Some(rect), None);
        }

        let (out, rect) = self.center_crop(view);
        log::warn!("all plate detectors failed, using centre crop");
        (out, LocateStrategy::CenterCrop, Some(rect), None)
    }

    fn try_perspective(
        &self,
        view: &RgbImageView<'_>,
        pixels: &[Point2<f32>],
    ) -> Option<(RgbImage, [Point2<f32>; 4])> {
        let p = &self.params;
        let quad = perspective::extreme_corners(pixels)?;
        let area = perspective::quad_area(&quad);
        if area < p.min_quad_area * (view.width * view.height) as f32 {
            log::debug!("corner quad too small ({area:.0} px^2)");
            return None;
        }
        let skew = perspective::skew(&quad);
        if skew < p.min_skew {
            log::debug!("plate skew {skew:.3} below warp threshold");
            return None;
        }
        let out = perspective::rectify(view, &quad, p.max_warp_width, p.bbox_padding)?;
        if !self.plausible(out.width, out.height) {
            log::debug!("rectified plate {}x{} rejected", out.width, out.height);
            return None;
        }
        Some((out, quad))
    }

    fn try_color_bounds(
        &self,
        view: &RgbImageView<'_>,
        pixels: &[Point2<f32>],
    ) -> Option<(RgbImage, PixelRect)> {
        let p = &self.params;
        let rect = color_box::padded_bounds(pixels, p.bbox_padding, view.width, view.height)?;
        if !self.plausible(rect.width, rect.height) {
            log::debug!(
                "colour bounds {}x{} rejected by aspect check",
                rect.width,
                rect.height
            );
            return None;
        }
        let rect = color_box::inset(rect, p.light_margin);
        Some((view.crop(rect)?, rect))
    }

    fn try_edge_bounds(&self, view: &RgbImageView<'_>) -> Option<(RgbImage, PixelRect)> {
        let p = &self.params;
        let rect = edges::edge_bounds(view, p.edge_max_dim, p.edge_threshold)?;
        if !self.plausible(rect.width, rect.height) {
            log::debug!(
                "edge bounds {}x{} rejected by aspect check",
                rect.width,
                rect.height
            );
            return None;
        }
        let rect = color_box::inset(rect, p.well_area_margin);
        Some((view.crop(rect)?, rect))
    }

    fn center_crop(&self, view: &RgbImageView<'_>) -> (RgbImage, PixelRect) {
        let (w, h) = (view.width as f32, view.height as f32);
        let (cw, ch) = if w / h > PLATE_ASPECT {
            (h * PLATE_ASPECT, h)
        } else {
            (w, w / PLATE_ASPECT)
        };
        let plate = PixelRect::new(
            ((w - cw) / 2.0) as usize,
            ((h - ch) / 2.0) as usize,
            (cw as usize).max(1),
            (ch as usize).max(1),
        );
        let rect = color_box::inset(plate, self.params.well_area_margin);
        match view.crop(rect) {
            Some(out) => (out, rect),
            None => (view.to_owned_image(), PixelRect::new(0, 0, view.width, view.height)),
        }
    }
}
