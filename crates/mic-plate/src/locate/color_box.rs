use mic_plate_core::layout::{COLS, ROWS};
use mic_plate_core::{is_well_colored, PixelRect, RgbImageView, WellPixelThresholds};
use nalgebra::Point2;

/// Coordinates of well-coloured pixels on a `stride` lattice.
pub(crate) fn well_pixels(
    img: &RgbImageView<'_>,
    stride: usize,
    thresholds: &WellPixelThresholds,
) -> Vec<Point2<f32>> {
    let stride = stride.max(1);
    let mut out = Vec::new();
    for y in (0..img.height).step_by(stride) {
        for x in (0..img.width).step_by(stride) {
            if is_well_colored(img.pixel(x, y), thresholds) {
                out.push(Point2::new(x as f32, y as f32));
            }
        }
    }
    out
}

/// Bounding box of `pixels`, padded by `padding` of one estimated cell on
/// every side and clamped to the image.
pub(crate) fn padded_bounds(
    pixels: &[Point2<f32>],
    padding: f32,
    width: usize,
    height: usize,
) -> Option<PixelRect> {
    let first = pixels.first()?;
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in pixels {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    let pad_x = ((x1 - x0) / COLS as f32 * padding) as i64;
    let pad_y = ((y1 - y0) / ROWS as f32 * padding) as i64;
    let rect = PixelRect::from_bounds_clamped(
        x0 as i64 - pad_x,
        y0 as i64 - pad_y,
        x1 as i64 + pad_x,
        y1 as i64 + pad_y,
        width,
        height,
    );
    (!rect.is_empty()).then_some(rect)
}

/// Shrink `rect` by `margin.0` of its width and `margin.1` of its height on
/// each side.
pub(crate) fn inset(rect: PixelRect, margin: (f32, f32)) -> PixelRect {
    let dx = (rect.width as f32 * margin.0) as usize;
    let dy = (rect.height as f32 * margin.1) as usize;
    PixelRect::new(
        rect.x + dx,
        rect.y + dy,
        rect.width.saturating_sub(2 * dx),
        rect.height.saturating_sub(2 * dy),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mic_plate_core::RgbImage;

    #[test]
    fn finds_coloured_patch() {
        let mut img = RgbImage::filled(60, 40, [200, 200, 200]);
        for y in 10..20 {
            for x in 12..36 {
                img.put_pixel(x, y, [120, 80, 170]);
            }
        }
        let px = well_pixels(&img.view(), 1, &WellPixelThresholds::locator());
        assert_eq!(px.len(), 240);
        let rect = padded_bounds(&px, 0.0, 60, 40).expect("bounds");
        assert_eq!(rect, PixelRect::new(12, 10, 23, 9));
    }

    #[test]
    fn padding_and_inset() {
        let px = [Point2::new(100.0, 100.0), Point2::new(220.0, 180.0)];
        // Cell estimate 10 x 10, padding 3 px.
        let rect = padded_bounds(&px, 0.3, 1000, 1000).expect("bounds");
        assert_eq!(rect, PixelRect::new(97, 97, 126, 86));
        assert_eq!(padded_bounds(&px, 0.3, 150, 150).map(|r| r.width), Some(53));
        assert_eq!(inset(PixelRect::new(0, 0, 100, 100), (0.02, 0.03)), PixelRect::new(2, 3, 96, 94));
    }
}
