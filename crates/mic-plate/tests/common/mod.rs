//! Synthetic plate photographs with a known answer.

#![allow(dead_code)]

use mic_plate::core::{homography_from_4pt, Homography, RgbImage};
use mic_plate::WellColor;
use nalgebra::Point2;

pub const WIDTH: usize = 1300;
pub const HEIGHT: usize = 900;
pub const STEP: f32 = 100.0;
pub const RADIUS: f32 = 40.0;
/// Centre of well A1.
pub const FIRST: f32 = 100.0;

pub const BACKGROUND: [u8; 3] = [90, 90, 90];
pub const PLATE: [u8; 3] = [215, 215, 215];
pub const PINK: [u8; 3] = [230, 190, 205];
pub const PURPLE: [u8; 3] = [120, 80, 170];

/// Plate body in canonical coordinates: (x0, y0, x1, y1).
const PLATE_BOUNDS: (f32, f32, f32, f32) = (30.0, 30.0, 1270.0, 870.0);

/// First purple column per row; 12 means the row grew everywhere.
pub const FIRST_PURPLE: [usize; 8] = [3, 5, 12, 6, 0, 7, 9, 4];

/// Expected colour of each well. H1 is the growth control.
pub fn expected(row: usize, col: usize) -> WellColor {
    if row == 7 && col == 0 {
        return WellColor::Pink;
    }
    if col >= FIRST_PURPLE[row] {
        WellColor::Purple
    } else {
        WellColor::Pink
    }
}

/// Colour at canonical plate coordinates.
fn canonical_color(x: f32, y: f32) -> [u8; 3] {
    let (x0, y0, x1, y1) = PLATE_BOUNDS;
    if x < x0 || x >= x1 || y < y0 || y >= y1 {
        return BACKGROUND;
    }
    let col = ((x - FIRST) / STEP).round();
    let row = ((y - FIRST) / STEP).round();
    if (0.0..12.0).contains(&col) && (0.0..8.0).contains(&row) {
        let dx = x - (FIRST + col * STEP);
        let dy = y - (FIRST + row * STEP);
        if dx * dx + dy * dy <= RADIUS * RADIUS {
            return match expected(row as usize, col as usize) {
                WellColor::Purple => PURPLE,
                _ => PINK,
            };
        }
    }
    PLATE
}

/// Axis-aligned plate photo.
pub fn render_plate() -> RgbImage {
    let mut img = RgbImage::filled(WIDTH, HEIGHT, BACKGROUND);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            img.put_pixel(x, y, canonical_color(x as f32 + 0.5, y as f32 + 0.5));
        }
    }
    img
}

/// Plate photographed at an angle: the canonical plate corners land on
/// `quad` (TL, TR, BR, BL).
pub fn render_keystoned(quad: [Point2<f32>; 4]) -> Option<RgbImage> {
    let (x0, y0, x1, y1) = PLATE_BOUNDS;
    let canonical = [
        Point2::new(x0, y0),
        Point2::new(x1, y0),
        Point2::new(x1, y1),
        Point2::new(x0, y1),
    ];
    let canon_from_img: Homography = homography_from_4pt(&quad, &canonical)?;
    let mut img = RgbImage::filled(WIDTH, HEIGHT, BACKGROUND);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let p = canon_from_img.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
            img.put_pixel(x, y, canonical_color(p.x, p.y));
        }
    }
    Some(img)
}

/// Fraction of wells whose colour matches [`expected`].
pub fn agreement(wells: &[mic_plate::WellResult]) -> f32 {
    let hits = wells
        .iter()
        .filter(|w| w.color == expected(w.row, w.column))
        .count();
    hits as f32 / 96.0
}
