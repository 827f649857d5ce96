//! Image decoding through the `image` crate.

use crate::pipeline::AnalyzeError;
use mic_plate_core::{RgbImage, RgbImageView};
use std::path::Path;

/// Borrow an `image::RgbImage` as a core view.
pub fn rgb_view(img: &::image::RgbImage) -> RgbImageView<'_> {
    RgbImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Convert any decoded image into an owned core image, dropping alpha.
pub fn from_dynamic(img: &::image::DynamicImage) -> Result<RgbImage, AnalyzeError> {
    let rgb = img.to_rgb8();
    let (w, h) = (rgb.width() as usize, rgb.height() as usize);
    Ok(RgbImage::from_raw(w, h, rgb.into_raw())?)
}

/// Decode an image file. Fails before any analysis for unreadable or empty
/// images.
pub fn load_rgb(path: impl AsRef<Path>) -> Result<RgbImage, AnalyzeError> {
    let path = path.as_ref();
    let img = ::image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    log::debug!("decoded {} ({}x{})", path.display(), img.width(), img.height());
    from_dynamic(&img)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tiny.png");
        let mut img = ::image::RgbImage::new(4, 3);
        img.put_pixel(3, 2, ::image::Rgb([10, 20, 30]));
        img.save(&path).expect("save");

        let loaded = load_rgb(&path).expect("load");
        assert_eq!((loaded.width, loaded.height), (4, 3));
        assert_eq!(loaded.view().pixel(3, 2), [10, 20, 30]);
        assert_eq!(rgb_view(&img).pixel(3, 2), [10, 20, 30]);
    }

    #[test]
    fn garbage_file_fails_to_decode() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").expect("write");
        assert!(matches!(load_rgb(&path), Err(AnalyzeError::Decode(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_rgb("/definitely/not/here.png"),
            Err(AnalyzeError::Io(_))
        ));
    }
}
