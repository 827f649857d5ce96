use serde::{Deserialize, Serialize};

/// Errors raised when wrapping raw pixel buffers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid image dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },

    #[error("invalid pixel buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },

    #[error("unsupported channel count {0} (expected 1, 3 or 4)")]
    UnsupportedChannels(usize),
}

fn expected_len(width: usize, height: usize, channels: usize) -> Result<usize, ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(channels))
        .ok_or(ImageError::InvalidDimensions { width, height })
}

/// Axis-aligned pixel rectangle (top-left inclusive).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelRect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a rectangle from signed corner coordinates, clamped to `[0, w) x [0, h)`.
    pub fn from_bounds_clamped(x0: i64, y0: i64, x1: i64, y1: i64, w: usize, h: usize) -> Self {
        let cx0 = x0.clamp(0, w as i64) as usize;
        let cy0 = y0.clamp(0, h as i64) as usize;
        let cx1 = x1.clamp(0, w as i64) as usize;
        let cy1 = y1.clamp(0, h as i64) as usize;
        Self {
            x: cx0,
            y: cy0,
            width: cx1.saturating_sub(cx0),
            height: cy1.saturating_sub(cy0),
        }
    }

    /// Width over height; zero for degenerate rectangles.
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f32 / self.height as f32
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Borrowed RGB8 image, row-major, 3 bytes per pixel.
#[derive(Clone, Copy, Debug)]
pub struct RgbImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

impl<'a> RgbImageView<'a> {
    /// Wrap an RGB8 buffer, validating its length.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, ImageError> {
        let expected = expected_len(width, height, 3)?;
        if data.len() != expected {
            return Err(ImageError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Pixel at integer coordinates. Caller guarantees `x < width && y < height`.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Pixel at signed coordinates, `None` outside the image.
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> Option<[u8; 3]> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(self.pixel(x as usize, y as usize))
    }

    /// Bilinear RGB sample; pixels outside the image read as black.
    pub fn sample_bilinear(&self, x: f32, y: f32) -> [f32; 3] {
        let x0 = x.floor() as i64;
        let y0 = y.floor() as i64;
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let fetch = |px: i64, py: i64| self.get(px, py).unwrap_or([0, 0, 0]);
        let p00 = fetch(x0, y0);
        let p10 = fetch(x0 + 1, y0);
        let p01 = fetch(x0, y0 + 1);
        let p11 = fetch(x0 + 1, y0 + 1);

        let mut out = [0.0f32; 3];
        for c in 0..3 {
            let a = p00[c] as f32 + fx * (p10[c] as f32 - p00[c] as f32);
            let b = p01[c] as f32 + fx * (p11[c] as f32 - p01[c] as f32);
            out[c] = a + fy * (b - a);
        }
        out
    }

    /// Copy a sub-rectangle (clamped to the image) into an owned image.
    ///
    /// Returns `None` if the clamped rectangle is empty.
    pub fn crop(&self, rect: PixelRect) -> Option<RgbImage> {
        let x1 = (rect.x + rect.width).min(self.width);
        let y1 = (rect.y + rect.height).min(self.height);
        if rect.x >= x1 || rect.y >= y1 {
            return None;
        }
        let w = x1 - rect.x;
        let h = y1 - rect.y;
        let mut data = Vec::with_capacity(w * h * 3);
        for y in rect.y..y1 {
            let start = (y * self.width + rect.x) * 3;
            data.extend_from_slice(&self.data[start..start + w * 3]);
        }
        Some(RgbImage {
            width: w,
            height: h,
            data,
        })
    }

    /// Rotate by 90 degrees clockwise.
    pub fn rotate90_cw(&self) -> RgbImage {
        let (w, h) = (self.height, self.width);
        let mut data = vec![0u8; w * h * 3];
        for y in 0..self.height {
            for x in 0..self.width {
                // (x, y) -> (h_src - 1 - y, x)
                let dx = self.height - 1 - y;
                let dy = x;
                let dst = (dy * w + dx) * 3;
                data[dst..dst + 3].copy_from_slice(&self.pixel(x, y));
            }
        }
        RgbImage {
            width: w,
            height: h,
            data,
        }
    }

    pub fn to_owned_image(&self) -> RgbImage {
        RgbImage {
            width: self.width,
            height: self.height,
            data: self.data.to_vec(),
        }
    }
}

/// Owned RGB8 image, row-major, 3 bytes per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbImage {
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        RgbImageView::new(width, height, &data)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build from an RGBA8 buffer, dropping alpha.
    pub fn from_rgba(width: usize, height: usize, rgba: &[u8]) -> Result<Self, ImageError> {
        let expected = expected_len(width, height, 4)?;
        if rgba.len() != expected {
            return Err(ImageError::InvalidBuffer {
                expected,
                got: rgba.len(),
            });
        }
        let data = rgba
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build from an interleaved 8-bit buffer with 1 (gray), 3 (RGB) or
    /// 4 (RGBA) channels.
    pub fn from_interleaved(
        width: usize,
        height: usize,
        channels: usize,
        data: &[u8],
    ) -> Result<Self, ImageError> {
        match channels {
            3 => Self::from_raw(width, height, data.to_vec()),
            4 => Self::from_rgba(width, height, data),
            1 => {
                let expected = expected_len(width, height, 1)?;
                if data.len() != expected {
                    return Err(ImageError::InvalidBuffer {
                        expected,
                        got: data.len(),
                    });
                }
                Ok(Self {
                    width,
                    height,
                    data: data.iter().flat_map(|&v| [v, v, v]).collect(),
                })
            }
            n => Err(ImageError::UnsupportedChannels(n)),
        }
    }

    /// Image of the given size filled with one colour.
    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        let data = std::iter::repeat_n(rgb, width * height)
            .flatten()
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn view(&self) -> RgbImageView<'_> {
        RgbImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn put_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let i = (y * self.width + x) * 3;
        self.data[i..i + 3].copy_from_slice(&rgb);
    }
}
