//! The target image, reduced to one grayscale pixel per module.

use std::path::Path;

use image::DynamicImage;
use image::imageops::FilterType;

use crate::error::Result;

/// What the engine wants at one module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetSample {
    /// Grayscale 0 (black) to 255 (white).
    pub target: u8,
    /// Local variance around the pixel, or -1 when the pixel does not matter.
    pub contrast: i32,
}

impl TargetSample {
    /// Transparent or outside the image.
    pub const IGNORE: TargetSample = TargetSample {
        target: 255,
        contrast: -1,
    };
}

/// Half-width of the contrast window (11x11).
const WINDOW: i64 = 5;

/// Luma grid of the resized target. Transparent pixels hold -1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    width: usize,
    height: usize,
    luma: Vec<i32>,
}

impl Target {
    /// Load and resize an image file so its longer side is `size` pixels.
    pub fn open(path: impl AsRef<Path>, size: u32) -> Result<Self> {
        let image = image::open(path)?;
        Ok(Self::from_image(&image, size))
    }

    /// Resize `image` so its longer side is `size` pixels, keeping the aspect
    /// ratio, and convert it to luma.
    pub fn from_image(image: &DynamicImage, size: u32) -> Self {
        let resized;
        let image = if image.width().max(image.height()) == size {
            image
        } else {
            resized = image.resize(size, size, FilterType::Triangle);
            &resized
        };

        let rgba = image.to_rgba8();
        let luma = rgba
            .pixels()
            .map(|pixel| {
                let [r, g, b, a] = pixel.0;
                if a == 0 {
                    -1
                } else {
                    (299 * i32::from(r) + 587 * i32::from(g) + 114 * i32::from(b) + 500) / 1000
                }
            })
            .collect();

        Self {
            width: rgba.width() as usize,
            height: rgba.height() as usize,
            luma,
        }
    }

    /// Build from a raw luma grid, row-major. Values below 0 are transparent.
    ///
    /// Panics if `luma` does not hold `width * height` values.
    pub fn from_luma(width: usize, height: usize, luma: Vec<i32>) -> Self {
        assert_eq!(luma.len(), width * height, "luma grid has wrong length");
        Self {
            width,
            height,
            luma,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn luma_at(&self, x: i64, y: i64) -> Option<i32> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(self.luma[y as usize * self.width + x as usize])
    }

    /// Sample at image coordinates (x, y).
    ///
    /// The contrast window is clipped to the image and counts transparent
    /// neighbours at their stored value of -1.
    pub fn sample(&self, x: i64, y: i64) -> TargetSample {
        let center = match self.luma_at(x, y) {
            Some(v) if v >= 0 => v,
            _ => return TargetSample::IGNORE,
        };

        let (mut n, mut sum, mut sumsq) = (0i64, 0i64, 0i64);
        for dy in -WINDOW..=WINDOW {
            for dx in -WINDOW..=WINDOW {
                if let Some(v) = self.luma_at(x + dx, y + dy) {
                    let v = i64::from(v);
                    sum += v;
                    sumsq += v * v;
                    n += 1;
                }
            }
        }

        let avg = sum / n;
        TargetSample {
            target: center as u8,
            contrast: (sumsq / n - avg * avg) as i32,
        }
    }
}
