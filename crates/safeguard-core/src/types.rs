use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Side length of a normalized face patch, in pixels.
pub const PATCH_SIZE: u32 = 200;

/// Candidate face region reported by a detector, in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Detector-specific score. Only used for logging; selection never ranks on it.
    pub confidence: f32,
}

impl FaceRegion {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence: 1.0,
        }
    }

    /// Area of the region; negative extents count as zero.
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// Single-channel face raster produced by the locator.
///
/// Patches are immutable once built. The locator always emits
/// [`PATCH_SIZE`]×[`PATCH_SIZE`] patches; other sizes only appear when a
/// caller wraps its own raster with [`Patch::from_gray`].
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pixels: GrayImage,
}

impl Patch {
    pub fn from_gray(pixels: GrayImage) -> Self {
        Self { pixels }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.pixels
    }

    /// Row-major luminance samples.
    pub fn samples(&self) -> &[u8] {
        self.pixels.as_raw()
    }
}
