//! Color raster ingestion and luminance conversion.

use image::{DynamicImage, GrayImage};
use std::str::FromStr;

/// Byte order of the three color channels in a packed raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

impl FromStr for ChannelOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rgb" => Ok(Self::Rgb),
            "bgr" => Ok(Self::Bgr),
            other => Err(format!("unknown channel order: {other}")),
        }
    }
}

/// A packed 3-channel, 8-bit color raster as delivered by a camera or decoder.
#[derive(Debug, Clone)]
pub struct ColorRaster {
    data: Vec<u8>,
    width: u32,
    height: u32,
    order: ChannelOrder,
}

impl ColorRaster {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        order: ChannelOrder,
    ) -> Result<Self, RasterError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(RasterError::InvalidLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            order,
        })
    }

    /// Wrap a decoded image of any pixel format as an RGB raster.
    pub fn from_image(image: &DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        Self {
            data: rgb.into_raw(),
            width,
            height,
            order: ChannelOrder::Rgb,
        }
    }

    /// Decode an image file into an RGB raster.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, image::ImageError> {
        Ok(Self::from_image(&image::open(path)?))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    /// Convert to single-channel luminance with BT.601 weights.
    ///
    /// Uses 14-bit fixed-point arithmetic so the result is bit-exact across
    /// platforms: `Y = (4899 R + 9617 G + 1868 B + 8192) >> 14`.
    pub fn to_luma(&self) -> GrayImage {
        let luma: Vec<u8> = self
            .data
            .chunks_exact(3)
            .map(|px| {
                let (r, g, b) = match self.order {
                    ChannelOrder::Rgb => (px[0], px[1], px[2]),
                    ChannelOrder::Bgr => (px[2], px[1], px[0]),
                };
                luminance(r, g, b)
            })
            .collect();
        // Length is checked at construction, so the buffer always fits.
        GrayImage::from_raw(self.width, self.height, luma)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }
}

fn luminance(r: u8, g: u8, b: u8) -> u8 {
    const R_WEIGHT: u32 = 4899;
    const G_WEIGHT: u32 = 9617;
    const B_WEIGHT: u32 = 1868;
    const SHIFT: u32 = 14;
    let y = (R_WEIGHT * r as u32 + G_WEIGHT * g as u32 + B_WEIGHT * b as u32 + (1 << (SHIFT - 1)))
        >> SHIFT;
    y.min(255) as u8
}

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("invalid raster length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
