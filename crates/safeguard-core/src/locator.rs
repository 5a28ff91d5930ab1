//! Face Locator: detect, select one candidate, crop, normalize.

use crate::detector::{DetectorError, FaceDetector};
use crate::raster::ColorRaster;
use crate::types::{FaceRegion, Patch, PATCH_SIZE};
use image::imageops::{self, FilterType};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How to pick one face when the detector reports several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// Take whatever the detector listed first, regardless of size or score.
    #[default]
    FirstCandidate,
    /// Take the candidate with the largest box; ties keep detector order.
    LargestArea,
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" | "first-candidate" => Ok(Self::FirstCandidate),
            "largest" | "largest-area" => Ok(Self::LargestArea),
            other => Err(format!("unknown selection policy: {other}")),
        }
    }
}

/// Pick one candidate according to `policy`.
pub fn select(candidates: &[FaceRegion], policy: SelectionPolicy) -> Option<&FaceRegion> {
    match policy {
        SelectionPolicy::FirstCandidate => candidates.first(),
        SelectionPolicy::LargestArea => candidates.iter().fold(None, |best, c| match best {
            Some(b) if b.area() >= c.area() => Some(b),
            _ => Some(c),
        }),
    }
}

/// Crop `region` out of `gray` (clamped to the image) and resize it to the
/// fixed patch size. Returns `None` when nothing of the region lies inside
/// the image.
pub fn normalize(gray: &GrayImage, region: &FaceRegion) -> Option<Patch> {
    let coords = [region.x, region.y, region.width, region.height];
    if coords.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let (width, height) = gray.dimensions();
    let x0 = region.x.max(0.0).floor() as u32;
    let y0 = region.y.max(0.0).floor() as u32;
    let x1 = ((region.x + region.width).ceil().max(0.0) as u32).min(width);
    let y1 = ((region.y + region.height).ceil().max(0.0) as u32).min(height);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    let crop = imageops::crop_imm(gray, x0, y0, x1 - x0, y1 - y0).to_image();
    let resized = imageops::resize(&crop, PATCH_SIZE, PATCH_SIZE, FilterType::Triangle);
    Some(Patch::from_gray(resized))
}

pub struct FaceLocator {
    detector: Box<dyn FaceDetector>,
    policy: SelectionPolicy,
}

impl FaceLocator {
    pub fn new(detector: impl FaceDetector + 'static) -> Self {
        Self::from_boxed(Box::new(detector))
    }

    pub fn from_boxed(detector: Box<dyn FaceDetector>) -> Self {
        Self {
            detector,
            policy: SelectionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Locate the face in a color raster. `Ok(None)` means no face was found.
    pub fn locate(&self, image: &ColorRaster) -> Result<Option<Patch>, DetectorError> {
        self.locate_gray(&image.to_luma())
    }

    pub fn locate_gray(&self, gray: &GrayImage) -> Result<Option<Patch>, DetectorError> {
        let candidates = self.detector.detect(gray)?;
        let Some(region) = select(&candidates, self.policy) else {
            tracing::debug!(
                width = gray.width(),
                height = gray.height(),
                "no face candidates"
            );
            return Ok(None);
        };

        tracing::debug!(
            candidates = candidates.len(),
            policy = ?self.policy,
            x = region.x,
            y = region.y,
            width = region.width,
            height = region.height,
            "face selected"
        );
        Ok(normalize(gray, region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::ChannelOrder;
    use image::Luma;

    fn fixed(regions: Vec<FaceRegion>) -> impl FaceDetector {
        move |_: &GrayImage| regions.clone()
    }

    #[test]
    fn test_select_first_candidate() {
        let small = FaceRegion::new(0.0, 0.0, 10.0, 10.0);
        let large = FaceRegion::new(50.0, 50.0, 40.0, 40.0);
        let candidates = [small, large];
        assert_eq!(select(&candidates, SelectionPolicy::FirstCandidate), Some(&small));
        assert_eq!(select(&candidates, SelectionPolicy::LargestArea), Some(&large));
    }

    #[test]
    fn test_select_largest_tie_keeps_first() {
        let a = FaceRegion::new(0.0, 0.0, 20.0, 20.0);
        let b = FaceRegion::new(30.0, 0.0, 20.0, 20.0);
        assert_eq!(select(&[a, b], SelectionPolicy::LargestArea), Some(&a));
    }

    #[test]
    fn test_select_empty() {
        assert_eq!(select(&[], SelectionPolicy::FirstCandidate), None);
        assert_eq!(select(&[], SelectionPolicy::LargestArea), None);
    }

    #[test]
    fn test_normalize_produces_fixed_size() {
        let gray = GrayImage::from_pixel(64, 48, Luma([90]));
        let patch = normalize(&gray, &FaceRegion::new(8.0, 4.0, 30.0, 20.0)).unwrap();
        assert_eq!(patch.dimensions(), (PATCH_SIZE, PATCH_SIZE));
        assert!(patch.samples().iter().all(|&p| p == 90));
    }

    #[test]
    fn test_normalize_clamps_to_image() {
        let gray = GrayImage::from_pixel(50, 50, Luma([10]));
        let patch = normalize(&gray, &FaceRegion::new(-20.0, 40.0, 100.0, 100.0)).unwrap();
        assert_eq!(patch.dimensions(), (PATCH_SIZE, PATCH_SIZE));
    }

    #[test]
    fn test_normalize_outside_image() {
        let gray = GrayImage::new(50, 50);
        assert!(normalize(&gray, &FaceRegion::new(60.0, 0.0, 10.0, 10.0)).is_none());
        assert!(normalize(&gray, &FaceRegion::new(10.0, 10.0, 0.0, 10.0)).is_none());
        assert!(normalize(&gray, &FaceRegion::new(f32::NAN, 0.0, 10.0, 10.0)).is_none());
    }

    #[test]
    fn test_locate_no_candidates() {
        let locator = FaceLocator::new(fixed(Vec::new()));
        let raster = ColorRaster::new(vec![0; 12 * 12 * 3], 12, 12, ChannelOrder::Rgb).unwrap();
        assert!(locator.locate(&raster).unwrap().is_none());
    }

    #[test]
    fn test_locate_policy_changes_crop() {
        // Left half dark, right half bright; the larger box covers the bright side.
        let mut gray = GrayImage::from_pixel(100, 50, Luma([20]));
        for y in 0..50 {
            for x in 50..100 {
                gray.put_pixel(x, y, Luma([220]));
            }
        }
        let regions = vec![
            FaceRegion::new(0.0, 0.0, 20.0, 20.0),
            FaceRegion::new(55.0, 0.0, 40.0, 40.0),
        ];

        let first = FaceLocator::new(fixed(regions.clone()));
        let largest = FaceLocator::new(fixed(regions)).with_policy(SelectionPolicy::LargestArea);

        let a = first.locate_gray(&gray).unwrap().unwrap();
        let b = largest.locate_gray(&gray).unwrap().unwrap();
        assert!(a.samples().iter().all(|&p| p == 20));
        assert!(b.samples().iter().all(|&p| p == 220));
    }

    #[test]
    fn test_locate_is_deterministic() {
        let gray = GrayImage::from_fn(80, 60, |x, y| Luma([((x * 7 + y * 13) % 251) as u8]));
        let locator = FaceLocator::new(fixed(vec![FaceRegion::new(10.5, 5.25, 47.0, 33.0)]));
        let a = locator.locate_gray(&gray).unwrap();
        let b = locator.locate_gray(&gray).unwrap();
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("largest".parse::<SelectionPolicy>().unwrap(), SelectionPolicy::LargestArea);
        assert_eq!(
            "first-candidate".parse::<SelectionPolicy>().unwrap(),
            SelectionPolicy::FirstCandidate
        );
        assert!("best".parse::<SelectionPolicy>().is_err());
    }
}
