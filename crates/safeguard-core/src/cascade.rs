//! SeetaFace cascade detector via the `rustface` crate.

use crate::detector::{DetectorError, FaceDetector};
use crate::types::FaceRegion;
use image::GrayImage;
use std::io::Cursor;
use std::path::Path;

const CASCADE_MIN_FACE_SIZE: u32 = 20;
const CASCADE_SCORE_THRESHOLD: f64 = 2.0;
const CASCADE_PYRAMID_SCALE: f32 = 0.8;
const CASCADE_WINDOW_STEP: u32 = 4;

/// Funnel-structured cascade face detector.
///
/// Holds the parsed model; a `rustface` detector is not `Send`, so one is
/// built from a clone of the model per call.
pub struct CascadeDetector {
    model: rustface::Model,
}

impl CascadeDetector {
    pub fn load(model_path: &Path) -> Result<Self, DetectorError> {
        if !model_path.exists() {
            return Err(DetectorError::ModelNotFound(model_path.display().to_string()));
        }
        let bytes = std::fs::read(model_path)?;
        let model = rustface::read_model(Cursor::new(&bytes))
            .map_err(|e| DetectorError::ModelLoad(format!("{}: {e}", model_path.display())))?;
        tracing::debug!(path = %model_path.display(), bytes = bytes.len(), "cascade model read");
        Ok(Self { model })
    }
}

impl FaceDetector for CascadeDetector {
    fn detect(&self, gray: &GrayImage) -> Result<Vec<FaceRegion>, DetectorError> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(CASCADE_MIN_FACE_SIZE);
        detector.set_score_thresh(CASCADE_SCORE_THRESHOLD);
        detector.set_pyramid_scale_factor(CASCADE_PYRAMID_SCALE);
        detector.set_slide_window_step(CASCADE_WINDOW_STEP, CASCADE_WINDOW_STEP);

        let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));
        tracing::debug!(count = faces.len(), width, height, "cascade detection");

        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceRegion {
                    x: bbox.x() as f32,
                    y: bbox.y() as f32,
                    width: bbox.width() as f32,
                    height: bbox.height() as f32,
                    confidence: face.score() as f32,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn model_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn test_truncated_model_is_rejected() {
        // Declares one hierarchy, then ends.
        let file = model_file(&[1, 0, 0, 0]);
        assert!(matches!(
            CascadeDetector::load(file.path()),
            Err(DetectorError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_empty_image_yields_no_faces() {
        // Zero hierarchies: a well-formed, empty cascade.
        let file = model_file(&[0, 0, 0, 0]);
        let detector = CascadeDetector::load(file.path()).unwrap();
        let found = detector.detect(&GrayImage::new(0, 0)).unwrap();
        assert!(found.is_empty());
    }
}
