//! Face detection seam and backend selection.

use crate::cascade::CascadeDetector;
use crate::scrfd::ScrfdDetector;
use crate::types::FaceRegion;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("failed to load model: {0}")]
    ModelLoad(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Finds candidate face regions in a luminance image.
///
/// Implementations return candidates in their own native order; the
/// locator's selection policy decides which one is used.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, gray: &GrayImage) -> Result<Vec<FaceRegion>, DetectorError>;
}

impl<F> FaceDetector for F
where
    F: Fn(&GrayImage) -> Vec<FaceRegion> + Send + Sync,
{
    fn detect(&self, gray: &GrayImage) -> Result<Vec<FaceRegion>, DetectorError> {
        Ok(self(gray))
    }
}

/// Which detector implementation to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorBackend {
    /// SeetaFace funnel-structured cascade.
    #[default]
    Cascade,
    /// SCRFD anchor-free detector via ONNX Runtime.
    Scrfd,
}

impl DetectorBackend {
    /// Conventional model file name inside a model directory.
    pub fn default_model_file(self) -> &'static str {
        match self {
            Self::Cascade => "seeta_fd_frontal_v1.0.bin",
            Self::Scrfd => "det_10g.onnx",
        }
    }

    pub fn load(self, model_path: &Path) -> Result<Box<dyn FaceDetector>, DetectorError> {
        let detector: Box<dyn FaceDetector> = match self {
            Self::Cascade => Box::new(CascadeDetector::load(model_path)?),
            Self::Scrfd => Box::new(ScrfdDetector::load(model_path)?),
        };
        tracing::info!(backend = ?self, path = %model_path.display(), "face detector loaded");
        Ok(detector)
    }
}

impl FromStr for DetectorBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cascade" | "seeta" => Ok(Self::Cascade),
            "scrfd" => Ok(Self::Scrfd),
            other => Err(format!("unknown detector backend: {other}")),
        }
    }
}
