use crate::detector::DetectorError;
use std::fmt;
use thiserror::Error;

/// Which of the two images in a comparison an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    Enrolled,
    Probe,
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enrolled => f.write_str("registered"),
            Self::Probe => f.write_str("probe"),
        }
    }
}

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("no face detected in {0} image")]
    NoFaceDetected(ImageRole),
    #[error("patch dimensions differ: {enrolled:?} vs {probe:?}")]
    DimensionMismatch {
        enrolled: (u32, u32),
        probe: (u32, u32),
    },
    #[error("detector: {0}")]
    Detector(#[from] DetectorError),
}
