//! Enrolled-vs-probe comparison: locate → locate → score → decide.

use crate::decision::{decide_with_threshold, Decision};
use crate::error::{ImageRole, MatchError};
use crate::locator::FaceLocator;
use crate::raster::ColorRaster;
use crate::scorer::ScoringStrategy;
use serde::Serialize;

/// Terminal outcome of one verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Matched,
    NotMatched,
    NoFaceDetected,
    DimensionMismatch,
    DetectorFailure,
}

/// Decision-shaped result of a verification, produced for every input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub outcome: Outcome,
    pub distance: Option<f64>,
    pub label: String,
}

impl Verdict {
    pub fn is_match(&self) -> bool {
        self.outcome == Outcome::Matched
    }

    fn from_decision(decision: Decision) -> Self {
        Self {
            outcome: if decision.matched {
                Outcome::Matched
            } else {
                Outcome::NotMatched
            },
            distance: Some(decision.distance),
            label: decision.label,
        }
    }

    fn from_error(err: &MatchError) -> Self {
        let (outcome, label) = match err {
            MatchError::NoFaceDetected(ImageRole::Enrolled) => {
                (Outcome::NoFaceDetected, "No face in registered image".to_string())
            }
            MatchError::NoFaceDetected(ImageRole::Probe) => {
                (Outcome::NoFaceDetected, "No face detected".to_string())
            }
            MatchError::DimensionMismatch { .. } => (Outcome::DimensionMismatch, err.to_string()),
            MatchError::Detector(_) => (Outcome::DetectorFailure, err.to_string()),
        };
        Self {
            outcome,
            distance: None,
            label,
        }
    }
}

/// Stateless comparison engine; safe to share across threads.
pub struct FaceMatcher {
    locator: FaceLocator,
    strategy: ScoringStrategy,
    threshold: f64,
}

impl FaceMatcher {
    pub fn new(locator: FaceLocator, strategy: ScoringStrategy) -> Self {
        Self {
            locator,
            strategy,
            threshold: strategy.default_threshold(),
        }
    }

    /// Override the strategy's named threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn compare(&self, enrolled: &ColorRaster, probe: &ColorRaster) -> Result<Decision, MatchError> {
        let enrolled_patch = self
            .locator
            .locate(enrolled)?
            .ok_or(MatchError::NoFaceDetected(ImageRole::Enrolled))?;
        let probe_patch = self
            .locator
            .locate(probe)?
            .ok_or(MatchError::NoFaceDetected(ImageRole::Probe))?;

        let distance = self.strategy.score(&enrolled_patch, &probe_patch)?;
        let decision = decide_with_threshold(distance, self.strategy, self.threshold);
        tracing::info!(
            strategy = ?self.strategy,
            distance,
            threshold = self.threshold,
            matched = decision.matched,
            "face comparison"
        );
        Ok(decision)
    }

    /// Like [`compare`](Self::compare), but folds every failure into the verdict.
    pub fn verify(&self, enrolled: &ColorRaster, probe: &ColorRaster) -> Verdict {
        match self.compare(enrolled, probe) {
            Ok(decision) => Verdict::from_decision(decision),
            Err(err) => {
                tracing::warn!(error = %err, "verification did not reach a decision");
                Verdict::from_error(&err)
            }
        }
    }
}
