//! Similarity scoring strategies. Every score is a non-negative distance;
//! lower means more similar.

use crate::decision::{LBPH_THRESHOLD, PIXEL_ERROR_THRESHOLD};
use crate::error::MatchError;
use crate::lbph::LbphModel;
use crate::types::Patch;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringStrategy {
    /// LBPH nearest-neighbour classifier trained on the enrolled patch.
    #[default]
    Lbph,
    /// Mean squared per-pixel difference.
    PixelError,
}

impl ScoringStrategy {
    pub fn score(self, enrolled: &Patch, probe: &Patch) -> Result<f64, MatchError> {
        match self {
            Self::Lbph => Ok(LbphModel::train(enrolled).predict(probe)),
            Self::PixelError => mean_squared_error(enrolled, probe),
        }
    }

    /// The named acceptance threshold for this strategy.
    pub fn default_threshold(self) -> f64 {
        match self {
            Self::Lbph => LBPH_THRESHOLD,
            Self::PixelError => PIXEL_ERROR_THRESHOLD,
        }
    }

    /// Whether `distance` is accepted under `threshold`.
    ///
    /// LBPH accepts strictly below the threshold; pixel error accepts up to
    /// and including it.
    pub fn accepts(self, distance: f64, threshold: f64) -> bool {
        match self {
            Self::Lbph => distance < threshold,
            Self::PixelError => distance <= threshold,
        }
    }
}

impl FromStr for ScoringStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lbph" => Ok(Self::Lbph),
            "pixel-error" | "pixel_error" | "mse" => Ok(Self::PixelError),
            other => Err(format!("unknown scoring strategy: {other}")),
        }
    }
}

/// Mean of squared per-pixel differences between two equally sized patches.
pub fn mean_squared_error(enrolled: &Patch, probe: &Patch) -> Result<f64, MatchError> {
    if enrolled.dimensions() != probe.dimensions() {
        return Err(MatchError::DimensionMismatch {
            enrolled: enrolled.dimensions(),
            probe: probe.dimensions(),
        });
    }
    let samples = enrolled.samples();
    if samples.is_empty() {
        return Ok(0.0);
    }
    let total: u64 = samples
        .iter()
        .zip(probe.samples())
        .map(|(&a, &b)| {
            let d = a.abs_diff(b) as u64;
            d * d
        })
        .sum();
    Ok(total as f64 / samples.len() as f64)
}
