//! Single-shot accept/reject over a distance score.

use crate::scorer::ScoringStrategy;
use serde::Serialize;

/// LBPH chi-square distance below which a probe is accepted.
pub const LBPH_THRESHOLD: f64 = 70.0;

/// Mean squared pixel error at or below which a probe is accepted.
pub const PIXEL_ERROR_THRESHOLD: f64 = 4000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub matched: bool,
    pub distance: f64,
    /// Human-readable result carrying the score to two decimals.
    pub label: String,
}

/// Decide with the strategy's named threshold.
pub fn decide(distance: f64, strategy: ScoringStrategy) -> Decision {
    decide_with_threshold(distance, strategy, strategy.default_threshold())
}

pub fn decide_with_threshold(distance: f64, strategy: ScoringStrategy, threshold: f64) -> Decision {
    let matched = strategy.accepts(distance, threshold);
    let label = if matched {
        format!("Match Found (Confidence: {distance:.2})")
    } else {
        format!("No Match (Confidence: {distance:.2})")
    };
    Decision {
        matched,
        distance,
        label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lbph_labels() {
        let hit = decide(42.1712, ScoringStrategy::Lbph);
        assert!(hit.matched);
        assert_eq!(hit.label, "Match Found (Confidence: 42.17)");

        let miss = decide(812.333, ScoringStrategy::Lbph);
        assert!(!miss.matched);
        assert_eq!(miss.label, "No Match (Confidence: 812.33)");
    }

    #[test]
    fn test_zero_distance_label() {
        let d = decide(0.0, ScoringStrategy::PixelError);
        assert!(d.matched);
        assert_eq!(d.label, "Match Found (Confidence: 0.00)");
    }

    #[test]
    fn test_pixel_error_boundary() {
        assert!(decide(3999.0, ScoringStrategy::PixelError).matched);
        assert!(decide(4000.0, ScoringStrategy::PixelError).matched);
        assert!(!decide(4001.0, ScoringStrategy::PixelError).matched);
    }

    #[test]
    fn test_lbph_boundary() {
        assert!(decide(69.999, ScoringStrategy::Lbph).matched);
        assert!(!decide(LBPH_THRESHOLD, ScoringStrategy::Lbph).matched);
    }

    #[test]
    fn test_custom_threshold() {
        let d = decide_with_threshold(75.0, ScoringStrategy::Lbph, 80.0);
        assert!(d.matched);
        assert_eq!(d.distance, 75.0);
    }
}
