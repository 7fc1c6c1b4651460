//! Salience scoring input.
//!
//! Scores arrive from an upstream attention component and are treated as
//! opaque input here; the coordinator only compares the weighted total
//! against admission thresholds.

use serde::{Deserialize, Serialize};

/// Weight of the novelty component in the total.
const NOVELTY_WEIGHT: f64 = 0.4;

/// Weight of the relevance component in the total.
const RELEVANCE_WEIGHT: f64 = 0.3;

/// Weight of the urgency component in the total.
const URGENCY_WEIGHT: f64 = 0.3;

/// Externally supplied salience of a content payload.
///
/// Components are clamped to [0, 1] at construction; the total is the
/// novelty-leaning weighted combination `0.4·novelty + 0.3·relevance +
/// 0.3·urgency`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalienceScore {
    pub novelty: f64,
    pub relevance: f64,
    pub urgency: f64,
}

impl SalienceScore {
    /// Build a score, clamping each component to [0, 1].
    pub fn new(novelty: f64, relevance: f64, urgency: f64) -> Self {
        Self {
            novelty: novelty.clamp(0.0, 1.0),
            relevance: relevance.clamp(0.0, 1.0),
            urgency: urgency.clamp(0.0, 1.0),
        }
    }

    /// Weighted total in [0, 1].
    pub fn total(&self) -> f64 {
        NOVELTY_WEIGHT * self.novelty
            + RELEVANCE_WEIGHT * self.relevance
            + URGENCY_WEIGHT * self.urgency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_are_clamped() {
        let score = SalienceScore::new(1.5, -0.2, 0.5);
        assert_eq!(score.novelty, 1.0);
        assert_eq!(score.relevance, 0.0);
        assert_eq!(score.urgency, 0.5);
    }

    #[test]
    fn total_is_weighted_and_bounded() {
        let high = SalienceScore::new(0.85, 0.9, 0.75);
        let expected = 0.4 * 0.85 + 0.3 * 0.9 + 0.3 * 0.75;
        assert!((high.total() - expected).abs() < 1e-9);
        assert!(high.total() > 0.65, "typical salient input clears 0.65");

        let max = SalienceScore::new(1.0, 1.0, 1.0);
        assert!((max.total() - 1.0).abs() < 1e-9);

        let low = SalienceScore::new(0.2, 0.2, 0.2);
        assert!((low.total() - 0.2).abs() < 1e-9);
    }
}
