//! Scoring functions for candidate ranking

use super::RoutingStrategy;
use crate::registry::{Capabilities, MAX_TIER, MIN_TIER};
use serde::{Deserialize, Serialize};

/// Weights for scoring backend candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Weight for the speed tier (0-100)
    pub speed: u32,

    /// Weight for the quality tier (0-100)
    pub quality: u32,

    /// Weight for cheapness, the inverted cost tier (0-100)
    pub cost: u32,
}

impl ScoringWeights {
    pub const fn new(speed: u32, quality: u32, cost: u32) -> Self {
        Self {
            speed,
            quality,
            cost,
        }
    }

    /// Validate that weights sum to 100
    pub fn validate(&self) -> Result<(), String> {
        let sum = self.speed + self.quality + self.cost;
        if sum != 100 {
            Err(format!("Scoring weights must sum to 100, got {}", sum))
        } else {
            Ok(())
        }
    }
}

/// One weight vector per concrete strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyWeights {
    pub speed: ScoringWeights,
    pub quality: ScoringWeights,
    pub balanced: ScoringWeights,
    pub cost: ScoringWeights,
}

impl Default for StrategyWeights {
    fn default() -> Self {
        Self {
            speed: ScoringWeights::new(60, 25, 15),
            quality: ScoringWeights::new(10, 75, 15),
            balanced: ScoringWeights::new(34, 33, 33),
            cost: ScoringWeights::new(15, 25, 60),
        }
    }
}

impl StrategyWeights {
    /// Weights for a concrete strategy. `Auto` must be resolved first; it
    /// falls back to the balanced vector.
    pub fn for_strategy(&self, strategy: RoutingStrategy) -> ScoringWeights {
        match strategy {
            RoutingStrategy::Speed => self.speed,
            RoutingStrategy::Quality => self.quality,
            RoutingStrategy::Cost => self.cost,
            RoutingStrategy::Balanced | RoutingStrategy::Auto => self.balanced,
        }
    }

    /// Named vectors, for validation and display
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, ScoringWeights)> {
        [
            ("speed", self.speed),
            ("quality", self.quality),
            ("balanced", self.balanced),
            ("cost", self.cost),
        ]
        .into_iter()
    }
}

fn tier_points(tier: u8) -> u32 {
    u32::from(tier.clamp(MIN_TIER, MAX_TIER)) * 20
}

/// Score a backend's capabilities against the weights
///
/// Returns a score in the range 20-100, where higher is better.
pub fn score_capabilities(capabilities: &Capabilities, weights: &ScoringWeights) -> u32 {
    let speed_score = tier_points(capabilities.speed_tier);
    let quality_score = tier_points(capabilities.quality_tier);

    // Cheap backends score high: cost tier 1 = 100, cost tier 5 = 20
    let cost_score = (MAX_TIER as u32 + 1) * 20 - tier_points(capabilities.cost_tier);

    (speed_score * weights.speed + quality_score * weights.quality + cost_score * weights.cost)
        / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(speed: u8, quality: u8, cost: u8) -> Capabilities {
        Capabilities {
            speed_tier: speed,
            quality_tier: quality,
            cost_tier: cost,
            ..Default::default()
        }
    }

    #[test]
    fn default_weights_sum_to_100() {
        for (name, weights) in StrategyWeights::default().iter() {
            assert!(weights.validate().is_ok(), "{name} does not sum to 100");
        }
    }

    #[test]
    fn validate_rejects_invalid_weights() {
        let weights = ScoringWeights::new(50, 50, 50);
        assert!(weights.validate().is_err());
    }

    #[test]
    fn perfect_backend_scores_100() {
        let score = score_capabilities(&caps(5, 5, 1), &ScoringWeights::new(34, 33, 33));
        assert_eq!(score, 100);
    }

    #[test]
    fn worst_backend_scores_20() {
        let score = score_capabilities(&caps(1, 1, 5), &ScoringWeights::new(34, 33, 33));
        assert_eq!(score, 20);
    }

    #[test]
    fn quality_weights_prefer_strong_backend() {
        let weights = StrategyWeights::default().quality;
        let strong = score_capabilities(&caps(2, 5, 4), &weights);
        let fast = score_capabilities(&caps(5, 2, 2), &weights);
        assert!(strong > fast);
    }

    #[test]
    fn cost_weights_prefer_cheap_backend() {
        let weights = StrategyWeights::default().cost;
        let cheap = score_capabilities(&caps(3, 3, 1), &weights);
        let pricey = score_capabilities(&caps(3, 4, 5), &weights);
        assert!(cheap > pricey);
    }

    #[test]
    fn out_of_range_tiers_are_clamped() {
        let weights = ScoringWeights::new(100, 0, 0);
        assert_eq!(score_capabilities(&caps(9, 3, 3), &weights), 100);
        assert_eq!(score_capabilities(&caps(0, 3, 3), &weights), 20);
    }
}
