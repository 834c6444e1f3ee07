//! Routing strategies for backend selection

use crate::classifier::TaskTier;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Routing strategy selects which weight vector ranks the candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    /// Pick a concrete strategy from the task tier
    #[default]
    Auto,

    /// Favor fast backends
    Speed,

    /// Favor the strongest backends
    Quality,

    /// Roughly even weighting
    Balanced,

    /// Favor cheap backends
    Cost,
}

impl RoutingStrategy {
    /// Resolve `Auto` to a concrete strategy for the given tier.
    ///
    /// Concrete strategies resolve to themselves.
    pub fn resolve(self, tier: TaskTier) -> RoutingStrategy {
        match self {
            RoutingStrategy::Auto => match tier {
                TaskTier::Trivial | TaskTier::Simple => RoutingStrategy::Speed,
                TaskTier::Moderate => RoutingStrategy::Balanced,
                TaskTier::Complex | TaskTier::Expert => RoutingStrategy::Quality,
            },
            concrete => concrete,
        }
    }
}

impl FromStr for RoutingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(RoutingStrategy::Auto),
            "speed" => Ok(RoutingStrategy::Speed),
            "quality" => Ok(RoutingStrategy::Quality),
            "balanced" => Ok(RoutingStrategy::Balanced),
            "cost" => Ok(RoutingStrategy::Cost),
            _ => Err(format!("Unknown routing strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutingStrategy::Auto => write!(f, "auto"),
            RoutingStrategy::Speed => write!(f, "speed"),
            RoutingStrategy::Quality => write!(f, "quality"),
            RoutingStrategy::Balanced => write!(f, "balanced"),
            RoutingStrategy::Cost => write!(f, "cost"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_is_case_insensitive() {
        assert_eq!(
            "QUALITY".parse::<RoutingStrategy>().unwrap(),
            RoutingStrategy::Quality
        );
        assert_eq!("auto".parse::<RoutingStrategy>().unwrap(), RoutingStrategy::Auto);
        assert!("fastest".parse::<RoutingStrategy>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for strategy in [
            RoutingStrategy::Auto,
            RoutingStrategy::Speed,
            RoutingStrategy::Quality,
            RoutingStrategy::Balanced,
            RoutingStrategy::Cost,
        ] {
            assert_eq!(strategy.to_string().parse::<RoutingStrategy>(), Ok(strategy));
        }
    }

    #[test]
    fn auto_resolves_by_tier() {
        let auto = RoutingStrategy::Auto;
        assert_eq!(auto.resolve(TaskTier::Trivial), RoutingStrategy::Speed);
        assert_eq!(auto.resolve(TaskTier::Simple), RoutingStrategy::Speed);
        assert_eq!(auto.resolve(TaskTier::Moderate), RoutingStrategy::Balanced);
        assert_eq!(auto.resolve(TaskTier::Complex), RoutingStrategy::Quality);
        assert_eq!(auto.resolve(TaskTier::Expert), RoutingStrategy::Quality);
    }

    #[test]
    fn concrete_strategy_ignores_tier() {
        assert_eq!(
            RoutingStrategy::Cost.resolve(TaskTier::Expert),
            RoutingStrategy::Cost
        );
    }
}
