//! Routing configuration

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
pub use crate::routing::{RoutingStrategy, ScoringWeights, StrategyWeights};

/// Routing configuration
///
/// # Example
///
/// ```toml
/// [routing]
/// strategy = "auto"
///
/// [routing.weights.quality]
/// speed = 10
/// quality = 75
/// cost = 15
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Strategy used when a request does not name one
    pub strategy: RoutingStrategy,
    pub weights: StrategyWeights,
}

impl RoutingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, weights) in self.weights.iter() {
            weights
                .validate()
                .map_err(|message| ConfigError::validation(format!("routing.weights.{name}"), message))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_config_defaults() {
        let config = RoutingConfig::default();
        assert_eq!(config.strategy, RoutingStrategy::Auto);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_weight_override_keeps_other_vectors() {
        let toml = r#"
        strategy = "cost"
        [weights.cost]
        speed = 0
        quality = 20
        cost = 80
        "#;

        let config: RoutingConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.strategy, RoutingStrategy::Cost);
        assert_eq!(config.weights.cost, ScoringWeights::new(0, 20, 80));
        assert_eq!(config.weights.speed, StrategyWeights::default().speed);
    }

    #[test]
    fn test_weights_not_summing_to_100_rejected() {
        let toml = r#"
        [weights.speed]
        speed = 90
        quality = 20
        cost = 10
        "#;

        let config: RoutingConfig = toml::from_str(toml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "routing.weights.speed"
        ));
    }
}
