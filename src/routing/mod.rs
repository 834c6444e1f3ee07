//! Intelligent router.
//!
//! Turns a task classification into an ordered list of candidate backends.
//! Routing is a pure read of registry state: filter by health and required
//! capabilities, score each survivor with the strategy's weight vector, then
//! sort by descending score.
//!
//! Equal scores are broken by the most recent successful execution, then the
//! lowest `cost_tier`, then the backend id, so the ordering is fully
//! deterministic for a given registry snapshot.

mod error;
mod scoring;
mod strategies;

pub use error::RoutingError;
pub use scoring::{score_capabilities, ScoringWeights, StrategyWeights};
pub use strategies::RoutingStrategy;

use crate::classifier::TaskClassification;
use crate::config::RoutingConfig;
use crate::registry::{DescriptorFilter, ModelDescriptor, Registry};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Capabilities a candidate must have
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Requirements {
    pub needs_code: bool,
    pub needs_tools: bool,
}

impl Requirements {
    /// Requirements implied by a classification alone.
    pub fn from_classification(classification: &TaskClassification) -> Self {
        Self {
            needs_code: classification.is_code,
            needs_tools: false,
        }
    }

    pub fn with_tools(mut self, needs_tools: bool) -> Self {
        self.needs_tools = needs_tools;
        self
    }

    fn filter(&self) -> DescriptorFilter {
        DescriptorFilter {
            healthy_only: true,
            needs_code: self.needs_code,
            needs_tools: self.needs_tools,
        }
    }
}

impl fmt::Display for Requirements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.needs_code, self.needs_tools) {
            (false, false) => f.write_str("no special capabilities"),
            (true, false) => f.write_str("code support"),
            (false, true) => f.write_str("tool support"),
            (true, true) => f.write_str("code and tool support"),
        }
    }
}

/// One ranked backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredCandidate {
    pub id: String,
    pub score: u32,
}

/// Result of a routing decision
#[derive(Debug, Clone, Serialize)]
pub struct RoutingDecision {
    /// Primary first, then fallbacks
    pub candidates: Vec<ScoredCandidate>,
    /// Strategy the caller asked for
    pub requested_strategy: RoutingStrategy,
    /// Concrete strategy after resolving `auto`
    pub applied_strategy: RoutingStrategy,
    pub weights: ScoringWeights,
    pub classification: TaskClassification,
    pub requirements: Requirements,
}

impl RoutingDecision {
    pub fn primary(&self) -> Option<&str> {
        self.candidates.first().map(|c| c.id.as_str())
    }

    pub fn candidate_ids(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.id.as_str())
    }
}

/// Router ranking registry descriptors for classified requests
pub struct Router {
    registry: Arc<Registry>,
    default_strategy: RoutingStrategy,
    weights: StrategyWeights,
}

impl Router {
    pub fn new(registry: Arc<Registry>, config: &RoutingConfig) -> Self {
        Self {
            registry,
            default_strategy: config.strategy,
            weights: config.weights,
        }
    }

    pub fn default_strategy(&self) -> RoutingStrategy {
        self.default_strategy
    }

    /// Rank candidates for a classification using capabilities implied by it.
    pub fn route(
        &self,
        classification: &TaskClassification,
        strategy: RoutingStrategy,
    ) -> Result<RoutingDecision, RoutingError> {
        self.route_with(
            classification,
            strategy,
            Requirements::from_classification(classification),
        )
    }

    /// Rank candidates with explicit requirements.
    pub fn route_with(
        &self,
        classification: &TaskClassification,
        strategy: RoutingStrategy,
        requirements: Requirements,
    ) -> Result<RoutingDecision, RoutingError> {
        let applied = strategy.resolve(classification.tier);
        let weights = self.weights.for_strategy(applied);

        let mut ranked: Vec<(ModelDescriptor, u32)> = self
            .registry
            .list(&requirements.filter())
            .into_iter()
            .map(|descriptor| {
                let score = score_capabilities(&descriptor.capabilities, &weights);
                (descriptor, score)
            })
            .collect();

        if ranked.is_empty() {
            tracing::debug!(
                tier = %classification.tier,
                requirements = %requirements,
                "No routing candidate"
            );
            return Err(RoutingError::NoCandidate {
                tier: classification.tier,
                requirements,
            });
        }

        ranked.sort_by(|(a, a_score), (b, b_score)| compare_candidates(a, *a_score, b, *b_score));

        let candidates: Vec<ScoredCandidate> = ranked
            .into_iter()
            .map(|(descriptor, score)| ScoredCandidate {
                id: descriptor.id,
                score,
            })
            .collect();

        tracing::debug!(
            tier = %classification.tier,
            is_code = classification.is_code,
            strategy = %applied,
            primary = %candidates[0].id,
            candidates = candidates.len(),
            "Routing decision"
        );

        Ok(RoutingDecision {
            candidates,
            requested_strategy: strategy,
            applied_strategy: applied,
            weights,
            classification: *classification,
            requirements,
        })
    }
}

/// Descending score, then most recent success, then cheapest, then id.
fn compare_candidates(
    a: &ModelDescriptor,
    a_score: u32,
    b: &ModelDescriptor,
    b_score: u32,
) -> Ordering {
    b_score
        .cmp(&a_score)
        // `None < Some`, so comparing b to a puts recent successes first
        .then_with(|| b.last_success.cmp(&a.last_success))
        .then_with(|| a.capabilities.cost_tier.cmp(&b.capabilities.cost_tier))
        .then_with(|| a.id.cmp(&b.id))
}
