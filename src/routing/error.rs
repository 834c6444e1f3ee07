//! Error types for routing failures

use super::Requirements;
use crate::classifier::TaskTier;
use thiserror::Error;

/// Errors that can occur during candidate selection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// No healthy descriptor satisfies the request's required capabilities
    #[error("No healthy backend available for {tier} task (requires {requirements})")]
    NoCandidate {
        tier: TaskTier,
        requirements: Requirements,
    },
}
