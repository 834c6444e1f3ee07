//! Orchestrator error types

use crate::agent::AgentError;
use crate::config::ConfigError;
use crate::confirmation::ConfirmationError;
use crate::engine::EngineError;
use crate::queue::QueueError;
use crate::registry::RegistryError;
use crate::routing::RoutingError;
use thiserror::Error;

/// Errors surfaced by the orchestrator facade
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Building an agent from configuration failed
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl OrchestratorError {
    /// Whether running the same request again could succeed.
    ///
    /// Backend exhaustion and deadlines are transient. Routing failures,
    /// refused confirmations and setup errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            OrchestratorError::Engine(_) => true,
            OrchestratorError::Queue(QueueError::Full { .. }) => true,
            OrchestratorError::Routing(_)
            | OrchestratorError::Confirmation(_)
            | OrchestratorError::Queue(_)
            | OrchestratorError::Registry(_)
            | OrchestratorError::Agent(_)
            | OrchestratorError::Config(_) => false,
        }
    }
}
