//! Backend agent abstraction layer.
//!
//! This module provides the `BackendAgent` trait and the concrete agents that
//! invoke an execution backend: an OpenAI-compatible HTTP endpoint or a local
//! command-line tool.

use async_trait::async_trait;
use std::time::Duration;

pub mod command;
pub mod error;
pub mod factory;
pub mod http;
pub mod types;

pub use command::CommandAgent;
pub use error::AgentError;
pub use factory::create_agent;
pub use http::HttpAgent;
pub use types::{AgentResponse, Payload};

/// Uniform interface over every execution backend.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn BackendAgent>`.
///
/// # Cancellation Safety
///
/// Dropping the future returned by [`invoke`](BackendAgent::invoke) must abort
/// the in-flight work (HTTP request or child process).
#[async_trait]
pub trait BackendAgent: Send + Sync + 'static {
    /// Identifier of the descriptor this agent serves.
    fn id(&self) -> &str;

    /// Short label for the agent kind, used in logs.
    fn kind(&self) -> &'static str;

    /// Execute the payload, giving up after `deadline`.
    ///
    /// # Returns
    ///
    /// - `Ok(AgentResponse)` on success
    /// - `Err(AgentError::Timeout)` if the deadline elapsed
    /// - `Err(AgentError::Upstream)` if the backend reported an error
    /// - `Err(AgentError::Network)` / `Err(AgentError::Process)` on transport failure
    async fn invoke(&self, payload: &Payload, deadline: Duration)
        -> Result<AgentResponse, AgentError>;
}
