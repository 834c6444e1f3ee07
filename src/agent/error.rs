//! Error types for agent operations.

use thiserror::Error;

/// Errors that can occur while invoking a backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// Network connectivity error (DNS, connection refused, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded deadline.
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Backend returned an error response (4xx, 5xx).
    #[error("Backend error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Local process could not be run or exited unsuccessfully.
    #[error("Process error: {0}")]
    Process(String),

    /// Backend response doesn't match expected format.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Agent configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AgentError {
    pub(crate) fn from_reqwest(e: reqwest::Error, deadline_ms: u64) -> Self {
        if e.is_timeout() {
            AgentError::Timeout(deadline_ms)
        } else {
            AgentError::Network(e.to_string())
        }
    }
}
