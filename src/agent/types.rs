//! Request and response types exchanged with backend agents.

use serde::{Deserialize, Serialize};

/// The unit of work handed to a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Correlates log lines across classifier, router and engine
    pub request_id: String,
    /// Natural-language request text
    pub text: String,
    /// Optional system instruction prepended by HTTP agents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl Payload {
    pub fn new(request_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            text: text.into(),
            system: None,
        }
    }
}

/// A backend's answer to a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Generated content
    pub content: String,
    /// Model reported by the backend, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl AgentResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: None,
        }
    }
}
