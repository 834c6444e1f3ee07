//! Backend descriptor configuration

use crate::registry::{Capabilities, ModelDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a backend is invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// OpenAI-compatible chat completions endpoint
    Http,
    /// Local executable reading the prompt on stdin
    Command,
}

/// Backend configuration
///
/// # Example
///
/// ```toml
/// [[backends]]
/// id = "local-coder"
/// kind = "http"
/// url = "http://localhost:11434"
/// model = "qwen2.5-coder:14b"
/// speed_tier = 3
/// quality_tier = 4
/// cost_tier = 1
/// supports_code = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub kind: AgentKind,
    /// Base URL (http agents)
    #[serde(default)]
    pub url: Option<String>,
    /// Remote model name (http agents, defaults to the id)
    #[serde(default)]
    pub model: Option<String>,
    /// Environment variable holding a bearer token (http agents)
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Executable to run (command agents)
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(flatten)]
    pub capabilities: Capabilities,
}

impl BackendConfig {
    /// Build the registry descriptor for this backend.
    pub fn to_descriptor(&self) -> ModelDescriptor {
        let name = self.name.clone().unwrap_or_else(|| self.id.clone());
        let mut descriptor = ModelDescriptor::new(self.id.clone(), name, self.capabilities);
        descriptor
            .metadata
            .insert("kind".to_string(), format!("{:?}", self.kind).to_lowercase());
        if let Some(model) = &self.model {
            descriptor.metadata.insert("model".to_string(), model.clone());
        }
        descriptor
    }
}
