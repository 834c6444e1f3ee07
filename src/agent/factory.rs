//! Agent factory for creating BackendAgent trait objects from configuration.

use super::{AgentError, BackendAgent, CommandAgent, HttpAgent};
use crate::config::{AgentKind, BackendConfig};
use reqwest::Client;
use std::sync::Arc;

/// Create an agent from backend configuration.
///
/// # Examples
///
/// ```
/// use gatekeeper::agent::create_agent;
/// use gatekeeper::config::BackendConfig;
/// use reqwest::Client;
/// use std::sync::Arc;
///
/// let config: BackendConfig = toml::from_str(r#"
///     id = "local"
///     kind = "http"
///     url = "http://localhost:11434"
/// "#).unwrap();
///
/// let agent = create_agent(&config, Arc::new(Client::new())).unwrap();
/// assert_eq!(agent.id(), "local");
/// assert_eq!(agent.kind(), "http");
/// ```
pub fn create_agent(
    config: &BackendConfig,
    client: Arc<Client>,
) -> Result<Arc<dyn BackendAgent>, AgentError> {
    match config.kind {
        AgentKind::Http => {
            let url = config.url.clone().ok_or_else(|| {
                AgentError::Configuration(format!("backend '{}' requires 'url'", config.id))
            })?;

            let api_key = match &config.api_key_env {
                Some(env_var) => Some(std::env::var(env_var).map_err(|e| {
                    AgentError::Configuration(format!(
                        "Failed to read API key from env var '{}': {}",
                        env_var, e
                    ))
                })?),
                None => None,
            };

            let model = config.model.clone().unwrap_or_else(|| config.id.clone());
            Ok(Arc::new(HttpAgent::new(
                config.id.clone(),
                url,
                model,
                api_key,
                client,
            )))
        }
        AgentKind::Command => {
            let program = config.command.clone().ok_or_else(|| {
                AgentError::Configuration(format!("backend '{}' requires 'command'", config.id))
            })?;
            Ok(Arc::new(CommandAgent::new(
                config.id.clone(),
                program,
                config.args.clone(),
                config.env.clone(),
            )))
        }
    }
}
