//! Configuration module for Gatekeeper
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`GATEKEEPER_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use gatekeeper::config::GatekeeperConfig;
//!
//! let config = GatekeeperConfig::default();
//! assert_eq!(config.server.port, 8700);
//!
//! let toml = r#"
//! [breaker]
//! failure_threshold = 5
//! "#;
//! let config: GatekeeperConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.breaker.failure_threshold, 5);
//! assert_eq!(config.breaker.cooldown_seconds, 30);
//! ```

pub mod backend;
pub mod confirmation;
pub mod error;
pub mod logging;
pub mod queue;
pub mod routing;
pub mod server;

pub use backend::{AgentKind, BackendConfig};
pub use confirmation::{ConfirmationConfig, NotifierConfig, NotifierKind};
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use queue::QueueConfig;
pub use routing::RoutingConfig;
pub use server::ServerConfig;

// Re-export BreakerConfig from the breaker module
pub use crate::breaker::BreakerConfig;

use crate::registry::{MAX_TIER, MIN_TIER};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Prometheus exposition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve `GET /metrics`
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Unified configuration for the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GatekeeperConfig {
    /// HTTP control API
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub routing: RoutingConfig,
    /// Circuit breakers and per-call timeout
    pub breaker: BreakerConfig,
    /// Deferred jobs and worker pool
    pub queue: QueueConfig,
    /// Human-in-the-loop gate
    pub confirmation: ConfirmationConfig,
    pub metrics: MetricsConfig,
    /// Static backend definitions
    pub backends: Vec<BackendConfig>,
}

impl GatekeeperConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports GATEKEEPER_* environment variables for common settings.
    /// Invalid values are silently ignored (existing values are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("GATEKEEPER_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(host) = std::env::var("GATEKEEPER_HOST") {
            self.server.host = host;
        }

        if let Ok(level) = std::env::var("GATEKEEPER_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("GATEKEEPER_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        if let Ok(strategy) = std::env::var("GATEKEEPER_ROUTING_STRATEGY") {
            if let Ok(s) = strategy.parse() {
                self.routing.strategy = s;
            }
        }
        if let Ok(workers) = std::env::var("GATEKEEPER_QUEUE_WORKERS") {
            if let Ok(w) = workers.parse() {
                self.queue.workers = w;
            }
        }
        if let Ok(timeout) = std::env::var("GATEKEEPER_CONFIRMATION_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.confirmation.default_timeout_seconds = t;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::validation(
                "server.port",
                "port must be non-zero",
            ));
        }

        if self.breaker.failure_threshold == 0 {
            return Err(ConfigError::validation(
                "breaker.failure_threshold",
                "threshold must be at least 1",
            ));
        }
        if self.breaker.call_timeout_seconds == 0 {
            return Err(ConfigError::validation(
                "breaker.call_timeout_seconds",
                "timeout must be non-zero",
            ));
        }

        self.routing.validate()?;

        for pattern in &self.confirmation.gated_operations {
            globset::Glob::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
        }
        if self.confirmation.notifier.kind == NotifierKind::Webhook
            && self.confirmation.notifier.url.is_none()
        {
            return Err(ConfigError::validation(
                "confirmation.notifier.url",
                "webhook notifier requires a url",
            ));
        }

        let mut seen = HashSet::new();
        for (i, backend) in self.backends.iter().enumerate() {
            if backend.id.trim().is_empty() {
                return Err(ConfigError::validation(
                    format!("backends[{}].id", i),
                    "id cannot be empty",
                ));
            }
            if !seen.insert(backend.id.as_str()) {
                return Err(ConfigError::validation(
                    format!("backends[{}].id", i),
                    format!("duplicate backend id '{}'", backend.id),
                ));
            }

            let caps = &backend.capabilities;
            for (name, tier) in [
                ("speed_tier", caps.speed_tier),
                ("quality_tier", caps.quality_tier),
                ("cost_tier", caps.cost_tier),
            ] {
                if !(MIN_TIER..=MAX_TIER).contains(&tier) {
                    return Err(ConfigError::validation(
                        format!("backends[{}].{}", i, name),
                        format!("tier must be between {} and {}, got {}", MIN_TIER, MAX_TIER, tier),
                    ));
                }
            }

            match backend.kind {
                AgentKind::Http if backend.url.as_deref().unwrap_or("").is_empty() => {
                    return Err(ConfigError::validation(
                        format!("backends[{}].url", i),
                        "http backends require a url",
                    ));
                }
                AgentKind::Command if backend.command.as_deref().unwrap_or("").is_empty() => {
                    return Err(ConfigError::validation(
                        format!("backends[{}].command", i),
                        "command backends require a command",
                    ));
                }
                _ => {}
            }
        }

        Ok(())
    }
}
