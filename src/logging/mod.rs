//! Structured logging helpers
//!
//! Filter construction for the tracing subscriber, request id generation
//! and safe truncation of request content for logs.

pub mod fields;

pub use fields::truncate_text;

use uuid::Uuid;

/// Correlation id carried by a request through routing and every backend attempt.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Build filter directives string from LoggingConfig
///
/// Constructs a tracing filter string that includes the base log level
/// and any component-specific log levels configured in the LoggingConfig.
/// Components are sorted so the output is stable.
///
/// # Examples
///
/// ```
/// use gatekeeper::config::{LogFormat, LoggingConfig};
/// use gatekeeper::logging::build_filter_directives;
/// use std::collections::HashMap;
///
/// let mut component_levels = HashMap::new();
/// component_levels.insert("breaker".to_string(), "debug".to_string());
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Pretty,
///     component_levels: Some(component_levels),
///     ..LoggingConfig::default()
/// };
///
/// assert_eq!(build_filter_directives(&config), "info,gatekeeper::breaker=debug");
/// ```
pub fn build_filter_directives(config: &crate::config::LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        let mut components: Vec<_> = component_levels.iter().collect();
        components.sort();
        for (component, level) in components {
            filter_str.push_str(&format!(",gatekeeper::{}={}", component, level));
        }
    }

    filter_str
}
