//! Logging configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Subscriber output style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("pretty") {
            Ok(LogFormat::Pretty)
        } else if s.eq_ignore_ascii_case("json") {
            Ok(LogFormat::Json)
        } else {
            Err(format!("Unknown log format '{}', expected pretty or json", s))
        }
    }
}

/// `[logging]` section.
///
/// `component_levels` keys are module names under `gatekeeper::`, e.g.
/// `engine = "debug"` turns on per-attempt failover logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_levels: Option<HashMap<String, String>>,
    /// Emit an excerpt of each request's text at debug level
    pub enable_content_logging: bool,
    /// Excerpt length in characters
    pub content_preview_chars: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            component_levels: None,
            enable_content_logging: false,
            content_preview_chars: 200,
        }
    }
}

impl LoggingConfig {
    /// Excerpt length when request text may be logged, `None` otherwise.
    pub fn content_preview(&self) -> Option<usize> {
        self.enable_content_logging
            .then_some(self.content_preview_chars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_not_logged_by_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.content_preview(), None);
    }

    #[test]
    fn format_parsing_ignores_case() {
        assert_eq!("Pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("logfmt".parse::<LogFormat>().is_err());
    }

    #[test]
    fn section_parses_preview_and_component_levels() {
        let toml = r#"
        level = "warn"
        enable_content_logging = true
        content_preview_chars = 64

        [component_levels]
        queue = "trace"
        "#;
        let config: LoggingConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.level, "warn");
        assert_eq!(config.content_preview(), Some(64));
        assert_eq!(
            config
                .component_levels
                .as_ref()
                .and_then(|levels| levels.get("queue"))
                .map(String::as_str),
            Some("trace")
        );
    }
}
