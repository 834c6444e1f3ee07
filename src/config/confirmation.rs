//! Confirmation gate configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where new confirmation requests are announced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotifierKind {
    /// Emit a structured log event
    #[default]
    Log,
    /// POST the request as JSON to a URL
    Webhook,
}

/// Notifier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub kind: NotifierKind,
    /// Target URL (webhook notifier)
    pub url: Option<String>,
    /// Upper bound for one notification attempt
    pub timeout_seconds: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: NotifierKind::Log,
            url: None,
            timeout_seconds: 5,
        }
    }
}

/// Confirmation gate configuration
///
/// # Example
///
/// ```toml
/// [confirmation]
/// default_timeout_seconds = 300
/// gated_operations = ["deploy.*", "db.drop_*"]
///
/// [confirmation.notifier]
/// kind = "webhook"
/// url = "https://hooks.example.com/approvals"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Wait applied when a request does not carry its own timeout
    pub default_timeout_seconds: u64,
    /// How often overdue requests are expired
    pub reaper_interval_seconds: u64,
    /// How long settled requests remain queryable
    pub settled_retention_seconds: u64,
    /// Glob patterns over operation ids that require approval
    pub gated_operations: Vec<String>,
    pub notifier: NotifierConfig,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            default_timeout_seconds: 300,
            reaper_interval_seconds: 5,
            settled_retention_seconds: 600,
            gated_operations: Vec::new(),
            notifier: NotifierConfig::default(),
        }
    }
}

impl ConfirmationConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_seconds)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_seconds.max(1))
    }

    pub fn settled_retention(&self) -> Duration {
        Duration::from_secs(self.settled_retention_seconds)
    }
}
