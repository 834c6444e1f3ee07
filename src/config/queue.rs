//! Job queue configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the deferred job queue and its worker pool.
///
/// # Example
///
/// ```toml
/// [queue]
/// enabled = true
/// max_size = 1000
/// workers = 4
/// retention_seconds = 3600
/// default_max_retries = 2
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Whether deferred submission is accepted.
    ///
    /// Default: true
    /// When false, queued submissions are rejected.
    pub enabled: bool,

    /// Maximum number of pending jobs.
    ///
    /// Default: 1000
    /// When max_size is 0, the pending depth is unbounded.
    pub max_size: u32,

    /// Number of workers draining the queue.
    ///
    /// Default: 4
    pub workers: usize,

    /// How long terminal jobs stay queryable.
    ///
    /// Default: 3600 seconds
    pub retention_seconds: u64,

    /// Retries granted to a job that does not set its own limit.
    ///
    /// Default: 2
    pub default_max_retries: u32,

    /// Deadline for one pipeline run of a job.
    ///
    /// Default: 600 seconds
    pub job_timeout_seconds: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 1000,
            workers: 4,
            retention_seconds: 3600,
            default_max_retries: 2,
            job_timeout_seconds: 600,
        }
    }
}

impl QueueConfig {
    /// Check if queuing is effectively enabled.
    ///
    /// Queuing is disabled if either enabled=false or workers=0.
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.workers > 0
    }

    /// Pending-depth bound, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        (self.max_size > 0).then_some(self.max_size as usize)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_seconds)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_bounded_queue() {
        let config = QueueConfig::default();
        assert!(config.is_enabled());
        assert_eq!(config.capacity(), Some(1000));
    }

    #[test]
    fn zero_max_size_means_unbounded() {
        let config = QueueConfig {
            max_size: 0,
            ..Default::default()
        };
        assert_eq!(config.capacity(), None);
        assert!(config.is_enabled());
    }

    #[test]
    fn zero_workers_disables_queue() {
        let config = QueueConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(!config.is_enabled());
    }
}
