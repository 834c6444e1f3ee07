//! Configuration for per-backend circuit breakers.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Circuit breaker and per-call timeout settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures in Closed before the circuit opens
    pub failure_threshold: u32,
    /// Seconds an open circuit rejects calls before allowing a probe
    pub cooldown_seconds: u64,
    /// Upper bound for a single backend invocation
    pub call_timeout_seconds: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_seconds: 30,
            call_timeout_seconds: 60,
        }
    }
}

impl BreakerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_seconds)
    }
}
