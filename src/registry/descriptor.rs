use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lowest value a capability tier may take.
pub const MIN_TIER: u8 = 1;
/// Highest value a capability tier may take.
pub const MAX_TIER: u8 = 5;

/// Capability tags declared for a backend.
///
/// Tiers run from 1 to 5. For `speed_tier` and `quality_tier` higher is
/// better; for `cost_tier` higher means more expensive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub speed_tier: u8,
    pub quality_tier: u8,
    pub cost_tier: u8,
    pub supports_code: bool,
    pub supports_tools: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            speed_tier: 3,
            quality_tier: 3,
            cost_tier: 3,
            supports_code: false,
            supports_tools: false,
        }
    }
}

/// A backend execution engine known to the registry.
///
/// Descriptors are created at config load and never removed at runtime.
/// The health flag is flipped by the execution engine's circuit breakers.
///
/// # Examples
///
/// ```
/// use gatekeeper::registry::{Capabilities, ModelDescriptor};
///
/// let descriptor = ModelDescriptor::new("fast-local", "Fast local model", Capabilities::default());
/// assert!(descriptor.healthy);
/// assert!(descriptor.last_success.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Unique identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Declared capability tags
    pub capabilities: Capabilities,
    /// Whether the backend may be selected by the router
    pub healthy: bool,
    /// When the health flag last changed
    pub last_health_change: DateTime<Utc>,
    /// Last time an execution on this backend succeeded
    pub last_success: Option<DateTime<Utc>>,
    /// Reason for the last transition to unhealthy (if any)
    pub last_error: Option<String>,
    /// Additional metadata key-value pairs
    pub metadata: HashMap<String, String>,
}

impl ModelDescriptor {
    /// Create a healthy descriptor with no execution history.
    pub fn new(id: impl Into<String>, name: impl Into<String>, capabilities: Capabilities) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capabilities,
            healthy: true,
            last_health_change: Utc::now(),
            last_success: None,
            last_error: None,
            metadata: HashMap::new(),
        }
    }
}

/// Selection criteria for [`Registry::list`](super::Registry::list).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DescriptorFilter {
    /// Only return descriptors whose health flag is set
    pub healthy_only: bool,
    /// Only return descriptors tagged `supports_code`
    pub needs_code: bool,
    /// Only return descriptors tagged `supports_tools`
    pub needs_tools: bool,
}

impl DescriptorFilter {
    /// Filter matching every descriptor.
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter matching healthy descriptors only.
    pub fn healthy() -> Self {
        Self {
            healthy_only: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, descriptor: &ModelDescriptor) -> bool {
        if self.healthy_only && !descriptor.healthy {
            return false;
        }
        if self.needs_code && !descriptor.capabilities.supports_code {
            return false;
        }
        if self.needs_tools && !descriptor.capabilities.supports_tools {
            return false;
        }
        true
    }
}
