//! Model Registry module.
//!
//! Provides thread-safe in-memory storage and querying of backend descriptors
//! and the agents that invoke them.

mod descriptor;
mod error;
#[cfg(test)]
mod tests;

pub use descriptor::*;
pub use error::*;

use crate::agent::BackendAgent;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

/// Write-side view of backend health used by the execution engine.
///
/// The engine only ever reports outcomes through this trait, so the registry
/// never needs to know about circuit breaker internals.
pub trait HealthSink: Send + Sync {
    /// Mark a backend as routable. Returns `true` if the flag changed.
    fn mark_healthy(&self, id: &str) -> Result<bool, RegistryError>;

    /// Mark a backend as not routable. Returns `true` if the flag changed.
    fn mark_unhealthy(&self, id: &str, reason: Option<String>) -> Result<bool, RegistryError>;

    /// Record a successful execution (used for routing tie-breaks).
    fn record_success(&self, id: &str) -> Result<(), RegistryError>;
}

/// The Model Registry stores all known backend descriptors.
///
/// Every descriptor lives behind its own map shard entry, so health updates
/// for one backend never contend with reads or writes of another.
///
/// # Examples
///
/// ```
/// use gatekeeper::registry::{Capabilities, DescriptorFilter, ModelDescriptor, Registry};
///
/// let registry = Registry::new();
/// registry
///     .add_descriptor(ModelDescriptor::new("local", "Local", Capabilities::default()))
///     .unwrap();
///
/// assert_eq!(registry.descriptor_count(), 1);
/// assert_eq!(registry.list(&DescriptorFilter::healthy()).len(), 1);
/// ```
pub struct Registry {
    descriptors: DashMap<String, ModelDescriptor>,
    agents: DashMap<String, Arc<dyn BackendAgent>>,
}

impl Registry {
    /// Create a new empty Registry.
    pub fn new() -> Self {
        Self {
            descriptors: DashMap::new(),
            agents: DashMap::new(),
        }
    }

    /// Add a new descriptor to the registry.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateDescriptor` if the id is already taken.
    pub fn add_descriptor(&self, descriptor: ModelDescriptor) -> Result<(), RegistryError> {
        match self.descriptors.entry(descriptor.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                Err(RegistryError::DuplicateDescriptor(entry.key().clone()))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(descriptor);
                Ok(())
            }
        }
    }

    /// Add a descriptor together with the agent used to invoke it.
    pub fn add_descriptor_with_agent(
        &self,
        descriptor: ModelDescriptor,
        agent: Arc<dyn BackendAgent>,
    ) -> Result<(), RegistryError> {
        let id = descriptor.id.clone();
        self.add_descriptor(descriptor)?;
        self.agents.insert(id, agent);
        Ok(())
    }

    /// Get the agent registered for a descriptor.
    pub fn get_agent(&self, id: &str) -> Option<Arc<dyn BackendAgent>> {
        self.agents.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Get a copy of a descriptor by id.
    pub fn get(&self, id: &str) -> Option<ModelDescriptor> {
        self.descriptors.get(id).map(|entry| entry.value().clone())
    }

    /// List descriptors matching the filter, ordered by id.
    pub fn list(&self, filter: &DescriptorFilter) -> Vec<ModelDescriptor> {
        let mut descriptors: Vec<ModelDescriptor> = self
            .descriptors
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        descriptors.sort_by(|a, b| a.id.cmp(&b.id));
        descriptors
    }

    /// Get the number of registered descriptors.
    pub fn descriptor_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Get the number of descriptors currently marked healthy.
    pub fn healthy_count(&self) -> usize {
        self.descriptors
            .iter()
            .filter(|entry| entry.value().healthy)
            .count()
    }

    fn set_health(
        &self,
        id: &str,
        healthy: bool,
        reason: Option<String>,
    ) -> Result<bool, RegistryError> {
        {
            let mut descriptor = self
                .descriptors
                .get_mut(id)
                .ok_or_else(|| RegistryError::DescriptorNotFound(id.to_string()))?;

            if descriptor.healthy == healthy {
                return Ok(false);
            }

            descriptor.healthy = healthy;
            descriptor.last_health_change = Utc::now();
            descriptor.last_error = if healthy { None } else { reason };
        }

        // Shard guard must be released before iterating the map again.
        tracing::info!(backend_id = %id, healthy, "Descriptor health changed");
        metrics::gauge!("gatekeeper_backends_healthy").set(self.healthy_count() as f64);
        Ok(true)
    }
}

impl HealthSink for Registry {
    fn mark_healthy(&self, id: &str) -> Result<bool, RegistryError> {
        self.set_health(id, true, None)
    }

    fn mark_unhealthy(&self, id: &str, reason: Option<String>) -> Result<bool, RegistryError> {
        self.set_health(id, false, reason)
    }

    fn record_success(&self, id: &str) -> Result<(), RegistryError> {
        let mut descriptor = self
            .descriptors
            .get_mut(id)
            .ok_or_else(|| RegistryError::DescriptorNotFound(id.to_string()))?;
        descriptor.last_success = Some(Utc::now());
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
