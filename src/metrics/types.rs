//! # Metrics Types
//!
//! Data structures for JSON stats API responses.

use serde::Serialize;

/// JSON response for GET /v1/stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Seconds since startup
    pub uptime_seconds: u64,
    pub backends: BackendCounts,
    /// Jobs waiting for a worker
    pub queue_depth: usize,
    pub pending_confirmations: usize,
}

/// Backend counts.
#[derive(Debug, Clone, Serialize)]
pub struct BackendCounts {
    pub total: usize,
    pub healthy: usize,
    /// Circuits currently open or half-open
    pub circuits_not_closed: usize,
}
