//! Gatekeeper - request orchestration control plane
//!
//! Classifies natural-language requests, routes them to the best-suited
//! backend, executes them behind per-backend circuit breakers, defers long
//! work to a priority job queue and holds high-risk operations until a human
//! approves them.

pub mod agent;
pub mod api;
pub mod breaker;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod confirmation;
pub mod engine;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod queue;
pub mod registry;
pub mod routing;
