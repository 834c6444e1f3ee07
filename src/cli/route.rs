//! Route command implementation

use crate::classifier::classify;
use crate::cli::output::{format_decision_json, format_decision_table};
use crate::cli::RouteArgs;
use crate::config::GatekeeperConfig;
use crate::registry::Registry;
use crate::routing::{Requirements, Router};
use std::sync::Arc;

/// Handle `gatekeeper route` command
///
/// Ranks the configured backends without invoking any of them. Every
/// backend is treated as healthy.
pub fn handle_route(args: &RouteArgs) -> Result<String, Box<dyn std::error::Error>> {
    let config = if args.config.exists() {
        GatekeeperConfig::load(Some(&args.config))?
    } else {
        GatekeeperConfig::default()
    }
    .with_env_overrides();
    config.validate()?;

    if config.backends.is_empty() {
        return Err(format!("No backends configured in {}", args.config.display()).into());
    }

    let registry = Arc::new(Registry::new());
    for backend in &config.backends {
        registry.add_descriptor(backend.to_descriptor())?;
    }

    let router = Router::new(registry, &config.routing);
    let classification = classify(&args.text);
    let strategy = args.strategy.unwrap_or(router.default_strategy());
    let requirements = Requirements::from_classification(&classification).with_tools(args.tools);
    let decision = router.route_with(&classification, strategy, requirements)?;

    Ok(if args.json {
        format_decision_json(&decision)
    } else {
        format_decision_table(&decision)
    })
}
