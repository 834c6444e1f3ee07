//! `gatekeeper serve`: run the control API with workers and reaper.

use crate::api::{create_router, AppState};
use crate::cli::ServeArgs;
use crate::config::{GatekeeperConfig, LogFormat, LoggingConfig};
use crate::metrics::{prometheus_handle, MetricsCollector};
use crate::orchestrator::Orchestrator;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type ServeResult<T> = Result<T, Box<dyn std::error::Error>>;

/// File (or defaults when absent), then `GATEKEEPER_*` variables, then flags.
pub fn load_config_with_overrides(args: &ServeArgs) -> ServeResult<GatekeeperConfig> {
    let config = if args.config.exists() {
        GatekeeperConfig::load(Some(&args.config))?
    } else {
        tracing::debug!(path = %args.config.display(), "No config file, using defaults");
        GatekeeperConfig::default()
    };
    Ok(apply_flags(config.with_env_overrides(), args))
}

fn apply_flags(mut config: GatekeeperConfig, args: &ServeArgs) -> GatekeeperConfig {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = &args.host {
        config.server.host.clone_from(host);
    }
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    if let Some(workers) = args.workers {
        config.queue.workers = workers;
    }
    config.queue.enabled &= !args.no_queue;
    config
}

/// Install the global subscriber. `RUST_LOG` wins over the configured filter.
pub fn init_tracing(config: &LoggingConfig) -> ServeResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(crate::logging::build_filter_directives(config)));

    let (pretty, json) = match config.format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer().pretty()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .try_init()?;

    if let Some(chars) = config.content_preview() {
        tracing::warn!(chars, "Request content logging enabled; logs may hold sensitive text");
    }
    Ok(())
}

fn api_router(orchestrator: Arc<Orchestrator>, config: &GatekeeperConfig) -> axum::Router {
    let exporter = config.metrics.enabled.then(prometheus_handle);
    let metrics = MetricsCollector::new(Arc::clone(&orchestrator), Instant::now(), exporter);
    let state = AppState::new(orchestrator)
        .with_metrics(Arc::new(metrics))
        .with_body_limit(config.server.body_limit_bytes);
    create_router(Arc::new(state))
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::error!(error = %e, "SIGTERM handler unavailable");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

/// Resolve on SIGINT, SIGTERM or `stop`, and cancel `stop` either way.
async fn shutdown_signal(stop: CancellationToken) {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "SIGINT handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    let signal = tokio::select! {
        _ = interrupt => Some("SIGINT"),
        _ = terminate() => Some("SIGTERM"),
        _ = stop.cancelled() => None,
    };
    if let Some(signal) = signal {
        tracing::info!(signal, "Shutdown requested");
    }
    stop.cancel();
}

pub async fn run_serve(args: ServeArgs) -> ServeResult<()> {
    let config = load_config_with_overrides(&args)?;
    config.validate()?;
    init_tracing(&config.logging)?;
    tracing::debug!(?config, "Configuration resolved");

    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);
    let background = orchestrator.start();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %addr,
        backends = config.backends.len(),
        workers = background.worker_count(),
        "Gatekeeper listening"
    );

    axum::serve(listener, api_router(Arc::clone(&orchestrator), &config))
        .with_graceful_shutdown(shutdown_signal(CancellationToken::new()))
        .await?;

    orchestrator.shutdown();
    background.join().await;
    tracing::info!("Gatekeeper stopped");
    Ok(())
}
