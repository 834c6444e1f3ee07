//! CLI module for Gatekeeper
//!
//! Command-line interface definitions and handlers.
//!
//! # Commands
//!
//! - `serve` - Start the orchestrator and its control API
//! - `classify` - Show how a request text is classified
//! - `route` - Show the ranked candidates for a request against a config
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Start server with default config
//! gatekeeper serve
//!
//! # Dry-run routing for a request
//! gatekeeper route "refactor the parser module" --strategy quality
//!
//! # Generate shell completions
//! gatekeeper completions bash > ~/.bash_completion.d/gatekeeper
//! ```

pub mod classify;
pub mod completions;
pub mod config;
pub mod output;
pub mod route;
pub mod serve;

pub use classify::handle_classify;
pub use completions::handle_completions;
pub use config::handle_config_init;
pub use route::handle_route;

use crate::routing::RoutingStrategy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Gatekeeper - request orchestration control plane
#[derive(Parser, Debug)]
#[command(
    name = "gatekeeper",
    version,
    about = "Classify, route and execute requests with circuit breakers, a job queue and human approval"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the orchestrator server
    Serve(ServeArgs),
    /// Classify a request text
    Classify(ClassifyArgs),
    /// Rank backends for a request text
    Route(RouteArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "gatekeeper.toml")]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long, env = "GATEKEEPER_PORT")]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long, env = "GATEKEEPER_HOST")]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "GATEKEEPER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Override the number of queue workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Disable the job queue
    #[arg(long)]
    pub no_queue: bool,
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Request text
    pub text: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Request text
    pub text: String,

    /// Routing strategy (auto, speed, quality, balanced, cost)
    #[arg(short, long)]
    pub strategy: Option<RoutingStrategy>,

    /// Only consider backends that support tools
    #[arg(long)]
    pub tools: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "gatekeeper.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "gatekeeper.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
