//! Configuration file loading and validation.

use gatekeeper::config::{AgentKind, ConfigError, GatekeeperConfig, LogFormat, NotifierKind};
use gatekeeper::routing::RoutingStrategy;
use std::io::Write;
use std::path::Path;

fn example_path() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/gatekeeper.example.toml"))
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn example_config_loads_and_validates() {
    let config = GatekeeperConfig::load(Some(example_path())).unwrap();
    config.validate().unwrap();

    assert_eq!(config.server.port, 8700);
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert_eq!(config.routing.strategy, RoutingStrategy::Auto);
    assert_eq!(config.breaker.failure_threshold, 3);
    assert_eq!(config.queue.workers, 4);
    assert_eq!(config.confirmation.notifier.kind, NotifierKind::Log);
    assert_eq!(
        config.confirmation.gated_operations,
        vec!["deploy.*", "db.drop_*", "shell.exec"]
    );

    assert_eq!(config.backends.len(), 4);
    let cli_agent = config.backends.iter().find(|b| b.id == "cli-agent").unwrap();
    assert_eq!(cli_agent.kind, AgentKind::Command);
    assert!(cli_agent.capabilities.supports_tools);
}

#[test]
fn missing_file_is_not_found() {
    let result = GatekeeperConfig::load(Some(Path::new("/nonexistent/gatekeeper.toml")));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
fn partial_file_falls_back_to_defaults() {
    let file = write_config(
        r#"
        [breaker]
        failure_threshold = 5
        "#,
    );
    let config = GatekeeperConfig::load(Some(file.path())).unwrap();

    assert_eq!(config.breaker.failure_threshold, 5);
    assert_eq!(config.breaker.cooldown_seconds, 30);
    assert_eq!(config.server.port, 8700);
    assert!(config.backends.is_empty());
}

#[test]
fn invalid_toml_is_parse_error() {
    let file = write_config("[server\nport = ");
    assert!(matches!(
        GatekeeperConfig::load(Some(file.path())),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn validation_rejects_bad_settings() {
    let file = write_config(
        r#"
        [[backends]]
        id = "dup"
        kind = "http"
        url = "http://localhost:1"

        [[backends]]
        id = "dup"
        kind = "http"
        url = "http://localhost:2"
        "#,
    );
    let config = GatekeeperConfig::load(Some(file.path())).unwrap();
    match config.validate() {
        Err(ConfigError::Validation { field, .. }) => assert_eq!(field, "backends[1].id"),
        other => panic!("expected validation error, got {:?}", other),
    }

    let file = write_config(
        r#"
        [confirmation]
        gated_operations = ["deploy.["]
        "#,
    );
    let config = GatekeeperConfig::load(Some(file.path())).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidPattern { .. })
    ));

    let file = write_config(
        r#"
        [confirmation.notifier]
        kind = "webhook"
        "#,
    );
    let config = GatekeeperConfig::load(Some(file.path())).unwrap();
    match config.validate() {
        Err(ConfigError::Validation { field, .. }) => {
            assert_eq!(field, "confirmation.notifier.url")
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}
