//! Unit tests for the breaker module.

use super::*;
use crate::registry::{Capabilities, ModelDescriptor, Registry};
use std::time::Duration;

fn setup(threshold: u32, cooldown_seconds: u64) -> (Arc<Registry>, CircuitBreakers) {
    let registry = Arc::new(Registry::new());
    registry
        .add_descriptor(ModelDescriptor::new("b1", "B1", Capabilities::default()))
        .unwrap();
    let config = BreakerConfig {
        failure_threshold: threshold,
        cooldown_seconds,
        call_timeout_seconds: 10,
    };
    let breakers = CircuitBreakers::new(config, registry.clone());
    (registry, breakers)
}

fn fail(breakers: &CircuitBreakers, id: &str) {
    breakers.try_acquire(id).unwrap().failure("boom");
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_default_values() {
    let config = BreakerConfig::default();
    assert_eq!(config.failure_threshold, 3);
    assert_eq!(config.cooldown(), Duration::from_secs(30));
    assert_eq!(config.call_timeout(), Duration::from_secs(60));
}

#[test]
fn test_config_partial_toml() {
    let config: BreakerConfig = toml::from_str("cooldown_seconds = 5").unwrap();
    assert_eq!(config.cooldown_seconds, 5);
    assert_eq!(config.failure_threshold, 3);
}

// ============================================================================
// Closed state
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_opens_after_threshold_consecutive_failures() {
    let (registry, breakers) = setup(3, 30);

    fail(&breakers, "b1");
    fail(&breakers, "b1");
    assert_eq!(breakers.snapshot("b1").state, CircuitState::Closed);
    assert!(registry.get("b1").unwrap().healthy);

    fail(&breakers, "b1");
    let snapshot = breakers.snapshot("b1");
    assert_eq!(snapshot.state, CircuitState::Open);
    assert_eq!(snapshot.consecutive_failures, 3);
    assert_eq!(snapshot.cooldown_remaining_ms, Some(30_000));

    let descriptor = registry.get("b1").unwrap();
    assert!(!descriptor.healthy);
    assert_eq!(descriptor.last_error.as_deref(), Some("boom"));
}

#[tokio::test(start_paused = true)]
async fn test_success_in_closed_resets_counter() {
    let (registry, breakers) = setup(3, 30);

    fail(&breakers, "b1");
    fail(&breakers, "b1");
    breakers.try_acquire("b1").unwrap().success();
    assert_eq!(breakers.snapshot("b1").consecutive_failures, 0);
    assert!(registry.get("b1").unwrap().last_success.is_some());

    fail(&breakers, "b1");
    fail(&breakers, "b1");
    assert_eq!(breakers.snapshot("b1").state, CircuitState::Closed);
}

// ============================================================================
// Open and HalfOpen
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_open_rejects_until_cooldown() {
    let (_registry, breakers) = setup(1, 30);
    fail(&breakers, "b1");

    let err = breakers.try_acquire("b1").err().unwrap();
    assert_eq!(err.state, CircuitState::Open);
    assert!(breakers.is_rejecting("b1"));

    tokio::time::advance(Duration::from_secs(29)).await;
    assert!(breakers.try_acquire("b1").is_err());

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(!breakers.is_rejecting("b1"));
    let permit = breakers.try_acquire("b1").unwrap();
    assert!(permit.is_probe());
    assert_eq!(breakers.snapshot("b1").state, CircuitState::HalfOpen);
}

#[tokio::test(start_paused = true)]
async fn test_half_open_admits_exactly_one_probe() {
    let (_registry, breakers) = setup(1, 10);
    fail(&breakers, "b1");
    tokio::time::advance(Duration::from_secs(10)).await;

    let probe = breakers.try_acquire("b1").unwrap();
    let second = breakers.try_acquire("b1");
    assert!(matches!(
        second,
        Err(CircuitOpenError {
            state: CircuitState::HalfOpen,
            ..
        })
    ));
    assert!(breakers.snapshot("b1").probe_in_flight);
    drop(probe);
}

#[test]
fn test_concurrent_admissions_share_one_probe() {
    let (_registry, breakers) = setup(1, 0);
    fail(&breakers, "b1");

    let threads = 16;
    let start = std::sync::Barrier::new(threads);
    let attempted = std::sync::Barrier::new(threads);
    let admitted = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(|| {
                    start.wait();
                    let permit = breakers.try_acquire("b1");
                    let ok = permit.is_ok();
                    attempted.wait();
                    ok
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count()
    });

    assert_eq!(admitted, 1);
}

#[tokio::test(start_paused = true)]
async fn test_probe_success_closes_circuit() {
    let (registry, breakers) = setup(1, 10);
    fail(&breakers, "b1");
    assert!(!registry.get("b1").unwrap().healthy);

    tokio::time::advance(Duration::from_secs(10)).await;
    breakers.try_acquire("b1").unwrap().success();

    let snapshot = breakers.snapshot("b1");
    assert_eq!(snapshot.state, CircuitState::Closed);
    assert_eq!(snapshot.consecutive_failures, 0);
    assert!(registry.get("b1").unwrap().healthy);
}

#[tokio::test(start_paused = true)]
async fn test_probe_failure_reopens_and_restarts_cooldown() {
    let (registry, breakers) = setup(1, 10);
    fail(&breakers, "b1");
    tokio::time::advance(Duration::from_secs(10)).await;

    breakers.try_acquire("b1").unwrap().failure("still down");
    let snapshot = breakers.snapshot("b1");
    assert_eq!(snapshot.state, CircuitState::Open);
    assert_eq!(snapshot.cooldown_remaining_ms, Some(10_000));
    assert!(!registry.get("b1").unwrap().healthy);

    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(breakers.try_acquire("b1").is_err());
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_probe_releases_slot_without_transition() {
    let (_registry, breakers) = setup(1, 10);
    fail(&breakers, "b1");
    tokio::time::advance(Duration::from_secs(10)).await;

    let probe = breakers.try_acquire("b1").unwrap();
    drop(probe);

    let snapshot = breakers.snapshot("b1");
    assert_eq!(snapshot.state, CircuitState::HalfOpen);
    assert!(!snapshot.probe_in_flight);
    assert!(breakers.try_acquire("b1").unwrap().is_probe());
}

#[tokio::test(start_paused = true)]
async fn test_stale_success_does_not_close_open_circuit() {
    let (_registry, breakers) = setup(1, 30);

    let slow = breakers.try_acquire("b1").unwrap();
    fail(&breakers, "b1");
    assert_eq!(breakers.snapshot("b1").state, CircuitState::Open);

    slow.success();
    assert_eq!(breakers.snapshot("b1").state, CircuitState::Open);
}

// ============================================================================
// Promotion and reset
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_promote_cooled_down_marks_backend_healthy() {
    let (registry, breakers) = setup(1, 10);
    fail(&breakers, "b1");

    assert!(breakers.promote_cooled_down().is_empty());

    tokio::time::advance(Duration::from_secs(11)).await;
    assert_eq!(breakers.promote_cooled_down(), vec!["b1".to_string()]);
    assert_eq!(breakers.snapshot("b1").state, CircuitState::HalfOpen);
    assert!(registry.get("b1").unwrap().healthy);
}

#[tokio::test(start_paused = true)]
async fn test_reset_closes_open_circuit() {
    let (registry, breakers) = setup(1, 3600);
    fail(&breakers, "b1");

    let snapshot = breakers.reset("b1");
    assert_eq!(snapshot.state, CircuitState::Closed);
    assert_eq!(snapshot.consecutive_failures, 0);
    assert!(registry.get("b1").unwrap().healthy);
    assert!(breakers.try_acquire("b1").is_ok());
}

#[test]
fn test_unknown_backend_reads_as_closed() {
    let (_registry, breakers) = setup(3, 30);
    let snapshot = breakers.snapshot("never-seen");
    assert_eq!(snapshot.state, CircuitState::Closed);
    assert!(!breakers.is_rejecting("other"));
}

#[tokio::test(start_paused = true)]
async fn test_snapshots_are_ordered_by_id() {
    let (_registry, breakers) = setup(3, 30);
    for id in ["c", "a", "b"] {
        breakers.try_acquire(id).unwrap().success();
    }
    let ids: Vec<String> = breakers.snapshots().into_keys().collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn test_circuit_state_serializes_snake_case() {
    assert_eq!(
        serde_json::to_string(&CircuitState::HalfOpen).unwrap(),
        "\"half_open\""
    );
}
