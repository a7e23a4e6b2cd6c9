//! Integration tests for the circuit breaker state machine.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use resilience::{BreakerError, BreakerState, CircuitBreaker, CircuitBreakerConfig};

#[tokio::test]
async fn full_breaker_flow() {
    let cb = CircuitBreaker::new(CircuitBreakerConfig::new(3, Duration::from_millis(100)));
    let calls = AtomicU32::new(0);

    // Three failing calls open the circuit.
    for _ in 0..3 {
        let result: Result<(), _> = cb
            .call(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("boom") }
            })
            .await;
        assert!(matches!(result, Err(BreakerError::Inner(_))));
    }
    assert_eq!(cb.state(), BreakerState::Open);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // While open, the operation is never invoked.
    let result: Result<(), BreakerError<&str>> = cb
        .call(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;
    assert!(matches!(result, Err(BreakerError::Open)));
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // After the recovery timeout the trial call goes through and
    // closes the circuit.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let result: Result<&str, BreakerError<&str>> = cb
        .call(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok("recovered") }
        })
        .await;
    assert_eq!(result.expect("trial call should pass"), "recovered");
    assert_eq!(cb.state(), BreakerState::Closed);
    assert_eq!(cb.failure_count(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn failed_trial_reopens_the_circuit() {
    let cb = CircuitBreaker::new(CircuitBreakerConfig::new(2, Duration::from_millis(50)));

    for _ in 0..2 {
        let _: Result<(), _> = cb.call(|| async { Err("down") }).await;
    }
    assert_eq!(cb.state(), BreakerState::Open);

    tokio::time::sleep(Duration::from_millis(80)).await;
    let result: Result<(), _> = cb.call(|| async { Err("still down") }).await;
    assert!(matches!(result, Err(BreakerError::Inner(_))));
    assert_eq!(cb.state(), BreakerState::Open);

    // And a later successful trial still closes it.
    tokio::time::sleep(Duration::from_millis(80)).await;
    let result: Result<(), BreakerError<&str>> = cb.call(|| async { Ok(()) }).await;
    assert!(result.is_ok());
    assert_eq!(cb.state(), BreakerState::Closed);
}

#[tokio::test]
async fn open_error_is_distinguishable_from_inner_errors() {
    let cb = CircuitBreaker::new(CircuitBreakerConfig::new(1, Duration::from_secs(60)));

    let failing: Result<(), BreakerError<&str>> = cb.call(|| async { Err("boom") }).await;
    let inner = failing.expect_err("operation failed");
    assert!(!inner.is_open());
    assert_eq!(inner.into_inner(), Some("boom"));

    let rejected: Result<(), BreakerError<&str>> = cb.call(|| async { Ok(()) }).await;
    let open = rejected.expect_err("circuit is open");
    assert!(open.is_open());
    assert_eq!(open.into_inner(), None);
}

#[tokio::test]
async fn shared_breaker_observed_across_tasks() {
    let cb = CircuitBreaker::new(CircuitBreakerConfig::new(4, Duration::from_secs(60)));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let cb = cb.clone();
        handles.push(tokio::spawn(async move {
            let _: Result<(), _> = cb.call(|| async { Err("boom") }).await;
        }));
    }
    for handle in handles {
        handle.await.expect("task should not panic");
    }

    // All four failures land on the same circuit; none may be lost.
    assert_eq!(cb.failure_count(), 4);
    assert_eq!(cb.state(), BreakerState::Open);
}
