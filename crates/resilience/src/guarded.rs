//! Composition of the breaker and the executor.

use std::fmt;
use std::future::Future;

use crate::circuit_breaker::{BreakerError, CircuitBreaker};
use crate::classify::RetryableError;
use crate::executor::{CallError, ResilientExecutor};

/// Run a retried operation as a single breaker-guarded call.
///
/// The whole retry burst counts as one call against the breaker: the
/// breaker records a single failure when the retry budget is exhausted
/// (or the failure was non-retryable), and a single success otherwise.
/// While the circuit is open the operation is not attempted at all.
pub async fn execute_guarded<F, Fut, T, E>(
    breaker: &CircuitBreaker,
    executor: &ResilientExecutor,
    operation: F,
) -> Result<T, BreakerError<CallError<E>>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError + fmt::Display,
{
    breaker.call(|| executor.execute(operation)).await
}
