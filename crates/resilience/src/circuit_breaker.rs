//! Circuit breaker for failing dependencies.
//!
//! Small Closed → Open → Half-Open state machine. Consecutive failures
//! past the threshold open the circuit; while open, calls are rejected
//! without touching the dependency. Once the recovery timeout elapses, a
//! single trial call is allowed through; success closes the circuit,
//! failure reopens it.
//!
//! Instances are explicitly constructed and injected (no module-level
//! globals), and all mutable state sits behind one instance-owned mutex
//! so concurrent callers cannot lose updates. Clones share the same
//! circuit.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::CircuitBreakerConfig;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Normal operation; failures increment a counter.
    Closed,
    /// Dependency considered down; calls are rejected.
    Open,
    /// Recovery timeout elapsed; the next call is a trial.
    HalfOpen,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakerState::Closed => write!(f, "closed"),
            BreakerState::Open => write!(f, "open"),
            BreakerState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Rejection issued by the breaker itself, distinguishable from any
/// error the guarded operation could produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("circuit breaker is open - call rejected")]
pub struct CircuitOpen;

/// Outcome of a guarded call.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The circuit was open; the operation was never invoked.
    #[error("circuit breaker is open - call rejected")]
    Open,

    /// The operation ran and failed with its own error.
    #[error("{0}")]
    Inner(E),
}

impl<E> BreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open)
    }

    pub fn into_inner(self) -> Option<E> {
        match self {
            BreakerError::Open => None,
            BreakerError::Inner(inner) => Some(inner),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

/// Guard that stops calling a failing dependency for a cooldown period
/// after repeated failures.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<BreakerInner>>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Arc::new(Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                failure_count: 0,
                last_failure_time: None,
            })),
        }
    }

    /// Breaker configured from the environment.
    pub fn from_env() -> Self {
        Self::new(CircuitBreakerConfig::from_env())
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Ask the breaker whether a call may proceed.
    ///
    /// While open, the transition to half-open is evaluated lazily here:
    /// the first caller arriving after the recovery timeout flips the
    /// state and becomes the trial call.
    pub fn try_acquire(&self) -> Result<(), CircuitOpen> {
        let mut inner = self.lock();

        match inner.state {
            BreakerState::Closed => Ok(()),
            BreakerState::HalfOpen => Ok(()),
            BreakerState::Open => match inner.last_failure_time {
                Some(last) if last.elapsed() >= self.config.recovery_timeout => {
                    info!("circuit breaker moving to half-open");
                    inner.state = BreakerState::HalfOpen;
                    Ok(())
                }
                _ => {
                    debug!("circuit breaker open - rejecting call");
                    Err(CircuitOpen)
                }
            },
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut inner = self.lock();

        match inner.state {
            BreakerState::HalfOpen => {
                info!("circuit breaker recovery confirmed, closing");
                inner.state = BreakerState::Closed;
                inner.failure_count = 0;
                inner.last_failure_time = None;
            }
            BreakerState::Closed => {
                if inner.failure_count > 0 {
                    debug!(
                        failures = inner.failure_count,
                        "circuit breaker resetting failure count"
                    );
                    inner.failure_count = 0;
                }
            }
            BreakerState::Open => {
                // Only reachable when callers bypass try_acquire.
                warn!("success recorded while circuit open");
            }
        }
    }

    /// Record a failed call. Handling is identical in every state:
    /// increment the counter, stamp the failure time, re-evaluate the
    /// threshold.
    pub fn record_failure(&self) {
        let mut inner = self.lock();

        inner.failure_count += 1;
        inner.last_failure_time = Some(Instant::now());

        if inner.failure_count >= self.config.failure_threshold
            && inner.state != BreakerState::Open
        {
            warn!(
                failures = inner.failure_count,
                threshold = self.config.failure_threshold,
                from = %inner.state,
                "circuit breaker opening"
            );
            inner.state = BreakerState::Open;
        } else {
            debug!(
                failures = inner.failure_count,
                threshold = self.config.failure_threshold,
                state = %inner.state,
                "circuit breaker recorded failure"
            );
        }
    }

    /// Run `operation` under the breaker, recording the outcome.
    ///
    /// Fails fast with [`BreakerError::Open`] while the circuit is open;
    /// the operation is not invoked in that case.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.try_acquire().map_err(|_| BreakerError::Open)?;

        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(error) => {
                self.record_failure();
                Err(BreakerError::Inner(error))
            }
        }
    }

    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    /// Human-readable state summary for diagnostics.
    pub fn state_info(&self) -> String {
        let inner = self.lock();
        match inner.state {
            BreakerState::Closed => format!("closed (failures: {})", inner.failure_count),
            BreakerState::Open => match inner.last_failure_time {
                Some(last) => {
                    let remaining = self.config.recovery_timeout.saturating_sub(last.elapsed());
                    format!("open (recovery in {remaining:?})")
                }
                None => "open".to_string(),
            },
            BreakerState::HalfOpen => "half-open (trial pending)".to_string(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().expect("circuit breaker lock poisoned")
    }
}
