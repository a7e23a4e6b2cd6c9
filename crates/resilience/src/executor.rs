//! Resilient call executor: retry with exponential backoff.
//!
//! Wraps an arbitrary async operation with per-attempt timeout
//! enforcement and a retry loop. Transient failures retry on
//! `backoff_factor * 2^(n-1)` seconds (n = 1-based retry number);
//! rate-limited failures retry on the steeper `backoff_factor * 4^a`
//! curve (a = 0-based index of the failed attempt) so a throttling
//! upstream gets real breathing room. Non-retryable failures propagate
//! immediately, and exhaustion hands back the original error untouched.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::classify::{FailureKind, RetryableError};
use crate::config::{CallOverrides, ExecutorConfig, TimeoutPolicy};

/// Terminal outcome of a retried call.
#[derive(Debug, Error)]
pub enum CallError<E> {
    /// Every attempt failed; the last error is preserved as-is.
    #[error("operation failed after {attempts} attempts: {inner}")]
    Exhausted { attempts: u32, inner: E },

    /// The error was classified non-retryable and propagated on first
    /// occurrence.
    #[error("{0}")]
    Failed(E),

    /// The enforced per-attempt timeout elapsed on the final attempt.
    #[error("operation timed out after {attempts} attempts ({timeout:?} per attempt)")]
    TimedOut { attempts: u32, timeout: Duration },
}

impl<E> CallError<E> {
    /// The wrapped operation's own error, when one was observed.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CallError::Exhausted { inner, .. } | CallError::Failed(inner) => Some(inner),
            CallError::TimedOut { .. } => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, CallError::Exhausted { .. } | CallError::TimedOut { .. })
    }
}

/// Retries async operations according to an [`ExecutorConfig`].
///
/// Holds no shared mutable state; safe to clone and call concurrently.
#[derive(Debug, Clone, Default)]
pub struct ResilientExecutor {
    config: ExecutorConfig,
}

impl ResilientExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Executor configured from the environment.
    pub fn from_env() -> Self {
        Self::new(ExecutorConfig::from_env())
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute `operation` with the executor's configured retry budget.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, CallError<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError + fmt::Display,
    {
        self.execute_with(CallOverrides::default(), operation).await
    }

    /// Execute `operation`, with per-call overrides taking precedence
    /// over the executor's configuration.
    pub async fn execute_with<F, Fut, T, E>(
        &self,
        overrides: CallOverrides,
        operation: F,
    ) -> Result<T, CallError<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError + fmt::Display,
    {
        let timeout = overrides.timeout.unwrap_or(self.config.timeout);
        let max_retries = overrides.max_retries.unwrap_or(self.config.max_retries);
        let backoff_factor = overrides
            .backoff_factor
            .unwrap_or(self.config.backoff_factor);

        let started = Instant::now();

        for attempt in 0..=max_retries {
            debug!(
                attempt = attempt + 1,
                total = max_retries + 1,
                "executing operation"
            );

            let outcome = match self.config.timeout_policy {
                TimeoutPolicy::Enforced => {
                    match tokio::time::timeout(timeout, operation()).await {
                        Ok(result) => Some(result),
                        Err(_) => None,
                    }
                }
                TimeoutPolicy::CallHandles => Some(operation().await),
            };

            match outcome {
                Some(Ok(value)) => {
                    if attempt > 0 {
                        info!(
                            attempts = attempt + 1,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "operation succeeded after retries"
                        );
                    }
                    return Ok(value);
                }
                Some(Err(error)) => {
                    let kind = error.failure_kind();

                    if kind == FailureKind::Permanent {
                        warn!(error = %error, "non-retryable failure, propagating");
                        return Err(CallError::Failed(error));
                    }
                    if attempt == max_retries {
                        warn!(
                            error = %error,
                            attempts = max_retries + 1,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "retry budget exhausted"
                        );
                        return Err(CallError::Exhausted {
                            attempts: max_retries + 1,
                            inner: error,
                        });
                    }

                    let delay = self.backoff_delay(backoff_factor, attempt, kind);
                    warn!(
                        error = %error,
                        kind = %kind,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "operation failed, retrying after delay"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    if attempt == max_retries {
                        warn!(
                            attempts = max_retries + 1,
                            timeout_ms = timeout.as_millis() as u64,
                            "retry budget exhausted by timeouts"
                        );
                        return Err(CallError::TimedOut {
                            attempts: max_retries + 1,
                            timeout,
                        });
                    }

                    let delay = self.backoff_delay(backoff_factor, attempt, FailureKind::Transient);
                    warn!(
                        attempt = attempt + 1,
                        timeout_ms = timeout.as_millis() as u64,
                        delay_ms = delay.as_millis() as u64,
                        "attempt timed out, retrying after delay"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        unreachable!("retry loop returns on the final attempt")
    }

    /// Delay before the retry that follows the failed attempt with
    /// 0-based index `attempt`.
    fn backoff_delay(&self, backoff_factor: f64, attempt: u32, kind: FailureKind) -> Duration {
        let base: f64 = match kind {
            FailureKind::RateLimited => 4.0,
            _ => 2.0,
        };
        let seconds = (backoff_factor * base.powi(attempt as i32)).max(0.0);
        let capped = seconds.min(self.config.max_delay.as_secs_f64());
        let mut delay = Duration::from_secs_f64(capped);

        if self.config.jitter {
            let millis = delay.as_millis() as f64;
            let jitter_range = millis * 0.1;
            let offset = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
            delay = Duration::from_millis((millis + offset).max(0.0) as u64);
        }

        delay
    }
}
