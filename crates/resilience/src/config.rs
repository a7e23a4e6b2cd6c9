//! Configuration for the executor and circuit breaker.
//!
//! Defaults are never compiled-in constants for the caller: every knob can
//! be overridden through the builder methods or the environment
//! (`from_env` loads `.env` first, then falls back to the defaults on
//! missing or unparseable values - it never fails).

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// How per-attempt timeouts are applied by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeoutPolicy {
    /// The executor wraps every attempt in `tokio::time::timeout`.
    Enforced,
    /// The callable carries its own deadline (e.g. a `reqwest::Client`
    /// built with a timeout); the executor does not impose one.
    CallHandles,
}

/// Configuration for the resilient call executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Per-attempt timeout, applied when `timeout_policy` is `Enforced`.
    pub timeout: Duration,
    /// Maximum number of retries (excluding the initial attempt).
    pub max_retries: u32,
    /// Multiplier for the backoff curves, in seconds.
    pub backoff_factor: f64,
    /// Cap on any single backoff delay.
    pub max_delay: Duration,
    /// Add ±10% random variation to delays for load distribution.
    /// Off by default so the curve is exactly `backoff_factor * 2^(n-1)`.
    pub jitter: bool,
    /// Whether the executor enforces `timeout` on each attempt.
    pub timeout_policy: TimeoutPolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_retries: 4,
            backoff_factor: 1.0,
            max_delay: Duration::from_secs(120),
            jitter: false,
            timeout_policy: TimeoutPolicy::Enforced,
        }
    }
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conservative config for production traffic.
    pub fn conservative() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(60),
            ..Self::default()
        }
    }

    /// Aggressive config for high-availability scenarios.
    pub fn aggressive() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_retries: 6,
            backoff_factor: 0.5,
            max_delay: Duration::from_secs(120),
            ..Self::default()
        }
    }

    /// Fast config for low-latency requirements.
    pub fn fast() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_retries: 2,
            backoff_factor: 0.1,
            max_delay: Duration::from_secs(5),
            ..Self::default()
        }
    }

    /// Load configuration from the environment.
    ///
    /// Reads `RESILIENCE_TIMEOUT_SECS`, `RESILIENCE_MAX_RETRIES`,
    /// `RESILIENCE_BACKOFF_FACTOR` and `RESILIENCE_MAX_DELAY_SECS`.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let base = Self::default();
        Self {
            timeout: Duration::from_secs(env_or(
                "RESILIENCE_TIMEOUT_SECS",
                base.timeout.as_secs(),
            )),
            max_retries: env_or("RESILIENCE_MAX_RETRIES", base.max_retries),
            backoff_factor: env_or("RESILIENCE_BACKOFF_FACTOR", base.backoff_factor),
            max_delay: Duration::from_secs(env_or(
                "RESILIENCE_MAX_DELAY_SECS",
                base.max_delay.as_secs(),
            )),
            ..base
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff_factor(mut self, backoff_factor: f64) -> Self {
        self.backoff_factor = backoff_factor;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_timeout_policy(mut self, timeout_policy: TimeoutPolicy) -> Self {
        self.timeout_policy = timeout_policy;
        self
    }
}

/// Per-call overrides for [`ExecutorConfig`]. Unset fields fall back to
/// the executor's configuration.
#[derive(Debug, Clone, Default)]
pub struct CallOverrides {
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
    pub backoff_factor: Option<f64>,
}

impl CallOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn backoff_factor(mut self, backoff_factor: f64) -> Self {
        self.backoff_factor = Some(backoff_factor);
        self
    }
}

/// Configuration for the circuit breaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long the circuit stays open before a trial call is allowed.
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
        }
    }

    /// Load configuration from the environment.
    ///
    /// Reads `BREAKER_FAILURE_THRESHOLD` and `BREAKER_RECOVERY_SECS`.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let base = Self::default();
        Self {
            failure_threshold: env_or("BREAKER_FAILURE_THRESHOLD", base.failure_threshold),
            recovery_timeout: Duration::from_secs(env_or(
                "BREAKER_RECOVERY_SECS",
                base.recovery_timeout.as_secs(),
            )),
        }
    }

    pub fn with_failure_threshold(mut self, failure_threshold: u32) -> Self {
        self.failure_threshold = failure_threshold;
        self
    }

    pub fn with_recovery_timeout(mut self, recovery_timeout: Duration) -> Self {
        self.recovery_timeout = recovery_timeout;
        self
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
