//! Resilience primitives for outbound network calls.
//!
//! Two independent, composable pieces:
//! - [`ResilientExecutor`]: retries an async operation with exponential
//!   backoff, a steeper curve for rate-limit responses, and optional
//!   per-attempt timeout enforcement.
//! - [`CircuitBreaker`]: a Closed → Open → Half-Open state machine that
//!   fast-fails calls to a dependency that keeps failing.
//!
//! Both are explicitly constructed, injectable instances; neither holds
//! global state. Configuration defaults can be overridden through the
//! environment (see [`ExecutorConfig::from_env`] and
//! [`CircuitBreakerConfig::from_env`]).
//!
//! ## Usage
//! ```no_run
//! use resilience::{ExecutorConfig, ResilientExecutor};
//!
//! # async fn demo() {
//! let executor = ResilientExecutor::new(ExecutorConfig::default());
//! let result = executor
//!     .execute(|| async { fetch_listing().await })
//!     .await;
//! # }
//! # async fn fetch_listing() -> Result<String, std::io::Error> { Ok(String::new()) }
//! ```

pub mod circuit_breaker;
pub mod classify;
pub mod config;
pub mod executor;
mod guarded;

pub use circuit_breaker::{BreakerError, BreakerState, CircuitBreaker, CircuitOpen};
pub use classify::{classify_message, FailureKind, MessageClassified, RetryableError};
pub use config::{CallOverrides, CircuitBreakerConfig, ExecutorConfig, TimeoutPolicy};
pub use executor::{CallError, ResilientExecutor};
pub use guarded::execute_guarded;
