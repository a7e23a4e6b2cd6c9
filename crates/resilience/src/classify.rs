//! Failure classification for retry decisions.
//!
//! The executor never inspects concrete error types itself; it asks the
//! error how it should be treated through [`RetryableError`]. Adapters are
//! provided for the error types outbound integrations actually produce
//! (`std::io::Error`, `anyhow::Error`, and `reqwest::Error` behind the
//! `reqwest` feature). Anything else can be wrapped in
//! [`MessageClassified`] to fall back to the message heuristic.

use std::fmt;
use std::io;

/// How a failed call should be treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network-level trouble (timeout, refused/reset connection).
    /// Always retried on the standard backoff curve.
    Transient,
    /// Upstream throttling. Retried on a steeper backoff curve so the
    /// dependency gets real breathing room.
    RateLimited,
    /// Everything else. Propagated on first occurrence, no retry.
    Permanent,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transient => write!(f, "transient"),
            FailureKind::RateLimited => write!(f, "rate-limited"),
            FailureKind::Permanent => write!(f, "permanent"),
        }
    }
}

/// Trait for errors that can be classified as retryable or not.
pub trait RetryableError {
    /// Classification driving the retry decision and backoff curve.
    fn failure_kind(&self) -> FailureKind;

    /// Returns true if the error is transient or rate-limited.
    fn is_retryable(&self) -> bool {
        !matches!(self.failure_kind(), FailureKind::Permanent)
    }
}

/// Substrings that identify throttling regardless of the error type that
/// carried them. Matched case-insensitively.
const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "too many requests", "429"];

/// Substrings that identify transient network failures in stringified
/// errors from clients that do not expose structured error kinds.
const TRANSIENT_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "connection refused",
    "connection reset",
    "connection",
    "network",
    "dns",
    "service unavailable",
    "temporarily unavailable",
];

/// Classify an error by its message alone.
///
/// Rate-limit markers win over transient markers: a "429 Too Many
/// Requests" body usually also mentions the connection, and the steeper
/// curve is the right response.
pub fn classify_message(message: &str) -> FailureKind {
    let lowered = message.to_lowercase();

    if RATE_LIMIT_MARKERS.iter().any(|m| lowered.contains(m)) {
        return FailureKind::RateLimited;
    }
    if TRANSIENT_MARKERS.iter().any(|m| lowered.contains(m)) {
        return FailureKind::Transient;
    }
    FailureKind::Permanent
}

/// Wrapper that classifies any `Display` error by its message.
///
/// Escape hatch for callers whose error type has no [`RetryableError`]
/// impl of its own.
#[derive(Debug)]
pub struct MessageClassified<E>(pub E);

impl<E: fmt::Display> fmt::Display for MessageClassified<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<E: fmt::Display> RetryableError for MessageClassified<E> {
    fn failure_kind(&self) -> FailureKind {
        classify_message(&self.0.to_string())
    }
}

impl RetryableError for io::Error {
    fn failure_kind(&self) -> FailureKind {
        match self.kind() {
            io::ErrorKind::TimedOut
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted => FailureKind::Transient,
            _ => classify_message(&self.to_string()),
        }
    }
}

impl RetryableError for anyhow::Error {
    fn failure_kind(&self) -> FailureKind {
        // Chained contexts can bury the interesting part, so the whole
        // chain is inspected.
        classify_message(&format!("{self:#}"))
    }
}

#[cfg(feature = "reqwest")]
impl RetryableError for reqwest::Error {
    fn failure_kind(&self) -> FailureKind {
        if self.is_timeout() || self.is_connect() {
            return FailureKind::Transient;
        }
        if let Some(status) = self.status() {
            if status.as_u16() == 429 {
                return FailureKind::RateLimited;
            }
            if status.is_server_error() {
                return FailureKind::Transient;
            }
        }
        classify_message(&self.to_string())
    }
}
