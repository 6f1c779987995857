//! Error taxonomy an executor reports and the scheduler routes on.
//!
//! Grounded on the teacher's `Retryable`/`Fatal` split, expanded to the
//! five categories the scheduler distinguishes: configuration mistakes
//! never retry, execution/timeout errors may retry or be caught by
//! `tryCatch`, cancellation never retries and is never caught, and a rate
//! limit is neither a retry nor a catch — it is a scheduling pause.

use std::time::Duration;

use thiserror::Error;

/// Why a node execution failed, and how the scheduler should react.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecutorError {
    /// The node's parameters (after interpolation) are invalid — a
    /// malformed URL, a missing required field. Never retryable, never
    /// catchable: the workflow itself is wrong.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The node ran and failed for a reason that may be transient (a
    /// network error, a 5xx response).
    #[error("execution error: {message}")]
    ExecError {
        message: String,
        /// Whether a `retry` wrapper may re-attempt this node.
        retryable: bool,
    },

    /// The node exceeded its timeout.
    #[error("timed out after {elapsed:?}")]
    TimeoutError { elapsed: Duration },

    /// The execution was cancelled cooperatively. Never retryable, never
    /// caught by `tryCatch` — cancellation always propagates.
    #[error("cancelled")]
    CancelledError,

    /// A `rateLimit` wrapper has no budget left for this node right now.
    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimitExceeded { retry_after: Duration },
}

impl ExecutorError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    pub fn exec(message: impl Into<String>) -> Self {
        Self::ExecError { message: message.into(), retryable: true }
    }

    pub fn exec_fatal(message: impl Into<String>) -> Self {
        Self::ExecError { message: message.into(), retryable: false }
    }

    pub fn timeout(elapsed: Duration) -> Self {
        Self::TimeoutError { elapsed }
    }

    pub fn rate_limited(retry_after: Duration) -> Self {
        Self::RateLimitExceeded { retry_after }
    }

    /// Whether a `retry` wrapper around this node may re-attempt it.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ExecError { retryable, .. } => *retryable,
            Self::TimeoutError { .. } => true,
            _ => false,
        }
    }

    /// Whether a `tryCatch` wrapper may trap this error instead of failing
    /// the run. `ConfigError` is excluded — a malformed workflow cannot be
    /// fixed by catching it, it must fail the execution immediately.
    /// Cancellation and rate limiting are excluded too: cancellation must
    /// always propagate, and a rate limit is a scheduling pause, not a node
    /// failure.
    pub fn is_catchable(&self) -> bool {
        matches!(self, Self::ExecError { .. } | Self::TimeoutError { .. })
    }
}
