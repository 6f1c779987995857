#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # NerveMind Resilience
//!
//! Backoff and throttling primitives used by the built-in `retry` and
//! `rateLimit` node types: a [`RetryPolicy`] decides how long to wait before
//! the next attempt, and a [`TokenBucket`] decides whether a dispatch may
//! proceed right now or must wait.
//!
//! Neither type touches the scheduler directly — both just answer "how
//! long until this can go" and let the caller turn that into an
//! [`nervemind_executor::ExecutorSignal`](../nervemind_executor/enum.ExecutorSignal.html).

pub mod rate_limit;
pub mod retry;

pub use rate_limit::TokenBucket;
pub use retry::{BackoffKind, RetryPolicy};
