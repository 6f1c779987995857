//! Run-wide scheduler knobs, sourced from `Settings::EXECUTION_*` (see
//! `apps/cli`'s config layer) and overridable per call for tests.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Bounds concurrently-running executor-backed dispatch units.
    /// `EXECUTION_MAX_PARALLEL`.
    pub max_parallel: usize,
    /// Workflow-level deadline. `EXECUTION_DEFAULT_TIMEOUT`.
    pub default_timeout: Duration,
    /// Default retry attempts for a `retry` node that omits `maxAttempts`.
    /// `EXECUTION_RETRY_ATTEMPTS`.
    pub default_retry_attempts: u32,
    /// Default initial retry delay. `EXECUTION_RETRY_DELAY`.
    pub default_retry_delay: Duration,
    /// Grace period the scheduler waits for in-flight executors to observe
    /// a cancellation signal before declaring the run cancelled anyway.
    pub cancellation_grace: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_parallel: 8,
            default_timeout: Duration::from_secs(300),
            default_retry_attempts: 3,
            default_retry_delay: Duration::from_millis(200),
            cancellation_grace: Duration::from_secs(5),
        }
    }
}
