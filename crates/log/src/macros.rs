//! Convenience macros wrapping `tracing` for the process-wide logging path.

/// Log an error at `error!` level and return it, so it can be used in a
/// `?`-propagating expression without losing the log line.
#[macro_export]
macro_rules! log_error {
    ($err:expr) => {{
        let e = $err;
        tracing::error!(error = ?e);
        e
    }};
    ($err:expr, $($arg:tt)*) => {{
        let e = $err;
        tracing::error!(error = ?e, $($arg)*);
        e
    }};
}

/// Create a span pre-populated with an `elapsed_ms` field, to be recorded
/// by the caller once the timed section completes.
#[macro_export]
macro_rules! timed_span {
    ($name:expr) => {
        tracing::info_span!($name, elapsed_ms = tracing::field::Empty)
    };
    ($level:expr, $name:expr) => {
        tracing::span!($level, $name, elapsed_ms = tracing::field::Empty)
    };
}
