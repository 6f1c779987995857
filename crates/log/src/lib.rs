//! # NerveMind Log
//!
//! Two logging paths live in this crate, for two different readers:
//!
//! - [`init_subscriber`] installs a process-wide `tracing-subscriber` for
//!   operators tailing stderr — ordinary spans and events, level-filtered
//!   via `RUST_LOG`.
//! - [`ExecutionLogger`] is the execution-console audience: every
//!   [`LogRecord`] a running workflow emits is fanned out, in order, to a
//!   snapshot of registered [`LogHandler`]s (console, UI bridge) *and*
//!   mirrored into `tracing` so the same timeline shows up in both places.
//!
//! Redaction ([`redact::redact_secrets`]) is applied before a record reaches
//! either path — a credential value must never appear in either log.

mod handler;
mod logger;
mod macros;
mod record;
pub mod redact;

pub use handler::{ConsoleHandler, LogHandler, UiBridgeHandler};
pub use logger::ExecutionLogger;
pub use record::{LogCategory, LogLevel, LogRecord};

/// Install a process-wide `tracing-subscriber` reading its filter from
/// `RUST_LOG` (default: `info`). Call once, at process start.
pub fn init_subscriber() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
