#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # NerveMind Execution
//!
//! Runtime execution state for the workflow execution core: what a single
//! run looks like while it's in flight, and what it leaves behind once it
//! finishes.
//!
//! This crate models execution-time concepts — it does NOT contain the
//! scheduler (see `nervemind-engine`). It defines:
//!
//! - [`ExecutionStatus`] — execution-level state machine
//! - [`ExecutionContext`] — runtime context with shared state and cancellation
//! - [`NodeExecutionRecord`] and [`NodeExecutionStatus`] — per-node history

pub mod context;
pub mod error;
pub mod record;
pub mod status;

pub use context::ExecutionContext;
pub use error::ExecutionError;
pub use record::{NodeExecutionRecord, NodeExecutionStatus};
pub use status::ExecutionStatus;

/// Serde helper for `Option<Duration>` serialized as milliseconds.
pub(crate) mod serde_duration_opt {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    /// Serialize an `Option<Duration>` as an optional integer of milliseconds.
    pub fn serialize<S: Serializer>(duration: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match duration {
            Some(d) => (d.as_millis() as u64).serialize(s),
            None => s.serialize_none(),
        }
    }

    /// Deserialize an optional integer of milliseconds into `Option<Duration>`.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let opt: Option<u64> = Option::deserialize(d)?;
        Ok(opt.map(Duration::from_millis))
    }
}
