//! What flows in and out of [`crate::Executor::execute`].
//!
//! Grounded on the teacher's `ActionResult<T>` (`Success`/`Branch`/
//! `MultiOutput`/`Wait`): the engine needs to know not just a value but the
//! executor's flow-control *intent* — which handles to activate, and
//! whether the scheduler should pause and re-enqueue this node later. That
//! intent is split in two here: `outputs_by_handle` answers "what data goes
//! where" (the scheduler dispatches a connection only if its source handle
//! is present), and `signal` answers "what should the scheduler do next"
//! (proceed, retry after a delay, or wait out a rate limit).

use std::collections::HashMap;
use std::time::Duration;

use nervemind_core::HandleKey;

/// Resolved input handed to an executor: one JSON value per input handle
/// that has a connected, live predecessor. A node with a single
/// predecessor normally sees one entry under `"default"`.
#[derive(Debug, Clone, Default)]
pub struct ExecutorInput {
    pub by_handle: HashMap<HandleKey, serde_json::Value>,
}

impl ExecutorInput {
    pub fn single(value: serde_json::Value) -> Self {
        let mut by_handle = HashMap::new();
        by_handle.insert(HandleKey::default_handle(), value);
        Self { by_handle }
    }

    /// The value on the default handle, falling back to `Value::Null` when
    /// absent (an entry node with no upstream input).
    pub fn default_value(&self) -> serde_json::Value {
        self.by_handle.get(&HandleKey::default_handle()).cloned().unwrap_or(serde_json::Value::Null)
    }

    pub fn get(&self, handle: &HandleKey) -> Option<&serde_json::Value> {
        self.by_handle.get(handle)
    }
}

/// What the scheduler should do after an executor returns successfully.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutorSignal {
    /// Proceed normally: dispatch along every output handle present in
    /// `outputs_by_handle`.
    Complete,
    /// Re-enqueue this same node after `after`, without dispatching
    /// downstream yet. Used by `retry` wrappers honoring backoff.
    RetryAfter { after: Duration },
    /// A `rateLimit` wrapper asks the scheduler to hold this dispatch unit
    /// and re-offer it after `after`.
    WaitForCapacity { after: Duration },
}

/// What an executor hands back to the scheduler on success.
#[derive(Debug, Clone)]
pub struct ExecutorOutput {
    pub outputs_by_handle: HashMap<HandleKey, serde_json::Value>,
    pub signal: ExecutorSignal,
}

impl ExecutorOutput {
    /// The common case: one value on the default output handle, proceed.
    pub fn single(value: serde_json::Value) -> Self {
        let mut outputs_by_handle = HashMap::new();
        outputs_by_handle.insert(HandleKey::default_handle(), value);
        Self { outputs_by_handle, signal: ExecutorSignal::Complete }
    }

    /// Activate exactly one handle — the shape an `if`/`switch` node
    /// returns to make its branch exclusive, so the scheduler can mark the
    /// other handle's connections dead for merge-policy purposes.
    pub fn branch(handle: impl Into<HandleKey>, value: serde_json::Value) -> Self {
        let mut outputs_by_handle = HashMap::new();
        outputs_by_handle.insert(handle.into(), value);
        Self { outputs_by_handle, signal: ExecutorSignal::Complete }
    }

    /// Activate several handles at once — a `parallel` node fanning out.
    pub fn multi(outputs_by_handle: HashMap<HandleKey, serde_json::Value>) -> Self {
        Self { outputs_by_handle, signal: ExecutorSignal::Complete }
    }

    pub fn retry_after(after: Duration) -> Self {
        Self { outputs_by_handle: HashMap::new(), signal: ExecutorSignal::RetryAfter { after } }
    }

    pub fn wait_for_capacity(after: Duration) -> Self {
        Self { outputs_by_handle: HashMap::new(), signal: ExecutorSignal::WaitForCapacity { after } }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.signal, ExecutorSignal::Complete)
    }
}
