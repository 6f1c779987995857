//! Runtime execution context (non-serializable).

use std::collections::HashMap;
use std::sync::Arc;

use nervemind_core::{ExecutionId, NodeId, WorkflowId};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::error::ExecutionError;
use crate::record::NodeExecutionRecord;

/// Runtime context for one in-flight execution.
///
/// Not serializable — it holds `Arc`-wrapped shared state and a
/// cancellation token. Durable state is the caller's concern (the `apps/cli`
/// surface persists whatever it needs for `status`/`cancel` lookups); this
/// type only exists for the lifetime of one `execute_workflow` call.
///
/// `Clone` is cheap (every field is an `Arc` or a `Copy` id) — the
/// scheduler hands a clone to each concurrently-spawned node task so it can
/// read and write shared state without threading a lifetime through
/// `tokio::task::JoinSet::spawn`'s `'static` bound.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub execution_id: ExecutionId,
    pub workflow_id: WorkflowId,
    /// Per-node output, keyed by node and then by output handle, populated
    /// as nodes complete. Read by the expression resolver's node-output
    /// lookup and by the scheduler's merge/routing logic.
    pub node_outputs: Arc<RwLock<HashMap<NodeId, HashMap<String, Value>>>>,
    /// Per-node execution history, surfaced to `status <executionId>`.
    pub node_records: Arc<RwLock<HashMap<NodeId, NodeExecutionRecord>>>,
    pub cancellation: CancellationToken,
    /// Execution-level variables (`execution.*` in expression lookups).
    pub variables: Arc<RwLock<Map<String, Value>>>,
}

impl ExecutionContext {
    #[must_use]
    pub fn new(execution_id: ExecutionId, workflow_id: WorkflowId) -> Self {
        Self {
            execution_id,
            workflow_id,
            node_outputs: Arc::new(RwLock::new(HashMap::new())),
            node_records: Arc::new(RwLock::new(HashMap::new())),
            cancellation: CancellationToken::new(),
            variables: Arc::new(RwLock::new(Map::new())),
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    #[must_use]
    pub fn with_variables(self, vars: Map<String, Value>) -> Self {
        *self.variables.write() = vars;
        self
    }

    pub fn set_node_output(&self, node_id: NodeId, by_handle: HashMap<String, Value>) {
        self.node_outputs.write().insert(node_id, by_handle);
    }

    #[must_use]
    pub fn node_output(&self, node_id: &NodeId, handle: &str) -> Option<Value> {
        self.node_outputs.read().get(node_id)?.get(handle).cloned()
    }

    pub fn set_variable(&self, key: impl Into<String>, value: Value) {
        self.variables.write().insert(key.into(), value);
    }

    #[must_use]
    pub fn get_variable(&self, key: &str) -> Option<Value> {
        self.variables.read().get(key).cloned()
    }

    pub fn check_cancelled(&self) -> Result<(), ExecutionError> {
        if self.cancellation.is_cancelled() {
            Err(ExecutionError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn record_mut(&self, node_id: &NodeId, f: impl FnOnce(&mut NodeExecutionRecord)) {
        let mut records = self.node_records.write();
        let record = records.entry(node_id.clone()).or_insert_with(|| NodeExecutionRecord::pending(node_id.clone()));
        f(record);
    }

    #[must_use]
    pub fn record(&self, node_id: &NodeId) -> Option<NodeExecutionRecord> {
        self.node_records.read().get(node_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(ExecutionId::v4(), WorkflowId::new(1))
    }

    #[test]
    fn new_context_is_empty() {
        let ctx = ctx();
        assert!(ctx.node_outputs.read().is_empty());
        assert!(ctx.variables.read().is_empty());
        assert!(!ctx.cancellation.is_cancelled());
    }

    #[test]
    fn set_and_get_node_output() {
        let ctx = ctx();
        let n1 = NodeId::new("n1");
        let mut by_handle = HashMap::new();
        by_handle.insert("default".to_string(), serde_json::json!(42));
        ctx.set_node_output(n1.clone(), by_handle);
        assert_eq!(ctx.node_output(&n1, "default"), Some(serde_json::json!(42)));
        assert_eq!(ctx.node_output(&n1, "other"), None);
    }

    #[test]
    fn get_missing_node_output() {
        let ctx = ctx();
        assert_eq!(ctx.node_output(&NodeId::new("missing"), "default"), None);
    }

    #[test]
    fn set_and_get_variable() {
        let ctx = ctx();
        ctx.set_variable("key", serde_json::json!("value"));
        assert_eq!(ctx.get_variable("key"), Some(serde_json::json!("value")));
    }

    #[test]
    fn check_cancelled_reflects_token() {
        let ctx = ctx();
        assert!(ctx.check_cancelled().is_ok());
        ctx.cancellation.cancel();
        assert!(matches!(ctx.check_cancelled(), Err(ExecutionError::Cancelled)));
    }

    #[test]
    fn with_cancellation_shares_token() {
        let token = CancellationToken::new();
        let ctx = ctx().with_cancellation(token.clone());
        token.cancel();
        assert!(ctx.cancellation.is_cancelled());
    }

    #[test]
    fn record_mut_creates_then_updates() {
        let ctx = ctx();
        let n1 = NodeId::new("n1");
        ctx.record_mut(&n1, |r| r.start(chrono::Utc::now()));
        let rec = ctx.record(&n1).unwrap();
        assert_eq!(rec.attempts, 1);
    }
}
