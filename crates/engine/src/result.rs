//! What one `WorkflowEngine::execute` call hands back.

use std::collections::HashMap;
use std::time::Duration;

use nervemind_core::{ExecutionId, NodeId};
use nervemind_execution::ExecutionStatus;
use serde_json::Value;

/// The originating node and message of a failed run.
#[derive(Debug, Clone)]
pub struct FailureInfo {
    pub node_id: NodeId,
    pub message: String,
}

/// The final outcome of one workflow run.
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub execution_id: ExecutionId,
    pub status: ExecutionStatus,
    /// Per-node, per-handle outputs recorded over the run's lifetime.
    pub node_outputs: HashMap<NodeId, HashMap<String, Value>>,
    pub duration: Duration,
    pub failure: Option<FailureInfo>,
}

impl ExecutionOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }

    #[must_use]
    pub fn node_output(&self, node_id: &NodeId, handle: &str) -> Option<&Value> {
        self.node_outputs.get(node_id)?.get(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_outcome_reports_success() {
        let outcome = ExecutionOutcome {
            execution_id: ExecutionId::v4(),
            status: ExecutionStatus::Success,
            node_outputs: HashMap::new(),
            duration: Duration::from_millis(5),
            failure: None,
        };
        assert!(outcome.is_success());
        assert!(!outcome.is_failure());
    }

    #[test]
    fn node_output_looks_up_by_handle() {
        let mut outputs = HashMap::new();
        outputs.insert(NodeId::new("a"), HashMap::from([("default".to_string(), Value::from(42))]));
        let outcome = ExecutionOutcome {
            execution_id: ExecutionId::v4(),
            status: ExecutionStatus::Success,
            node_outputs: outputs,
            duration: Duration::from_millis(1),
            failure: None,
        };
        assert_eq!(outcome.node_output(&NodeId::new("a"), "default"), Some(&Value::from(42)));
        assert_eq!(outcome.node_output(&NodeId::new("a"), "other"), None);
    }
}
