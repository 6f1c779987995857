//! Execution error types.

use nervemind_core::NodeId;
use thiserror::Error;

use crate::status::ExecutionStatus;

/// Errors that can occur while tracking a workflow execution.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A state transition is not valid for the current status.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// A referenced node has no recorded execution state.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// A serialization or deserialization error.
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The execution was cancelled.
    #[error("execution cancelled")]
    Cancelled,
}

impl ExecutionError {
    pub fn invalid_execution_transition(from: ExecutionStatus, to: ExecutionStatus) -> Self {
        Self::InvalidTransition { from: from.to_string(), to: to.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_display() {
        let err = ExecutionError::InvalidTransition { from: "running".into(), to: "pending".into() };
        assert_eq!(err.to_string(), "invalid transition from running to pending");
    }

    #[test]
    fn node_not_found_display() {
        let err = ExecutionError::NodeNotFound(NodeId::new("n1"));
        assert!(err.to_string().contains("node not found"));
    }

    #[test]
    fn from_serde_error() {
        let serde_err = serde_json::from_str::<String>("not valid json").unwrap_err();
        let err = ExecutionError::from(serde_err);
        assert!(err.to_string().starts_with("serialization:"));
    }

    #[test]
    fn cancelled_display() {
        assert_eq!(ExecutionError::Cancelled.to_string(), "execution cancelled");
    }
}
