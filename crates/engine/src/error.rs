//! Scheduler-level error type.

use nervemind_core::NodeId;
use nervemind_executor::ExecutorError;
use nervemind_workflow::ValidationError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The workflow failed structural validation before scheduling began.
    #[error("workflow failed validation: {0}")]
    Invalid(#[from] ValidationError),

    /// A connection or parameter names a node id that does not exist.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// No entry node matched the requested trigger kind.
    #[error("no node matches the requested trigger")]
    NoMatchingTrigger,

    /// A node's executor type is not registered.
    #[error("unregistered node type: {0}")]
    UnregisteredType(String),

    /// A flow-control node's parameters failed to decode.
    #[error("node {node_id} has invalid {node_type} parameters: {message}")]
    BadParameters { node_id: NodeId, node_type: &'static str, message: String },

    /// An uncaught, unretried executor failure ended the run.
    #[error("node {node_id} failed: {source}")]
    NodeFailed { node_id: NodeId, #[source] source: ExecutorError },

    /// The execution context itself errored (e.g. cooperative cancellation).
    #[error(transparent)]
    Execution(#[from] nervemind_execution::ExecutionError),
}
