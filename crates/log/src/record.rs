//! The wire shape of one execution log line.

use chrono::{DateTime, Utc};
use nervemind_core::{ExecutionId, NodeId};
use serde::{Deserialize, Serialize};

/// Severity of a [`LogRecord`], ordered least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Fine-grained diagnostic detail, off by default in the console handler.
    Debug,
    /// Normal execution milestones (node started, node completed).
    Info,
    /// Recoverable anomalies — a retry about to happen, a rate limit hit.
    Warn,
    /// A node or the run failed.
    Error,
}

/// What kind of execution event a [`LogRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogCategory {
    /// The run itself started.
    ExecutionStarted,
    /// The run reached a terminal status.
    ExecutionFinished,
    /// A node was dispatched.
    NodeStarted,
    /// A node finished successfully.
    NodeCompleted,
    /// A node finished with a fatal error.
    NodeFailed,
    /// A node is about to be retried.
    NodeRetrying,
    /// A node was skipped (dead branch, merge policy).
    NodeSkipped,
    /// A late envelope arrived at a `wait-any` target after it had already
    /// fired, or a connection was marked dead by an exclusive branch choice.
    Branch,
    /// Admission into a `rateLimit` node was refused or delayed.
    RateLimit,
    /// The execution observed a cancellation signal.
    Cancel,
    /// Free-form diagnostic emitted by an executor.
    Custom,
}

/// One structured line in the execution console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// When this record was produced.
    pub timestamp: DateTime<Utc>,
    /// The run this record belongs to.
    pub execution_id: ExecutionId,
    /// The node this record concerns, if any (execution-level records have none).
    pub node_id: Option<NodeId>,
    pub level: LogLevel,
    pub category: LogCategory,
    /// Redacted, human-readable message.
    pub message: String,
    /// Redacted structured context (arbitrary JSON, e.g. attempt number, handle name).
    pub context: serde_json::Map<String, serde_json::Value>,
}

impl LogRecord {
    /// Build a record with an empty context map.
    pub fn new(
        execution_id: ExecutionId,
        node_id: Option<NodeId>,
        level: LogLevel,
        category: LogCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            execution_id,
            node_id,
            level,
            category,
            message: message.into(),
            context: serde_json::Map::new(),
        }
    }

    /// Attach a context field, returning `self` for chaining.
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }
}
