//! Per-node execution history, kept for the execution console and the
//! final `ExecutionResult`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use nervemind_core::NodeId;
use serde::{Deserialize, Serialize};

use crate::serde_duration_opt;

/// Where a single node stands (or ended up) within one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeExecutionStatus {
    /// Queued but its inputs are not all satisfied yet.
    Pending,
    /// Currently executing.
    Running,
    /// Completed without error.
    Success,
    /// Completed with an error.
    Failed,
    /// Never dispatched because an exclusive upstream branch didn't select it.
    Skipped,
    /// Dispatch was abandoned because the run was cancelled.
    Cancelled,
}

impl NodeExecutionStatus {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

/// One node's recorded history within an execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExecutionRecord {
    pub node_id: NodeId,
    pub status: NodeExecutionStatus,
    /// Number of attempts made so far (starts at 0, incremented per dispatch).
    pub attempts: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(with = "serde_duration_opt")]
    pub duration: Option<Duration>,
    pub error: Option<String>,
}

impl NodeExecutionRecord {
    #[must_use]
    pub fn pending(node_id: NodeId) -> Self {
        Self { node_id, status: NodeExecutionStatus::Pending, attempts: 0, started_at: None, ended_at: None, duration: None, error: None }
    }

    pub fn start(&mut self, at: DateTime<Utc>) {
        self.status = NodeExecutionStatus::Running;
        self.attempts += 1;
        self.started_at = Some(at);
    }

    pub fn finish_success(&mut self, at: DateTime<Utc>) {
        self.status = NodeExecutionStatus::Success;
        self.ended_at = Some(at);
        self.recompute_duration();
    }

    pub fn finish_failed(&mut self, at: DateTime<Utc>, error: impl Into<String>) {
        self.status = NodeExecutionStatus::Failed;
        self.ended_at = Some(at);
        self.error = Some(error.into());
        self.recompute_duration();
    }

    pub fn skip(&mut self) {
        self.status = NodeExecutionStatus::Skipped;
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) {
        self.status = NodeExecutionStatus::Cancelled;
        self.ended_at = Some(at);
        self.recompute_duration();
    }

    fn recompute_duration(&mut self) {
        if let (Some(start), Some(end)) = (self.started_at, self.ended_at) {
            self.duration = (end - start).to_std().ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn pending_record_has_no_timestamps() {
        let rec = NodeExecutionRecord::pending(NodeId::new("n1"));
        assert_eq!(rec.status, NodeExecutionStatus::Pending);
        assert_eq!(rec.attempts, 0);
        assert!(rec.started_at.is_none());
    }

    #[test]
    fn start_increments_attempts_and_sets_running() {
        let mut rec = NodeExecutionRecord::pending(NodeId::new("n1"));
        let now = Utc::now();
        rec.start(now);
        assert_eq!(rec.status, NodeExecutionStatus::Running);
        assert_eq!(rec.attempts, 1);
        rec.start(now + ChronoDuration::seconds(1));
        assert_eq!(rec.attempts, 2);
    }

    #[test]
    fn finish_success_computes_duration() {
        let mut rec = NodeExecutionRecord::pending(NodeId::new("n1"));
        let start = Utc::now();
        rec.start(start);
        rec.finish_success(start + ChronoDuration::milliseconds(250));
        assert_eq!(rec.status, NodeExecutionStatus::Success);
        assert_eq!(rec.duration, Some(Duration::from_millis(250)));
    }

    #[test]
    fn finish_failed_records_error_message() {
        let mut rec = NodeExecutionRecord::pending(NodeId::new("n1"));
        rec.start(Utc::now());
        rec.finish_failed(Utc::now(), "timed out");
        assert_eq!(rec.status, NodeExecutionStatus::Failed);
        assert_eq!(rec.error.as_deref(), Some("timed out"));
    }

    #[test]
    fn skipped_is_terminal_without_timestamps() {
        let mut rec = NodeExecutionRecord::pending(NodeId::new("n1"));
        rec.skip();
        assert!(rec.status.is_terminal());
        assert!(rec.ended_at.is_none());
    }

    #[test]
    fn serde_roundtrip() {
        let mut rec = NodeExecutionRecord::pending(NodeId::new("n1"));
        rec.start(Utc::now());
        rec.finish_success(Utc::now());
        let json = serde_json::to_string(&rec).unwrap();
        let back: NodeExecutionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.node_id, rec.node_id);
        assert_eq!(back.status, rec.status);
    }
}
