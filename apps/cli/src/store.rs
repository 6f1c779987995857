//! File-backed execution records.
//!
//! `WorkflowEngine::execute` owns a run start-to-finish inside one process
//! and returns a result directly — there is no daemon and no
//! `ExecutionStore` implementation behind it. `run` persists one JSON
//! record per execution so a later `status`/`cancel` invocation (a
//! separate process) has something to read, matching the persisted-state
//! shape `spec.md` §6 describes for execution rows.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use nervemind_core::{ExecutionId, WorkflowId};
use nervemind_execution::ExecutionStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub status: ExecutionStatus,
    pub trigger_type: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub error_message: Option<String>,
    pub output_json: Option<Value>,
}

/// Persists one [`ExecutionRecord`] per execution as `<dir>/<id>.json`.
pub struct FileExecutionStore {
    dir: PathBuf,
}

impl FileExecutionStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, id: &ExecutionId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    pub fn save(&self, record: &ExecutionRecord) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_vec_pretty(record).expect("ExecutionRecord always serializes");
        std::fs::write(self.path(&record.id), json)
    }

    pub fn load(&self, id: &ExecutionId) -> std::io::Result<Option<ExecutionRecord>> {
        let path = self.path(id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Marks a stale record still showing `Running`/`Pending` as
    /// cancelled. The engine itself has no cross-process cancellation
    /// hook — this only corrects the bookkeeping left by a `run` that was
    /// killed before it could record its own terminal status.
    pub fn mark_cancelled(&self, id: &ExecutionId) -> std::io::Result<Option<ExecutionRecord>> {
        let Some(mut record) = self.load(id)? else {
            return Ok(None);
        };
        if !record.status.is_terminal() {
            record.status = ExecutionStatus::Cancelled;
            record.finished_at = Some(Utc::now());
            self.save(&record)?;
        }
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_a_record_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileExecutionStore::new(dir.path().to_path_buf());
        let record = ExecutionRecord {
            id: ExecutionId::v4(),
            workflow_id: WorkflowId::new(1),
            status: ExecutionStatus::Success,
            trigger_type: "manual".to_string(),
            started_at: Utc::now(),
            finished_at: Some(Utc::now()),
            duration_ms: Some(12),
            error_message: None,
            output_json: None,
        };
        store.save(&record).unwrap();
        let loaded = store.load(&record.id).unwrap().unwrap();
        assert_eq!(loaded.id, record.id);
        assert_eq!(loaded.status, ExecutionStatus::Success);
    }

    #[test]
    fn missing_record_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileExecutionStore::new(dir.path().to_path_buf());
        assert!(store.load(&ExecutionId::v4()).unwrap().is_none());
    }

    #[test]
    fn mark_cancelled_leaves_terminal_status_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileExecutionStore::new(dir.path().to_path_buf());
        let record = ExecutionRecord {
            id: ExecutionId::v4(),
            workflow_id: WorkflowId::new(1),
            status: ExecutionStatus::Success,
            trigger_type: "manual".to_string(),
            started_at: Utc::now(),
            finished_at: Some(Utc::now()),
            duration_ms: Some(1),
            error_message: None,
            output_json: None,
        };
        store.save(&record).unwrap();
        let updated = store.mark_cancelled(&record.id).unwrap().unwrap();
        assert_eq!(updated.status, ExecutionStatus::Success);
    }
}
