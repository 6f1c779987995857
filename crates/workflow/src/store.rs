//! The workflow persistence port. The canvas editor and the durable store
//! behind it live outside this crate; this trait is the only contract the
//! execution core needs from them.

use nervemind_core::WorkflowId;

use crate::model::Workflow;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WorkflowStoreError {
    #[error("workflow {0} not found")]
    NotFound(WorkflowId),

    #[error("workflow store error: {0}")]
    Backend(String),
}

/// Read access to stored workflow definitions.
pub trait WorkflowStore: Send + Sync {
    /// Load the latest version of a workflow.
    fn get(&self, id: WorkflowId) -> Result<Workflow, WorkflowStoreError>;
}

/// An in-memory store, used by the CLI and by tests.
#[derive(Default)]
pub struct InMemoryWorkflowStore {
    workflows: std::collections::HashMap<WorkflowId, Workflow>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, workflow: Workflow) {
        self.workflows.insert(workflow.id, workflow);
    }
}

impl WorkflowStore for InMemoryWorkflowStore {
    fn get(&self, id: WorkflowId) -> Result<Workflow, WorkflowStoreError> {
        self.workflows.get(&id).cloned().ok_or(WorkflowStoreError::NotFound(id))
    }
}
