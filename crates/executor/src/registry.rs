//! Node type registry. Modeled on the plugin registry's reject-on-duplicate
//! behavior rather than the simpler overwrite-on-register pattern seen
//! elsewhere in the wider codebase: a duplicate node type means two
//! components disagree about what a key means, and the engine must refuse
//! to run with an ambiguous registry rather than silently pick a winner.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::executor::Executor;
use crate::metadata::ExecutorMetadata;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("node type {0:?} is already registered")]
    DuplicateType(String),

    #[error("unknown node type {0:?}")]
    NotFound(String),
}

/// Maps node type keys to their executor implementation.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn Executor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor. Fails if the key is already taken.
    pub fn register(&mut self, executor: Arc<dyn Executor>) -> Result<(), RegistryError> {
        let key = executor.metadata().key.clone();
        if self.executors.contains_key(&key) {
            return Err(RegistryError::DuplicateType(key));
        }
        self.executors.insert(key, executor);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<&Arc<dyn Executor>, RegistryError> {
        self.executors.get(key).ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.executors.contains_key(key)
    }

    pub fn list(&self) -> Vec<&ExecutorMetadata> {
        self.executors.values().map(|e| e.metadata()).collect()
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }

    /// Keys of every node type registered with `supports_looping = true` —
    /// passed straight through to `nervemind_workflow::validate`.
    pub fn looping_capable(&self) -> std::collections::HashSet<&str> {
        self.executors
            .values()
            .filter(|e| e.metadata().supports_looping)
            .map(|e| e.metadata().key.as_str())
            .collect()
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("count", &self.executors.len())
            .field("keys", &self.executors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutorContext;
    use crate::error::ExecutorError;
    use crate::result::{ExecutorInput, ExecutorOutput};
    use async_trait::async_trait;

    struct DummyExecutor(ExecutorMetadata);

    #[async_trait]
    impl Executor for DummyExecutor {
        fn metadata(&self) -> &ExecutorMetadata {
            &self.0
        }
        async fn execute(&self, _input: ExecutorInput, _ctx: &ExecutorContext) -> Result<ExecutorOutput, ExecutorError> {
            Ok(ExecutorOutput::single(serde_json::Value::Null))
        }
    }

    fn make(key: &str) -> Arc<dyn Executor> {
        Arc::new(DummyExecutor(ExecutorMetadata::new(key, key, "test")))
    }

    #[test]
    fn register_and_get() {
        let mut reg = ExecutorRegistry::new();
        reg.register(make("http.request")).unwrap();
        assert!(reg.get("http.request").is_ok());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut reg = ExecutorRegistry::new();
        reg.register(make("set")).unwrap();
        let err = reg.register(make("set")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateType("set".to_string()));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unknown_key_is_not_found() {
        let reg = ExecutorRegistry::new();
        assert_eq!(reg.get("nope").unwrap_err(), RegistryError::NotFound("nope".to_string()));
    }

    #[test]
    fn looping_capable_reflects_metadata_flag() {
        let mut reg = ExecutorRegistry::new();
        reg.register(Arc::new(DummyExecutor(ExecutorMetadata::new("loop", "Loop", "").supporting_looping()))).unwrap();
        reg.register(make("set")).unwrap();

        let capable = reg.looping_capable();
        assert!(capable.contains("loop"));
        assert!(!capable.contains("set"));
    }
}
