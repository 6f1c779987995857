//! In-memory plugin registry. Same reject-on-duplicate behavior as
//! [`nervemind_executor::ExecutorRegistry`], plus a freeze gate: plugins
//! may only be registered during startup, before the engine begins
//! dispatching work, matching `spec.md` §6's "out-of-core discovery
//! excluded, registration contract only" scope.

use std::collections::HashMap;
use std::sync::Arc;

use nervemind_executor::ExecutorRegistry;

use crate::error::PluginError;
use crate::plugin::Plugin;

pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn Plugin>>,
    frozen: bool,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { plugins: HashMap::new(), frozen: false }
    }

    /// Register a plugin. Fails if the key is taken or the registry is frozen.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), PluginError> {
        if self.frozen {
            return Err(PluginError::RegistryFrozen);
        }
        let key = plugin.key().to_string();
        if self.plugins.contains_key(&key) {
            return Err(PluginError::AlreadyExists(key));
        }
        self.plugins.insert(key, plugin);
        Ok(())
    }

    /// Run every registered plugin's `register_executors` against
    /// `executors`, then freeze this registry — no further plugin
    /// registration is accepted afterward.
    pub fn install_all(&mut self, executors: &mut ExecutorRegistry) -> Result<(), PluginError> {
        for plugin in self.plugins.values() {
            plugin
                .register_executors(executors)
                .map_err(|e| PluginError::RegistrationFailed { plugin: plugin.key().to_string(), message: e.to_string() })?;
        }
        self.frozen = true;
        Ok(())
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Result<Arc<dyn Plugin>, PluginError> {
        self.plugins.get(key).cloned().ok_or_else(|| PluginError::NotFound(key.to_string()))
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.plugins.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry").field("count", &self.plugins.len()).field("frozen", &self.frozen).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PluginMetadata;
    use async_trait::async_trait;
    use nervemind_executor::{Executor, ExecutorContext, ExecutorError, ExecutorInput, ExecutorMetadata, ExecutorOutput, RegistryError};

    #[derive(Debug)]
    struct NoopExecutor(ExecutorMetadata);

    #[async_trait]
    impl Executor for NoopExecutor {
        fn metadata(&self) -> &ExecutorMetadata {
            &self.0
        }
        async fn execute(&self, _input: ExecutorInput, _ctx: &ExecutorContext) -> Result<ExecutorOutput, ExecutorError> {
            Ok(ExecutorOutput::single(serde_json::Value::Null))
        }
    }

    #[derive(Debug)]
    struct StubPlugin(PluginMetadata, &'static str);

    impl Plugin for StubPlugin {
        fn metadata(&self) -> &PluginMetadata {
            &self.0
        }

        fn register_executors(&self, registry: &mut ExecutorRegistry) -> Result<(), RegistryError> {
            registry.register(Arc::new(NoopExecutor(ExecutorMetadata::new(self.1, self.1, "test"))))
        }
    }

    fn stub(key: &str, executor_key: &'static str) -> Arc<dyn Plugin> {
        Arc::new(StubPlugin(PluginMetadata::builder(key, key).build(), executor_key))
    }

    #[test]
    fn register_and_get() {
        let mut reg = PluginRegistry::new();
        reg.register(stub("slack", "slack.post")).unwrap();
        assert!(reg.get("slack").is_ok());
    }

    #[test]
    fn duplicate_register_fails() {
        let mut reg = PluginRegistry::new();
        reg.register(stub("a", "a.run")).unwrap();
        let err = reg.register(stub("a", "a.run2")).unwrap_err();
        assert_eq!(err, PluginError::AlreadyExists("a".to_string()));
    }

    #[test]
    fn install_all_freezes_the_registry() {
        let mut reg = PluginRegistry::new();
        reg.register(stub("a", "a.run")).unwrap();
        let mut executors = ExecutorRegistry::new();
        reg.install_all(&mut executors).unwrap();

        assert!(reg.is_frozen());
        assert!(executors.contains("a.run"));
        let err = reg.register(stub("b", "b.run")).unwrap_err();
        assert_eq!(err, PluginError::RegistryFrozen);
    }

    #[test]
    fn remove_not_found() {
        let reg = PluginRegistry::new();
        assert!(reg.get("nope").is_err());
    }
}
