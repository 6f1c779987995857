//! The base `Plugin` trait.

use std::fmt::Debug;

use nervemind_executor::{ExecutorRegistry, RegistryError};

use crate::PluginMetadata;

/// A packaged bundle of node executors (e.g. "Slack", "PostgreSQL").
///
/// Object-safe so plugins can be stored as `Arc<dyn Plugin>` in the
/// [`crate::PluginRegistry`].
pub trait Plugin: Send + Sync + Debug + 'static {
    fn metadata(&self) -> &PluginMetadata;

    /// Register this plugin's node executors into the shared registry.
    /// Called once, at startup, before the registry is frozen.
    fn register_executors(&self, registry: &mut ExecutorRegistry) -> Result<(), RegistryError>;

    fn key(&self) -> &str {
        self.metadata().key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nervemind_executor::{Executor, ExecutorContext, ExecutorError, ExecutorInput, ExecutorMetadata, ExecutorOutput};
    use std::sync::Arc;

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
    struct TestPlugin(PluginMetadata);

    impl Plugin for TestPlugin {
        fn metadata(&self) -> &PluginMetadata {
            &self.0
        }

        fn register_executors(&self, registry: &mut ExecutorRegistry) -> Result<(), RegistryError> {
            registry.register(Arc::new(NoopExecutor(ExecutorMetadata::new("test.noop", "Noop", "test"))))
        }
    }

    #[test]
    fn registers_its_executors() {
        let plugin = TestPlugin(PluginMetadata::builder("test", "Test").build());
        let mut registry = ExecutorRegistry::new();
        plugin.register_executors(&mut registry).unwrap();
        assert!(registry.contains("test.noop"));
    }
}
