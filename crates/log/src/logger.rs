//! Ordered handler fanout for one execution.

use std::sync::Arc;

use nervemind_core::{ExecutionId, NodeId};
use parking_lot::RwLock;

use crate::handler::LogHandler;
use crate::record::{LogCategory, LogLevel, LogRecord};
use crate::redact::redact_secrets;

/// Per-execution logger. Cheap to clone (an `Arc` internally) so it can be
/// handed to every node task without lifetime gymnastics.
#[derive(Clone)]
pub struct ExecutionLogger {
    execution_id: ExecutionId,
    handlers: Arc<RwLock<Vec<Arc<dyn LogHandler>>>>,
    secrets: Arc<RwLock<Vec<String>>>,
}

impl ExecutionLogger {
    /// Create a logger for one execution with no handlers registered yet.
    pub fn new(execution_id: ExecutionId) -> Self {
        Self {
            execution_id,
            handlers: Arc::new(RwLock::new(Vec::new())),
            secrets: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register a handler. Handlers fire in registration order.
    pub fn add_handler(&self, handler: Arc<dyn LogHandler>) {
        self.handlers.write().push(handler);
    }

    /// Register a literal secret value that must be redacted from every
    /// message and context field before it reaches a handler. Called once
    /// per credential value resolved during the run.
    pub fn register_secret(&self, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.secrets.write().push(value);
        }
    }

    fn emit(&self, node_id: Option<NodeId>, level: LogLevel, category: LogCategory, message: impl Into<String>) {
        self.emit_with_context(node_id, level, category, message, serde_json::Map::new());
    }

    fn emit_with_context(
        &self,
        node_id: Option<NodeId>,
        level: LogLevel,
        category: LogCategory,
        message: impl Into<String>,
        context: serde_json::Map<String, serde_json::Value>,
    ) {
        let secrets = self.secrets.read();
        let message = redact_secrets(&message.into(), &secrets);
        let context = crate::redact::redact_json(context, &secrets);
        drop(secrets);

        let mut record = LogRecord::new(self.execution_id, node_id, level, category, message);
        record.context = context;

        // Snapshot under the lock, then run handlers without holding it —
        // a handler registering another handler mid-fanout must not deadlock.
        let snapshot = self.handlers.read().clone();
        for handler in &snapshot {
            handler.handle(&record);
        }
    }

    pub fn execution_started(&self) {
        self.emit(None, LogLevel::Info, LogCategory::ExecutionStarted, "execution started");
    }

    pub fn execution_finished(&self, status: &str) {
        self.emit_with_context(
            None,
            LogLevel::Info,
            LogCategory::ExecutionFinished,
            format!("execution finished: {status}"),
            serde_json::Map::from_iter([("status".to_string(), serde_json::json!(status))]),
        );
    }

    pub fn node_started(&self, node_id: NodeId) {
        self.emit(Some(node_id), LogLevel::Info, LogCategory::NodeStarted, "node started");
    }

    pub fn node_completed(&self, node_id: NodeId) {
        self.emit(Some(node_id), LogLevel::Info, LogCategory::NodeCompleted, "node completed");
    }

    pub fn node_failed(&self, node_id: NodeId, error: impl std::fmt::Display) {
        self.emit(
            Some(node_id),
            LogLevel::Error,
            LogCategory::NodeFailed,
            format!("node failed: {error}"),
        );
    }

    pub fn node_retrying(&self, node_id: NodeId, attempt: u32, delay_ms: u64) {
        self.emit_with_context(
            Some(node_id),
            LogLevel::Warn,
            LogCategory::NodeRetrying,
            format!("retrying after {delay_ms}ms (attempt {attempt})"),
            serde_json::Map::from_iter([
                ("attempt".to_string(), serde_json::json!(attempt)),
                ("delayMs".to_string(), serde_json::json!(delay_ms)),
            ]),
        );
    }

    pub fn node_skipped(&self, node_id: NodeId, reason: impl std::fmt::Display) {
        self.emit(
            Some(node_id),
            LogLevel::Debug,
            LogCategory::NodeSkipped,
            format!("node skipped: {reason}"),
        );
    }

    pub fn custom(&self, node_id: Option<NodeId>, level: LogLevel, message: impl Into<String>) {
        self.emit(node_id, level, LogCategory::Custom, message);
    }

    /// A late or excluded envelope was dropped at a merge point.
    pub fn branch_dropped(&self, node_id: NodeId, reason: impl std::fmt::Display) {
        self.emit(Some(node_id), LogLevel::Debug, LogCategory::Branch, format!("branch dropped: {reason}"));
    }

    /// A `rateLimit` node delayed or rejected an admission.
    pub fn rate_limited(&self, node_id: NodeId, message: impl std::fmt::Display) {
        self.emit(Some(node_id), LogLevel::Warn, LogCategory::RateLimit, format!("rate limit: {message}"));
    }

    pub fn cancelled(&self) {
        self.emit(None, LogLevel::Warn, LogCategory::Cancel, "execution cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::UiBridgeHandler;
    use nervemind_core::ExecutionId;

    #[test]
    fn fanout_reaches_every_handler() {
        let logger = ExecutionLogger::new(ExecutionId::v4());
        let bridge = Arc::new(UiBridgeHandler::new(10));
        logger.add_handler(bridge.clone());

        logger.node_started(NodeId::new("n1"));
        logger.node_completed(NodeId::new("n1"));

        assert_eq!(bridge.snapshot().len(), 2);
    }

    #[test]
    fn secrets_are_redacted_from_messages() {
        let logger = ExecutionLogger::new(ExecutionId::v4());
        let bridge = Arc::new(UiBridgeHandler::new(10));
        logger.add_handler(bridge.clone());
        logger.register_secret("sk-super-secret");

        logger.node_failed(NodeId::new("n1"), "auth failed: sk-super-secret");

        let record = &bridge.snapshot()[0];
        assert!(!record.message.contains("sk-super-secret"));
        assert!(record.message.contains("***"));
    }
}
