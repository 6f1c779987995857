//! Handlers a [`crate::ExecutionLogger`] fans records out to.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::record::LogRecord;

/// A sink for execution log records. Handlers run synchronously and in
/// registration order on whatever task emitted the record — keep them
/// cheap, and never block on I/O that could stall the scheduler.
pub trait LogHandler: Send + Sync + 'static {
    /// Receive one record.
    fn handle(&self, record: &LogRecord);
}

/// Writes one formatted line per record to the process's tracing subscriber.
#[derive(Debug, Default)]
pub struct ConsoleHandler;

impl ConsoleHandler {
    pub fn new() -> Self {
        Self
    }
}

impl LogHandler for ConsoleHandler {
    fn handle(&self, record: &LogRecord) {
        let node = record
            .node_id
            .as_ref()
            .map_or_else(String::new, |n| format!(" node={n}"));

        match record.level {
            crate::LogLevel::Debug => {
                tracing::debug!(execution_id = %record.execution_id, %node, category = ?record.category, "{}", record.message);
            }
            crate::LogLevel::Info => {
                tracing::info!(execution_id = %record.execution_id, %node, category = ?record.category, "{}", record.message);
            }
            crate::LogLevel::Warn => {
                tracing::warn!(execution_id = %record.execution_id, %node, category = ?record.category, "{}", record.message);
            }
            crate::LogLevel::Error => {
                tracing::error!(execution_id = %record.execution_id, %node, category = ?record.category, "{}", record.message);
            }
        }
    }
}

/// Bounded ring buffer feeding the workflow canvas's live execution console.
///
/// When full, the oldest record is dropped and `dropped_count` increments —
/// a slow or disconnected UI must never apply backpressure to the scheduler.
pub struct UiBridgeHandler {
    capacity: usize,
    buffer: Mutex<VecDeque<LogRecord>>,
    dropped: std::sync::atomic::AtomicU64,
}

impl UiBridgeHandler {
    /// Create a handler holding at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            dropped: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Snapshot of currently buffered records, oldest first.
    pub fn snapshot(&self) -> Vec<LogRecord> {
        self.buffer.lock().iter().cloned().collect()
    }

    /// How many records have been dropped for overflow since creation.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(std::sync::atomic::Ordering::Relaxed)
    }
}

impl LogHandler for UiBridgeHandler {
    fn handle(&self, record: &LogRecord) {
        let mut buf = self.buffer.lock();
        if buf.len() >= self.capacity {
            buf.pop_front();
            self.dropped.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        buf.push_back(record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LogCategory, LogLevel};
    use nervemind_core::ExecutionId;

    fn record() -> LogRecord {
        LogRecord::new(ExecutionId::v4(), None, LogLevel::Info, LogCategory::NodeStarted, "hi")
    }

    #[test]
    fn ui_bridge_drops_oldest_on_overflow() {
        let handler = UiBridgeHandler::new(2);
        handler.handle(&record());
        handler.handle(&record());
        handler.handle(&record());

        assert_eq!(handler.snapshot().len(), 2);
        assert_eq!(handler.dropped_count(), 1);
    }

    #[test]
    fn ui_bridge_keeps_everything_under_capacity() {
        let handler = UiBridgeHandler::new(10);
        handler.handle(&record());
        handler.handle(&record());

        assert_eq!(handler.snapshot().len(), 2);
        assert_eq!(handler.dropped_count(), 0);
    }
}
