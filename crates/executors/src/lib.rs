#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # NerveMind Executors
//!
//! The built-in node executor library: HTTP requests, sandboxed code,
//! LLM chat, data transforms (`set`/`filter`/`sort`), and OS command
//! execution. Flow-control node types (`if`, `switch`, `merge`, `loop`,
//! `parallel`, `retry`, `rateLimit`, `tryCatch`) are **not** here — the
//! scheduler interprets those natively.

pub mod code;
pub mod command;
pub mod http_request;
pub mod llm_chat;
pub mod transform;

use std::sync::Arc;

use nervemind_executor::{Executor, ExecutorRegistry, RegistryError};

pub use code::{CodeExecutor, ScriptError, ScriptRuntime};
pub use command::ExecuteCommandExecutor;
pub use http_request::HttpRequestExecutor;
pub use llm_chat::LlmChatExecutor;
pub use transform::{FilterExecutor, SetExecutor, SortExecutor};

/// Registers every built-in under its spec-named key. Called once at
/// process start, before plugin-contributed executors are added — a
/// plugin that tries to reuse one of these keys is rejected by
/// [`ExecutorRegistry::register`]'s duplicate check.
///
/// `disallowed_commands` is forwarded to `executeCommand`'s blocklist; the
/// host surface (`apps/cli`) is where an operator configures it.
pub fn register_builtins(
    registry: &mut ExecutorRegistry,
    disallowed_commands: Vec<String>,
) -> Result<(), RegistryError> {
    let executors: Vec<Arc<dyn Executor>> = vec![
        Arc::new(HttpRequestExecutor::new()),
        Arc::new(CodeExecutor::new(Arc::new(code::RestrictedExprRuntime))),
        Arc::new(LlmChatExecutor::new()),
        Arc::new(SetExecutor),
        Arc::new(FilterExecutor),
        Arc::new(SortExecutor),
        Arc::new(ExecuteCommandExecutor::new(disallowed_commands)),
    ];
    for executor in executors {
        registry.register(executor)?;
    }
    Ok(())
}

/// Decode a node's (already-interpolated) parameters into `T`, mapping a
/// missing/malformed field to `ExecutorError::ConfigError` rather than
/// panicking — per spec.md §9's "Dynamic parameter maps" guidance.
pub(crate) fn decode_params<T: serde::de::DeserializeOwned>(
    params: &serde_json::Map<String, serde_json::Value>,
) -> Result<T, nervemind_executor::ExecutorError> {
    serde_json::from_value(serde_json::Value::Object(params.clone()))
        .map_err(|e| nervemind_executor::ExecutorError::config(format!("invalid parameters: {e}")))
}
