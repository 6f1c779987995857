//! The base trait every node type implements.

use async_trait::async_trait;

use crate::context::ExecutorContext;
use crate::error::ExecutorError;
use crate::metadata::ExecutorMetadata;
use crate::result::{ExecutorInput, ExecutorOutput};

/// Runs one node. Implementations are registered under
/// [`ExecutorMetadata::key`] in an [`crate::ExecutorRegistry`] and are
/// looked up by the scheduler once per dispatch unit.
///
/// # Object safety
///
/// Object-safe; the registry stores executors as `Arc<dyn Executor>`.
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    /// Static metadata describing this node type.
    fn metadata(&self) -> &ExecutorMetadata;

    /// Run the node once. `ctx.check_cancelled()` should be polled between
    /// any internally-looping steps.
    async fn execute(&self, input: ExecutorInput, ctx: &ExecutorContext) -> Result<ExecutorOutput, ExecutorError>;
}
