#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # NerveMind Engine
//!
//! The scheduler that turns a [`nervemind_workflow::model::Workflow`] and a
//! trigger into a run: [`WorkflowEngine::execute`] dispatches nodes in
//! handle-aware rounds, interpreting flow-control node types natively and
//! handing everything else to the [`nervemind_executor::ExecutorRegistry`].

mod engine;
mod error;
mod params;
mod result;
mod settings;

pub use engine::{ExecutionPoll, WorkflowEngine};
pub use error::EngineError;
pub use params::{
    CompareOp, IfParams, LoopParams, MergeMode, MergeParams, ParallelParams, RateLimitMode, RateLimitParams, RetryParams, SwitchParams,
    TryCatchParams,
};
pub use result::{ExecutionOutcome, FailureInfo};
pub use settings::EngineSettings;
