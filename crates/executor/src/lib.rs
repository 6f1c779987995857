//! # NerveMind Executor
//!
//! Defines **what** a node executor is and **how** it talks to the engine,
//! not how the engine schedules it. Ports & Drivers: the contract lives
//! here, concrete executors (built-ins, plugins) are drivers implementing
//! [`Executor`].
//!
//! ## Core types
//!
//! - [`Executor`] — the trait every node type implements
//! - [`ExecutorMetadata`] — static descriptor (key, declared handles, flags)
//! - [`ExecutorInput`] / [`ExecutorOutput`] — what flows in and out of `execute`
//! - [`ExecutorError`] — the five-member error taxonomy
//! - [`ExecutorContext`] — per-call runtime context (ids, cancellation, logger)
//! - [`ExecutorRegistry`] — lookup by node type, rejects duplicate registration

#![forbid(unsafe_code)]

pub mod context;
pub mod error;
pub mod executor;
pub mod metadata;
pub mod registry;
pub mod result;

pub use context::{ExecutorContext, SecureString};
pub use error::ExecutorError;
pub use executor::Executor;
pub use metadata::{ExecutorMetadata, HandleDirection, HandleSpec};
pub use registry::{ExecutorRegistry, RegistryError};
pub use result::{ExecutorInput, ExecutorOutput, ExecutorSignal};
