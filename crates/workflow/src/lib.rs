//! Workflow data model, validation, and dependency graph.
//!
//! This crate owns the shape of a workflow as the canvas editor and the
//! workflow store exchange it — [`Workflow`], [`Node`], [`Connection`],
//! [`Envelope`] — and the pure-graph operations the scheduler needs before
//! it can run one: [`validate::validate`] and [`graph::DependencyGraph`].
//! It does not know how to execute a node; that is `nervemind-executor`.

pub mod graph;
pub mod model;
pub mod store;
pub mod validate;

pub use graph::DependencyGraph;
pub use model::{Connection, Envelope, Node, TriggerKind, Workflow};
pub use store::WorkflowStore;
pub use validate::{validate, ValidationError};
