//! # NerveMind Core
//!
//! Identifiers and small shared value types used across the execution core.
//! Every other crate in the workspace depends on this one and nothing else
//! in the workspace.

#![forbid(unsafe_code)]

pub mod id;

pub use id::{ConnectionId, CredentialRef, ExecutionId, HandleKey, NodeId, UuidParseError, WorkflowId};

/// Common prelude for NerveMind crates.
pub mod prelude {
    pub use crate::id::{ConnectionId, CredentialRef, ExecutionId, HandleKey, NodeId, WorkflowId};
}
