//! Typed identifiers for workflows, nodes, connections and executions.
//!
//! `ExecutionId` is UUID-backed via [`domain_key::define_uuid!`], matching
//! every other entity identifier in the wider NerveMind platform. `NodeId`
//! and `ConnectionId` are opaque strings — they are authored by the canvas
//! editor and must round-trip exactly as typed, so a UUID wrapper would
//! only get in the way. `WorkflowId` is a small positive integer assigned
//! by the workflow store on creation.

use std::fmt;
use std::str::FromStr;

use domain_key::define_uuid;
use serde::{Deserialize, Serialize};

pub use domain_key::UuidParseError;

define_uuid!(ExecutionIdDomain => ExecutionId);

/// Opaque, editor-assigned identifier for a node. Unique within one workflow.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Wrap a raw string as a `NodeId`.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for NodeId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for NodeId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// Opaque, editor-assigned identifier for a connection between two node handles.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Wrap a raw string as a `ConnectionId`.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Workflow store-assigned numeric identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(i64);

impl WorkflowId {
    /// Wrap a raw numeric id.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw numeric value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WorkflowId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Named handle on a node — an input/output port, a branch key (`"true"`,
/// `"false"`, a switch case name), or a loop/parallel sub-port.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleKey(String);

impl HandleKey {
    /// The conventional default handle name used when a node declares no
    /// explicit ports.
    pub const DEFAULT: &'static str = "default";

    /// Wrap a raw string as a `HandleKey`.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The default handle.
    pub fn default_handle() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HandleKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for HandleKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Reference to a stored credential, as it appears in a node's
/// `credentialId` field. Resolution against the `CredentialVault` happens
/// at execution time, not at parse time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialRef(String);

impl CredentialRef {
    /// Wrap a raw string as a `CredentialRef`.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CredentialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CredentialRef {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_id_v4_is_not_nil() {
        let id = ExecutionId::v4();
        assert!(!id.is_nil());
    }

    #[test]
    fn execution_id_serde_roundtrip() {
        let id = ExecutionId::v4();
        let json = serde_json::to_string(&id).unwrap();
        let back: ExecutionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn node_id_display_roundtrips_exact_string() {
        let id = NodeId::new("weather-fetch-1");
        assert_eq!(id.to_string(), "weather-fetch-1");
        assert_eq!(id.as_str(), "weather-fetch-1");
    }

    #[test]
    fn workflow_id_parses_and_displays() {
        let id: WorkflowId = "42".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn handle_key_default_is_stable() {
        assert_eq!(HandleKey::default_handle().as_str(), "default");
    }

    #[test]
    fn node_ids_with_different_content_are_not_equal() {
        assert_ne!(NodeId::new("a"), NodeId::new("b"));
    }
}
