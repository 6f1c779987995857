//! The stored shape of a workflow.

use nervemind_core::{ConnectionId, HandleKey, NodeId, WorkflowId};
use serde::{Deserialize, Serialize};

/// What starts a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TriggerKind {
    /// Started explicitly through the Execution API or the CLI.
    Manual,
    /// Started on a cron-style schedule. `schedule` is a five-field cron expression.
    Schedule { schedule: String },
    /// Started by an inbound HTTP request to the workflow's webhook path.
    Webhook { path: String },
    /// Started when a watched file changes.
    File { path: String },
}

/// One node in the workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    /// Registry key of the executor that runs this node (e.g. `"http.request"`).
    pub node_type: String,
    /// Raw, per-executor configuration. Decoded into a typed struct by the
    /// executor itself — the engine never interprets these fields.
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    /// Credential this node resolves through the vault, if any.
    #[serde(default)]
    pub credential_id: Option<nervemind_core::CredentialRef>,
    /// Whether this node is a trigger entry point.
    #[serde(default)]
    pub trigger: Option<TriggerKind>,
    /// Per-node timeout override, in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Skipped at execution time: the scheduler passes its `main` input
    /// straight through on `main` output instead of invoking an executor.
    #[serde(default)]
    pub disabled: bool,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            parameters: serde_json::Map::new(),
            credential_id: None,
            trigger: None,
            timeout_ms: None,
            disabled: false,
        }
    }

    pub fn is_trigger(&self) -> bool {
        self.trigger.is_some()
    }
}

/// A directed edge from one node's output handle to another node's input handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub from_node: NodeId,
    #[serde(default = "HandleKey::default_handle")]
    pub from_handle: HandleKey,
    pub to_node: NodeId,
    #[serde(default = "HandleKey::default_handle")]
    pub to_handle: HandleKey,
}

/// A full workflow definition as stored by the `WorkflowStore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: WorkflowId,
    /// Monotonically increasing; bumped on every stored edit. An `Execution`
    /// records the version it ran against so a later edit never gets
    /// misattributed to a historical run.
    pub version: u64,
    pub name: String,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    /// Workflow-scoped settings (default timeouts, default retry policy).
    /// Decoded lazily by whichever component needs a specific key.
    #[serde(default)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

impl Workflow {
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn entry_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_trigger())
    }

    pub fn connections_from(&self, node: &NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| &c.from_node == node)
    }

    pub fn connections_to(&self, node: &NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| &c.to_node == node)
    }
}

/// One value traveling a connection, delivered to a node's input handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub from_node: NodeId,
    pub from_handle: HandleKey,
    pub to_handle: HandleKey,
    pub value: serde_json::Value,
}

impl Envelope {
    pub fn new(from_node: NodeId, from_handle: HandleKey, to_handle: HandleKey, value: serde_json::Value) -> Self {
        Self { from_node, from_handle, to_handle, value }
    }
}
