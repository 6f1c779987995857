//! Structural validation applied before a workflow is ever scheduled.

use std::collections::{HashMap, HashSet};

use nervemind_core::NodeId;

use crate::graph::DependencyGraph;
use crate::model::Workflow;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("duplicate node id: {0}")]
    DuplicateNodeId(NodeId),

    #[error("connection {connection} references unknown node {node}")]
    UnknownNode { connection: String, node: NodeId },

    #[error("workflow has no entry node")]
    NoEntryNode,

    #[error("schedule trigger on node {0} has an empty cron expression")]
    EmptySchedule(NodeId),

    #[error("webhook trigger on node {0} has an empty path")]
    EmptyWebhookPath(NodeId),

    #[error("workflow contains a cycle not passing exclusively through looping-capable nodes: {0:?}")]
    IllegalCycle(Vec<NodeId>),
}

/// Validate a workflow's structure.
///
/// `looping_capable` names the node types (executor registry keys) allowed
/// to sit on a cycle — everything else forming a loop is a malformed graph,
/// not a workflow feature. The caller (the engine, which owns the executor
/// registry) supplies this set; this crate has no executor knowledge of its
/// own.
pub fn validate(workflow: &Workflow, looping_capable: &HashSet<&str>) -> Result<(), ValidationError> {
    let mut seen = HashMap::new();
    for node in &workflow.nodes {
        if seen.insert(node.id.clone(), ()).is_some() {
            return Err(ValidationError::DuplicateNodeId(node.id.clone()));
        }
        if let Some(crate::model::TriggerKind::Schedule { schedule }) = &node.trigger {
            if schedule.trim().is_empty() {
                return Err(ValidationError::EmptySchedule(node.id.clone()));
            }
        }
        if let Some(crate::model::TriggerKind::Webhook { path }) = &node.trigger {
            if path.trim().is_empty() {
                return Err(ValidationError::EmptyWebhookPath(node.id.clone()));
            }
        }
    }

    if workflow.entry_nodes().next().is_none() {
        return Err(ValidationError::NoEntryNode);
    }

    for conn in &workflow.connections {
        if workflow.node(&conn.from_node).is_none() {
            return Err(ValidationError::UnknownNode {
                connection: conn.id.to_string(),
                node: conn.from_node.clone(),
            });
        }
        if workflow.node(&conn.to_node).is_none() {
            return Err(ValidationError::UnknownNode {
                connection: conn.id.to_string(),
                node: conn.to_node.clone(),
            });
        }
    }

    let graph = DependencyGraph::from_workflow(workflow);
    if let Some(cycle) = graph.find_illegal_cycle(workflow, looping_capable) {
        return Err(ValidationError::IllegalCycle(cycle));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Connection, Node};
    use nervemind_core::{ConnectionId, HandleKey, WorkflowId};

    fn wf(nodes: Vec<Node>, connections: Vec<Connection>) -> Workflow {
        Workflow {
            id: WorkflowId::new(1),
            version: 1,
            name: "test".into(),
            nodes,
            connections,
            settings: serde_json::Map::new(),
        }
    }

    fn trigger(id: &str) -> Node {
        let mut n = Node::new(id, "trigger.manual");
        n.trigger = Some(crate::model::TriggerKind::Manual);
        n
    }

    #[test]
    fn rejects_duplicate_node_ids() {
        let workflow = wf(vec![trigger("a"), trigger("a")], vec![]);
        assert_eq!(
            validate(&workflow, &HashSet::new()),
            Err(ValidationError::DuplicateNodeId("a".into()))
        );
    }

    #[test]
    fn rejects_missing_entry_node() {
        let workflow = wf(vec![Node::new("a", "set")], vec![]);
        assert_eq!(validate(&workflow, &HashSet::new()), Err(ValidationError::NoEntryNode));
    }

    #[test]
    fn rejects_dangling_connection() {
        let workflow = wf(
            vec![trigger("a")],
            vec![Connection {
                id: ConnectionId::new("c1"),
                from_node: "a".into(),
                from_handle: HandleKey::default_handle(),
                to_node: "missing".into(),
                to_handle: HandleKey::default_handle(),
            }],
        );
        assert!(matches!(validate(&workflow, &HashSet::new()), Err(ValidationError::UnknownNode { .. })));
    }

    #[test]
    fn accepts_well_formed_linear_workflow() {
        let workflow = wf(
            vec![trigger("a"), Node::new("b", "set")],
            vec![Connection {
                id: ConnectionId::new("c1"),
                from_node: "a".into(),
                from_handle: HandleKey::default_handle(),
                to_node: "b".into(),
                to_handle: HandleKey::default_handle(),
            }],
        );
        assert!(validate(&workflow, &HashSet::new()).is_ok());
    }

    #[test]
    fn rejects_cycle_through_non_looping_nodes() {
        let workflow = wf(
            vec![trigger("a"), Node::new("b", "set")],
            vec![
                Connection {
                    id: ConnectionId::new("c1"),
                    from_node: "a".into(),
                    from_handle: HandleKey::default_handle(),
                    to_node: "b".into(),
                    to_handle: HandleKey::default_handle(),
                },
                Connection {
                    id: ConnectionId::new("c2"),
                    from_node: "b".into(),
                    from_handle: HandleKey::default_handle(),
                    to_node: "a".into(),
                    to_handle: HandleKey::default_handle(),
                },
            ],
        );
        assert!(matches!(validate(&workflow, &HashSet::new()), Err(ValidationError::IllegalCycle(_))));
    }

    #[test]
    fn accepts_cycle_through_looping_capable_node() {
        let mut loop_node = Node::new("b", "loop");
        loop_node.node_type = "loop".into();
        let workflow = wf(
            vec![trigger("a"), loop_node],
            vec![
                Connection {
                    id: ConnectionId::new("c1"),
                    from_node: "a".into(),
                    from_handle: HandleKey::default_handle(),
                    to_node: "b".into(),
                    to_handle: HandleKey::default_handle(),
                },
                Connection {
                    id: ConnectionId::new("c2"),
                    from_node: "b".into(),
                    from_handle: HandleKey::new("loop"),
                    to_node: "a".into(),
                    to_handle: HandleKey::default_handle(),
                },
            ],
        );
        let capable: HashSet<&str> = ["loop"].into_iter().collect();
        assert!(validate(&workflow, &capable).is_ok());
    }
}
