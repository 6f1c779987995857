//! Pure graph operations over a [`Workflow`]'s node/connection structure.

use std::collections::{HashMap, HashSet};

use nervemind_core::NodeId;
use petgraph::graphmap::DiGraphMap;

use crate::model::Workflow;

/// A thin wrapper around the workflow's node graph, used for cycle
/// detection and reachability queries. The scheduler's actual dispatch
/// queue is independent of this — it walks `Workflow::connections_from`
/// directly at runtime.
pub struct DependencyGraph<'w> {
    graph: DiGraphMap<&'w str, ()>,
    node_by_str: HashMap<&'w str, &'w NodeId>,
}

impl<'w> DependencyGraph<'w> {
    pub fn from_workflow(workflow: &'w Workflow) -> Self {
        let mut graph = DiGraphMap::new();
        let mut node_by_str = HashMap::new();

        for node in &workflow.nodes {
            let key = node.id.as_str();
            graph.add_node(key);
            node_by_str.insert(key, &node.id);
        }
        for conn in &workflow.connections {
            graph.add_edge(conn.from_node.as_str(), conn.to_node.as_str(), ());
        }

        Self { graph, node_by_str }
    }

    /// All nodes reachable from `start`, `start` included.
    pub fn reachable_from(&self, start: &NodeId) -> HashSet<NodeId> {
        petgraph::visit::Dfs::new(&self.graph, start.as_str())
            .iter(&self.graph)
            .filter_map(|key| self.node_by_str.get(key).map(|id| (*id).clone()))
            .collect()
    }

    /// Find a cycle that does not pass through any `looping_capable` node,
    /// returning its member node ids if one exists.
    pub fn find_illegal_cycle(&self, workflow: &Workflow, looping_capable: &HashSet<&str>) -> Option<Vec<NodeId>> {
        for scc in petgraph::algo::tarjan_scc(&self.graph) {
            let is_cycle = scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]);
            if !is_cycle {
                continue;
            }
            let has_capable_member = scc.iter().any(|key| {
                workflow
                    .node(self.node_by_str[key])
                    .is_some_and(|n| looping_capable.contains(n.node_type.as_str()))
            });
            if !has_capable_member {
                return Some(scc.iter().map(|key| (*self.node_by_str[key]).clone()).collect());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Connection, Node};
    use nervemind_core::{ConnectionId, HandleKey, WorkflowId};

    fn wf() -> Workflow {
        Workflow {
            id: WorkflowId::new(1),
            version: 1,
            name: "t".into(),
            nodes: vec![Node::new("a", "trigger.manual"), Node::new("b", "set"), Node::new("c", "set")],
            connections: vec![
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
                    to_node: "c".into(),
                    to_handle: HandleKey::default_handle(),
                },
            ],
            settings: serde_json::Map::new(),
        }
    }

    #[test]
    fn reachability_follows_connections_transitively() {
        let workflow = wf();
        let graph = DependencyGraph::from_workflow(&workflow);
        let reachable = graph.reachable_from(&"a".into());
        assert_eq!(reachable.len(), 3);
    }

    #[test]
    fn acyclic_graph_has_no_illegal_cycle() {
        let workflow = wf();
        let graph = DependencyGraph::from_workflow(&workflow);
        assert!(graph.find_illegal_cycle(&workflow, &HashSet::new()).is_none());
    }
}
