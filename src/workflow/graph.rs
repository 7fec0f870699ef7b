/// Structural validation and execution ordering of workflow graphs
///
/// Builds a petgraph `DiGraph` from the declared nodes and connections,
/// rejects malformed graphs and produces a deterministic topological order.

use crate::workflow::types::{WorkflowGraph, WorkflowNode};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Structural faults in a workflow graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("node id must not be empty")]
    EmptyNodeId,

    #[error("connection {from} -> {to} references undeclared node '{missing}'")]
    DanglingReference { from: String, to: String, missing: String },

    #[error("node '{0}' is connected to itself")]
    SelfLoop(String),

    #[error("workflow contains a cycle through nodes: {}", .nodes.join(", "))]
    Cycle { nodes: Vec<String> },
}

/// Petgraph view of a workflow. Graph index `i` is the node at array position `i`.
struct IndexedGraph<'a> {
    graph: DiGraph<&'a WorkflowNode, ()>,
}

impl<'a> IndexedGraph<'a> {
    fn build(workflow_graph: &'a WorkflowGraph) -> Result<Self, GraphError> {
        let mut graph = DiGraph::with_capacity(workflow_graph.nodes.len(), workflow_graph.connections.len());
        let mut index_of: HashMap<&str, NodeIndex> = HashMap::new();

        for node in &workflow_graph.nodes {
            if node.id.trim().is_empty() {
                return Err(GraphError::EmptyNodeId);
            }
            let index = graph.add_node(node);
            if index_of.insert(node.id.as_str(), index).is_some() {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
        }

        let mut seen = HashSet::new();
        for connection in &workflow_graph.connections {
            let lookup = |id: &str| {
                index_of.get(id).copied().ok_or_else(|| GraphError::DanglingReference {
                    from: connection.from.clone(),
                    to: connection.to.clone(),
                    missing: id.to_string(),
                })
            };
            let from = lookup(&connection.from)?;
            let to = lookup(&connection.to)?;
            if from == to {
                return Err(GraphError::SelfLoop(connection.from.clone()));
            }
            // Parallel duplicates count once
            if seen.insert((from, to)) {
                graph.add_edge(from, to, ());
            }
        }

        Ok(Self { graph })
    }

    /// Report the cycle whose earliest-declared member comes first
    fn find_cycle(&self) -> Option<GraphError> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|mut component| {
                component.sort_by_key(|index| index.index());
                component
            })
            .min_by_key(|component| component[0].index())
            .map(|component| GraphError::Cycle {
                nodes: component.iter().map(|&index| self.graph[index].id.clone()).collect(),
            })
    }

    /// Kahn's algorithm; the ready set is ordered by array position
    fn topological_order(&self) -> Vec<&'a WorkflowNode> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|index| self.graph.neighbors_directed(index, Direction::Incoming).count())
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(position, _)| Reverse(position))
            .collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(Reverse(position)) = ready.pop() {
            let index = NodeIndex::new(position);
            order.push(self.graph[index]);
            for successor in self.graph.neighbors_directed(index, Direction::Outgoing) {
                let degree = &mut in_degree[successor.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(successor.index()));
                }
            }
        }
        order
    }
}

/// Validate a graph and return its nodes in execution order.
///
/// Every connection `from -> to` places `from` before `to`; nodes that are
/// otherwise unordered keep their declaration order.
pub fn validate(graph: &WorkflowGraph) -> Result<Vec<&WorkflowNode>, GraphError> {
    let indexed = IndexedGraph::build(graph)?;
    if let Some(cycle) = indexed.find_cycle() {
        return Err(cycle);
    }
    Ok(indexed.topological_order())
}

/// Direct predecessors of every node, in declaration order of the connections
pub fn predecessors(graph: &WorkflowGraph) -> HashMap<&str, Vec<&str>> {
    let mut upstream: HashMap<&str, Vec<&str>> = HashMap::new();
    for connection in &graph.connections {
        let entry = upstream.entry(connection.to.as_str()).or_default();
        if !entry.contains(&connection.from.as_str()) {
            entry.push(connection.from.as_str());
        }
    }
    upstream
}
