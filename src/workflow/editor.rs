/// Conversion between stored graphs and the visual editor's node/edge format
///
/// The editor speaks in `nodes` with a `data` payload and `edges` with
/// `source`/`target`. Nothing in the runtime reads this format.

use crate::integration::schema::ParamMap;
use crate::workflow::types::{Position, WorkflowConnection, WorkflowGraph, WorkflowNode};
use serde::{Deserialize, Serialize};

pub const NODE_TYPE: &str = "integration";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorGraph {
    #[serde(default)]
    pub nodes: Vec<EditorNode>,
    #[serde(default)]
    pub edges: Vec<EditorEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorNode {
    pub id: String,
    #[serde(rename = "type", default = "default_node_type")]
    pub node_type: String,
    #[serde(default)]
    pub position: Position,
    pub data: EditorNodeData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorNodeData {
    pub integration_id: String,
    pub task: String,
    #[serde(default)]
    pub params: ParamMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorEdge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
}

fn default_node_type() -> String {
    NODE_TYPE.to_string()
}

pub fn edge_id(from: &str, to: &str) -> String {
    format!("e-{}-{}", from, to)
}

pub fn to_editor(graph: &WorkflowGraph) -> EditorGraph {
    EditorGraph {
        nodes: graph
            .nodes
            .iter()
            .map(|node| EditorNode {
                id: node.id.clone(),
                node_type: default_node_type(),
                position: node.position,
                data: EditorNodeData {
                    integration_id: node.integration_id.clone(),
                    task: node.task.clone(),
                    params: node.params.clone(),
                },
            })
            .collect(),
        edges: graph
            .connections
            .iter()
            .map(|connection| EditorEdge {
                id: edge_id(&connection.from, &connection.to),
                source: connection.from.clone(),
                target: connection.to.clone(),
            })
            .collect(),
    }
}

/// Edge ids and node types are editor-only and dropped here
pub fn from_editor(editor: EditorGraph) -> WorkflowGraph {
    WorkflowGraph {
        nodes: editor
            .nodes
            .into_iter()
            .map(|node| WorkflowNode {
                id: node.id,
                integration_id: node.data.integration_id,
                task: node.data.task,
                params: node.data.params,
                position: node.position,
            })
            .collect(),
        connections: editor
            .edges
            .into_iter()
            .map(|edge| WorkflowConnection {
                from: edge.source,
                to: edge.target,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> WorkflowGraph {
        serde_json::from_value(json!({
            "nodes": [
                {"id": "fetch", "integration_id": "i-1", "task": "request",
                 "params": {"method": "GET", "path": "/users"}, "position": {"x": 10.0, "y": 20.0}},
                {"id": "notify", "integration_id": "i-2", "task": "send", "params": {}}
            ],
            "connections": [{"from": "fetch", "to": "notify"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_editor_format_shape() {
        let editor = serde_json::to_value(to_editor(&sample())).unwrap();

        assert_eq!(editor["nodes"][0]["type"], "integration");
        assert_eq!(editor["nodes"][0]["data"]["params"]["path"], "/users");
        assert_eq!(editor["nodes"][1]["position"], json!({"x": 0.0, "y": 0.0}));
        assert_eq!(
            editor["edges"][0],
            json!({"id": "e-fetch-notify", "source": "fetch", "target": "notify"})
        );
    }

    #[test]
    fn test_conversion_preserves_graph() {
        let graph = sample();
        assert_eq!(from_editor(to_editor(&graph)), graph);
    }

    #[test]
    fn test_editor_input_without_ids_or_types() {
        let editor: EditorGraph = serde_json::from_value(json!({
            "nodes": [{"id": "a", "data": {"integration_id": "i", "task": "t"}}],
            "edges": [{"source": "a", "target": "a"}]
        }))
        .unwrap();

        let graph = from_editor(editor);
        assert_eq!(graph.nodes[0].task, "t");
        assert_eq!(graph.connections[0].from, "a");
    }
}
