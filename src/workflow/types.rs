/// Core workflow type definitions
///
/// Defines workflows, their nodes and connections. These types are
/// serialized/deserialized from JSON for persistence and for the HTTP API.

use crate::integration::schema::ParamMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted workflow: metadata plus its node graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Server-assigned workflow identifier
    pub id: String,
    /// Human-readable workflow name
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Node graph; must be acyclic to execute
    #[serde(alias = "workflow_data")]
    pub graph: WorkflowGraph,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Optional cron expression for scheduled executions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Nodes and the connections between them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub connections: Vec<WorkflowConnection>,
}

/// A single task invocation in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Unique node identifier within the workflow (e.g., "n1", "create-ticket")
    pub id: String,
    /// Integration whose credentials and connector run this node
    pub integration_id: String,
    /// Task name declared by the integration's type
    pub task: String,
    /// Task arguments
    #[serde(default)]
    pub params: ParamMap,
    /// Layout hint for the editor, no execution semantics
    #[serde(default)]
    pub position: Position,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Execution-order dependency: `to` runs after `from`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowConnection {
    pub from: String,
    pub to: String,
}

/// Fields accepted when creating or replacing a workflow
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "workflow_data", default)]
    pub graph: WorkflowGraph,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub schedule: Option<String>,
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "workflow_data")]
    pub graph: Option<WorkflowGraph>,
    pub is_active: Option<bool>,
    /// `Some(None)` clears the schedule
    #[serde(default, deserialize_with = "deserialize_some")]
    pub schedule: Option<Option<String>>,
}

impl Workflow {
    /// Build a new workflow with a fresh id from a draft
    pub fn from_draft(draft: WorkflowDraft) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: draft.name,
            description: draft.description,
            graph: draft.graph,
            is_active: draft.is_active,
            schedule: normalize_schedule(draft.schedule),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update and bump `updated_at`
    pub fn apply(&mut self, patch: WorkflowPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(graph) = patch.graph {
            self.graph = graph;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if let Some(schedule) = patch.schedule {
            self.schedule = normalize_schedule(schedule);
        }
        self.updated_at = Utc::now();
    }
}

fn normalize_schedule(schedule: Option<String>) -> Option<String> {
    schedule
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn default_true() -> bool {
    true
}

fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
