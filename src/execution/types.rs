use crate::integration::schema::ParamMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

/// Status of a workflow execution. `Success` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    #[serde(alias = "pending")]
    Running,
    #[serde(alias = "succeeded", alias = "completed")]
    Success,
    #[serde(alias = "error")]
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" | "pending" => Ok(ExecutionStatus::Running),
            "success" | "succeeded" | "completed" => Ok(ExecutionStatus::Success),
            "failed" | "error" => Ok(ExecutionStatus::Failed),
            other => Err(format!("unknown execution status: {}", other)),
        }
    }
}

/// Outcome of one attempted node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeResult {
    pub node_id: String,
    pub task: String,
    pub integration_id: String,
    pub success: bool,
    pub message: String,
    pub data: Map<String, Value>,
    pub execution_time_seconds: f64,
    pub timestamp: DateTime<Utc>,
}

/// Trigger and progress bookkeeping stored alongside the node results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_source: Option<String>,
    pub trigger_metadata: Map<String, Value>,
    pub runtime_params: ParamMap,
    pub nodes_executed: usize,
    pub nodes_total: usize,
}

/// Persisted record of one workflow execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub id: String,
    pub workflow_id: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub node_results: Vec<NodeResult>,
    pub error_message: Option<String>,
    pub metadata: ExecutionMetadata,
}

impl ExecutionLog {
    /// Fresh `running` log with no results
    pub fn start(workflow_id: &str, metadata: ExecutionMetadata) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_id: workflow_id.to_string(),
            status: ExecutionStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            node_results: Vec::new(),
            error_message: None,
            metadata,
        }
    }
}

/// JSON payload of the `execution_data` column
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ExecutionData {
    pub node_results: Vec<NodeResult>,
    pub metadata: ExecutionMetadata,
}
