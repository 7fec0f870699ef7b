/// Read-side view of an execution log
///
/// Flattens the stored metadata and adds the derived figures clients show:
/// duration, success count and the workflow name.

use crate::execution::types::{ExecutionLog, ExecutionStatus, NodeResult};
use crate::integration::schema::ParamMap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

pub const UNKNOWN_TRIGGER: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedExecutionView {
    pub id: String,
    pub workflow_id: String,
    pub workflow_name: Option<String>,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// `None` while the execution is still running
    pub execution_time_seconds: Option<f64>,
    pub error_message: Option<String>,
    pub trigger_source: String,
    pub trigger_metadata: Map<String, Value>,
    pub runtime_params: ParamMap,
    pub nodes_total: usize,
    pub nodes_executed: usize,
    pub nodes_successful: usize,
    pub node_results: Vec<NodeResult>,
}

pub fn expand_details(log: &ExecutionLog, workflow_name: Option<&str>) -> DetailedExecutionView {
    let execution_time_seconds = log
        .completed_at
        .map(|completed_at| (completed_at - log.started_at).num_microseconds().unwrap_or(0) as f64 / 1_000_000.0);

    DetailedExecutionView {
        id: log.id.clone(),
        workflow_id: log.workflow_id.clone(),
        workflow_name: workflow_name.map(str::to_string),
        status: log.status,
        started_at: log.started_at,
        completed_at: log.completed_at,
        execution_time_seconds,
        error_message: log.error_message.clone(),
        trigger_source: log
            .metadata
            .trigger_source
            .clone()
            .unwrap_or_else(|| UNKNOWN_TRIGGER.to_string()),
        trigger_metadata: log.metadata.trigger_metadata.clone(),
        runtime_params: log.metadata.runtime_params.clone(),
        nodes_total: log.metadata.nodes_total,
        // Legacy rows never tracked the counter
        nodes_executed: log.metadata.nodes_executed.max(log.node_results.len()),
        nodes_successful: log.node_results.iter().filter(|result| result.success).count(),
        node_results: log.node_results.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::types::ExecutionMetadata;
    use chrono::Duration;

    fn result(success: bool) -> NodeResult {
        NodeResult {
            success,
            ..Default::default()
        }
    }

    #[test]
    fn test_running_log_has_no_duration() {
        let log = ExecutionLog::start("wf", ExecutionMetadata::default());
        let view = expand_details(&log, None);

        assert_eq!(view.execution_time_seconds, None);
        assert_eq!(view.trigger_source, "unknown");
        assert_eq!(view.workflow_name, None);
    }

    #[test]
    fn test_finished_log_figures() {
        let mut log = ExecutionLog::start(
            "wf",
            ExecutionMetadata {
                trigger_source: Some("webhook".to_string()),
                nodes_total: 3,
                nodes_executed: 2,
                ..Default::default()
            },
        );
        log.completed_at = Some(log.started_at + Duration::milliseconds(2500));
        log.status = ExecutionStatus::Failed;
        log.node_results = vec![result(true), result(false)];

        let view = expand_details(&log, Some("sync"));

        assert_eq!(view.execution_time_seconds, Some(2.5));
        assert_eq!(view.trigger_source, "webhook");
        assert_eq!(view.workflow_name.as_deref(), Some("sync"));
        assert_eq!(view.nodes_successful, 1);
        assert_eq!(view.nodes_executed, 2);
        assert_eq!(view.nodes_total, 3);
    }
}
