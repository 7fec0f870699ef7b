/// Node execution against connectors
///
/// The engine resolves every integration a workflow references once, up front,
/// into an `ExecutionSnapshot`. `NodeExecutor` runs one node against that
/// snapshot and always produces a `NodeResult`; connector faults, missing
/// integrations and deadlines become failed results instead of errors.

use crate::{
    connector::{ConnectorRegistry, TaskInvocation, TaskOutcome},
    execution::types::NodeResult,
    integration::{
        error::RegistryError,
        schema::{validate_values, ParamMap},
        storage::IntegrationStorage,
        types::{Integration, IntegrationType},
    },
    workflow::types::{WorkflowGraph, WorkflowNode},
};
use chrono::Utc;
use indexmap::IndexMap;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc, time::Duration, time::Instant};

/// Message recorded for a node whose integration is missing or deactivated
pub const INTEGRATION_UNAVAILABLE: &str = "integration unavailable";

/// Message recorded for a node that missed its deadline
pub const TIMED_OUT: &str = "timed out";

/// An integration together with its type, as loaded at execution start
#[derive(Debug, Clone)]
pub struct ResolvedIntegration {
    pub integration: Integration,
    pub integration_type: IntegrationType,
}

impl ResolvedIntegration {
    /// Merge runtime params into the node's params and check them against the task.
    ///
    /// Runtime params only override keys the task declares; a task without a
    /// parameter schema takes them all. Types that declare no tasks accept any task.
    pub fn prepare_params(&self, node: &WorkflowNode, runtime_params: &ParamMap) -> Result<ParamMap, String> {
        let task = self.integration_type.task(&node.task);
        if task.is_none() && !self.integration_type.tasks.is_empty() {
            return Err(format!(
                "node '{}': task '{}' is not declared by integration type '{}'",
                node.id, node.task, self.integration_type.name
            ));
        }

        let schema = task.map(|task| task.parameters.as_slice()).unwrap_or_default();
        let mut params = node.params.clone();
        for (key, value) in runtime_params {
            if schema.is_empty() || schema.iter().any(|spec| spec.name == *key) {
                params.insert(key.clone(), value.clone());
            }
        }

        if schema.is_empty() {
            return Ok(params);
        }
        validate_values(schema, &params).map_err(|err| format!("node '{}': invalid params: {}", node.id, err))
    }
}

/// Immutable view of the integrations a workflow references
#[derive(Debug, Clone, Default)]
pub struct ExecutionSnapshot {
    integrations: HashMap<String, ResolvedIntegration>,
}

impl ExecutionSnapshot {
    /// Load every integration referenced by the graph. Missing ones are simply absent.
    pub async fn load(storage: &IntegrationStorage, graph: &WorkflowGraph) -> Result<Self, RegistryError> {
        let mut integrations = HashMap::new();
        for node in &graph.nodes {
            if integrations.contains_key(&node.integration_id) {
                continue;
            }
            let Some(integration) = storage.get_integration(&node.integration_id).await? else {
                continue;
            };
            let Some(integration_type) = storage.get_type(&integration.integration_type_id).await? else {
                continue;
            };
            integrations.insert(
                node.integration_id.clone(),
                ResolvedIntegration {
                    integration,
                    integration_type,
                },
            );
        }
        Ok(Self { integrations })
    }

    pub fn get(&self, integration_id: &str) -> Option<&ResolvedIntegration> {
        self.integrations.get(integration_id)
    }

    /// Present and active
    pub fn available(&self, integration_id: &str) -> Option<&ResolvedIntegration> {
        self.get(integration_id).filter(|resolved| resolved.integration.is_active)
    }
}

/// Runs single nodes through the connector registry under a deadline
#[derive(Debug, Clone)]
pub struct NodeExecutor {
    connectors: Arc<ConnectorRegistry>,
    node_timeout: Duration,
}

impl NodeExecutor {
    pub fn new(connectors: Arc<ConnectorRegistry>, node_timeout: Duration) -> Self {
        Self {
            connectors,
            node_timeout,
        }
    }

    /// Execute one node and record the outcome
    pub async fn execute_node(
        &self,
        node: &WorkflowNode,
        params: ParamMap,
        upstream: IndexMap<String, Value>,
        snapshot: &ExecutionSnapshot,
    ) -> NodeResult {
        tracing::debug!(node_id = %node.id, task = %node.task, "executing node");
        let started = Instant::now();

        let outcome = match self.invoke(node, params, upstream, snapshot).await {
            Ok(outcome) => outcome,
            Err(message) => TaskOutcome::failed(message),
        };

        let result = NodeResult {
            node_id: node.id.clone(),
            task: node.task.clone(),
            integration_id: node.integration_id.clone(),
            success: outcome.success,
            message: outcome.message,
            data: outcome.data,
            execution_time_seconds: started.elapsed().as_secs_f64(),
            timestamp: Utc::now(),
        };

        if result.success {
            tracing::info!(node_id = %node.id, elapsed = result.execution_time_seconds, "node completed");
        } else {
            tracing::warn!(node_id = %node.id, message = %result.message, "node failed");
        }
        result
    }

    async fn invoke(
        &self,
        node: &WorkflowNode,
        params: ParamMap,
        upstream: IndexMap<String, Value>,
        snapshot: &ExecutionSnapshot,
    ) -> Result<TaskOutcome, String> {
        let resolved = snapshot
            .available(&node.integration_id)
            .ok_or_else(|| INTEGRATION_UNAVAILABLE.to_string())?;

        let type_name = &resolved.integration_type.name;
        let connector = self
            .connectors
            .get(type_name)
            .ok_or_else(|| format!("no connector registered for integration type '{}'", type_name))?;

        let invocation = TaskInvocation {
            task: node.task.clone(),
            credentials: resolved.integration.credentials.clone(),
            params,
            upstream,
        };

        match tokio::time::timeout(self.node_timeout, connector.invoke(invocation)).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err(TIMED_OUT.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::schema::{ParameterKind, ParameterSpec};
    use crate::integration::types::TaskSpec;
    use serde_json::json;

    fn resolved(tasks: Vec<TaskSpec>) -> ResolvedIntegration {
        let now = Utc::now();
        ResolvedIntegration {
            integration: Integration {
                id: "int-1".to_string(),
                name: "mail".to_string(),
                integration_type_id: "type-1".to_string(),
                credentials: ParamMap::new(),
                is_active: true,
                created_at: now,
                updated_at: now,
            },
            integration_type: IntegrationType {
                id: "type-1".to_string(),
                name: "mailer".to_string(),
                description: String::new(),
                credential_schema: vec![],
                tasks,
                created_at: now,
            },
        }
    }

    fn send_task() -> TaskSpec {
        TaskSpec {
            name: "send".to_string(),
            display_name: "Send".to_string(),
            description: String::new(),
            parameters: vec![
                ParameterSpec {
                    name: "to".to_string(),
                    kind: ParameterKind::String,
                    required: true,
                    description: String::new(),
                },
                ParameterSpec {
                    name: "retries".to_string(),
                    kind: ParameterKind::Number,
                    required: false,
                    description: String::new(),
                },
            ],
        }
    }

    fn node(task: &str, params: serde_json::Value) -> WorkflowNode {
        WorkflowNode {
            id: "n1".to_string(),
            integration_id: "int-1".to_string(),
            task: task.to_string(),
            params: serde_json::from_value(params).unwrap(),
            position: Default::default(),
        }
    }

    fn params(value: serde_json::Value) -> ParamMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_runtime_params_override_declared_keys_only() {
        let resolved = resolved(vec![send_task()]);
        let merged = resolved
            .prepare_params(
                &node("send", json!({"to": "a@example.com"})),
                &params(json!({"to": "b@example.com", "retries": "3", "debug": true})),
            )
            .unwrap();

        assert_eq!(merged["to"], json!("b@example.com"));
        assert_eq!(merged["retries"], json!(3));
        assert!(!merged.contains_key("debug"));
    }

    #[test]
    fn test_undeclared_task_and_bad_params_are_rejected() {
        let resolved = resolved(vec![send_task()]);

        let err = resolved.prepare_params(&node("archive", json!({})), &ParamMap::new()).unwrap_err();
        assert!(err.contains("archive"));

        let err = resolved.prepare_params(&node("send", json!({})), &ParamMap::new()).unwrap_err();
        assert!(err.contains("to"));
    }

    #[test]
    fn test_open_types_accept_any_task_and_params() {
        let resolved = resolved(vec![]);
        let merged = resolved
            .prepare_params(&node("anything", json!({"a": 1})), &params(json!({"b": 2})))
            .unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_integration_is_unavailable() {
        let executor = NodeExecutor::new(Arc::new(ConnectorRegistry::new()), Duration::from_secs(1));
        let result = executor
            .execute_node(&node("send", json!({})), ParamMap::new(), IndexMap::new(), &ExecutionSnapshot::default())
            .await;

        assert!(!result.success);
        assert_eq!(result.message, INTEGRATION_UNAVAILABLE);
        assert_eq!(result.node_id, "n1");
    }
}
