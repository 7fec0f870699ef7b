/// Petgraph-based workflow execution engine
///
/// Validates a stored workflow, resolves its integrations into a snapshot and
/// walks the nodes in topological order, fail-fast. Every run is recorded in the
/// execution log store: created `running`, one result appended per attempted
/// node, finalized exactly once.

use crate::{
    execution::{
        store::{ExecutionLogStore, StoreError},
        types::{ExecutionLog, ExecutionMetadata, ExecutionStatus},
    },
    integration::{schema::ParamMap, storage::IntegrationStorage},
    runtime::executor::{ExecutionSnapshot, NodeExecutor},
    workflow::{
        graph,
        storage::WorkflowStorage,
        types::{WorkflowGraph, WorkflowNode},
    },
};
use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections::HashMap, sync::Arc};

/// Where an execution request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    Manual,
    Api,
    Webhook,
    Scheduled,
}

impl TriggerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSource::Manual => "manual",
            TriggerSource::Api => "api",
            TriggerSource::Webhook => "webhook",
            TriggerSource::Scheduled => "scheduled",
        }
    }
}

/// Origin of an execution plus the inputs it carries
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub source: TriggerSource,
    pub metadata: Map<String, Value>,
    pub runtime_params: ParamMap,
}

impl Trigger {
    pub fn new(source: TriggerSource) -> Self {
        Self {
            source,
            metadata: Map::new(),
            runtime_params: ParamMap::new(),
        }
    }

    pub fn manual() -> Self {
        Self::new(TriggerSource::Manual)
    }

    pub fn scheduled() -> Self {
        Self::new(TriggerSource::Scheduled)
    }

    pub fn with_params(mut self, runtime_params: ParamMap) -> Self {
        self.runtime_params = runtime_params;
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("execution log persistence failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("failed to load workflow definitions: {0}")]
    Storage(#[from] anyhow::Error),

    #[error("execution task aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

/// A node ready to run with its final params
struct PlannedNode<'a> {
    node: &'a WorkflowNode,
    params: ParamMap,
}

/// Workflow execution engine
#[derive(Clone)]
pub struct ExecutionEngine {
    workflows: WorkflowStorage,
    integrations: IntegrationStorage,
    store: Arc<dyn ExecutionLogStore>,
    executor: NodeExecutor,
}

impl ExecutionEngine {
    pub fn new(
        workflows: WorkflowStorage,
        integrations: IntegrationStorage,
        store: Arc<dyn ExecutionLogStore>,
        executor: NodeExecutor,
    ) -> Self {
        Self {
            workflows,
            integrations,
            store,
            executor,
        }
    }

    pub fn store(&self) -> &Arc<dyn ExecutionLogStore> {
        &self.store
    }

    /// Run a stored workflow to completion and return its finalized log.
    ///
    /// Node faults, structural faults and definition faults all end in a
    /// `failed` log. Only an unknown workflow or a storage failure is an `Err`.
    ///
    /// The run owns its own task: dropping the returned future (a client
    /// hanging up on a synchronous request) does not stop it, so the log is
    /// still finalized.
    pub async fn execute(&self, workflow_id: &str, trigger: Trigger) -> Result<ExecutionLog, EngineError> {
        let engine = self.clone();
        let workflow_id = workflow_id.to_string();
        tokio::spawn(async move { engine.run(&workflow_id, trigger).await }).await?
    }

    async fn run(&self, workflow_id: &str, trigger: Trigger) -> Result<ExecutionLog, EngineError> {
        let workflow = self
            .workflows
            .get_workflow(workflow_id)
            .await?
            .ok_or_else(|| EngineError::WorkflowNotFound(workflow_id.to_string()))?;

        let snapshot = ExecutionSnapshot::load(&self.integrations, &workflow.graph)
            .await
            .map_err(|err| EngineError::Storage(err.into()))?;

        let log = ExecutionLog::start(
            &workflow.id,
            ExecutionMetadata {
                trigger_source: Some(trigger.source.as_str().to_string()),
                trigger_metadata: trigger.metadata.clone(),
                runtime_params: trigger.runtime_params.clone(),
                nodes_executed: 0,
                nodes_total: workflow.graph.nodes.len(),
            },
        );
        self.store.create(&log).await?;

        tracing::info!(
            execution_id = %log.id,
            workflow_id = %workflow.id,
            trigger = trigger.source.as_str(),
            nodes = workflow.graph.nodes.len(),
            "starting workflow execution"
        );

        let plan = match prepare_plan(&workflow.graph, &snapshot, &trigger.runtime_params) {
            Ok(plan) => plan,
            Err(fault) => {
                tracing::warn!(execution_id = %log.id, "workflow rejected before running: {}", fault);
                return Ok(self
                    .store
                    .finalize(&log.id, ExecutionStatus::Failed, Some(&fault), Utc::now())
                    .await?);
            }
        };

        let upstream_of = graph::predecessors(&workflow.graph);
        let mut outputs: HashMap<&str, Value> = HashMap::new();
        let mut failure: Option<String> = None;

        for (step, planned) in plan.into_iter().enumerate() {
            let node = planned.node;
            tracing::debug!(execution_id = %log.id, step = step + 1, node_id = %node.id, "running node");

            let upstream: IndexMap<String, Value> = upstream_of
                .get(node.id.as_str())
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| outputs.get(id).map(|data| (id.to_string(), data.clone())))
                        .collect()
                })
                .unwrap_or_default();

            let result = self
                .executor
                .execute_node(node, planned.params, upstream, &snapshot)
                .await;
            self.store.append_node_result(&log.id, &result).await?;

            if !result.success {
                failure = Some(result.message);
                break;
            }
            outputs.insert(node.id.as_str(), Value::Object(result.data));
        }

        let (status, error_message) = match failure {
            Some(message) => (ExecutionStatus::Failed, Some(message)),
            None => (ExecutionStatus::Success, None),
        };
        let finished = self
            .store
            .finalize(&log.id, status, error_message.as_deref(), Utc::now())
            .await?;

        tracing::info!(
            execution_id = %finished.id,
            workflow_id = %finished.workflow_id,
            status = %finished.status,
            nodes_executed = finished.node_results.len(),
            "workflow execution finished"
        );
        Ok(finished)
    }
}

/// Order the nodes and settle their params; any fault here means nothing runs
fn prepare_plan<'a>(
    workflow_graph: &'a WorkflowGraph,
    snapshot: &ExecutionSnapshot,
    runtime_params: &ParamMap,
) -> Result<Vec<PlannedNode<'a>>, String> {
    let order = graph::validate(workflow_graph).map_err(|err| err.to_string())?;

    order
        .into_iter()
        .map(|node| -> Result<PlannedNode<'a>, String> {
            let params = match snapshot.get(&node.integration_id) {
                Some(resolved) => resolved.prepare_params(node, runtime_params)?,
                // Recorded as unavailable when the walk reaches it
                None => node.params.clone(),
            };
            Ok(PlannedNode { node, params })
        })
        .collect()
}
