/// Workflow management REST API endpoints
///
/// CRUD over workflow definitions with scheduler hot-reload, structural
/// validation, manual/API execution and the editor format.

use crate::{
    api::{
        error::{ApiError, ApiResult},
        AppState,
    },
    execution::projection::{expand_details, DetailedExecutionView},
    integration::schema::ParamMap,
    runtime::{
        engine::{Trigger, TriggerSource},
        scheduler::validate_schedule,
    },
    workflow::{
        editor::{from_editor, to_editor, EditorGraph},
        graph,
        types::{Workflow, WorkflowDraft, WorkflowGraph, WorkflowPatch},
    },
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Optional body of an execute request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExecuteRequest {
    pub runtime_params: ParamMap,
    pub trigger_metadata: Map<String, Value>,
    pub trigger_source: Option<TriggerSource>,
}

/// Outcome of a structural check
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    /// Node ids in execution order when valid
    pub execution_order: Vec<String>,
    pub error: Option<String>,
}

pub fn create_workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows", post(create_workflow).get(list_workflows))
        .route("/api/workflows/validate", post(validate_workflow))
        .route(
            "/api/workflows/{id}",
            get(get_workflow).put(update_workflow).delete(delete_workflow),
        )
        .route("/api/workflows/{id}/execute", post(execute_workflow))
        .route("/api/workflows/{id}/executions", get(list_workflow_executions))
        .route("/api/workflows/{id}/editor", get(get_editor_graph).put(put_editor_graph))
}

fn check_definition(workflow: &Workflow) -> ApiResult<()> {
    if workflow.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Workflow name must not be empty".to_string()));
    }
    if let Some(schedule) = &workflow.schedule {
        validate_schedule(schedule).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    }
    Ok(())
}

async fn load(state: &AppState, id: &str) -> ApiResult<Workflow> {
    state
        .workflows
        .get_workflow(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Workflow not found: {}", id)))
}

/// Persist and hot-reload the schedule
async fn store(state: &AppState, workflow: &Workflow) -> ApiResult<()> {
    state.workflows.save_workflow(workflow).await?;
    state.scheduler.sync_workflow(workflow).await?;
    Ok(())
}

/// POST /api/workflows
///
/// Cyclic graphs are accepted here; they fail at execution time.
async fn create_workflow(
    State(state): State<AppState>,
    Json(payload): Json<WorkflowDraft>,
) -> ApiResult<(StatusCode, Json<Workflow>)> {
    let workflow = Workflow::from_draft(payload);
    check_definition(&workflow)?;
    store(&state, &workflow).await?;

    tracing::info!("🔥 Created workflow: {} ({})", workflow.id, workflow.name);
    Ok((StatusCode::CREATED, Json(workflow)))
}

/// GET /api/workflows
async fn list_workflows(State(state): State<AppState>) -> ApiResult<Json<Vec<Workflow>>> {
    Ok(Json(state.workflows.list_workflows().await?))
}

/// GET /api/workflows/{id}
async fn get_workflow(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Workflow>> {
    Ok(Json(load(&state, &id).await?))
}

/// PUT /api/workflows/{id}
async fn update_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<WorkflowPatch>,
) -> ApiResult<Json<Workflow>> {
    let mut workflow = load(&state, &id).await?;
    workflow.apply(patch);
    check_definition(&workflow)?;
    store(&state, &workflow).await?;

    tracing::info!("🔥 Updated workflow: {} ({})", workflow.id, workflow.name);
    Ok(Json(workflow))
}

/// DELETE /api/workflows/{id}
///
/// Execution history of the workflow is kept.
async fn delete_workflow(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    state.scheduler.remove_workflow(&id).await;

    if !state.workflows.delete_workflow(&id).await? {
        return Err(ApiError::NotFound(format!("Workflow not found: {}", id)));
    }
    tracing::info!("Deleted workflow: {}", id);
    Ok(Json(json!({ "message": "Workflow deleted successfully" })))
}

/// POST /api/workflows/validate
async fn validate_workflow(Json(graph_def): Json<WorkflowGraph>) -> Json<ValidationReport> {
    let report = match graph::validate(&graph_def) {
        Ok(order) => ValidationReport {
            valid: true,
            execution_order: order.into_iter().map(|node| node.id.clone()).collect(),
            error: None,
        },
        Err(err) => ValidationReport {
            valid: false,
            execution_order: Vec::new(),
            error: Some(err.to_string()),
        },
    };
    Json(report)
}

/// POST /api/workflows/{id}/execute
///
/// Body is optional: `{runtime_params, trigger_metadata, trigger_source}`.
async fn execute_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<DetailedExecutionView>> {
    let request: ExecuteRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ExecuteRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?
    };

    let trigger = Trigger::new(request.trigger_source.unwrap_or(TriggerSource::Manual))
        .with_params(request.runtime_params)
        .with_metadata(request.trigger_metadata);

    let log = state.engine.execute(&id, trigger).await?;
    let workflow_name = state.workflows.get_workflow(&id).await?.map(|w| w.name);
    Ok(Json(expand_details(&log, workflow_name.as_deref())))
}

/// GET /api/workflows/{id}/executions
async fn list_workflow_executions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<DetailedExecutionView>>> {
    let workflow = load(&state, &id).await?;
    let logs = state.executions.list(Some(&id)).await?;
    Ok(Json(
        logs.iter()
            .map(|log| expand_details(log, Some(&workflow.name)))
            .collect(),
    ))
}

/// GET /api/workflows/{id}/editor
async fn get_editor_graph(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<EditorGraph>> {
    let workflow = load(&state, &id).await?;
    Ok(Json(to_editor(&workflow.graph)))
}

/// PUT /api/workflows/{id}/editor
async fn put_editor_graph(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(editor): Json<EditorGraph>,
) -> ApiResult<Json<Workflow>> {
    let mut workflow = load(&state, &id).await?;
    workflow.apply(WorkflowPatch {
        graph: Some(from_editor(editor)),
        ..Default::default()
    });
    store(&state, &workflow).await?;
    Ok(Json(workflow))
}
