/// Execution history REST API endpoints

use crate::{
    api::{
        error::{ApiError, ApiResult},
        AppState,
    },
    execution::projection::{expand_details, DetailedExecutionView},
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct ExecutionQuery {
    pub workflow_id: Option<String>,
}

pub fn create_execution_routes() -> Router<AppState> {
    Router::new()
        .route("/api/executions", get(list_executions))
        .route("/api/executions/{id}", get(get_execution))
}

/// GET /api/executions[?workflow_id=]
///
/// Newest first. Logs of deleted workflows are listed without a name.
async fn list_executions(
    State(state): State<AppState>,
    Query(query): Query<ExecutionQuery>,
) -> ApiResult<Json<Vec<DetailedExecutionView>>> {
    let names: HashMap<String, String> = state
        .workflows
        .list_workflows()
        .await?
        .into_iter()
        .map(|workflow| (workflow.id, workflow.name))
        .collect();

    let logs = state.executions.list(query.workflow_id.as_deref()).await?;
    Ok(Json(
        logs.iter()
            .map(|log| expand_details(log, names.get(&log.workflow_id).map(String::as_str)))
            .collect(),
    ))
}

/// GET /api/executions/{id}
async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DetailedExecutionView>> {
    let log = state
        .executions
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Execution not found: {}", id)))?;
    let workflow_name = state.workflows.get_workflow(&log.workflow_id).await?.map(|w| w.name);
    Ok(Json(expand_details(&log, workflow_name.as_deref())))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::spawn_app;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_history_outlives_workflow_and_reads_are_stable() {
        let app = spawn_app().await;
        let (_, integration_id) = app.echo_integration().await;
        let workflow_id = app
            .create_workflow(json!({
                "name": "once",
                "graph": {"nodes": [{"id": "n1", "integration_id": integration_id, "task": "say"}]}
            }))
            .await;
        let other_id = app.create_workflow(json!({"name": "empty"})).await;

        let run: Value = app
            .client
            .post(app.url(&format!("/api/workflows/{}/execute", workflow_id)))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        app.client
            .post(app.url(&format!("/api/workflows/{}/execute", other_id)))
            .send()
            .await
            .unwrap();

        let url = app.url(&format!("/api/executions/{}", run["id"].as_str().unwrap()));
        let first: Value = app.client.get(&url).send().await.unwrap().json().await.unwrap();
        let second: Value = app.client.get(&url).send().await.unwrap().json().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first["workflow_name"], "once");

        let filtered: Vec<Value> = app
            .client
            .get(app.url(&format!("/api/executions?workflow_id={}", workflow_id)))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);

        app.client
            .delete(app.url(&format!("/api/workflows/{}", workflow_id)))
            .send()
            .await
            .unwrap();

        let after: Value = app.client.get(&url).send().await.unwrap().json().await.unwrap();
        assert_eq!(after["status"], "success");
        assert_eq!(after["workflow_name"], Value::Null);

        let all: Vec<Value> = app
            .client
            .get(app.url("/api/executions"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let missing = app.client.get(app.url("/api/executions/ghost")).send().await.unwrap();
        assert_eq!(missing.status(), 404);
    }
}
