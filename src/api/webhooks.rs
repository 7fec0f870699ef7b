/// Webhook trigger endpoint
///
/// `POST /webhook/{workflow_id}` runs a workflow with the JSON object body as
/// runtime params. Paused workflows refuse webhook runs.

use crate::{
    api::{
        error::{ApiError, ApiResult},
        AppState,
    },
    execution::projection::{expand_details, DetailedExecutionView},
    integration::schema::ParamMap,
    runtime::engine::{Trigger, TriggerSource},
};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
    routing::post,
    Router,
};
use serde_json::{json, Map, Value};

pub fn create_webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook/{workflow_id}", post(execute_webhook))
}

async fn execute_webhook(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
    headers: HeaderMap,
    body: String,
) -> ApiResult<Json<DetailedExecutionView>> {
    tracing::info!("📥 Webhook request received: {}", workflow_id);
    tracing::debug!("📄 Request body: {}", body);

    let runtime_params = parse_payload(&body).map_err(|e| {
        tracing::warn!("❌ Invalid webhook payload for {}: {}", workflow_id, e);
        ApiError::BadRequest(e)
    })?;

    let workflow = state
        .workflows
        .get_workflow(&workflow_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Workflow not found: {}", workflow_id)))?;
    if !workflow.is_active {
        return Err(ApiError::Conflict(format!("Workflow '{}' is not active", workflow.name)));
    }

    let mut metadata = Map::new();
    if let Some(content_type) = headers.get("content-type").and_then(|v| v.to_str().ok()) {
        metadata.insert("content_type".to_string(), json!(content_type));
    }
    if let Some(user_agent) = headers.get("user-agent").and_then(|v| v.to_str().ok()) {
        metadata.insert("user_agent".to_string(), json!(user_agent));
    }

    let trigger = Trigger::new(TriggerSource::Webhook)
        .with_params(runtime_params)
        .with_metadata(metadata);
    let log = state.engine.execute(&workflow.id, trigger).await?;

    tracing::info!("🎉 Webhook execution {} finished: {}", log.id, log.status);
    Ok(Json(expand_details(&log, Some(&workflow.name))))
}

/// Empty body means no params; otherwise it must be a JSON object
fn parse_payload(body: &str) -> Result<ParamMap, String> {
    if body.trim().is_empty() {
        return Ok(ParamMap::new());
    }
    match serde_json::from_str::<ParamMap>(body) {
        Ok(params) => Ok(params),
        Err(_) if serde_json::from_str::<Value>(body).is_ok() => {
            Err("Webhook payload must be a JSON object".to_string())
        }
        Err(e) => Err(format!("Invalid JSON payload: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::spawn_app;

    #[test]
    fn test_parse_payload() {
        assert!(parse_payload("  ").unwrap().is_empty());
        assert_eq!(parse_payload(r#"{"b": 1, "a": 2}"#).unwrap().keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert!(parse_payload("[1, 2]").is_err());
        assert!(parse_payload("{oops").is_err());
    }

    #[tokio::test]
    async fn test_webhook_runs_active_workflows_only() {
        let app = spawn_app().await;
        let (_, integration_id) = app.echo_integration().await;
        let workflow_id = app
            .create_workflow(json!({
                "name": "hook",
                "graph": {"nodes": [{"id": "n1", "integration_id": integration_id, "task": "say"}]}
            }))
            .await;

        let view: Value = app
            .client
            .post(app.url(&format!("/webhook/{}", workflow_id)))
            .json(&json!({"text": "from hook"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(view["status"], "success");
        assert_eq!(view["trigger_source"], "webhook");
        assert_eq!(view["runtime_params"]["text"], "from hook");
        assert_eq!(view["trigger_metadata"]["content_type"], "application/json");
        assert_eq!(view["node_results"][0]["data"]["params"]["text"], "from hook");

        app.client
            .put(app.url(&format!("/api/workflows/{}", workflow_id)))
            .json(&json!({"is_active": false}))
            .send()
            .await
            .unwrap();
        let paused = app
            .client
            .post(app.url(&format!("/webhook/{}", workflow_id)))
            .send()
            .await
            .unwrap();
        assert_eq!(paused.status(), 409);

        let unknown = app.client.post(app.url("/webhook/ghost")).send().await.unwrap();
        assert_eq!(unknown.status(), 404);

        let bad = app
            .client
            .post(app.url(&format!("/webhook/{}", workflow_id)))
            .body("[]")
            .send()
            .await
            .unwrap();
        assert_eq!(bad.status(), 400);
    }
}
