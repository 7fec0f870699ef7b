/// Integration catalog REST API endpoints
///
/// Integration types describe what a connector needs and can do; integrations
/// bind credentials to a type. Credentials are write-only through this API.

use crate::{
    api::{error::ApiResult, AppState},
    integration::{
        schema::ParamMap,
        types::{Integration, IntegrationType, NewIntegrationType, TestConnectionResult},
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Integration as exposed over HTTP, without credentials
#[derive(Debug, Serialize)]
pub struct IntegrationView {
    pub id: String,
    pub name: String,
    pub integration_type_id: String,
    pub integration_type_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IntegrationView {
    fn new(integration: Integration, integration_type_name: Option<String>) -> Self {
        Self {
            id: integration.id,
            name: integration.name,
            integration_type_id: integration.integration_type_id,
            integration_type_name,
            is_active: integration.is_active,
            created_at: integration.created_at,
            updated_at: integration.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateIntegrationRequest {
    pub name: String,
    pub integration_type_id: String,
    #[serde(default)]
    pub credentials: ParamMap,
}

#[derive(Debug, Deserialize)]
pub struct TestConnectionRequest {
    pub integration_type_id: String,
    #[serde(default)]
    pub credentials: ParamMap,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

pub fn create_integration_routes() -> Router<AppState> {
    Router::new()
        .route("/api/integration-types", post(create_integration_type).get(list_integration_types))
        .route(
            "/api/integration-types/{id}",
            get(get_integration_type).delete(delete_integration_type),
        )
        .route("/api/integrations/test", post(test_connection))
        .route("/api/integrations", post(create_integration).get(list_integrations))
        .route("/api/integrations/{id}", get(get_integration).delete(delete_integration))
        .route("/api/integrations/{id}/active", put(set_integration_active))
}

/// POST /api/integration-types
async fn create_integration_type(
    State(state): State<AppState>,
    Json(payload): Json<NewIntegrationType>,
) -> ApiResult<(StatusCode, Json<IntegrationType>)> {
    let integration_type = state.registry.create_type(payload).await?;
    Ok((StatusCode::CREATED, Json(integration_type)))
}

/// GET /api/integration-types
async fn list_integration_types(State(state): State<AppState>) -> ApiResult<Json<Vec<IntegrationType>>> {
    Ok(Json(state.registry.list_types().await?))
}

/// GET /api/integration-types/{id}
async fn get_integration_type(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<IntegrationType>> {
    Ok(Json(state.registry.get_type(&id).await?))
}

/// DELETE /api/integration-types/{id}
async fn delete_integration_type(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    state.registry.delete_type(&id).await?;
    Ok(Json(json!({ "message": "Integration type deleted successfully" })))
}

/// POST /api/integrations/test
///
/// Probes credentials against the connector; nothing is stored.
async fn test_connection(
    State(state): State<AppState>,
    Json(payload): Json<TestConnectionRequest>,
) -> ApiResult<Json<TestConnectionResult>> {
    let result = state
        .registry
        .test_connection(&payload.integration_type_id, &payload.credentials)
        .await?;
    Ok(Json(result))
}

/// POST /api/integrations
async fn create_integration(
    State(state): State<AppState>,
    Json(payload): Json<CreateIntegrationRequest>,
) -> ApiResult<(StatusCode, Json<IntegrationView>)> {
    let integration = state
        .registry
        .create_integration(&payload.name, &payload.integration_type_id, &payload.credentials)
        .await?;
    let type_name = state
        .registry
        .find_type(&integration.integration_type_id)
        .await?
        .map(|t| t.name);
    Ok((StatusCode::CREATED, Json(IntegrationView::new(integration, type_name))))
}

/// GET /api/integrations
async fn list_integrations(State(state): State<AppState>) -> ApiResult<Json<Vec<IntegrationView>>> {
    let types = state.registry.list_types().await?;
    let views = state
        .registry
        .list_integrations()
        .await?
        .into_iter()
        .map(|integration| {
            let type_name = types
                .iter()
                .find(|t| t.id == integration.integration_type_id)
                .map(|t| t.name.clone());
            IntegrationView::new(integration, type_name)
        })
        .collect();
    Ok(Json(views))
}

/// GET /api/integrations/{id}
async fn get_integration(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<IntegrationView>> {
    let integration = state.registry.get_integration(&id).await?;
    let type_name = state
        .registry
        .find_type(&integration.integration_type_id)
        .await?
        .map(|t| t.name);
    Ok(Json(IntegrationView::new(integration, type_name)))
}

/// DELETE /api/integrations/{id}
async fn delete_integration(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    state.registry.delete_integration(&id).await?;
    Ok(Json(json!({ "message": "Integration deleted successfully" })))
}

/// PUT /api/integrations/{id}/active
async fn set_integration_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SetActiveRequest>,
) -> ApiResult<Json<IntegrationView>> {
    let integration = state.registry.set_active(&id, payload.is_active).await?;
    let type_name = state
        .registry
        .find_type(&integration.integration_type_id)
        .await?
        .map(|t| t.name);
    Ok(Json(IntegrationView::new(integration, type_name)))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::spawn_app;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_connection_endpoint_never_persists() {
        let app = spawn_app().await;
        let (type_id, _) = app.echo_integration().await;

        let ok: Value = app
            .client
            .post(app.url("/api/integrations/test"))
            .json(&json!({"integration_type_id": type_id, "credentials": {"api_key": "valid"}}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(ok["success"], true);

        let missing: Value = app
            .client
            .post(app.url("/api/integrations/test"))
            .json(&json!({"integration_type_id": type_id, "credentials": {}}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(missing["success"], false);
        assert!(missing["message"].as_str().unwrap().contains("api_key"));

        let listed: Vec<Value> = app
            .client
            .get(app.url("/api/integrations"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_credentials_are_never_returned() {
        let app = spawn_app().await;
        let (_, integration_id) = app.echo_integration().await;

        let integration: Value = app
            .client
            .get(app.url(&format!("/api/integrations/{}", integration_id)))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(integration["integration_type_name"], "echo");
        assert!(integration.get("credentials").is_none());
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let app = spawn_app().await;
        let (type_id, integration_id) = app.echo_integration().await;

        let response = app
            .client
            .post(app.url("/api/integrations"))
            .json(&json!({"name": "bad", "integration_type_id": type_id, "credentials": {"api_key": 42}}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().contains("api_key"));

        let response = app
            .client
            .delete(app.url(&format!("/api/integration-types/{}", type_id)))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 409);

        let response = app.client.get(app.url("/api/integrations/nope")).send().await.unwrap();
        assert_eq!(response.status(), 404);

        let response = app
            .client
            .put(app.url(&format!("/api/integrations/{}/active", integration_id)))
            .json(&json!({"is_active": false}))
            .send()
            .await
            .unwrap();
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["is_active"], false);
    }
}
