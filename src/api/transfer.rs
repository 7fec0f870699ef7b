/// Import/export of definitions between environments
///
/// Exports carry integration types, integrations (never their credentials) and
/// workflows. Imports match existing records by name and report per-item
/// errors instead of aborting.

use crate::{
    api::{error::ApiResult, AppState},
    integration::{
        schema::ParameterSpec,
        types::{IntegrationType, NewIntegrationType, TaskSpec},
    },
    runtime::scheduler::validate_schedule,
    workflow::types::{Workflow, WorkflowDraft, WorkflowGraph, WorkflowPatch},
};
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const EXPORT_VERSION: &str = "1.0";
pub const CREDENTIALS_TEMPLATE: &str = "REPLACE_WITH_YOUR_CREDENTIALS";

#[derive(Debug, Serialize)]
pub struct ExportedIntegrationType {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
    pub tasks: Vec<TaskSpec>,
}

impl From<IntegrationType> for ExportedIntegrationType {
    fn from(integration_type: IntegrationType) -> Self {
        Self {
            name: integration_type.name,
            description: integration_type.description,
            parameters: integration_type.credential_schema,
            tasks: integration_type.tasks,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExportedIntegration {
    pub name: String,
    pub integration_type_name: String,
    pub is_active: bool,
    pub credentials_template: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ExportedWorkflow {
    pub name: String,
    pub description: String,
    pub workflow_data: WorkflowGraph,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

impl From<Workflow> for ExportedWorkflow {
    fn from(workflow: Workflow) -> Self {
        Self {
            name: workflow.name,
            description: workflow.description,
            workflow_data: workflow.graph,
            is_active: workflow.is_active,
            schedule: workflow.schedule,
        }
    }
}

/// Per-section import tally
#[derive(Debug, Default, Serialize)]
pub struct ImportCounts {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

impl ImportCounts {
    fn error(&mut self, item: &Value, message: impl std::fmt::Display) {
        let name = item.get("name").and_then(Value::as_str).unwrap_or("unknown");
        self.errors.push(format!("{}: {}", name, message));
    }
}

#[derive(Debug, Deserialize)]
pub struct ImportAllRequest {
    #[serde(default)]
    pub integration_types: Vec<Value>,
    #[serde(default)]
    pub integrations: Vec<Value>,
    #[serde(default)]
    pub workflows: Vec<Value>,
    #[serde(default = "default_skip_existing")]
    pub skip_existing: bool,
}

#[derive(Debug, Deserialize)]
pub struct ImportIntegrationTypesRequest {
    pub integration_types: Vec<Value>,
    #[serde(default = "default_skip_existing")]
    pub skip_existing: bool,
}

#[derive(Debug, Deserialize)]
pub struct ImportWorkflowsRequest {
    pub workflows: Vec<Value>,
    #[serde(default = "default_skip_existing")]
    pub skip_existing: bool,
}

#[derive(Debug, Deserialize)]
struct ImportedIntegration {
    name: String,
    integration_type_name: String,
}

fn default_skip_existing() -> bool {
    true
}

pub fn create_transfer_routes() -> Router<AppState> {
    Router::new()
        .route("/api/import-export/export/all", get(export_all))
        .route("/api/import-export/export/integration-types", get(export_integration_types))
        .route("/api/import-export/export/integrations", get(export_integrations))
        .route("/api/import-export/export/workflows", get(export_workflows))
        .route("/api/import-export/import/all", post(import_all))
        .route("/api/import-export/import/integration-types", post(import_integration_types))
        .route("/api/import-export/import/workflows", post(import_workflows))
}

async fn collect_types(state: &AppState) -> ApiResult<Vec<ExportedIntegrationType>> {
    Ok(state.registry.list_types().await?.into_iter().map(Into::into).collect())
}

async fn collect_integrations(state: &AppState) -> ApiResult<Vec<ExportedIntegration>> {
    let types = state.registry.list_types().await?;
    Ok(state
        .registry
        .list_integrations()
        .await?
        .into_iter()
        .map(|integration| ExportedIntegration {
            integration_type_name: types
                .iter()
                .find(|t| t.id == integration.integration_type_id)
                .map(|t| t.name.clone())
                .unwrap_or_default(),
            name: integration.name,
            is_active: integration.is_active,
            credentials_template: CREDENTIALS_TEMPLATE,
        })
        .collect())
}

async fn collect_workflows(state: &AppState) -> ApiResult<Vec<ExportedWorkflow>> {
    Ok(state.workflows.list_workflows().await?.into_iter().map(Into::into).collect())
}

/// GET /api/import-export/export/all
async fn export_all(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(Json(json!({
        "version": EXPORT_VERSION,
        "exported_at": Utc::now(),
        "integration_types": collect_types(&state).await?,
        "integrations": collect_integrations(&state).await?,
        "workflows": collect_workflows(&state).await?,
    })))
}

async fn export_integration_types(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(Json(json!({
        "version": EXPORT_VERSION,
        "exported_at": Utc::now(),
        "integration_types": collect_types(&state).await?,
    })))
}

async fn export_integrations(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(Json(json!({
        "version": EXPORT_VERSION,
        "exported_at": Utc::now(),
        "integrations": collect_integrations(&state).await?,
    })))
}

async fn export_workflows(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(Json(json!({
        "version": EXPORT_VERSION,
        "exported_at": Utc::now(),
        "workflows": collect_workflows(&state).await?,
    })))
}

async fn import_types(state: &AppState, items: &[Value], skip_existing: bool) -> ImportCounts {
    let mut counts = ImportCounts::default();
    for item in items {
        let definition: NewIntegrationType = match serde_json::from_value(item.clone()) {
            Ok(definition) => definition,
            Err(e) => {
                counts.error(item, e);
                continue;
            }
        };

        let outcome = match state.registry.find_type_by_name(&definition.name).await {
            Ok(Some(_)) if skip_existing => {
                counts.skipped += 1;
                continue;
            }
            Ok(Some(existing)) => state.registry.replace_type(&existing, definition).await.map(|_| ()),
            Ok(None) => state.registry.create_type(definition).await.map(|_| ()),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => counts.imported += 1,
            Err(e) => counts.error(item, e),
        }
    }
    counts
}

/// Integrations are never created from an export: credentials are not in it
async fn import_integrations(state: &AppState, items: &[Value], skip_existing: bool) -> ImportCounts {
    let mut counts = ImportCounts::default();
    for item in items {
        let imported: ImportedIntegration = match serde_json::from_value(item.clone()) {
            Ok(imported) => imported,
            Err(e) => {
                counts.error(item, e);
                continue;
            }
        };

        let integration_type = match state.registry.find_type_by_name(&imported.integration_type_name).await {
            Ok(Some(integration_type)) => integration_type,
            Ok(None) => {
                counts.error(
                    item,
                    format!("Integration type '{}' not found", imported.integration_type_name),
                );
                continue;
            }
            Err(e) => {
                counts.error(item, e);
                continue;
            }
        };

        match state
            .registry
            .storage()
            .find_integration_by_name(&imported.name, &integration_type.id)
            .await
        {
            Ok(Some(_)) if skip_existing => counts.skipped += 1,
            Ok(Some(_)) => {}
            Ok(None) => {
                counts.error(item, "Skipped - credentials must be configured manually");
                counts.skipped += 1;
            }
            Err(e) => counts.error(item, e),
        }
    }
    counts
}

async fn import_workflow_items(state: &AppState, items: &[Value], skip_existing: bool) -> ImportCounts {
    let mut counts = ImportCounts::default();
    for item in items {
        let draft: WorkflowDraft = match serde_json::from_value(item.clone()) {
            Ok(draft) => draft,
            Err(e) => {
                counts.error(item, e);
                continue;
            }
        };
        if let Some(Err(e)) = draft.schedule.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(validate_schedule) {
            counts.error(item, e);
            continue;
        }

        let workflow = match state.workflows.find_by_name(&draft.name).await {
            Ok(Some(_)) if skip_existing => {
                counts.skipped += 1;
                continue;
            }
            Ok(Some(mut existing)) => {
                existing.apply(WorkflowPatch {
                    name: None,
                    description: Some(draft.description),
                    graph: Some(draft.graph),
                    is_active: Some(draft.is_active),
                    schedule: Some(draft.schedule),
                });
                existing
            }
            Ok(None) => Workflow::from_draft(draft),
            Err(e) => {
                counts.error(item, e);
                continue;
            }
        };

        let saved = async {
            state.workflows.save_workflow(&workflow).await?;
            state.scheduler.sync_workflow(&workflow).await
        };
        match saved.await {
            Ok(()) => counts.imported += 1,
            Err(e) => counts.error(item, e),
        }
    }
    counts
}

/// POST /api/import-export/import/all
async fn import_all(State(state): State<AppState>, Json(request): Json<ImportAllRequest>) -> Json<Value> {
    let integration_types = import_types(&state, &request.integration_types, request.skip_existing).await;
    let integrations = import_integrations(&state, &request.integrations, request.skip_existing).await;
    let workflows = import_workflow_items(&state, &request.workflows, request.skip_existing).await;

    tracing::info!(
        types = integration_types.imported,
        workflows = workflows.imported,
        "📥 Import completed"
    );
    Json(json!({
        "success": true,
        "message": "Import completed",
        "results": {
            "integration_types": integration_types,
            "integrations": integrations,
            "workflows": workflows,
        }
    }))
}

async fn import_integration_types(
    State(state): State<AppState>,
    Json(request): Json<ImportIntegrationTypesRequest>,
) -> Json<Value> {
    let counts = import_types(&state, &request.integration_types, request.skip_existing).await;
    Json(json!({
        "success": true,
        "imported": counts.imported,
        "skipped": counts.skipped,
        "errors": counts.errors,
    }))
}

async fn import_workflows(State(state): State<AppState>, Json(request): Json<ImportWorkflowsRequest>) -> Json<Value> {
    let counts = import_workflow_items(&state, &request.workflows, request.skip_existing).await;
    Json(json!({
        "success": true,
        "imported": counts.imported,
        "skipped": counts.skipped,
        "errors": counts.errors,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::spawn_app;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_export_omits_credentials() {
        let app = spawn_app().await;
        let (_, integration_id) = app.echo_integration().await;
        app.create_workflow(json!({
            "name": "exported",
            "graph": {"nodes": [{"id": "n1", "integration_id": integration_id, "task": "say"}]}
        }))
        .await;

        let export: Value = app
            .client
            .get(app.url("/api/import-export/export/all"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(export["version"], "1.0");
        assert!(export["exported_at"].is_string());
        let integration = &export["integrations"][0];
        assert_eq!(integration["integration_type_name"], "echo");
        assert_eq!(integration["credentials_template"], "REPLACE_WITH_YOUR_CREDENTIALS");
        assert!(integration.get("credentials").is_none());
        assert!(!export.to_string().contains("api_key\":\"valid"));
        assert_eq!(export["workflows"][0]["workflow_data"]["nodes"][0]["id"], "n1");
    }

    #[tokio::test]
    async fn test_import_skips_existing_and_integrations() {
        let app = spawn_app().await;
        app.echo_integration().await;
        app.create_workflow(json!({"name": "existing"})).await;

        let report: Value = app
            .client
            .post(app.url("/api/import-export/import/all"))
            .json(&json!({
                "integration_types": [
                    {"name": "echo", "parameters": []},
                    {"name": "queue", "description": "new", "parameters": [{"name": "url", "type": "string"}]},
                    {"description": "nameless"}
                ],
                "integrations": [
                    {"name": "echo-main", "integration_type_name": "echo", "is_active": true},
                    {"name": "fresh", "integration_type_name": "queue", "is_active": true},
                    {"name": "orphan", "integration_type_name": "missing", "is_active": true}
                ],
                "workflows": [
                    {"name": "existing", "workflow_data": {"nodes": [], "connections": []}},
                    {"name": "brand-new", "workflow_data": {"nodes": [], "connections": []}, "is_active": false}
                ]
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let results = &report["results"];
        assert_eq!(results["integration_types"]["imported"], 1);
        assert_eq!(results["integration_types"]["skipped"], 1);
        assert_eq!(results["integration_types"]["errors"].as_array().unwrap().len(), 1);

        assert_eq!(results["integrations"]["skipped"], 2);
        let errors = results["integrations"]["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].as_str().unwrap().contains("credentials must be configured manually"));

        assert_eq!(results["workflows"]["imported"], 1);
        assert_eq!(results["workflows"]["skipped"], 1);

        let workflows: Vec<Value> = app
            .client
            .get(app.url("/api/workflows"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(workflows.len(), 2);
    }

    #[tokio::test]
    async fn test_import_without_skip_replaces_by_name() {
        let app = spawn_app().await;
        app.create_workflow(json!({"name": "nightly", "description": "old"})).await;

        let report: Value = app
            .client
            .post(app.url("/api/import-export/import/workflows"))
            .json(&json!({
                "skip_existing": false,
                "workflows": [{"name": "nightly", "description": "new", "workflow_data": {"nodes": []}}]
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(report["imported"], 1);

        let workflows: Vec<Value> = app
            .client
            .get(app.url("/api/workflows"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(workflows.len(), 1);
        assert_eq!(workflows[0]["description"], "new");
    }
}
