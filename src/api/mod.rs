/// HTTP API Layer
///
/// REST endpoints over the integration catalog, workflows and execution
/// history, plus the webhook trigger:
/// - Integration type and integration management, connection tests
/// - Workflow CRUD, validation, execution and editor conversion
/// - Execution log queries
/// - Import/export of definitions

// Error responses shared by every handler
pub mod error;

// Execution history endpoints
pub mod executions;

// Integration type and integration endpoints
pub mod integrations;

// Import/export endpoints
pub mod transfer;

// Webhook trigger endpoint
pub mod webhooks;

// Workflow management endpoints (POST/GET/PUT/DELETE)
pub mod workflows;

use crate::{
    execution::store::ExecutionLogStore,
    integration::registry::IntegrationRegistry,
    runtime::{engine::ExecutionEngine, scheduler::CronSchedulerService},
    workflow::storage::WorkflowStorage,
};
use axum::{routing::get, Router};
use std::sync::Arc;

pub use error::{ApiError, ApiResult};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Workflow definitions
    pub workflows: WorkflowStorage,
    /// Integration catalog and connection tests
    pub registry: IntegrationRegistry,
    /// Execution engine for running workflows
    pub engine: Arc<ExecutionEngine>,
    /// Execution history
    pub executions: Arc<dyn ExecutionLogStore>,
    /// Cron scheduler service, kept in sync with workflow changes
    pub scheduler: Arc<CronSchedulerService>,
}

/// Every route of the service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .merge(integrations::create_integration_routes())
        .merge(workflows::create_workflow_routes())
        .merge(executions::create_execution_routes())
        .merge(transfer::create_transfer_routes())
        .merge(webhooks::create_webhook_routes())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}
