/// Server setup and initialization
///
/// Wires together all components: storage, integration registry, execution
/// engine, scheduler and HTTP routes.

use crate::{
    api::{create_router, AppState},
    config::Config,
    connector::ConnectorRegistry,
    database,
    execution::store::{ExecutionLogStore, SqliteExecutionLogStore},
    integration::{registry::IntegrationRegistry, storage::IntegrationStorage},
    runtime::{engine::ExecutionEngine, executor::NodeExecutor, scheduler::CronSchedulerService},
    workflow::storage::WorkflowStorage,
};
use anyhow::Result;
use axum::Router;
use sqlx::SqlitePool;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Build the shared application state over an initialized pool.
///
/// The scheduler is created but not started.
pub async fn build_state(pool: SqlitePool, connectors: ConnectorRegistry, node_timeout: Duration) -> Result<AppState> {
    let connectors = Arc::new(connectors);
    let workflows = WorkflowStorage::new(pool.clone());
    let integrations = IntegrationStorage::new(pool.clone());

    tracing::info!("🔌 Initializing integration registry");
    let registry = IntegrationRegistry::new(integrations.clone(), Arc::clone(&connectors), node_timeout);
    let seeded = registry.seed_builtin_types().await?;
    if seeded > 0 {
        tracing::info!("🌱 Seeded {} built-in integration types", seeded);
    }

    tracing::info!("🚀 Initializing execution engine");
    let executions: Arc<dyn ExecutionLogStore> = Arc::new(SqliteExecutionLogStore::new(pool));
    let executor = NodeExecutor::new(connectors, node_timeout);
    let engine = Arc::new(ExecutionEngine::new(
        workflows.clone(),
        integrations,
        Arc::clone(&executions),
        executor,
    ));

    tracing::info!("⏰ Initializing cron scheduler service");
    let scheduler = Arc::new(
        CronSchedulerService::new(workflows.clone(), Arc::clone(&engine))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize cron scheduler: {}", e))?,
    );

    Ok(AppState {
        workflows,
        registry,
        engine,
        executions,
        scheduler,
    })
}

/// Create the main Axum application with all routes
pub async fn create_app(config: Config) -> Result<Router> {
    let pool = database::connect(&config.database).await?;
    let state = build_state(pool, ConnectorRegistry::with_builtins(), config.engine.node_timeout()).await?;

    tracing::info!("🚀 Starting cron scheduler");
    let scheduler = Arc::clone(&state.scheduler);
    tokio::spawn(async move {
        if let Err(e) = scheduler.start().await {
            tracing::error!("❌ Failed to start cron scheduler: {}", e);
        }
    });

    tracing::info!("✅ Application initialized successfully");
    Ok(create_router(state))
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting linkflow server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
