/// SQLite database setup
///
/// Opens the single service database and creates every table on startup.
/// All stores share one connection pool.

use crate::{
    config::DatabaseConfig, execution::store::SqliteExecutionLogStore,
    integration::storage::IntegrationStorage, workflow::storage::WorkflowStorage,
};
use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::{path::Path, time::Duration};

/// Open (creating if missing) the service database and initialize its schema
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool> {
    std::fs::create_dir_all(&config.data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create data directory '{}': {}", config.data_dir, e))?;
    let db_path = Path::new(&config.data_dir).join(&config.file_name);

    tracing::info!("🗄️ Opening database: {}", db_path.display());

    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(10));
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;

    tracing::info!("✅ Database ready: {}", db_path.display());
    Ok(pool)
}

/// Private in-memory database, used by tests.
///
/// Every connection to `sqlite::memory:` is a separate database, so the pool is
/// capped at one connection.
pub async fn in_memory() -> Result<SqlitePool> {
    let options = "sqlite::memory:"
        .parse::<SqliteConnectOptions>()?
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables. Safe to call multiple times.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    WorkflowStorage::new(pool.clone()).init_schema().await?;
    IntegrationStorage::new(pool.clone()).init_schema().await?;
    SqliteExecutionLogStore::new(pool.clone()).init_schema().await?;
    Ok(())
}
