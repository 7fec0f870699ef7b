/// Execution log persistence
///
/// One row per execution. Node results and metadata live in the
/// `execution_data` JSON column; status and timestamps are plain columns so
/// the terminal transition can be guarded in SQL.

use crate::execution::types::{ExecutionData, ExecutionLog, ExecutionStatus, NodeResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, sqlite::SqliteRow, Row};

/// Error type for execution log storage
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("execution not found: {0}")]
    NotFound(String),

    #[error("execution {0} is already finalized")]
    AlreadyFinalized(String),

    #[error("execution cannot be finalized as {0}")]
    NotTerminal(ExecutionStatus),

    #[error("corrupt execution record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage for execution logs.
///
/// A log is created `running`, grows by appended node results and is
/// finalized exactly once.
#[async_trait]
pub trait ExecutionLogStore: Send + Sync {
    /// Insert a new log
    async fn create(&self, log: &ExecutionLog) -> Result<(), StoreError>;

    /// Append one node result to a running log
    async fn append_node_result(&self, execution_id: &str, result: &NodeResult) -> Result<(), StoreError>;

    /// Move a running log to a terminal status and return the stored record
    async fn finalize(
        &self,
        execution_id: &str,
        status: ExecutionStatus,
        error_message: Option<&str>,
        completed_at: DateTime<Utc>,
    ) -> Result<ExecutionLog, StoreError>;

    async fn get(&self, execution_id: &str) -> Result<Option<ExecutionLog>, StoreError>;

    /// Logs newest first, optionally restricted to one workflow
    async fn list(&self, workflow_id: Option<&str>) -> Result<Vec<ExecutionLog>, StoreError>;
}

/// SQLite-based execution log store
#[derive(Debug, Clone)]
pub struct SqliteExecutionLogStore {
    pool: SqlitePool,
}

impl SqliteExecutionLogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the execution log table. Safe to call multiple times.
    ///
    /// No foreign key to `workflows`: history outlives deleted workflows.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS execution_logs (
                id TEXT PRIMARY KEY,
                workflow_id TEXT NOT NULL,
                status TEXT NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                error_message TEXT,
                execution_data JSON
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_execution_logs_workflow ON execution_logs(workflow_id, started_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Tell a missing row apart from a finalized one after a guarded update matched nothing
    async fn explain_miss(&self, execution_id: &str) -> StoreError {
        match sqlx::query("SELECT status FROM execution_logs WHERE id = ?")
            .bind(execution_id)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(Some(_)) => StoreError::AlreadyFinalized(execution_id.to_string()),
            Ok(None) => StoreError::NotFound(execution_id.to_string()),
            Err(err) => StoreError::Database(err),
        }
    }
}

#[async_trait]
impl ExecutionLogStore for SqliteExecutionLogStore {
    async fn create(&self, log: &ExecutionLog) -> Result<(), StoreError> {
        let data = serde_json::to_string(&ExecutionData {
            node_results: log.node_results.clone(),
            metadata: log.metadata.clone(),
        })?;

        sqlx::query(
            r#"
            INSERT INTO execution_logs (id, workflow_id, status, started_at, completed_at, error_message, execution_data)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&log.id)
        .bind(&log.workflow_id)
        .bind(log.status.as_str())
        .bind(log.started_at)
        .bind(log.completed_at)
        .bind(&log.error_message)
        .bind(data)
        .execute(&self.pool)
        .await?;

        tracing::debug!(execution_id = %log.id, workflow_id = %log.workflow_id, "created execution log");
        Ok(())
    }

    async fn append_node_result(&self, execution_id: &str, result: &NodeResult) -> Result<(), StoreError> {
        let result_json = serde_json::to_string(result)?;

        // Single statement: the array push and the counter move together
        let outcome = sqlx::query(
            r#"
            UPDATE execution_logs
            SET execution_data = json_set(
                execution_data,
                '$.node_results[#]', json(?),
                '$.metadata.nodes_executed', json_array_length(execution_data, '$.node_results') + 1
            )
            WHERE id = ? AND status = 'running'
            "#,
        )
        .bind(result_json)
        .bind(execution_id)
        .execute(&self.pool)
        .await?;

        if outcome.rows_affected() == 0 {
            return Err(self.explain_miss(execution_id).await);
        }
        Ok(())
    }

    async fn finalize(
        &self,
        execution_id: &str,
        status: ExecutionStatus,
        error_message: Option<&str>,
        completed_at: DateTime<Utc>,
    ) -> Result<ExecutionLog, StoreError> {
        if !status.is_terminal() {
            return Err(StoreError::NotTerminal(status));
        }

        let outcome = sqlx::query(
            r#"
            UPDATE execution_logs
            SET status = ?, completed_at = ?, error_message = ?
            WHERE id = ? AND status = 'running'
            "#,
        )
        .bind(status.as_str())
        .bind(completed_at)
        .bind(error_message)
        .bind(execution_id)
        .execute(&self.pool)
        .await?;

        if outcome.rows_affected() == 0 {
            return Err(self.explain_miss(execution_id).await);
        }

        tracing::debug!(execution_id = %execution_id, status = %status, "finalized execution log");
        self.get(execution_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(execution_id.to_string()))
    }

    async fn get(&self, execution_id: &str) -> Result<Option<ExecutionLog>, StoreError> {
        let row = sqlx::query("SELECT * FROM execution_logs WHERE id = ?")
            .bind(execution_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode_log).transpose()
    }

    async fn list(&self, workflow_id: Option<&str>) -> Result<Vec<ExecutionLog>, StoreError> {
        let rows = match workflow_id {
            Some(workflow_id) => {
                sqlx::query(
                    "SELECT * FROM execution_logs WHERE workflow_id = ? ORDER BY started_at DESC, rowid DESC",
                )
                .bind(workflow_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM execution_logs ORDER BY started_at DESC, rowid DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(decode_log).collect()
    }
}

/// Decode a row, tolerating null or partial `execution_data` from older writers
fn decode_log(row: &SqliteRow) -> Result<ExecutionLog, StoreError> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<ExecutionStatus>()
        .map_err(|reason| StoreError::Corrupt { id: id.clone(), reason })?;

    let raw_data: Option<String> = row.try_get("execution_data")?;
    let data = match raw_data.as_deref().map(str::trim) {
        None | Some("") => ExecutionData::default(),
        Some(raw) => serde_json::from_str::<Option<ExecutionData>>(raw)?.unwrap_or_default(),
    };

    Ok(ExecutionLog {
        workflow_id: row.try_get("workflow_id")?,
        status,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        error_message: row.try_get("error_message")?,
        node_results: data.node_results,
        metadata: data.metadata,
        id,
    })
}
