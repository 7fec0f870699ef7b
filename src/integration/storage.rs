/// SQLite persistence for integration types and integrations
///
/// Schemas, task lists and credentials are stored as JSON columns next to the
/// indexed lookup fields, same layout as the workflow table.

use crate::integration::{
    error::RegistryError,
    types::{Integration, IntegrationType},
};
use sqlx::{sqlite::SqlitePool, sqlite::SqliteRow, Row};

/// SQLite-based integration catalog storage
#[derive(Debug, Clone)]
pub struct IntegrationStorage {
    pool: SqlitePool,
}

impl IntegrationStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the integration tables. Safe to call multiple times.
    pub async fn init_schema(&self) -> Result<(), RegistryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS integration_types (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                credential_schema JSON NOT NULL,
                tasks JSON NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS integrations (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                integration_type_id TEXT NOT NULL REFERENCES integration_types(id),
                credentials JSON NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_integrations_type ON integrations(integration_type_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_type(&self, integration_type: &IntegrationType) -> Result<(), RegistryError> {
        sqlx::query(
            r#"
            INSERT INTO integration_types (id, name, description, credential_schema, tasks, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&integration_type.id)
        .bind(&integration_type.name)
        .bind(&integration_type.description)
        .bind(serde_json::to_string(&integration_type.credential_schema)?)
        .bind(serde_json::to_string(&integration_type.tasks)?)
        .bind(integration_type.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Overwrite description, schema and tasks of an existing type (import path)
    pub async fn update_type(&self, integration_type: &IntegrationType) -> Result<bool, RegistryError> {
        let result = sqlx::query(
            r#"
            UPDATE integration_types
            SET description = ?, credential_schema = ?, tasks = ?
            WHERE id = ?
            "#,
        )
        .bind(&integration_type.description)
        .bind(serde_json::to_string(&integration_type.credential_schema)?)
        .bind(serde_json::to_string(&integration_type.tasks)?)
        .bind(&integration_type.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_type(&self, id: &str) -> Result<Option<IntegrationType>, RegistryError> {
        let row = sqlx::query("SELECT * FROM integration_types WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| type_from_row(&row)).transpose()
    }

    pub async fn get_type_by_name(&self, name: &str) -> Result<Option<IntegrationType>, RegistryError> {
        let row = sqlx::query("SELECT * FROM integration_types WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| type_from_row(&row)).transpose()
    }

    pub async fn list_types(&self) -> Result<Vec<IntegrationType>, RegistryError> {
        let rows = sqlx::query("SELECT * FROM integration_types ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(type_from_row).collect()
    }

    pub async fn delete_type(&self, id: &str) -> Result<bool, RegistryError> {
        let result = sqlx::query("DELETE FROM integration_types WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of integrations bound to a type
    pub async fn count_integrations_of_type(&self, type_id: &str) -> Result<i64, RegistryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM integrations WHERE integration_type_id = ?")
            .bind(type_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn insert_integration(&self, integration: &Integration) -> Result<(), RegistryError> {
        sqlx::query(
            r#"
            INSERT INTO integrations (id, name, integration_type_id, credentials, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&integration.id)
        .bind(&integration.name)
        .bind(&integration.integration_type_id)
        .bind(serde_json::to_string(&integration.credentials)?)
        .bind(integration.is_active)
        .bind(integration.created_at)
        .bind(integration.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_integration(&self, id: &str) -> Result<Option<Integration>, RegistryError> {
        let row = sqlx::query("SELECT * FROM integrations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| integration_from_row(&row)).transpose()
    }

    pub async fn find_integration_by_name(
        &self,
        name: &str,
        type_id: &str,
    ) -> Result<Option<Integration>, RegistryError> {
        let row = sqlx::query("SELECT * FROM integrations WHERE name = ? AND integration_type_id = ?")
            .bind(name)
            .bind(type_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| integration_from_row(&row)).transpose()
    }

    pub async fn list_integrations(&self) -> Result<Vec<Integration>, RegistryError> {
        let rows = sqlx::query("SELECT * FROM integrations ORDER BY created_at, rowid")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(integration_from_row).collect()
    }

    pub async fn set_active(&self, id: &str, is_active: bool) -> Result<bool, RegistryError> {
        let result = sqlx::query("UPDATE integrations SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(is_active)
            .bind(chrono::Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_integration(&self, id: &str) -> Result<bool, RegistryError> {
        let result = sqlx::query("DELETE FROM integrations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn type_from_row(row: &SqliteRow) -> Result<IntegrationType, RegistryError> {
    let credential_schema: String = row.try_get("credential_schema")?;
    let tasks: String = row.try_get("tasks")?;

    Ok(IntegrationType {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        credential_schema: serde_json::from_str(&credential_schema)?,
        tasks: serde_json::from_str(&tasks)?,
        created_at: row.try_get("created_at")?,
    })
}

fn integration_from_row(row: &SqliteRow) -> Result<Integration, RegistryError> {
    let credentials: String = row.try_get("credentials")?;

    Ok(Integration {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        integration_type_id: row.try_get("integration_type_id")?,
        credentials: serde_json::from_str(&credentials)?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
