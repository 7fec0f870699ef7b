use crate::integration::schema::{SchemaDefinitionError, SchemaError};
use thiserror::Error;

/// Errors raised by the integration registry and its storage
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("integration type not found: {0}")]
    UnknownType(String),

    #[error("integration not found: {0}")]
    UnknownIntegration(String),

    #[error("integration type '{0}' already exists")]
    DuplicateTypeName(String),

    #[error("integration type '{name}' is still used by {count} integration(s)")]
    TypeInUse { name: String, count: i64 },

    #[error("invalid credentials: {0}")]
    InvalidCredentials(#[from] SchemaError),

    #[error("invalid schema definition: {0}")]
    InvalidDefinition(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<SchemaDefinitionError> for RegistryError {
    fn from(err: SchemaDefinitionError) -> Self {
        RegistryError::InvalidDefinition(err.to_string())
    }
}
