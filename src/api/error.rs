/// HTTP error responses
///
/// Every failure leaves the API as `{"detail": "..."}` with a matching status code.

use crate::{execution::store::StoreError, integration::error::RegistryError, runtime::engine::EngineError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::Conflict(msg) => msg,
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                msg
            }
        };

        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let message = err.to_string();
        match err {
            RegistryError::UnknownType(_) | RegistryError::UnknownIntegration(_) => ApiError::NotFound(message),
            RegistryError::DuplicateTypeName(_) | RegistryError::TypeInUse { .. } => ApiError::Conflict(message),
            RegistryError::InvalidCredentials(_) | RegistryError::InvalidDefinition(_) => {
                ApiError::BadRequest(message)
            }
            RegistryError::Database(_) | RegistryError::Serialization(_) => ApiError::Internal(message),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::WorkflowNotFound(id) => ApiError::NotFound(format!("Workflow not found: {}", id)),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(format!("Execution not found: {}", id)),
            StoreError::AlreadyFinalized(_) => ApiError::Conflict(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_errors_map_to_status_codes() {
        let missing = ApiError::from(EngineError::WorkflowNotFound("wf".to_string()));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let persistence = ApiError::from(EngineError::Persistence(StoreError::Database(sqlx::Error::PoolClosed)));
        assert_eq!(persistence.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_store_errors_map_to_status_codes() {
        assert_eq!(ApiError::from(StoreError::NotFound("x".to_string())).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(StoreError::AlreadyFinalized("x".to_string())).status(),
            StatusCode::CONFLICT
        );
    }
}
