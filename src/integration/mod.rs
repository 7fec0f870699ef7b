/// Integration Registry
///
/// Catalog of integration types (credential schema + tasks) and credentialed
/// integration instances:
/// - Parameter schema validation shared with task arguments
/// - SQLite persistence with sqlx
/// - Registry operations including the connection test

pub mod error;
pub mod registry;
pub mod schema;
pub mod storage;
pub mod types;

pub use error::RegistryError;
pub use registry::IntegrationRegistry;
pub use schema::{ParamMap, ParameterKind, ParameterSpec};
pub use storage::IntegrationStorage;
pub use types::{Integration, IntegrationType, NewIntegrationType, TaskSpec, TestConnectionResult};
