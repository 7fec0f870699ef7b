/// Integration catalog types
///
/// `IntegrationType` is a connector category (credential shape + named tasks),
/// `Integration` is a concrete credentialed instance of one type.

use crate::integration::schema::{ParamMap, ParameterSpec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A category of external service connector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationType {
    pub id: String,
    /// Unique name, also the key used to look up the connector implementation
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Credential parameters an integration of this type must provide
    #[serde(alias = "parameters", default)]
    pub credential_schema: Vec<ParameterSpec>,
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
    pub created_at: DateTime<Utc>,
}

impl IntegrationType {
    /// Find a declared task by name
    pub fn task(&self, name: &str) -> Option<&TaskSpec> {
        self.tasks.iter().find(|task| task.name == name)
    }
}

/// Descriptor of an operation an integration type supports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

/// A concrete integration instance with bound credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integration {
    pub id: String,
    pub name: String,
    pub integration_type_id: String,
    pub credentials: ParamMap,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Definition payload for creating an integration type
#[derive(Debug, Clone, Deserialize)]
pub struct NewIntegrationType {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "parameters", default)]
    pub credential_schema: Vec<ParameterSpec>,
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

/// Outcome of a connection probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConnectionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl TestConnectionResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}
