/// Task capability providers
///
/// A `Connector` implements every task of one integration type. The engine and the
/// integration registry reach connectors only through `ConnectorRegistry`, keyed by
/// the integration type name.

// Generic HTTP/JSON connector shipped with the service
pub mod http;

use crate::integration::{schema::ParamMap, types::NewIntegrationType};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;

pub use http::HttpConnector;

/// Arguments for one task call
#[derive(Debug, Clone)]
pub struct TaskInvocation {
    pub task: String,
    pub credentials: ParamMap,
    pub params: ParamMap,
    /// Output data of the node's direct predecessors, keyed by node id
    pub upstream: IndexMap<String, Value>,
}

/// What a connector reports back for a task call or connection probe
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOutcome {
    pub success: bool,
    pub message: String,
    pub data: Map<String, Value>,
}

impl TaskOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Map::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: Map::new(),
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }
}

/// Faults raised by connector implementations
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("task '{0}' is not supported by this connector")]
    UnknownTask(String),

    #[error("missing or invalid argument '{0}'")]
    InvalidArgument(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected response: {0}")]
    Response(String),
}

impl From<reqwest::Error> for ConnectorError {
    fn from(err: reqwest::Error) -> Self {
        ConnectorError::Request(err.to_string())
    }
}

/// Uniform capability interface implemented per integration type.
///
/// Implementations must not touch the integration registry or the execution log
/// store, and must be safe to drop mid-call (the engine enforces deadlines by
/// dropping the future).
#[async_trait]
pub trait Connector: Send + Sync {
    /// Probe reachability/authentication with the given credentials
    async fn test_connection(&self, credentials: &ParamMap) -> Result<TaskOutcome, ConnectorError>;

    /// Run one named task
    async fn invoke(&self, invocation: TaskInvocation) -> Result<TaskOutcome, ConnectorError>;

    /// Catalog entry seeded at startup for built-in connectors
    fn definition(&self) -> Option<NewIntegrationType> {
        None
    }
}

/// Connector implementations keyed by integration type name
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<String, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the connectors shipped in this crate
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(http::TYPE_NAME, Arc::new(HttpConnector::new()));
        registry
    }

    pub fn register(&mut self, type_name: impl Into<String>, connector: Arc<dyn Connector>) {
        let type_name = type_name.into();
        tracing::debug!(type_name = %type_name, "registered connector");
        self.connectors.insert(type_name, connector);
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<dyn Connector>> {
        self.connectors.get(type_name).cloned()
    }

    /// Catalog entries of registered connectors that describe themselves
    pub fn builtin_definitions(&self) -> Vec<NewIntegrationType> {
        let mut definitions: Vec<NewIntegrationType> =
            self.connectors.values().filter_map(|c| c.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.connectors.keys().collect();
        names.sort();
        f.debug_struct("ConnectorRegistry").field("connectors", &names).finish()
    }
}
