/// Integration registry
///
/// Catalog operations on integration types and integrations, plus the
/// side-effect-free connection test. Creation validates credential shape only;
/// reachability is the caller's concern (it runs `test_connection` first).

use crate::connector::ConnectorRegistry;
use crate::integration::{
    error::RegistryError,
    schema::{check_definition, validate_values, ParamMap},
    storage::IntegrationStorage,
    types::{Integration, IntegrationType, NewIntegrationType, TestConnectionResult},
};
use chrono::Utc;
use std::{sync::Arc, time::Duration};

#[derive(Debug, Clone)]
pub struct IntegrationRegistry {
    storage: IntegrationStorage,
    connectors: Arc<ConnectorRegistry>,
    probe_timeout: Duration,
}

impl IntegrationRegistry {
    pub fn new(storage: IntegrationStorage, connectors: Arc<ConnectorRegistry>, probe_timeout: Duration) -> Self {
        Self {
            storage,
            connectors,
            probe_timeout,
        }
    }

    pub fn storage(&self) -> &IntegrationStorage {
        &self.storage
    }

    /// Register a new integration type. Names are unique.
    pub async fn create_type(&self, definition: NewIntegrationType) -> Result<IntegrationType, RegistryError> {
        let name = definition.name.trim().to_string();
        if name.is_empty() {
            return Err(RegistryError::InvalidDefinition("name must not be empty".to_string()));
        }
        if self.storage.get_type_by_name(&name).await?.is_some() {
            return Err(RegistryError::DuplicateTypeName(name));
        }

        let integration_type = build_type(uuid::Uuid::new_v4().to_string(), name, definition)?;
        self.storage.insert_type(&integration_type).await?;

        tracing::info!(type_id = %integration_type.id, name = %integration_type.name, "created integration type");
        Ok(integration_type)
    }

    /// Replace description, schema and tasks of an existing type, keeping its id
    pub async fn replace_type(
        &self,
        existing: &IntegrationType,
        definition: NewIntegrationType,
    ) -> Result<IntegrationType, RegistryError> {
        let mut integration_type = build_type(existing.id.clone(), existing.name.clone(), definition)?;
        integration_type.created_at = existing.created_at;
        self.storage.update_type(&integration_type).await?;
        Ok(integration_type)
    }

    pub async fn list_types(&self) -> Result<Vec<IntegrationType>, RegistryError> {
        self.storage.list_types().await
    }

    pub async fn get_type(&self, id: &str) -> Result<IntegrationType, RegistryError> {
        self.storage
            .get_type(id)
            .await?
            .ok_or_else(|| RegistryError::UnknownType(id.to_string()))
    }

    pub async fn find_type(&self, id: &str) -> Result<Option<IntegrationType>, RegistryError> {
        self.storage.get_type(id).await
    }

    pub async fn find_type_by_name(&self, name: &str) -> Result<Option<IntegrationType>, RegistryError> {
        self.storage.get_type_by_name(name).await
    }

    /// Delete a type that no integration references anymore
    pub async fn delete_type(&self, id: &str) -> Result<(), RegistryError> {
        let integration_type = self.get_type(id).await?;
        let count = self.storage.count_integrations_of_type(id).await?;
        if count > 0 {
            return Err(RegistryError::TypeInUse {
                name: integration_type.name,
                count,
            });
        }
        self.storage.delete_type(id).await?;
        tracing::info!(type_id = %id, "deleted integration type");
        Ok(())
    }

    /// Make sure every built-in connector has a catalog entry
    pub async fn seed_builtin_types(&self) -> Result<usize, RegistryError> {
        let mut seeded = 0;
        for definition in self.connectors.builtin_definitions() {
            if self.storage.get_type_by_name(&definition.name).await?.is_none() {
                self.create_type(definition).await?;
                seeded += 1;
            }
        }
        Ok(seeded)
    }

    /// Probe a `(type, credentials)` pair without persisting anything.
    ///
    /// Schema violations short-circuit before the connector is called.
    pub async fn test_connection(
        &self,
        integration_type_id: &str,
        credentials: &ParamMap,
    ) -> Result<TestConnectionResult, RegistryError> {
        let integration_type = self.get_type(integration_type_id).await?;

        let validated = match validate_values(&integration_type.credential_schema, credentials) {
            Ok(validated) => validated,
            Err(err) => {
                tracing::debug!(type_name = %integration_type.name, "credential validation failed: {}", err);
                return Ok(TestConnectionResult::failed(format!("Invalid credentials: {}", err)));
            }
        };

        let Some(connector) = self.connectors.get(&integration_type.name) else {
            return Ok(TestConnectionResult::failed(format!(
                "No connector registered for {}",
                integration_type.name
            )));
        };

        let result = match tokio::time::timeout(self.probe_timeout, connector.test_connection(&validated)).await {
            Ok(Ok(outcome)) => TestConnectionResult {
                success: outcome.success,
                message: outcome.message,
                data: (!outcome.data.is_empty()).then(|| serde_json::Value::Object(outcome.data)),
            },
            Ok(Err(err)) => TestConnectionResult::failed(format!("Error testing connection: {}", err)),
            Err(_) => TestConnectionResult::failed("Connection timeout"),
        };

        tracing::info!(
            type_name = %integration_type.name,
            success = result.success,
            "tested integration connection"
        );
        Ok(result)
    }

    /// Create an integration after validating credentials against the type schema
    pub async fn create_integration(
        &self,
        name: &str,
        integration_type_id: &str,
        credentials: &ParamMap,
    ) -> Result<Integration, RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidDefinition("name must not be empty".to_string()));
        }
        let integration_type = self.get_type(integration_type_id).await?;
        let credentials = validate_values(&integration_type.credential_schema, credentials)?;

        let now = Utc::now();
        let integration = Integration {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            integration_type_id: integration_type.id,
            credentials,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.storage.insert_integration(&integration).await?;

        tracing::info!(integration_id = %integration.id, name = %integration.name, "created integration");
        Ok(integration)
    }

    pub async fn list_integrations(&self) -> Result<Vec<Integration>, RegistryError> {
        self.storage.list_integrations().await
    }

    pub async fn get_integration(&self, id: &str) -> Result<Integration, RegistryError> {
        self.storage
            .get_integration(id)
            .await?
            .ok_or_else(|| RegistryError::UnknownIntegration(id.to_string()))
    }

    /// Toggle availability for workflow nodes; history is untouched
    pub async fn set_active(&self, id: &str, is_active: bool) -> Result<Integration, RegistryError> {
        if !self.storage.set_active(id, is_active).await? {
            return Err(RegistryError::UnknownIntegration(id.to_string()));
        }
        tracing::info!(integration_id = %id, is_active, "changed integration availability");
        self.get_integration(id).await
    }

    pub async fn delete_integration(&self, id: &str) -> Result<(), RegistryError> {
        if !self.storage.delete_integration(id).await? {
            return Err(RegistryError::UnknownIntegration(id.to_string()));
        }
        tracing::info!(integration_id = %id, "deleted integration");
        Ok(())
    }
}

fn build_type(id: String, name: String, definition: NewIntegrationType) -> Result<IntegrationType, RegistryError> {
    check_definition(&definition.credential_schema)?;

    let mut tasks = definition.tasks;
    let mut seen = std::collections::HashSet::new();
    for task in &mut tasks {
        if task.name.trim().is_empty() {
            return Err(RegistryError::InvalidDefinition("task name must not be empty".to_string()));
        }
        if !seen.insert(task.name.clone()) {
            return Err(RegistryError::InvalidDefinition(format!(
                "task '{}' declared more than once",
                task.name
            )));
        }
        check_definition(&task.parameters)?;
        if task.display_name.is_empty() {
            task.display_name = task.name.clone();
        }
    }

    Ok(IntegrationType {
        id,
        name,
        description: definition.description,
        credential_schema: definition.credential_schema,
        tasks,
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{Connector, ConnectorError, TaskInvocation, TaskOutcome};
    use crate::database;
    use crate::integration::schema::{ParameterKind, ParameterSpec};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingConnector {
        probes: AtomicUsize,
    }

    #[async_trait]
    impl Connector for CountingConnector {
        async fn test_connection(&self, credentials: &ParamMap) -> Result<TaskOutcome, ConnectorError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if credentials["token"] == json!("good") {
                Ok(TaskOutcome::ok("Connected"))
            } else {
                Ok(TaskOutcome::failed("Bad token"))
            }
        }

        async fn invoke(&self, invocation: TaskInvocation) -> Result<TaskOutcome, ConnectorError> {
            Err(ConnectorError::UnknownTask(invocation.task))
        }
    }

    async fn setup() -> (IntegrationRegistry, Arc<CountingConnector>) {
        let pool = database::in_memory().await.unwrap();
        let connector = Arc::new(CountingConnector::default());
        let mut connectors = ConnectorRegistry::new();
        connectors.register("vault", connector.clone());
        let registry = IntegrationRegistry::new(
            IntegrationStorage::new(pool),
            Arc::new(connectors),
            Duration::from_secs(5),
        );
        (registry, connector)
    }

    fn vault_type() -> NewIntegrationType {
        NewIntegrationType {
            name: "vault".to_string(),
            description: "secret store".to_string(),
            credential_schema: vec![
                ParameterSpec {
                    name: "token".to_string(),
                    kind: ParameterKind::Password,
                    required: true,
                    description: String::new(),
                },
                ParameterSpec {
                    name: "port".to_string(),
                    kind: ParameterKind::Number,
                    required: false,
                    description: String::new(),
                },
            ],
            tasks: vec![],
        }
    }

    fn creds(value: serde_json::Value) -> ParamMap {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_type_names_are_unique() {
        let (registry, _) = setup().await;
        registry.create_type(vault_type()).await.unwrap();
        let err = registry.create_type(vault_type()).await.unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTypeName(_)));
    }

    #[tokio::test]
    async fn test_connection_with_missing_required_param_skips_connector() {
        let (registry, connector) = setup().await;
        let vault = registry.create_type(vault_type()).await.unwrap();

        let result = registry.test_connection(&vault.id, &creds(json!({"port": 8200}))).await.unwrap();

        assert!(!result.success);
        assert!(result.message.contains("token"));
        assert_eq!(connector.probes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_connection_delegates_and_persists_nothing() {
        let (registry, connector) = setup().await;
        let vault = registry.create_type(vault_type()).await.unwrap();

        let ok = registry.test_connection(&vault.id, &creds(json!({"token": "good"}))).await.unwrap();
        let bad = registry.test_connection(&vault.id, &creds(json!({"token": "bad"}))).await.unwrap();

        assert!(ok.success);
        assert!(!bad.success);
        assert_eq!(connector.probes.load(Ordering::SeqCst), 2);
        assert!(registry.list_integrations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connection_for_unknown_type_is_an_error() {
        let (registry, _) = setup().await;
        let err = registry.test_connection("nope", &ParamMap::new()).await.unwrap_err();
        assert!(matches!(err, RegistryError::UnknownType(_)));
    }

    #[tokio::test]
    async fn test_create_integration_validates_and_coerces_credentials() {
        let (registry, _) = setup().await;
        let vault = registry.create_type(vault_type()).await.unwrap();

        let err = registry
            .create_integration("prod", &vault.id, &creds(json!({"token": "t", "port": "abc"})))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidCredentials(_)));

        let integration = registry
            .create_integration("prod", &vault.id, &creds(json!({"token": "t", "port": "8200"})))
            .await
            .unwrap();
        assert_eq!(integration.credentials["port"], json!(8200));
        assert!(integration.is_active);

        let toggled = registry.set_active(&integration.id, false).await.unwrap();
        assert!(!toggled.is_active);
    }

    #[tokio::test]
    async fn test_type_in_use_cannot_be_deleted() {
        let (registry, _) = setup().await;
        let vault = registry.create_type(vault_type()).await.unwrap();
        let integration = registry
            .create_integration("prod", &vault.id, &creds(json!({"token": "t"})))
            .await
            .unwrap();

        assert!(matches!(
            registry.delete_type(&vault.id).await.unwrap_err(),
            RegistryError::TypeInUse { count: 1, .. }
        ));

        registry.delete_integration(&integration.id).await.unwrap();
        registry.delete_type(&vault.id).await.unwrap();
        assert!(registry.list_types().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_builtin_types_are_seeded_once() {
        let pool = database::in_memory().await.unwrap();
        let registry = IntegrationRegistry::new(
            IntegrationStorage::new(pool),
            Arc::new(ConnectorRegistry::with_builtins()),
            Duration::from_secs(5),
        );

        assert_eq!(registry.seed_builtin_types().await.unwrap(), 1);
        assert_eq!(registry.seed_builtin_types().await.unwrap(), 0);
        let http = registry.find_type_by_name("http").await.unwrap().unwrap();
        assert_eq!(http.tasks[0].name, "request");
    }
}
