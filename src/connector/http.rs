/// Generic HTTP/JSON connector
///
/// Credentials: `base_url` (required) and an optional bearer `token`.
/// Task `request` sends `method` to `base_url` + `path` with an optional body and
/// reports status, headers and the decoded response body.

use crate::connector::{Connector, ConnectorError, TaskInvocation, TaskOutcome};
use crate::integration::{
    schema::{ParamMap, ParameterKind, ParameterSpec},
    types::{NewIntegrationType, TaskSpec},
};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Integration type name this connector is registered under
pub const TYPE_NAME: &str = "http";

#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    client: reqwest::Client,
}

impl HttpConnector {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn base_url(credentials: &ParamMap) -> Result<&str, ConnectorError> {
        credentials
            .get("base_url")
            .and_then(Value::as_str)
            .filter(|url| url.starts_with("http://") || url.starts_with("https://"))
            .ok_or_else(|| ConnectorError::InvalidArgument("base_url".to_string()))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder, credentials: &ParamMap) -> reqwest::RequestBuilder {
        match credentials.get("token").and_then(Value::as_str) {
            Some(token) if !token.is_empty() => builder.bearer_auth(token),
            _ => builder,
        }
    }

    async fn send_request(&self, invocation: &TaskInvocation) -> Result<TaskOutcome, ConnectorError> {
        let base_url = Self::base_url(&invocation.credentials)?;
        let path = invocation.params.get("path").and_then(Value::as_str).unwrap_or("");
        let url = join_url(base_url, path);

        let method = invocation
            .params
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_uppercase();

        let mut request_builder = match method.as_str() {
            "GET" => self.client.get(&url),
            "POST" => self.client.post(&url),
            "PUT" => self.client.put(&url),
            "DELETE" => self.client.delete(&url),
            "PATCH" => self.client.patch(&url),
            _ => return Err(ConnectorError::InvalidArgument(format!("method ({})", method))),
        };
        request_builder = self.authorize(request_builder, &invocation.credentials);

        if let Some(body) = invocation.params.get("body").and_then(Value::as_str) {
            if matches!(method.as_str(), "POST" | "PUT" | "PATCH") {
                // JSON text is sent as JSON, anything else as plain text
                request_builder = match serde_json::from_str::<Value>(body) {
                    Ok(json_body) => request_builder.json(&json_body),
                    Err(_) => request_builder
                        .header("Content-Type", "text/plain")
                        .body(body.to_string()),
                };
            }
        }

        tracing::debug!("🌍 HTTP {} {}", method, url);
        let response = request_builder.send().await?;

        let status = response.status();
        let headers_map: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let response_text = response
            .text()
            .await
            .map_err(|e| ConnectorError::Response(format!("failed to read body: {}", e)))?;
        let body = serde_json::from_str::<Value>(&response_text).unwrap_or(Value::String(response_text));

        let mut data = Map::new();
        data.insert("status".to_string(), json!(status.as_u16()));
        data.insert("headers".to_string(), json!(headers_map));
        data.insert("body".to_string(), body);

        let message = format!("{} {} returned {}", method, url, status.as_u16());
        let outcome = if status.is_success() {
            TaskOutcome::ok(message)
        } else {
            TaskOutcome::failed(message)
        };

        Ok(outcome.with_data(data))
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn test_connection(&self, credentials: &ParamMap) -> Result<TaskOutcome, ConnectorError> {
        let base_url = Self::base_url(credentials)?;
        let response = self.authorize(self.client.get(base_url), credentials).send().await?;
        let status = response.status();

        if status.is_success() {
            let mut data = Map::new();
            data.insert("status".to_string(), json!(status.as_u16()));
            Ok(TaskOutcome::ok(format!("Connected to {}", base_url)).with_data(data))
        } else {
            Ok(TaskOutcome::failed(format!(
                "Connection failed with status {}",
                status.as_u16()
            )))
        }
    }

    async fn invoke(&self, invocation: TaskInvocation) -> Result<TaskOutcome, ConnectorError> {
        match invocation.task.as_str() {
            "request" => self.send_request(&invocation).await,
            other => Err(ConnectorError::UnknownTask(other.to_string())),
        }
    }

    fn definition(&self) -> Option<NewIntegrationType> {
        Some(NewIntegrationType {
            name: TYPE_NAME.to_string(),
            description: "Generic HTTP/JSON service".to_string(),
            credential_schema: vec![
                param("base_url", ParameterKind::String, true, "Service root URL, e.g. https://api.example.com"),
                param("token", ParameterKind::Password, false, "Bearer token sent in the Authorization header"),
            ],
            tasks: vec![TaskSpec {
                name: "request".to_string(),
                display_name: "Send request".to_string(),
                description: "Send an HTTP request relative to the base URL".to_string(),
                parameters: vec![
                    param("method", ParameterKind::String, false, "GET, POST, PUT, PATCH or DELETE (default GET)"),
                    param("path", ParameterKind::String, false, "Path appended to the base URL"),
                    param("body", ParameterKind::String, false, "Request body; JSON text is sent as JSON"),
                ],
            }],
        })
    }
}

fn param(name: &str, kind: ParameterKind, required: bool, description: &str) -> ParameterSpec {
    ParameterSpec {
        name: name.to_string(),
        kind,
        required,
        description: description.to_string(),
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    if path.is_empty() {
        return base_url.to_string();
    }
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, routing::post, Json, Router};
    use indexmap::IndexMap;

    async fn spawn_service() -> String {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .route("/items", post(|Json(body): Json<Value>| async move { Json(json!({"echo": body})) }))
            .route(
                "/missing",
                get(|| async { (axum::http::StatusCode::NOT_FOUND, "nope") }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn credentials(base_url: &str) -> ParamMap {
        let mut credentials = ParamMap::new();
        credentials.insert("base_url".to_string(), json!(base_url));
        credentials
    }

    fn invocation(base_url: &str, params: Value) -> TaskInvocation {
        TaskInvocation {
            task: "request".to_string(),
            credentials: credentials(base_url),
            params: serde_json::from_value(params).unwrap(),
            upstream: IndexMap::new(),
        }
    }

    #[test]
    fn test_join_url_handles_slashes() {
        assert_eq!(join_url("http://a/", "/b"), "http://a/b");
        assert_eq!(join_url("http://a", "b"), "http://a/b");
        assert_eq!(join_url("http://a", ""), "http://a");
    }

    #[tokio::test]
    async fn test_connection_probe_succeeds_against_live_service() {
        let base_url = spawn_service().await;
        let outcome = HttpConnector::new().test_connection(&credentials(&base_url)).await.unwrap();
        assert!(outcome.success, "{}", outcome.message);
    }

    #[tokio::test]
    async fn test_request_posts_json_and_decodes_response() {
        let base_url = spawn_service().await;
        let outcome = HttpConnector::new()
            .invoke(invocation(&base_url, json!({"method": "post", "path": "items", "body": "{\"a\":1}"})))
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.data["status"], json!(200));
        assert_eq!(outcome.data["body"], json!({"echo": {"a": 1}}));
    }

    #[tokio::test]
    async fn test_non_success_status_is_a_failed_outcome() {
        let base_url = spawn_service().await;
        let outcome = HttpConnector::new()
            .invoke(invocation(&base_url, json!({"path": "/missing"})))
            .await
            .unwrap();

        assert!(!outcome.success);
        assert!(outcome.message.contains("404"));
    }

    #[tokio::test]
    async fn test_unknown_task_is_rejected() {
        let mut call = invocation("http://127.0.0.1:1", json!({}));
        call.task = "explode".to_string();
        let err = HttpConnector::new().invoke(call).await.unwrap_err();
        assert!(matches!(err, ConnectorError::UnknownTask(_)));
    }
}
