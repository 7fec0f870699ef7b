/// Configuration management for the linkflow service
///
/// Handles server configuration, database location, and engine runtime parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Execution engine configuration
    pub engine: EngineConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// SQLite database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding the database file (default: "data")
    pub data_dir: String,
    /// Database file name inside `data_dir` (default: "linkflow.db")
    pub file_name: String,
    /// Connection pool size
    pub max_connections: u32,
}

/// Execution engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deadline for a single node invocation or connection test, in seconds
    pub node_timeout_secs: u64,
}

impl EngineConfig {
    pub fn node_timeout(&self) -> Duration {
        Duration::from_secs(self.node_timeout_secs.max(1))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { node_timeout_secs: 30 }
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("LINKFLOW_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_parse("LINKFLOW_PORT", 8000),
            },
            database: DatabaseConfig {
                data_dir: std::env::var("LINKFLOW_DATA_DIR").unwrap_or_else(|_| "data".to_string()),
                file_name: std::env::var("LINKFLOW_DB_FILE").unwrap_or_else(|_| "linkflow.db".to_string()),
                max_connections: env_parse("LINKFLOW_DB_MAX_CONNECTIONS", 5),
            },
            engine: EngineConfig {
                node_timeout_secs: env_parse("LINKFLOW_NODE_TIMEOUT_SECS", EngineConfig::default().node_timeout_secs),
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
