/// linkflow: workflow automation over credentialed integration connectors
///
/// Workflows are DAGs of integration tasks. The engine runs them in dependency
/// order, fails fast, and keeps an append-only execution history.

// Core configuration and setup
pub mod config;

// SQLite pool and schema
pub mod database;

// Connector implementations behind integration types
pub mod connector;

// Integration types, integrations and their credential schemas
pub mod integration;

// Workflow definitions, graph validation and storage
pub mod workflow;

// Execution logs and their projections
pub mod execution;

// Runtime execution engine and cron scheduling
pub mod runtime;

// HTTP API layer
pub mod api;

// Server setup and initialization
pub mod server;

pub use execution::{ExecutionLog, ExecutionStatus};
pub use runtime::{ExecutionEngine, Trigger, TriggerSource};
pub use server::start_server;
pub use workflow::{Workflow, WorkflowGraph};
