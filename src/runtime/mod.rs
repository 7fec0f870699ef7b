/// Runtime Execution Engine
///
/// Everything that runs workflows:
/// - Topological, fail-fast execution with per-run logging
/// - Node execution against connectors with per-node deadlines
/// - Cron scheduling of active workflows

// Core execution engine using petgraph ordering
pub mod engine;

// Single-node execution and the integration snapshot
pub mod executor;

// Background cron scheduler service for scheduled workflows
pub mod scheduler;

pub use engine::{EngineError, ExecutionEngine, Trigger, TriggerSource};
pub use executor::{ExecutionSnapshot, NodeExecutor};
pub use scheduler::CronSchedulerService;
