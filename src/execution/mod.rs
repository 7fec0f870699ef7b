/// Execution history
///
/// Execution log records, their SQLite store and the detailed read view.

pub mod projection;
pub mod store;
pub mod types;

pub use projection::{expand_details, DetailedExecutionView};
pub use store::{ExecutionLogStore, SqliteExecutionLogStore, StoreError};
pub use types::{ExecutionLog, ExecutionMetadata, ExecutionStatus, NodeResult};
