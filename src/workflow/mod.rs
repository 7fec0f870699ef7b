/// Workflow Management Layer
///
/// Workflow definitions and everything that operates on them without running them:
/// - Type definitions (Workflow, WorkflowNode, WorkflowConnection)
/// - Structural validation and topological ordering with petgraph
/// - SQLite persistence with sqlx
/// - Conversion to and from the visual editor format

pub mod editor;
pub mod graph;
pub mod storage;
pub mod types;

pub use graph::GraphError;
pub use storage::WorkflowStorage;
pub use types::{Position, Workflow, WorkflowConnection, WorkflowDraft, WorkflowGraph, WorkflowNode, WorkflowPatch};
