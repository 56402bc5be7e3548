//! Core abstractions for the loom workflow engine
//!
//! This crate provides the fundamental types that every other component
//! depends on: the dynamic `Value` type, the workflow graph model, the
//! `Node` trait, execution records, events, and the error taxonomy.
//! It contains no execution logic.

mod error;
mod events;
mod execution;
mod node;
mod services;
mod value;
mod workflow;

pub use error::{EngineError, NodeError, WorkflowError};
pub use events::{EngineEvent, EventBus, EventEmitter, NodeEvent};
pub use execution::{
    Execution, ExecutionId, ExecutionStatus, NodeRunState, NodeStatus,
};
pub use node::{Node, NodeContext, NodeOutput};
pub use services::Services;
pub use value::Value;
pub use workflow::{
    Connection, ConnectionKind, Endpoint, ErrorHandling, NodeId, NodeSpec,
    Workflow, WorkflowId, WorkflowMetadata, WorkflowSettings, WorkflowState,
};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
