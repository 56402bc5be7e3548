//! Workflow execution runtime
//!
//! This crate provides the engine that validates workflow graphs,
//! resolves a deterministic execution order, and runs nodes with
//! per-node timeout and error-policy semantics. The `WorkflowEngine`
//! facade ties the registry, validator, resolver, executor, and
//! bounded execution history together behind one API.

mod engine;
mod executor;
mod history;
mod registry;
mod resolver;
mod validator;

pub use engine::{EngineConfig, NodeDraft, WorkflowConfig, WorkflowEngine};
pub use executor::{ExecuteOptions, ExecutionOutcome, WorkflowExecutor};
pub use history::ExecutionHistory;
pub use registry::{NodeFactory, NodeRegistry, NodeTypeMetadata, PortDefinition};
pub use resolver::resolve_order;
pub use validator::{validate, ValidationReport};
