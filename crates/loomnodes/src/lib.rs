//! Built-in node types for the loom workflow engine
//!
//! Transforms and branches select from a fixed operation set via
//! config keys; nothing here evaluates caller-supplied code.

mod core;
mod debug;
mod logic;
mod time;
mod transform;

pub use crate::core::{SinkNodeFactory, SourceNodeFactory};
pub use crate::debug::DebugNodeFactory;
pub use crate::logic::BranchNodeFactory;
pub use crate::time::DelayNodeFactory;
pub use crate::transform::{JsonParseNodeFactory, JsonStringifyNodeFactory, MathNodeFactory};

use loomcore::WorkflowError;
use loomruntime::NodeRegistry;
use std::sync::Arc;

/// Register every built-in node type.
pub fn register_all(registry: &mut NodeRegistry) -> Result<(), WorkflowError> {
    registry.register(Arc::new(SourceNodeFactory))?;
    registry.register(Arc::new(SinkNodeFactory))?;
    registry.register(Arc::new(MathNodeFactory))?;
    registry.register(Arc::new(BranchNodeFactory))?;
    registry.register(Arc::new(JsonParseNodeFactory))?;
    registry.register(Arc::new(JsonStringifyNodeFactory))?;
    registry.register(Arc::new(DebugNodeFactory))?;
    registry.register(Arc::new(DelayNodeFactory))?;
    Ok(())
}
