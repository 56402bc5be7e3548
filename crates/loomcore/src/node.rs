use crate::{events::EventEmitter, ExecutionId, NodeError, NodeId, Services, Value};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Core trait all executable node types implement
#[async_trait]
pub trait Node: Send + Sync {
    /// Type identifier this instance was created from (e.g. "transform.math")
    fn node_type(&self) -> &str;

    /// Execute the node with the given context, producing output port values
    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError>;

    /// Optional: acquire stateful resources before the run
    async fn initialize(&mut self) -> Result<(), NodeError> {
        Ok(())
    }

    /// Optional: validate configuration before execution
    fn validate_config(&self, _config: &HashMap<String, Value>) -> Result<(), NodeError> {
        Ok(())
    }
}

/// Execution context passed to each node invocation
#[derive(Clone)]
pub struct NodeContext {
    pub node_id: NodeId,

    /// Which execution this invocation belongs to
    pub execution_id: ExecutionId,

    /// Input port values gathered from upstream results
    pub inputs: HashMap<String, Value>,

    /// Static configuration, already merged over the type defaults
    pub config: HashMap<String, Value>,

    /// Raw input the whole workflow run was started with
    pub workflow_input: HashMap<String, Value>,

    /// Emitter for real-time diagnostics from inside the node
    pub events: EventEmitter,

    /// Externally injected collaborators; the engine never constructs these
    pub services: Arc<Services>,

    /// Best-effort stop signal for long-running work
    pub cancellation: tokio_util::sync::CancellationToken,
}

impl NodeContext {
    /// Get a required input or fail with `MissingInput`
    pub fn require_input(&self, name: &str) -> Result<&Value, NodeError> {
        self.inputs
            .get(name)
            .ok_or_else(|| NodeError::MissingInput(name.to_string()))
    }

    /// Get a required config value or fail with `Configuration`
    pub fn require_config(&self, name: &str) -> Result<&Value, NodeError> {
        self.config
            .get(name)
            .ok_or_else(|| NodeError::Configuration(format!("missing config: {}", name)))
    }

    /// Get a config value with a fallback
    pub fn get_config_or(&self, name: &str, default: Value) -> Value {
        self.config.get(name).cloned().unwrap_or(default)
    }
}

/// Output of one node invocation: values keyed by output port
#[derive(Debug, Clone, Default)]
pub struct NodeOutput {
    pub outputs: HashMap<String, Value>,
}

impl NodeOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, port: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(port.into(), value.into());
        self
    }
}
