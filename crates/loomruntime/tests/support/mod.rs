#![allow(dead_code)]

use async_trait::async_trait;
use loomcore::{Node, NodeContext, NodeError, NodeOutput, Value};
use loomruntime::{
    EngineConfig, NodeFactory, NodeRegistry, NodeTypeMetadata, PortDefinition, WorkflowEngine,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Emits its configured `value`, else the workflow input's `value`.
/// Declares a `value` input so back edges can be wired in cycle tests.
struct SourceNode {
    configured: Option<Value>,
}

#[async_trait]
impl Node for SourceNode {
    fn node_type(&self) -> &str {
        "test.source"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let value = self
            .configured
            .clone()
            .or_else(|| ctx.inputs.get("value").cloned())
            .unwrap_or(Value::Null);
        Ok(NodeOutput::new().with_output("value", value))
    }
}

pub struct SourceFactory;

impl NodeFactory for SourceFactory {
    fn node_type(&self) -> &str {
        "test.source"
    }

    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(SourceNode {
            configured: config.get("value").cloned(),
        }))
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            inputs: vec![PortDefinition::new("value")],
            outputs: vec![PortDefinition::new("value")],
            ..Default::default()
        }
    }
}

/// Doubles a numeric `value`.
struct DoubleNode;

#[async_trait]
impl Node for DoubleNode {
    fn node_type(&self) -> &str {
        "test.double"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let n = ctx
            .require_input("value")?
            .as_f64()
            .ok_or_else(|| NodeError::InvalidInputType {
                field: "value".to_string(),
                expected: "number".to_string(),
                actual: "other".to_string(),
            })?;
        Ok(NodeOutput::new().with_output("value", n * 2.0))
    }
}

pub struct DoubleFactory;

impl NodeFactory for DoubleFactory {
    fn node_type(&self) -> &str {
        "test.double"
    }

    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(DoubleNode))
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            inputs: vec![PortDefinition::new("value").required()],
            outputs: vec![PortDefinition::new("value")],
            ..Default::default()
        }
    }
}

/// Passes its `value` input straight through.
struct SinkNode;

#[async_trait]
impl Node for SinkNode {
    fn node_type(&self) -> &str {
        "test.sink"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let value = ctx.inputs.get("value").cloned().unwrap_or(Value::Null);
        Ok(NodeOutput::new().with_output("value", value))
    }
}

pub struct SinkFactory;

impl NodeFactory for SinkFactory {
    fn node_type(&self) -> &str {
        "test.sink"
    }

    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(SinkNode))
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            inputs: vec![PortDefinition::new("value")],
            outputs: vec![PortDefinition::new("value")],
            ..Default::default()
        }
    }
}

/// Always fails.
struct FailNode;

#[async_trait]
impl Node for FailNode {
    fn node_type(&self) -> &str {
        "test.fail"
    }

    async fn execute(&self, _ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        Err(NodeError::ExecutionFailed("deliberate failure".to_string()))
    }
}

pub struct FailFactory;

impl NodeFactory for FailFactory {
    fn node_type(&self) -> &str {
        "test.fail"
    }

    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(FailNode))
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            inputs: vec![PortDefinition::new("value")],
            outputs: vec![PortDefinition::new("value")],
            ..Default::default()
        }
    }
}

/// Sleeps for `delay_ms`, then passes `value` through.
struct SleepNode {
    delay_ms: u64,
}

#[async_trait]
impl Node for SleepNode {
    fn node_type(&self) -> &str {
        "test.sleep"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        sleep(Duration::from_millis(self.delay_ms)).await;
        let value = ctx.inputs.get("value").cloned().unwrap_or(Value::Null);
        Ok(NodeOutput::new().with_output("value", value))
    }
}

pub struct SleepFactory;

impl NodeFactory for SleepFactory {
    fn node_type(&self) -> &str {
        "test.sleep"
    }

    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        let delay_ms = config
            .get("delay_ms")
            .and_then(|v| v.as_f64())
            .unwrap_or(100.0) as u64;
        Ok(Box::new(SleepNode { delay_ms }))
    }

    fn metadata(&self) -> NodeTypeMetadata {
        let mut default_config = HashMap::new();
        default_config.insert("delay_ms".to_string(), Value::Number(100.0));
        NodeTypeMetadata {
            default_config,
            inputs: vec![PortDefinition::new("value")],
            outputs: vec![PortDefinition::new("value")],
            ..Default::default()
        }
    }
}

/// Joins two inputs into one output object.
struct JoinNode;

#[async_trait]
impl Node for JoinNode {
    fn node_type(&self) -> &str {
        "test.join"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let mut merged = HashMap::new();
        for port in ["a", "b"] {
            if let Some(value) = ctx.inputs.get(port) {
                merged.insert(port.to_string(), value.clone());
            }
        }
        Ok(NodeOutput::new().with_output("value", Value::Object(merged)))
    }
}

pub struct JoinFactory;

impl NodeFactory for JoinFactory {
    fn node_type(&self) -> &str {
        "test.join"
    }

    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(JoinNode))
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            inputs: vec![PortDefinition::new("a"), PortDefinition::new("b")],
            outputs: vec![PortDefinition::new("value")],
            ..Default::default()
        }
    }
}

pub fn test_registry() -> Arc<NodeRegistry> {
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(SourceFactory)).unwrap();
    registry.register(Arc::new(DoubleFactory)).unwrap();
    registry.register(Arc::new(SinkFactory)).unwrap();
    registry.register(Arc::new(FailFactory)).unwrap();
    registry.register(Arc::new(SleepFactory)).unwrap();
    registry.register(Arc::new(JoinFactory)).unwrap();
    Arc::new(registry)
}

pub fn test_engine() -> WorkflowEngine {
    WorkflowEngine::new(test_registry())
}

pub fn test_engine_with(config: EngineConfig) -> WorkflowEngine {
    WorkflowEngine::with_config(test_registry(), config)
}

pub fn number_input(value: f64) -> HashMap<String, Value> {
    let mut input = HashMap::new();
    input.insert("value".to_string(), Value::Number(value));
    input
}
