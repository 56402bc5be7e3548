use async_trait::async_trait;
use loomcore::{Node, NodeContext, NodeError, NodeOutput, Value};
use loomruntime::{NodeFactory, NodeTypeMetadata, PortDefinition};
use std::collections::HashMap;

/// Entry point of a graph: emits its configured `value`, or the
/// workflow input's `value` key, or the whole input object.
pub struct SourceNode;

#[async_trait]
impl Node for SourceNode {
    fn node_type(&self) -> &str {
        "core.source"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let value = if let Some(configured) = ctx.config.get("value") {
            configured.clone()
        } else if let Some(input) = ctx.inputs.get("value") {
            input.clone()
        } else {
            Value::Object(ctx.inputs.clone())
        };
        Ok(NodeOutput::new().with_output("value", value))
    }
}

pub struct SourceNodeFactory;

impl NodeFactory for SourceNodeFactory {
    fn node_type(&self) -> &str {
        "core.source"
    }

    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(SourceNode))
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            description: "Feeds the workflow input (or a configured value) into the graph"
                .to_string(),
            category: "core".to_string(),
            inputs: vec![PortDefinition::new("value")],
            outputs: vec![PortDefinition::new("value")],
            ..Default::default()
        }
    }
}

/// Terminal node: passes its `value` input through unchanged so it
/// becomes the run's output.
pub struct SinkNode;

#[async_trait]
impl Node for SinkNode {
    fn node_type(&self) -> &str {
        "core.sink"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let value = ctx.inputs.get("value").cloned().unwrap_or(Value::Null);
        Ok(NodeOutput::new().with_output("value", value))
    }
}

pub struct SinkNodeFactory;

impl NodeFactory for SinkNodeFactory {
    fn node_type(&self) -> &str {
        "core.sink"
    }

    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(SinkNode))
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            description: "Collects a value as the workflow's final output".to_string(),
            category: "core".to_string(),
            inputs: vec![PortDefinition::new("value").required()],
            outputs: vec![PortDefinition::new("value")],
            ..Default::default()
        }
    }
}
