use async_trait::async_trait;
use loomcore::{Node, NodeContext, NodeError, NodeOutput, Value};
use loomruntime::{NodeFactory, NodeTypeMetadata, PortDefinition};
use std::collections::HashMap;

/// Logs its inputs through the node event emitter and passes them on
pub struct DebugNode;

#[async_trait]
impl Node for DebugNode {
    fn node_type(&self) -> &str {
        "debug.log"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let message = ctx
            .inputs
            .get("value")
            .and_then(|v| v.as_str())
            .unwrap_or("(no message)");
        ctx.events.info(format!("DEBUG: {}", message));

        for (key, value) in &ctx.inputs {
            ctx.events.info(format!("  {}: {:?}", key, value));
        }

        let value = ctx.inputs.get("value").cloned().unwrap_or(Value::Null);
        Ok(NodeOutput::new().with_output("value", value))
    }
}

pub struct DebugNodeFactory;

impl NodeFactory for DebugNodeFactory {
    fn node_type(&self) -> &str {
        "debug.log"
    }

    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(DebugNode))
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            description: "Log input values for debugging".to_string(),
            category: "debug".to_string(),
            inputs: vec![PortDefinition::new("value")],
            outputs: vec![PortDefinition::new("value")],
            ..Default::default()
        }
    }
}
