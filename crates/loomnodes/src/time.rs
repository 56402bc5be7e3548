use async_trait::async_trait;
use loomcore::{Node, NodeContext, NodeError, NodeOutput, Value};
use loomruntime::{NodeFactory, NodeTypeMetadata, PortDefinition};
use std::collections::HashMap;
use tokio::time::{sleep, Duration};

/// Waits `delay_ms`, then passes its input through
pub struct DelayNode;

#[async_trait]
impl Node for DelayNode {
    fn node_type(&self) -> &str {
        "time.delay"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let delay_ms = ctx
            .config
            .get("delay_ms")
            .and_then(|v| v.as_f64())
            .unwrap_or(1000.0) as u64;

        ctx.events.info(format!("delaying for {}ms", delay_ms));
        sleep(Duration::from_millis(delay_ms)).await;

        let value = ctx.inputs.get("value").cloned().unwrap_or(Value::Null);
        Ok(NodeOutput::new().with_output("value", value))
    }
}

pub struct DelayNodeFactory;

impl NodeFactory for DelayNodeFactory {
    fn node_type(&self) -> &str {
        "time.delay"
    }

    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(DelayNode))
    }

    fn metadata(&self) -> NodeTypeMetadata {
        let mut default_config = HashMap::new();
        default_config.insert("delay_ms".to_string(), Value::Number(1000.0));
        NodeTypeMetadata {
            description: "Delay execution for the configured milliseconds".to_string(),
            category: "time".to_string(),
            default_config,
            inputs: vec![PortDefinition::new("value")],
            outputs: vec![PortDefinition::new("value")],
        }
    }
}
