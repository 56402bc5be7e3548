use async_trait::async_trait;
use loomcore::{Node, NodeContext, NodeError, NodeOutput, Value};
use loomruntime::{NodeFactory, NodeTypeMetadata, PortDefinition};
use std::collections::HashMap;

const MATH_OPS: &[&str] = &["double", "negate", "add", "multiply"];

/// Numeric transform over a fixed operation set.
///
/// The operation is picked by the `op` config key; `add` and
/// `multiply` take an `operand`. No caller-supplied code is evaluated.
pub struct MathNode {
    op: String,
    operand: f64,
}

#[async_trait]
impl Node for MathNode {
    fn node_type(&self) -> &str {
        "transform.math"
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

        let result = match self.op.as_str() {
            "double" => n * 2.0,
            "negate" => -n,
            "add" => n + self.operand,
            "multiply" => n * self.operand,
            other => {
                return Err(NodeError::Configuration(format!(
                    "unsupported op '{}'",
                    other
                )))
            }
        };
        Ok(NodeOutput::new().with_output("value", result))
    }
}

pub struct MathNodeFactory;

impl NodeFactory for MathNodeFactory {
    fn node_type(&self) -> &str {
        "transform.math"
    }

    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        let op = config
            .get("op")
            .and_then(|v| v.as_str())
            .unwrap_or("double")
            .to_string();
        let operand = config.get("operand").and_then(|v| v.as_f64()).unwrap_or(0.0);
        Ok(Box::new(MathNode { op, operand }))
    }

    fn metadata(&self) -> NodeTypeMetadata {
        let mut default_config = HashMap::new();
        default_config.insert("op".to_string(), Value::String("double".to_string()));
        NodeTypeMetadata {
            description: "Apply a fixed numeric operation (double/negate/add/multiply)"
                .to_string(),
            category: "transform".to_string(),
            default_config,
            inputs: vec![PortDefinition::new("value").required()],
            outputs: vec![PortDefinition::new("value")],
        }
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> Result<(), NodeError> {
        if let Some(op) = config.get("op") {
            let op = op
                .as_str()
                .ok_or_else(|| NodeError::Configuration("op must be a string".to_string()))?;
            if !MATH_OPS.contains(&op) {
                return Err(NodeError::Configuration(format!(
                    "unsupported op '{}'; expected one of {:?}",
                    op, MATH_OPS
                )));
            }
        }
        Ok(())
    }
}

/// Parse a JSON string
pub struct JsonParseNode;

#[async_trait]
impl Node for JsonParseNode {
    fn node_type(&self) -> &str {
        "transform.json_parse"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let input = ctx
            .require_input("json")?
            .as_str()
            .ok_or_else(|| NodeError::InvalidInputType {
                field: "json".to_string(),
                expected: "string".to_string(),
                actual: "other".to_string(),
            })?;

        let parsed: serde_json::Value = serde_json::from_str(input)
            .map_err(|e| NodeError::ExecutionFailed(format!("JSON parse error: {}", e)))?;

        Ok(NodeOutput::new().with_output("parsed", Value::Json(parsed)))
    }
}

pub struct JsonParseNodeFactory;

impl NodeFactory for JsonParseNodeFactory {
    fn node_type(&self) -> &str {
        "transform.json_parse"
    }

    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(JsonParseNode))
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            description: "Parse a JSON string".to_string(),
            category: "transform".to_string(),
            inputs: vec![PortDefinition::new("json").required()],
            outputs: vec![PortDefinition::new("parsed")],
            ..Default::default()
        }
    }
}

/// Render a value as a JSON string
pub struct JsonStringifyNode;

#[async_trait]
impl Node for JsonStringifyNode {
    fn node_type(&self) -> &str {
        "transform.json_stringify"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let value = ctx.require_input("value")?;

        let json = serde_json::to_string_pretty(value)
            .map_err(|e| NodeError::ExecutionFailed(format!("JSON stringify error: {}", e)))?;

        Ok(NodeOutput::new().with_output("json", json))
    }
}

pub struct JsonStringifyNodeFactory;

impl NodeFactory for JsonStringifyNodeFactory {
    fn node_type(&self) -> &str {
        "transform.json_stringify"
    }

    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(JsonStringifyNode))
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            description: "Convert a value to a JSON string".to_string(),
            category: "transform".to_string(),
            inputs: vec![PortDefinition::new("value").required()],
            outputs: vec![PortDefinition::new("json")],
            ..Default::default()
        }
    }
}
