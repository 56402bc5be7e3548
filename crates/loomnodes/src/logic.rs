use async_trait::async_trait;
use loomcore::{Node, NodeContext, NodeError, NodeOutput, Value};
use loomruntime::{NodeFactory, NodeTypeMetadata, PortDefinition};
use std::collections::HashMap;

const BRANCH_OPS: &[&str] = &["eq", "gt", "lt", "not-null"];

/// Routes its input to the `true` or `false` port by evaluating a
/// fixed predicate (`op` + `operand` config) against the value.
pub struct BranchNode {
    op: String,
    operand: Option<Value>,
}

impl BranchNode {
    fn test(&self, value: &Value) -> Result<bool, NodeError> {
        match self.op.as_str() {
            "not-null" => Ok(!value.is_null()),
            "eq" => Ok(Some(value) == self.operand.as_ref()),
            "gt" | "lt" => {
                let left = value.as_f64().ok_or_else(|| NodeError::InvalidInputType {
                    field: "value".to_string(),
                    expected: "number".to_string(),
                    actual: "other".to_string(),
                })?;
                let right = self
                    .operand
                    .as_ref()
                    .and_then(|v| v.as_f64())
                    .ok_or_else(|| {
                        NodeError::Configuration("operand must be a number".to_string())
                    })?;
                Ok(if self.op == "gt" {
                    left > right
                } else {
                    left < right
                })
            }
            other => Err(NodeError::Configuration(format!(
                "unsupported op '{}'",
                other
            ))),
        }
    }
}

#[async_trait]
impl Node for BranchNode {
    fn node_type(&self) -> &str {
        "logic.branch"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let value = ctx.require_input("value")?;
        let port = if self.test(value)? { "true" } else { "false" };
        Ok(NodeOutput::new().with_output(port, value.clone()))
    }
}

pub struct BranchNodeFactory;

impl NodeFactory for BranchNodeFactory {
    fn node_type(&self) -> &str {
        "logic.branch"
    }

    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        let op = config
            .get("op")
            .and_then(|v| v.as_str())
            .unwrap_or("not-null")
            .to_string();
        Ok(Box::new(BranchNode {
            op,
            operand: config.get("operand").cloned(),
        }))
    }

    fn metadata(&self) -> NodeTypeMetadata {
        let mut default_config = HashMap::new();
        default_config.insert("op".to_string(), Value::String("not-null".to_string()));
        NodeTypeMetadata {
            description: "Route a value to the true/false port by a fixed predicate".to_string(),
            category: "logic".to_string(),
            default_config,
            inputs: vec![PortDefinition::new("value").required()],
            outputs: vec![PortDefinition::new("true"), PortDefinition::new("false")],
        }
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> Result<(), NodeError> {
        if let Some(op) = config.get("op") {
            let op = op
                .as_str()
                .ok_or_else(|| NodeError::Configuration("op must be a string".to_string()))?;
            if !BRANCH_OPS.contains(&op) {
                return Err(NodeError::Configuration(format!(
                    "unsupported op '{}'; expected one of {:?}",
                    op, BRANCH_OPS
                )));
            }
        }
        Ok(())
    }
}
