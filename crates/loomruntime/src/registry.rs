use loomcore::{Node, NodeError, Value, WorkflowError};
use std::collections::HashMap;
use std::sync::Arc;

/// Factory for a registered node type: the sole extension point.
///
/// A factory carries everything the engine needs to know about a type
/// without instantiating it: its key, default config, declared ports,
/// and a config validator. `create` builds the executable instance.
pub trait NodeFactory: Send + Sync {
    /// Type key this factory is registered under (e.g. "transform.math")
    fn node_type(&self) -> &str;

    /// Create an executable instance for the given configuration
    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError>;

    /// Declared ports, default config, and description for this type
    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata::default()
    }

    /// Optional: check a node config at graph-validation time
    fn validate_config(&self, _config: &HashMap<String, Value>) -> Result<(), NodeError> {
        Ok(())
    }
}

/// Static description of a node type
#[derive(Debug, Clone)]
pub struct NodeTypeMetadata {
    pub description: String,
    pub category: String,
    pub default_config: HashMap<String, Value>,
    pub inputs: Vec<PortDefinition>,
    pub outputs: Vec<PortDefinition>,
}

impl Default for NodeTypeMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
            default_config: HashMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

impl NodeTypeMetadata {
    pub fn input_names(&self) -> Vec<String> {
        self.inputs.iter().map(|p| p.name.clone()).collect()
    }

    pub fn output_names(&self) -> Vec<String> {
        self.outputs.iter().map(|p| p.name.clone()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct PortDefinition {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl PortDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            required: false,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Registry of available node types.
///
/// Explicitly constructed and injected, never a process global. Must be
/// fully populated before executions begin; it is read-only from then on.
pub struct NodeRegistry {
    factories: HashMap<String, Arc<dyn NodeFactory>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a node factory. Re-registering an existing type is
    /// rejected rather than silently overwriting it.
    pub fn register(&mut self, factory: Arc<dyn NodeFactory>) -> Result<(), WorkflowError> {
        let node_type = factory.node_type().to_string();
        if self.factories.contains_key(&node_type) {
            return Err(WorkflowError::DuplicateNodeType(node_type));
        }
        tracing::info!("registering node type: {}", node_type);
        self.factories.insert(node_type, factory);
        Ok(())
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.factories.contains_key(node_type)
    }

    /// Create an executable instance of a registered type
    pub fn create_node(
        &self,
        node_type: &str,
        config: &HashMap<String, Value>,
    ) -> Result<Box<dyn Node>, WorkflowError> {
        let factory = self
            .factories
            .get(node_type)
            .ok_or_else(|| WorkflowError::UnknownNodeType(node_type.to_string()))?;

        factory
            .create(config)
            .map_err(|e| WorkflowError::Invalid(format!("failed to create node: {}", e)))
    }

    pub fn metadata(&self, node_type: &str) -> Option<NodeTypeMetadata> {
        self.factories.get(node_type).map(|f| f.metadata())
    }

    /// Output port names declared by a type, if registered
    pub fn output_ports(&self, node_type: &str) -> Option<Vec<String>> {
        self.metadata(node_type).map(|m| m.output_names())
    }

    /// Run a type's config validator, if the type is registered
    pub fn validate_config(
        &self,
        node_type: &str,
        config: &HashMap<String, Value>,
    ) -> Result<(), NodeError> {
        match self.factories.get(node_type) {
            Some(factory) => factory.validate_config(config),
            None => Ok(()),
        }
    }

    pub fn list_node_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use loomcore::{NodeContext, NodeOutput};

    struct NoopNode;

    #[async_trait]
    impl Node for NoopNode {
        fn node_type(&self) -> &str {
            "test.noop"
        }

        async fn execute(&self, _ctx: NodeContext) -> Result<NodeOutput, NodeError> {
            Ok(NodeOutput::new())
        }
    }

    struct NoopFactory;

    impl NodeFactory for NoopFactory {
        fn node_type(&self) -> &str {
            "test.noop"
        }

        fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
            Ok(Box::new(NoopNode))
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = NodeRegistry::new();
        registry.register(Arc::new(NoopFactory)).unwrap();
        let err = registry.register(Arc::new(NoopFactory)).unwrap_err();
        assert!(matches!(err, WorkflowError::DuplicateNodeType(t) if t == "test.noop"));
        assert!(registry.contains("test.noop"));
    }

    #[test]
    fn unknown_type_fails_creation() {
        let registry = NodeRegistry::new();
        let err = registry.create_node("missing", &HashMap::new()).err().unwrap();
        assert!(matches!(err, WorkflowError::UnknownNodeType(_)));
    }
}
