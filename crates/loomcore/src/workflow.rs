use crate::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type WorkflowId = Uuid;
pub type NodeId = Uuid;

/// Complete workflow definition: a directed graph of typed nodes joined
/// by port-to-port connections.
///
/// `nodes` and `connections` are kept in insertion order. Node order is
/// the tie-break for the execution order resolver; connection order
/// decides last-write-wins when two connections target the same input
/// port. Both orders are therefore significant and preserved by
/// serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    pub description: Option<String>,
    pub version: String,
    pub nodes: Vec<NodeSpec>,
    pub connections: Vec<Connection>,
    pub metadata: WorkflowMetadata,
    pub settings: WorkflowSettings,
    /// Runtime bookkeeping, never persisted; fresh after load.
    #[serde(skip)]
    pub state: WorkflowState,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            version: "1.0.0".to_string(),
            nodes: Vec::new(),
            connections: Vec::new(),
            metadata: WorkflowMetadata::default(),
            settings: WorkflowSettings::default(),
            state: WorkflowState::default(),
        }
    }

    /// Append a node, preserving insertion order.
    pub fn add_node(&mut self, node: NodeSpec) -> NodeId {
        let id = node.id;
        self.nodes.push(node);
        self.touch();
        id
    }

    /// Append a connection, preserving declaration order.
    pub fn add_connection(&mut self, connection: Connection) -> Uuid {
        let id = connection.id;
        self.connections.push(connection);
        self.touch();
        id
    }

    pub fn find_node(&self, id: NodeId) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.find_node(id).is_some()
    }

    /// Data connections feeding the given node, in declaration order.
    pub fn connections_into(&self, id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections
            .iter()
            .filter(move |c| c.kind == ConnectionKind::Data && c.to.node == id)
    }

    /// True if any data connection leaves the given node.
    pub fn has_outgoing(&self, id: NodeId) -> bool {
        self.connections
            .iter()
            .any(|c| c.kind == ConnectionKind::Data && c.from.node == id)
    }

    /// Nodes with no outgoing data connection, in insertion order.
    pub fn sink_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| !self.has_outgoing(n.id))
            .map(|n| n.id)
            .collect()
    }

    pub fn touch(&mut self) {
        self.metadata.last_modified = Utc::now();
    }
}

/// Node instance within a workflow graph.
///
/// `inputs`/`outputs` are the port names declared by the node's type,
/// snapshotted when the node is added so connection checks do not need
/// the registry. Per-run status lives on the `Execution` record, not
/// here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    pub node_type: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub config: HashMap<String, Value>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl NodeSpec {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            node_type: node_type.into(),
            name: None,
            description: None,
            config: HashMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Display label: explicit name if set, otherwise the type key.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.node_type)
    }
}

/// One endpoint of a connection: a node and one of its named ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub node: NodeId,
    pub port: String,
}

/// Directed edge from an output port to an input port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub from: Endpoint,
    pub to: Endpoint,
    #[serde(default)]
    pub kind: ConnectionKind,
}

impl Connection {
    pub fn data(
        from_node: NodeId,
        from_port: impl Into<String>,
        to_node: NodeId,
        to_port: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from: Endpoint {
                node: from_node,
                port: from_port.into(),
            },
            to: Endpoint {
                node: to_node,
                port: to_port.into(),
            },
            kind: ConnectionKind::Data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    #[default]
    Data,
    Control,
    Event,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub author: Option<String>,
    pub tags: Vec<String>,
}

impl Default for WorkflowMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created: now,
            last_modified: now,
            author: None,
            tags: Vec::new(),
        }
    }
}

/// Global workflow settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSettings {
    pub allow_parallel: bool,
    pub timeout_ms: u64,
    pub on_error: ErrorHandling,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            allow_parallel: false,
            timeout_ms: 30_000,
            on_error: ErrorHandling::Stop,
        }
    }
}

/// What the executor does when a node fails or times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorHandling {
    /// Abort the whole execution and surface the error.
    Stop,
    /// Record a failure sentinel for the node and keep going.
    Continue,
}

/// Runtime-only workflow bookkeeping; reset on load.
#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    pub is_valid: bool,
    pub has_errors: bool,
    pub execution_count: u64,
    pub last_executed: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_document_skips_runtime_state() {
        let mut workflow = Workflow::new("serde");
        workflow.state.execution_count = 7;
        workflow.state.is_valid = true;

        let json = serde_json::to_string(&workflow).unwrap();
        let loaded: Workflow = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded.id, workflow.id);
        assert_eq!(loaded.name, "serde");
        assert_eq!(loaded.state.execution_count, 0);
        assert!(!loaded.state.is_valid);
    }

    #[test]
    fn sink_nodes_follow_insertion_order() {
        let mut workflow = Workflow::new("sinks");
        let a = workflow.add_node(NodeSpec::new("t"));
        let b = workflow.add_node(NodeSpec::new("t"));
        let c = workflow.add_node(NodeSpec::new("t"));
        workflow.add_connection(Connection::data(a, "out", b, "in"));

        assert_eq!(workflow.sink_nodes(), vec![b, c]);
        assert!(workflow.has_outgoing(a));
        assert!(!workflow.has_outgoing(c));
    }
}
