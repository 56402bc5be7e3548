use crate::{ExecutionId, NodeId, Value, WorkflowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Lifecycle notifications emitted by the engine.
///
/// Delivery is buffered and best-effort over a broadcast channel: a
/// missing or lagging subscriber never blocks or fails the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EngineEvent {
    WorkflowCreated {
        workflow_id: WorkflowId,
        name: String,
        timestamp: DateTime<Utc>,
    },
    NodeAdded {
        workflow_id: WorkflowId,
        node_id: NodeId,
        node_type: String,
        timestamp: DateTime<Utc>,
    },
    NodesConnected {
        workflow_id: WorkflowId,
        connection_id: Uuid,
        from_node: NodeId,
        to_node: NodeId,
        timestamp: DateTime<Utc>,
    },
    WorkflowValidated {
        workflow_id: WorkflowId,
        is_valid: bool,
        errors: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    WorkflowExecuted {
        workflow_id: WorkflowId,
        execution_id: ExecutionId,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    WorkflowExecutionError {
        workflow_id: WorkflowId,
        execution_id: ExecutionId,
        error: String,
        timestamp: DateTime<Utc>,
    },
    NodeStarted {
        execution_id: ExecutionId,
        node_id: NodeId,
        node_type: String,
        timestamp: DateTime<Utc>,
    },
    NodeExecuted {
        execution_id: ExecutionId,
        node_id: NodeId,
        outputs: HashMap<String, Value>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeExecutionError {
        execution_id: ExecutionId,
        node_id: NodeId,
        error: String,
        timestamp: DateTime<Utc>,
    },
    WorkflowSaved {
        workflow_id: WorkflowId,
        path: PathBuf,
        timestamp: DateTime<Utc>,
    },
    WorkflowLoaded {
        workflow_id: WorkflowId,
        path: PathBuf,
        timestamp: DateTime<Utc>,
    },
    WorkflowDeleted {
        workflow_id: WorkflowId,
        timestamp: DateTime<Utc>,
    },
    NodeDiagnostic {
        execution_id: ExecutionId,
        node_id: NodeId,
        event: NodeEvent,
        timestamp: DateTime<Utc>,
    },
}

/// Diagnostics emitted from inside a running node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "kebab-case")]
pub enum NodeEvent {
    Info { message: String },
    Warning { message: String },
    Progress { percent: f64, message: Option<String> },
    Data { port: String, value: Value },
}

/// Handle a node uses to send real-time diagnostics
#[derive(Clone)]
pub struct EventEmitter {
    execution_id: ExecutionId,
    node_id: NodeId,
    sender: broadcast::Sender<EngineEvent>,
}

impl EventEmitter {
    pub fn new(
        execution_id: ExecutionId,
        node_id: NodeId,
        sender: broadcast::Sender<EngineEvent>,
    ) -> Self {
        Self {
            execution_id,
            node_id,
            sender,
        }
    }

    pub fn emit(&self, event: NodeEvent) {
        let _ = self.sender.send(EngineEvent::NodeDiagnostic {
            execution_id: self.execution_id,
            node_id: self.node_id,
            event,
            timestamp: Utc::now(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(NodeEvent::Info {
            message: message.into(),
        });
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(NodeEvent::Warning {
            message: message.into(),
        });
    }

    pub fn progress(&self, percent: f64, message: Option<String>) {
        self.emit(NodeEvent::Progress { percent, message });
    }

    pub fn data(&self, port: impl Into<String>, value: Value) {
        self.emit(NodeEvent::Data {
            port: port.into(),
            value,
        });
    }
}

/// Broadcast bus carrying all engine events
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: EngineEvent) {
        let _ = self.sender.send(event);
    }

    pub fn node_emitter(&self, execution_id: ExecutionId, node_id: NodeId) -> EventEmitter {
        EventEmitter::new(execution_id, node_id, self.sender.clone())
    }
}
