use crate::{NodeId, Value, WorkflowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type ExecutionId = Uuid;

/// Record of one workflow run.
///
/// All per-run node state lives here, keyed by node id, so concurrent
/// executions of the same workflow never share mutable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: ExecutionStatus,
    pub input: HashMap<String, Value>,
    pub output: HashMap<String, Value>,
    pub error: Option<String>,
    /// Per-node output values, keyed by node id then output port.
    pub node_results: HashMap<NodeId, HashMap<String, Value>>,
    /// Per-node run state for this execution only.
    pub node_states: HashMap<NodeId, NodeRunState>,
    /// The resolved order actually used for this run.
    pub execution_order: Vec<NodeId>,
}

impl Execution {
    pub fn new(
        workflow_id: WorkflowId,
        input: HashMap<String, Value>,
        execution_order: Vec<NodeId>,
    ) -> Self {
        let node_states = execution_order
            .iter()
            .map(|id| (*id, NodeRunState::default()))
            .collect();
        Self {
            id: Uuid::new_v4(),
            workflow_id,
            start_time: Utc::now(),
            end_time: None,
            status: ExecutionStatus::Running,
            input,
            output: HashMap::new(),
            error: None,
            node_results: HashMap::new(),
            node_states,
            execution_order,
        }
    }

    pub fn node_state(&self, id: NodeId) -> Option<&NodeRunState> {
        self.node_states.get(&id)
    }

    pub fn mark_node_running(&mut self, id: NodeId) {
        let state = self.node_states.entry(id).or_default();
        state.status = NodeStatus::Running;
        state.last_executed = Some(Utc::now());
    }

    pub fn mark_node_completed(&mut self, id: NodeId, duration_ms: u64) {
        let state = self.node_states.entry(id).or_default();
        state.status = NodeStatus::Completed;
        state.duration_ms = Some(duration_ms);
    }

    pub fn mark_node_failed(&mut self, id: NodeId, error: impl Into<String>, duration_ms: u64) {
        let state = self.node_states.entry(id).or_default();
        state.status = NodeStatus::Error;
        state.duration_ms = Some(duration_ms);
        state.error = Some(error.into());
    }

    /// Transition to a terminal status and stamp the end time.
    pub fn finish(&mut self, status: ExecutionStatus) {
        self.status = status;
        self.end_time = Some(Utc::now());
    }
}

/// Execution lifecycle: running is the only non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Error,
    Cancelled,
}

/// Node lifecycle within a single run: idle until scheduled, then
/// running, then completed or error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Error,
}

/// Per-run state of one node, scoped to a single execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeRunState {
    pub status: NodeStatus,
    pub last_executed: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
}
