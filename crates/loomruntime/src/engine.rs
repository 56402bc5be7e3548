use crate::executor::{ExecuteOptions, ExecutionOutcome, WorkflowExecutor};
use crate::history::ExecutionHistory;
use crate::registry::NodeRegistry;
use crate::validator::{validate, ValidationReport};
use chrono::Utc;
use loomcore::{
    Connection, EngineError, EngineEvent, EventBus, Execution, ExecutionId, ExecutionStatus,
    NodeId, NodeSpec, Services, Value, Workflow, WorkflowError, WorkflowId, WorkflowSettings,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Engine-level configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub history_capacity: usize,
    pub event_buffer_size: usize,
    pub max_parallel_nodes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            event_buffer_size: 1000,
            max_parallel_nodes: 10,
        }
    }
}

/// Caller-facing description of a workflow to create
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
    pub tags: Vec<String>,
    pub settings: Option<WorkflowSettings>,
}

impl WorkflowConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            version: None,
            author: None,
            tags: Vec::new(),
            settings: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_settings(mut self, settings: WorkflowSettings) -> Self {
        self.settings = Some(settings);
        self
    }
}

/// Caller-facing description of a node to add
#[derive(Debug, Clone)]
pub struct NodeDraft {
    pub node_type: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub config: HashMap<String, Value>,
}

impl NodeDraft {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            name: None,
            description: None,
            config: HashMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

/// The engine facade: owns the workflow store and execution history,
/// wires the registry, validator, executor, and event bus together,
/// and exposes the programmatic API.
///
/// The registry and services are injected, never constructed here.
/// Every mutation re-runs the validator and bumps `last_modified`.
pub struct WorkflowEngine {
    registry: Arc<NodeRegistry>,
    executor: WorkflowExecutor,
    event_bus: Arc<EventBus>,
    services: Arc<Services>,
    workflows: RwLock<HashMap<WorkflowId, Workflow>>,
    history: RwLock<ExecutionHistory>,
}

impl WorkflowEngine {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self::with_services(registry, Services::new(), EngineConfig::default())
    }

    pub fn with_config(registry: Arc<NodeRegistry>, config: EngineConfig) -> Self {
        Self::with_services(registry, Services::new(), config)
    }

    pub fn with_services(
        registry: Arc<NodeRegistry>,
        services: Services,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            executor: WorkflowExecutor::new(config.max_parallel_nodes),
            event_bus: Arc::new(EventBus::new(config.event_buffer_size)),
            services: Arc::new(services),
            workflows: RwLock::new(HashMap::new()),
            history: RwLock::new(ExecutionHistory::new(config.history_capacity)),
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<EngineEvent> {
        self.event_bus.subscribe()
    }

    /// Create and store an empty workflow.
    pub async fn create_workflow(&self, config: WorkflowConfig) -> Workflow {
        let mut workflow = Workflow::new(config.name);
        workflow.description = config.description;
        if let Some(version) = config.version {
            workflow.version = version;
        }
        workflow.metadata.author = config.author;
        workflow.metadata.tags = config.tags;
        if let Some(settings) = config.settings {
            workflow.settings = settings;
        }

        self.event_bus.emit(EngineEvent::WorkflowCreated {
            workflow_id: workflow.id,
            name: workflow.name.clone(),
            timestamp: Utc::now(),
        });

        let mut workflows = self.workflows.write().await;
        workflows.insert(workflow.id, workflow.clone());
        workflow
    }

    /// Add a node to a workflow. The type must be registered; the
    /// caller config is merged over the type's default config and the
    /// type's port declarations are snapshotted onto the node.
    pub async fn add_node(
        &self,
        workflow_id: WorkflowId,
        draft: NodeDraft,
    ) -> Result<NodeSpec, EngineError> {
        let meta = self
            .registry
            .metadata(&draft.node_type)
            .ok_or_else(|| WorkflowError::UnknownNodeType(draft.node_type.clone()))?;

        let mut config = meta.default_config.clone();
        config.extend(draft.config);

        let mut spec = NodeSpec::new(draft.node_type);
        spec.name = draft.name;
        spec.description = draft.description;
        spec.config = config;
        spec.inputs = meta.input_names();
        spec.outputs = meta.output_names();

        let mut workflows = self.workflows.write().await;
        let workflow = workflows
            .get_mut(&workflow_id)
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;

        workflow.add_node(spec.clone());
        let report = validate(workflow, &self.registry);
        apply_validation(workflow, &report);

        self.event_bus.emit(EngineEvent::NodeAdded {
            workflow_id,
            node_id: spec.id,
            node_type: spec.node_type.clone(),
            timestamp: Utc::now(),
        });
        Ok(spec)
    }

    /// Connect an output port to an input port.
    ///
    /// Port declarations on both endpoints are checked synchronously
    /// and raise immediately; the full validation pass then re-runs
    /// over the mutated graph.
    pub async fn connect_nodes(
        &self,
        workflow_id: WorkflowId,
        from_node: NodeId,
        from_port: &str,
        to_node: NodeId,
        to_port: &str,
    ) -> Result<Connection, EngineError> {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows
            .get_mut(&workflow_id)
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;

        let from = workflow
            .find_node(from_node)
            .ok_or_else(|| WorkflowError::NodeNotFound(from_node.to_string()))?;
        if !from.outputs.iter().any(|p| p == from_port) {
            return Err(WorkflowError::InvalidConnection(format!(
                "node '{}' has no output port '{}'",
                from.label(),
                from_port
            ))
            .into());
        }
        let to = workflow
            .find_node(to_node)
            .ok_or_else(|| WorkflowError::NodeNotFound(to_node.to_string()))?;
        if !to.inputs.iter().any(|p| p == to_port) {
            return Err(WorkflowError::InvalidConnection(format!(
                "node '{}' has no input port '{}'",
                to.label(),
                to_port
            ))
            .into());
        }

        let connection = Connection::data(from_node, from_port, to_node, to_port);
        workflow.add_connection(connection.clone());
        let report = validate(workflow, &self.registry);
        apply_validation(workflow, &report);

        self.event_bus.emit(EngineEvent::NodesConnected {
            workflow_id,
            connection_id: connection.id,
            from_node,
            to_node,
            timestamp: Utc::now(),
        });
        Ok(connection)
    }

    /// Run the full validation pass and update the workflow's state.
    pub async fn validate_workflow(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<ValidationReport, EngineError> {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows
            .get_mut(&workflow_id)
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;

        let report = validate(workflow, &self.registry);
        apply_validation(workflow, &report);

        self.event_bus.emit(EngineEvent::WorkflowValidated {
            workflow_id,
            is_valid: report.is_valid,
            errors: report.errors.clone(),
            timestamp: Utc::now(),
        });
        Ok(report)
    }

    /// Execute a workflow against the given input.
    ///
    /// The graph is snapshotted under the lock and run lock-free, so
    /// concurrent executions of one workflow are fully independent.
    /// Every finished run lands in the bounded history, including
    /// failed ones; a run stopped by the error policy returns `Err`
    /// while its record stays available via [`Self::execution`].
    pub async fn execute_workflow(
        &self,
        workflow_id: WorkflowId,
        input: HashMap<String, Value>,
        options: ExecuteOptions,
    ) -> Result<ExecutionOutcome, EngineError> {
        let snapshot = {
            let workflows = self.workflows.read().await;
            workflows
                .get(&workflow_id)
                .cloned()
                .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?
        };

        let outcome = self
            .executor
            .execute(
                &snapshot,
                &self.registry,
                &self.event_bus,
                self.services.clone(),
                input,
                options,
            )
            .await?;

        {
            let mut workflows = self.workflows.write().await;
            if let Some(workflow) = workflows.get_mut(&workflow_id) {
                workflow.state.execution_count += 1;
                workflow.state.last_executed = Some(Utc::now());
            }
        }
        {
            let mut history = self.history.write().await;
            history.record(outcome.execution.clone());
        }

        if outcome.execution.status == ExecutionStatus::Error {
            let message = outcome
                .execution
                .error
                .clone()
                .unwrap_or_else(|| "execution failed".to_string());
            return Err(EngineError::Execution(message));
        }
        Ok(outcome)
    }

    /// Serialize a workflow definition to a JSON document on disk.
    pub async fn save_workflow(
        &self,
        workflow_id: WorkflowId,
        path: Option<PathBuf>,
    ) -> Result<PathBuf, EngineError> {
        let workflow = {
            let workflows = self.workflows.read().await;
            workflows
                .get(&workflow_id)
                .cloned()
                .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?
        };

        let path = path.unwrap_or_else(|| PathBuf::from(format!("{}.json", workflow.id)));
        let json = serde_json::to_string_pretty(&workflow)?;
        std::fs::write(&path, json)?;

        self.event_bus.emit(EngineEvent::WorkflowSaved {
            workflow_id,
            path: path.clone(),
            timestamp: Utc::now(),
        });
        Ok(path)
    }

    /// Load a workflow document and store it. Runtime state is not
    /// persisted, so the loaded graph starts fresh.
    pub async fn load_workflow(&self, path: &Path) -> Result<Workflow, EngineError> {
        let json = std::fs::read_to_string(path)?;
        let workflow: Workflow = serde_json::from_str(&json)?;

        let mut workflows = self.workflows.write().await;
        workflows.insert(workflow.id, workflow.clone());

        self.event_bus.emit(EngineEvent::WorkflowLoaded {
            workflow_id: workflow.id,
            path: path.to_path_buf(),
            timestamp: Utc::now(),
        });
        Ok(workflow)
    }

    pub async fn delete_workflow(&self, workflow_id: WorkflowId) -> Result<(), EngineError> {
        let mut workflows = self.workflows.write().await;
        workflows
            .remove(&workflow_id)
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;

        self.event_bus.emit(EngineEvent::WorkflowDeleted {
            workflow_id,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    pub async fn get_workflow(&self, workflow_id: WorkflowId) -> Option<Workflow> {
        self.workflows.read().await.get(&workflow_id).cloned()
    }

    pub async fn list_workflows(&self) -> Vec<Workflow> {
        self.workflows.read().await.values().cloned().collect()
    }

    /// Look up a retained execution record by id.
    pub async fn execution(&self, execution_id: ExecutionId) -> Option<Execution> {
        self.history.read().await.get(execution_id).cloned()
    }

    /// Retained execution records, oldest first.
    pub async fn recent_executions(&self) -> Vec<Execution> {
        self.history.read().await.recent().cloned().collect()
    }
}

fn apply_validation(workflow: &mut Workflow, report: &ValidationReport) {
    workflow.state.is_valid = report.is_valid;
    workflow.state.has_errors = !report.errors.is_empty();
}
