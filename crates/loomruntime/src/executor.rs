use crate::registry::NodeRegistry;
use crate::resolver::resolve_order;
use crate::validator::validate;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use loomcore::{
    EngineError, EngineEvent, ErrorHandling, EventBus, Execution, ExecutionStatus, Node,
    NodeContext, NodeError, NodeId, NodeOutput, Services, Value, Workflow, WorkflowError,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

/// Per-call execution options
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Per-node timeout override; falls back to `settings.timeout_ms`
    pub timeout_ms: Option<u64>,
    /// Skip the pre-flight validation pass (the resolver still raises
    /// on cycles)
    pub allow_invalid: bool,
    /// Best-effort stop signal: prevents new nodes from starting but
    /// does not force-terminate an in-flight node
    pub cancellation: Option<CancellationToken>,
}

/// Everything one run produced: the final output plus the full
/// execution record for diagnosis.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub output: HashMap<String, Value>,
    pub execution: Execution,
}

enum RunEnd {
    Completed,
    Failed(String),
    Cancelled,
}

/// Drives one workflow run: node-by-node in resolved order, or in
/// dependency-respecting waves when the workflow allows parallelism.
pub struct WorkflowExecutor {
    max_parallel: usize,
}

impl WorkflowExecutor {
    pub fn new(max_parallel: usize) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
        }
    }

    /// Execute a workflow against the given input.
    ///
    /// Structural problems (failed validation, cycles, unknown types)
    /// return `Err` before any node runs. Runtime node failures are
    /// governed by `settings.on_error` and reported through the
    /// returned `Execution` record: under `Stop` the outcome carries
    /// `ExecutionStatus::Error` and the triggering error; under
    /// `Continue` failed nodes record a sentinel and the run completes.
    pub async fn execute(
        &self,
        workflow: &Workflow,
        registry: &NodeRegistry,
        event_bus: &EventBus,
        services: Arc<Services>,
        input: HashMap<String, Value>,
        options: ExecuteOptions,
    ) -> Result<ExecutionOutcome, EngineError> {
        if !options.allow_invalid {
            let report = validate(workflow, registry);
            if !report.is_valid {
                return Err(WorkflowError::Invalid(report.errors.join("; ")).into());
            }
        }

        let order = resolve_order(workflow)?;
        let mut execution = Execution::new(workflow.id, input, order);
        let started = Instant::now();

        tracing::info!(
            workflow = %workflow.id,
            execution = %execution.id,
            nodes = workflow.nodes.len(),
            "starting workflow execution"
        );

        // Instantiate and initialize every node up front so type and
        // init failures surface before anything runs.
        let mut instances: HashMap<NodeId, Box<dyn Node>> = HashMap::new();
        for node in &workflow.nodes {
            let mut instance = registry.create_node(&node.node_type, &node.config)?;
            instance.initialize().await.map_err(|e| {
                EngineError::Execution(format!(
                    "node '{}' failed to initialize: {}",
                    node.label(),
                    e
                ))
            })?;
            instances.insert(node.id, instance);
        }

        let timeout_ms = options.timeout_ms.unwrap_or(workflow.settings.timeout_ms);
        let cancellation = options.cancellation.clone().unwrap_or_default();

        let end = if workflow.settings.allow_parallel {
            self.run_parallel(
                workflow,
                registry,
                event_bus,
                &services,
                &mut execution,
                instances,
                timeout_ms,
                &cancellation,
            )
            .await
        } else {
            self.run_sequential(
                workflow,
                registry,
                event_bus,
                &services,
                &mut execution,
                instances,
                timeout_ms,
                &cancellation,
            )
            .await
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        match end {
            RunEnd::Completed => {
                execution.output = final_output(workflow, &execution);
                execution.finish(ExecutionStatus::Completed);
                event_bus.emit(EngineEvent::WorkflowExecuted {
                    workflow_id: workflow.id,
                    execution_id: execution.id,
                    duration_ms,
                    timestamp: Utc::now(),
                });
                tracing::info!(execution = %execution.id, duration_ms, "workflow completed");
            }
            RunEnd::Failed(message) => {
                execution.error = Some(message.clone());
                execution.finish(ExecutionStatus::Error);
                event_bus.emit(EngineEvent::WorkflowExecutionError {
                    workflow_id: workflow.id,
                    execution_id: execution.id,
                    error: message.clone(),
                    timestamp: Utc::now(),
                });
                tracing::error!(execution = %execution.id, error = %message, "workflow failed");
            }
            RunEnd::Cancelled => {
                execution.output = final_output(workflow, &execution);
                execution.finish(ExecutionStatus::Cancelled);
                tracing::warn!(execution = %execution.id, "workflow cancelled");
            }
        }

        Ok(ExecutionOutcome {
            output: execution.output.clone(),
            execution,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_sequential(
        &self,
        workflow: &Workflow,
        registry: &NodeRegistry,
        event_bus: &EventBus,
        services: &Arc<Services>,
        execution: &mut Execution,
        mut instances: HashMap<NodeId, Box<dyn Node>>,
        timeout_ms: u64,
        cancellation: &CancellationToken,
    ) -> RunEnd {
        for node_id in execution.execution_order.clone() {
            if cancellation.is_cancelled() {
                return RunEnd::Cancelled;
            }

            let spec = match workflow.find_node(node_id) {
                Some(spec) => spec,
                None => return RunEnd::Failed(format!("node {} missing from graph", node_id)),
            };
            let node = match instances.remove(&node_id) {
                Some(node) => node,
                None => return RunEnd::Failed(format!("no instance for node {}", node_id)),
            };

            let ctx = self.node_context(
                workflow, event_bus, services, execution, spec, cancellation,
            );
            event_bus.emit(EngineEvent::NodeStarted {
                execution_id: execution.id,
                node_id,
                node_type: spec.node_type.clone(),
                timestamp: Utc::now(),
            });
            execution.mark_node_running(node_id);

            let (result, duration_ms) = run_with_timeout(node, ctx, timeout_ms).await;
            match result {
                Ok(output) => {
                    record_success(event_bus, execution, node_id, output, duration_ms);
                }
                Err(e) => {
                    record_failure(event_bus, execution, node_id, &e, duration_ms);
                    match workflow.settings.on_error {
                        ErrorHandling::Stop => {
                            return RunEnd::Failed(format!(
                                "node '{}' failed: {}",
                                spec.label(),
                                e
                            ));
                        }
                        ErrorHandling::Continue => {
                            record_failure_sentinel(
                                workflow,
                                registry,
                                execution,
                                node_id,
                                &e.to_string(),
                            );
                        }
                    }
                }
            }
        }
        RunEnd::Completed
    }

    /// Wave scheduling: repeatedly run every node whose producers have
    /// all settled, joining the whole wave before recomputing, so a
    /// dependent never starts before its producers finish (or record
    /// their sentinel under the continue policy).
    #[allow(clippy::too_many_arguments)]
    async fn run_parallel(
        &self,
        workflow: &Workflow,
        registry: &NodeRegistry,
        event_bus: &EventBus,
        services: &Arc<Services>,
        execution: &mut Execution,
        mut instances: HashMap<NodeId, Box<dyn Node>>,
        timeout_ms: u64,
        cancellation: &CancellationToken,
    ) -> RunEnd {
        let mut pending: Vec<NodeId> = execution.execution_order.clone();
        let mut settled: HashSet<NodeId> = HashSet::new();

        while !pending.is_empty() {
            if cancellation.is_cancelled() {
                return RunEnd::Cancelled;
            }

            let ready: Vec<NodeId> = pending
                .iter()
                .copied()
                .filter(|id| {
                    workflow.connections.iter().all(|c| {
                        c.to.node != *id
                            || settled.contains(&c.from.node)
                            || !workflow.has_node(c.from.node)
                    })
                })
                .take(self.max_parallel)
                .collect();
            if ready.is_empty() {
                // Cannot happen on a resolved DAG; guards against a
                // graph mutated between resolve and run.
                return RunEnd::Failed("no runnable nodes remain".to_string());
            }

            let mut wave = FuturesUnordered::new();
            for node_id in &ready {
                let node_id = *node_id;
                let spec = match workflow.find_node(node_id) {
                    Some(spec) => spec,
                    None => {
                        return RunEnd::Failed(format!("node {} missing from graph", node_id))
                    }
                };
                let node = match instances.remove(&node_id) {
                    Some(node) => node,
                    None => return RunEnd::Failed(format!("no instance for node {}", node_id)),
                };

                let ctx = self.node_context(
                    workflow, event_bus, services, execution, spec, cancellation,
                );
                event_bus.emit(EngineEvent::NodeStarted {
                    execution_id: execution.id,
                    node_id,
                    node_type: spec.node_type.clone(),
                    timestamp: Utc::now(),
                });
                execution.mark_node_running(node_id);

                wave.push(async move {
                    let (result, duration_ms) = run_with_timeout(node, ctx, timeout_ms).await;
                    (node_id, result, duration_ms)
                });
            }

            let mut wave_failure: Option<String> = None;
            while let Some((node_id, result, duration_ms)) = wave.next().await {
                match result {
                    Ok(output) => {
                        record_success(event_bus, execution, node_id, output, duration_ms);
                    }
                    Err(e) => {
                        record_failure(event_bus, execution, node_id, &e, duration_ms);
                        let label = workflow
                            .find_node(node_id)
                            .map(|n| n.label().to_string())
                            .unwrap_or_else(|| node_id.to_string());
                        match workflow.settings.on_error {
                            ErrorHandling::Stop => {
                                // Drain the wave; nothing new starts.
                                wave_failure
                                    .get_or_insert(format!("node '{}' failed: {}", label, e));
                            }
                            ErrorHandling::Continue => {
                                record_failure_sentinel(
                                    workflow,
                                    registry,
                                    execution,
                                    node_id,
                                    &e.to_string(),
                                );
                            }
                        }
                    }
                }
            }

            if let Some(message) = wave_failure {
                return RunEnd::Failed(message);
            }
            pending.retain(|id| !ready.contains(id));
            settled.extend(ready);
        }
        RunEnd::Completed
    }

    fn node_context(
        &self,
        workflow: &Workflow,
        event_bus: &EventBus,
        services: &Arc<Services>,
        execution: &Execution,
        spec: &loomcore::NodeSpec,
        cancellation: &CancellationToken,
    ) -> NodeContext {
        NodeContext {
            node_id: spec.id,
            execution_id: execution.id,
            inputs: build_inputs(workflow, spec.id, &execution.node_results, &execution.input),
            config: spec.config.clone(),
            workflow_input: execution.input.clone(),
            events: event_bus.node_emitter(execution.id, spec.id),
            services: services.clone(),
            cancellation: cancellation.clone(),
        }
    }
}

/// Race the node against the resolved timeout. On expiry the spawned
/// task keeps running; it is simply no longer awaited.
async fn run_with_timeout(
    node: Box<dyn Node>,
    ctx: NodeContext,
    timeout_ms: u64,
) -> (Result<NodeOutput, NodeError>, u64) {
    let started = Instant::now();
    let handle = tokio::spawn(async move { node.execute(ctx).await });
    let result = match timeout(Duration::from_millis(timeout_ms), handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(NodeError::ExecutionFailed(format!(
            "node task panicked: {}",
            join_err
        ))),
        Err(_) => Err(NodeError::Timeout { ms: timeout_ms }),
    };
    (result, started.elapsed().as_millis() as u64)
}

/// Gather a node's input map from upstream results.
///
/// Data connections are walked in declaration order; a later connection
/// targeting an already-filled port overwrites it (last-write-wins).
/// A node with no incoming data connection receives the raw workflow
/// input instead.
fn build_inputs(
    workflow: &Workflow,
    node_id: NodeId,
    node_results: &HashMap<NodeId, HashMap<String, Value>>,
    workflow_input: &HashMap<String, Value>,
) -> HashMap<String, Value> {
    let mut inputs = if workflow.connections_into(node_id).next().is_none() {
        workflow_input.clone()
    } else {
        HashMap::new()
    };

    for conn in workflow.connections_into(node_id) {
        if let Some(results) = node_results.get(&conn.from.node) {
            if let Some(value) = results.get(&conn.from.port) {
                inputs.insert(conn.to.port.clone(), value.clone());
            }
        }
    }

    inputs
}

fn record_success(
    event_bus: &EventBus,
    execution: &mut Execution,
    node_id: NodeId,
    output: NodeOutput,
    duration_ms: u64,
) {
    tracing::debug!(node = %node_id, duration_ms, "node completed");
    event_bus.emit(EngineEvent::NodeExecuted {
        execution_id: execution.id,
        node_id,
        outputs: output.outputs.clone(),
        duration_ms,
        timestamp: Utc::now(),
    });
    execution.node_results.insert(node_id, output.outputs);
    execution.mark_node_completed(node_id, duration_ms);
}

fn record_failure(
    event_bus: &EventBus,
    execution: &mut Execution,
    node_id: NodeId,
    error: &NodeError,
    duration_ms: u64,
) {
    tracing::warn!(node = %node_id, error = %error, "node failed");
    event_bus.emit(EngineEvent::NodeExecutionError {
        execution_id: execution.id,
        node_id,
        error: error.to_string(),
        timestamp: Utc::now(),
    });
    execution.mark_node_failed(node_id, error.to_string(), duration_ms);
}

/// Under the continue policy a failed node still records outputs: the
/// failure sentinel on every declared output port, so downstream reads
/// observe the sentinel instead of a missing value.
fn record_failure_sentinel(
    workflow: &Workflow,
    registry: &NodeRegistry,
    execution: &mut Execution,
    node_id: NodeId,
    message: &str,
) {
    let sentinel = Value::failed(message);
    let spec = workflow.find_node(node_id);

    let mut ports: Vec<String> = spec.map(|s| s.outputs.clone()).unwrap_or_default();
    if ports.is_empty() {
        if let Some(spec) = spec {
            ports = registry.output_ports(&spec.node_type).unwrap_or_default();
        }
    }

    let mut outputs = HashMap::new();
    for port in ports {
        outputs.insert(port, sentinel.clone());
    }
    if outputs.is_empty() {
        outputs.insert("error".to_string(), sentinel);
    }
    execution.node_results.insert(node_id, outputs);
}

/// Pick the run's final output: the single sink's result when there is
/// exactly one, a map keyed by node id when there are several, and the
/// last node in resolved order as the fallback when no sink exists.
fn final_output(workflow: &Workflow, execution: &Execution) -> HashMap<String, Value> {
    let sinks = workflow.sink_nodes();
    match sinks.as_slice() {
        [only] => execution.node_results.get(only).cloned().unwrap_or_default(),
        [] => execution
            .execution_order
            .last()
            .and_then(|id| execution.node_results.get(id))
            .cloned()
            .unwrap_or_default(),
        many => many
            .iter()
            .map(|id| {
                (
                    id.to_string(),
                    Value::Object(execution.node_results.get(id).cloned().unwrap_or_default()),
                )
            })
            .collect(),
    }
}
