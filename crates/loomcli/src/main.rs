use anyhow::Result;
use clap::{Parser, Subcommand};
use loomcore::{EngineEvent, NodeEvent, Value};
use loomruntime::{ExecuteOptions, NodeDraft, NodeRegistry, WorkflowConfig, WorkflowEngine};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "loom")]
#[command(about = "Loom workflow engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Input data as JSON object string
        #[arg(short, long)]
        input: Option<String>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available node types
    Nodes,

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

fn build_engine() -> Result<WorkflowEngine> {
    let mut registry = NodeRegistry::new();
    loomnodes::register_all(&mut registry)?;
    Ok(WorkflowEngine::new(Arc::new(registry)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            input,
            verbose,
        } => {
            let level = if verbose {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            };
            tracing_subscriber::fmt().with_max_level(level).init();
            run_workflow(file, input).await?;
        }

        Commands::Validate { file } => {
            validate_workflow(file).await?;
        }

        Commands::Nodes => {
            list_nodes()?;
        }

        Commands::Init { output } => {
            create_example_workflow(output).await?;
        }
    }

    Ok(())
}

async fn run_workflow(file: PathBuf, input: Option<String>) -> Result<()> {
    let engine = build_engine()?;
    let workflow = engine.load_workflow(&file).await?;

    println!("Workflow: {}", workflow.name);
    println!("   nodes: {}", workflow.nodes.len());
    println!("   connections: {}", workflow.connections.len());
    println!();

    let inputs: HashMap<String, Value> = match input {
        Some(input_str) => {
            let json: serde_json::Value = serde_json::from_str(&input_str)?;
            match Value::from_json(json) {
                Value::Object(map) => map,
                _ => return Err(anyhow::anyhow!("input must be a JSON object")),
            }
        }
        None => HashMap::new(),
    };

    // Stream execution progress while the run is in flight.
    let mut events = engine.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                EngineEvent::NodeStarted {
                    node_id, node_type, ..
                } => {
                    println!("  -> starting {} ({})", node_id, node_type);
                }
                EngineEvent::NodeExecuted {
                    node_id,
                    duration_ms,
                    ..
                } => {
                    println!("  ok {} in {}ms", node_id, duration_ms);
                }
                EngineEvent::NodeExecutionError { node_id, error, .. } => {
                    println!("  FAILED {}: {}", node_id, error);
                }
                EngineEvent::NodeDiagnostic {
                    node_id,
                    event: NodeEvent::Info { message },
                    ..
                } => {
                    println!("     [{}] {}", node_id, message);
                }
                EngineEvent::WorkflowExecuted { duration_ms, .. } => {
                    println!("workflow completed in {}ms", duration_ms);
                }
                EngineEvent::WorkflowExecutionError { error, .. } => {
                    println!("workflow failed: {}", error);
                }
                _ => {}
            }
        }
    });

    let result = engine
        .execute_workflow(workflow.id, inputs, ExecuteOptions::default())
        .await;

    // Let the event printer drain before reporting.
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();

    let outcome = result?;
    println!();
    println!("Execution {} summary:", outcome.execution.id);
    println!(
        "   order: {} node(s), status {:?}",
        outcome.execution.execution_order.len(),
        outcome.execution.status
    );
    if !outcome.output.is_empty() {
        println!("   output:");
        for (key, value) in &outcome.output {
            println!("     {}: {:?}", key, value);
        }
    }

    Ok(())
}

async fn validate_workflow(file: PathBuf) -> Result<()> {
    let engine = build_engine()?;
    let workflow = engine.load_workflow(&file).await?;
    let report = engine.validate_workflow(workflow.id).await?;

    println!("Workflow: {}", workflow.name);
    if report.is_valid {
        println!("valid ({} warning(s))", report.warnings.len());
    } else {
        println!("INVALID:");
        for error in &report.errors {
            println!("  error: {}", error);
        }
    }
    for warning in &report.warnings {
        println!("  warning: {}", warning);
    }

    Ok(())
}

fn list_nodes() -> Result<()> {
    let mut registry = NodeRegistry::new();
    loomnodes::register_all(&mut registry)?;

    println!("Available node types:");
    for node_type in registry.list_node_types() {
        if let Some(meta) = registry.metadata(&node_type) {
            println!("  - {} ({})", node_type, meta.category);
            if !meta.description.is_empty() {
                println!("    {}", meta.description);
            }
        }
    }
    Ok(())
}

async fn create_example_workflow(output: PathBuf) -> Result<()> {
    let engine = build_engine()?;

    let workflow = engine
        .create_workflow(
            WorkflowConfig::new("Example doubling workflow")
                .with_description("Doubles a numeric input and collects the result"),
        )
        .await;
    let source = engine
        .add_node(workflow.id, NodeDraft::new("core.source").with_name("input"))
        .await?;
    let math = engine
        .add_node(
            workflow.id,
            NodeDraft::new("transform.math")
                .with_name("double")
                .with_config("op", "double"),
        )
        .await?;
    let sink = engine
        .add_node(workflow.id, NodeDraft::new("core.sink").with_name("output"))
        .await?;
    engine
        .connect_nodes(workflow.id, source.id, "value", math.id, "value")
        .await?;
    engine
        .connect_nodes(workflow.id, math.id, "value", sink.id, "value")
        .await?;

    let path = engine.save_workflow(workflow.id, Some(output)).await?;
    println!("created example workflow: {}", path.display());
    println!();
    println!("Run it with:");
    println!(
        "  loom run --file {} --input '{{\"value\": 21}}'",
        path.display()
    );

    Ok(())
}
