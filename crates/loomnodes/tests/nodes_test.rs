use loomcore::Value;
use loomruntime::{ExecuteOptions, NodeDraft, NodeRegistry, WorkflowConfig, WorkflowEngine};
use std::collections::HashMap;
use std::sync::Arc;

fn engine() -> WorkflowEngine {
    let mut registry = NodeRegistry::new();
    loomnodes::register_all(&mut registry).unwrap();
    WorkflowEngine::new(Arc::new(registry))
}

fn input(value: Value) -> HashMap<String, Value> {
    let mut map = HashMap::new();
    map.insert("value".to_string(), value);
    map
}

#[tokio::test]
async fn source_math_sink_pipeline_doubles() {
    let engine = engine();
    let workflow = engine.create_workflow(WorkflowConfig::new("double")).await;
    let source = engine
        .add_node(workflow.id, NodeDraft::new("core.source"))
        .await
        .unwrap();
    let math = engine
        .add_node(
            workflow.id,
            NodeDraft::new("transform.math").with_config("op", "double"),
        )
        .await
        .unwrap();
    let sink = engine
        .add_node(workflow.id, NodeDraft::new("core.sink"))
        .await
        .unwrap();
    engine
        .connect_nodes(workflow.id, source.id, "value", math.id, "value")
        .await
        .unwrap();
    engine
        .connect_nodes(workflow.id, math.id, "value", sink.id, "value")
        .await
        .unwrap();

    let outcome = engine
        .execute_workflow(
            workflow.id,
            input(Value::Number(21.0)),
            ExecuteOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.output.get("value"), Some(&Value::Number(42.0)));
}

#[tokio::test]
async fn math_ops_add_and_multiply_use_operand() {
    let engine = engine();
    let workflow = engine.create_workflow(WorkflowConfig::new("ops")).await;
    let source = engine
        .add_node(workflow.id, NodeDraft::new("core.source"))
        .await
        .unwrap();
    let add = engine
        .add_node(
            workflow.id,
            NodeDraft::new("transform.math")
                .with_config("op", "add")
                .with_config("operand", 5.0),
        )
        .await
        .unwrap();
    let multiply = engine
        .add_node(
            workflow.id,
            NodeDraft::new("transform.math")
                .with_config("op", "multiply")
                .with_config("operand", 3.0),
        )
        .await
        .unwrap();
    engine
        .connect_nodes(workflow.id, source.id, "value", add.id, "value")
        .await
        .unwrap();
    engine
        .connect_nodes(workflow.id, add.id, "value", multiply.id, "value")
        .await
        .unwrap();

    let outcome = engine
        .execute_workflow(
            workflow.id,
            input(Value::Number(7.0)),
            ExecuteOptions::default(),
        )
        .await
        .unwrap();
    // (7 + 5) * 3
    assert_eq!(outcome.output.get("value"), Some(&Value::Number(36.0)));
}

#[tokio::test]
async fn unsupported_math_op_fails_validation() {
    let engine = engine();
    let workflow = engine.create_workflow(WorkflowConfig::new("badop")).await;
    engine
        .add_node(
            workflow.id,
            NodeDraft::new("transform.math").with_config("op", "exec"),
        )
        .await
        .unwrap();

    let report = engine.validate_workflow(workflow.id).await.unwrap();
    assert!(!report.is_valid);
    assert!(report.errors.iter().any(|e| e.contains("unsupported op")));
}

#[tokio::test]
async fn branch_routes_to_the_matching_port() {
    let engine = engine();
    let workflow = engine.create_workflow(WorkflowConfig::new("branch")).await;
    let source = engine
        .add_node(workflow.id, NodeDraft::new("core.source"))
        .await
        .unwrap();
    let branch = engine
        .add_node(
            workflow.id,
            NodeDraft::new("logic.branch")
                .with_config("op", "gt")
                .with_config("operand", 10.0),
        )
        .await
        .unwrap();
    let high = engine
        .add_node(workflow.id, NodeDraft::new("core.sink").with_name("high"))
        .await
        .unwrap();
    let low = engine
        .add_node(workflow.id, NodeDraft::new("core.sink").with_name("low"))
        .await
        .unwrap();
    engine
        .connect_nodes(workflow.id, source.id, "value", branch.id, "value")
        .await
        .unwrap();
    engine
        .connect_nodes(workflow.id, branch.id, "true", high.id, "value")
        .await
        .unwrap();
    engine
        .connect_nodes(workflow.id, branch.id, "false", low.id, "value")
        .await
        .unwrap();

    let outcome = engine
        .execute_workflow(
            workflow.id,
            input(Value::Number(42.0)),
            ExecuteOptions::default(),
        )
        .await
        .unwrap();

    // Two sinks: the taken branch carries the value, the other is empty.
    let high_out = outcome.output.get(&high.id.to_string()).unwrap();
    assert_eq!(
        high_out.as_object().unwrap().get("value"),
        Some(&Value::Number(42.0))
    );
    let low_out = outcome.output.get(&low.id.to_string()).unwrap();
    assert_eq!(
        low_out.as_object().unwrap().get("value"),
        Some(&Value::Null)
    );
}

#[tokio::test]
async fn json_parse_then_stringify_round_trips() {
    let engine = engine();
    let workflow = engine.create_workflow(WorkflowConfig::new("json")).await;
    let source = engine
        .add_node(
            workflow.id,
            NodeDraft::new("core.source").with_config("value", r#"{"answer":42}"#),
        )
        .await
        .unwrap();
    let parse = engine
        .add_node(workflow.id, NodeDraft::new("transform.json_parse"))
        .await
        .unwrap();
    let stringify = engine
        .add_node(workflow.id, NodeDraft::new("transform.json_stringify"))
        .await
        .unwrap();
    engine
        .connect_nodes(workflow.id, source.id, "value", parse.id, "json")
        .await
        .unwrap();
    engine
        .connect_nodes(workflow.id, parse.id, "parsed", stringify.id, "value")
        .await
        .unwrap();

    let outcome = engine
        .execute_workflow(workflow.id, HashMap::new(), ExecuteOptions::default())
        .await
        .unwrap();
    let rendered = outcome.output.get("json").unwrap().as_str().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(rendered).unwrap();
    assert_eq!(parsed["value"]["answer"], 42);
}

#[tokio::test]
async fn debug_and_delay_pass_values_through() {
    let engine = engine();
    let workflow = engine.create_workflow(WorkflowConfig::new("passthrough")).await;
    let source = engine
        .add_node(workflow.id, NodeDraft::new("core.source"))
        .await
        .unwrap();
    let delay = engine
        .add_node(
            workflow.id,
            NodeDraft::new("time.delay").with_config("delay_ms", 10.0),
        )
        .await
        .unwrap();
    let debug = engine
        .add_node(workflow.id, NodeDraft::new("debug.log"))
        .await
        .unwrap();
    engine
        .connect_nodes(workflow.id, source.id, "value", delay.id, "value")
        .await
        .unwrap();
    engine
        .connect_nodes(workflow.id, delay.id, "value", debug.id, "value")
        .await
        .unwrap();

    let outcome = engine
        .execute_workflow(
            workflow.id,
            input(Value::String("hello".to_string())),
            ExecuteOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(
        outcome.output.get("value"),
        Some(&Value::String("hello".to_string()))
    );
}
