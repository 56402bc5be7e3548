use crate::registry::NodeRegistry;
use loomcore::{NodeId, Workflow};
use std::collections::HashMap;

/// Outcome of a validation pass over one workflow graph
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Validate a workflow graph against a registry.
///
/// Checks, in order: the graph is non-empty; the graph is acyclic;
/// every node type is registered; every node config passes its type's
/// validator; every connection references declared ports on existing
/// endpoints. The pass is pure; callers update `workflow.state` from
/// the report. Validating an unchanged graph twice yields the same
/// report.
pub fn validate(workflow: &Workflow, registry: &NodeRegistry) -> ValidationReport {
    let mut report = ValidationReport::default();

    if workflow.nodes.is_empty() {
        report.errors.push("workflow has no nodes".to_string());
        return report;
    }

    check_acyclic(workflow, &mut report);

    for node in &workflow.nodes {
        if !registry.contains(&node.node_type) {
            report.errors.push(format!(
                "node '{}' has unknown type '{}'",
                node.label(),
                node.node_type
            ));
            continue;
        }
        if let Err(e) = registry.validate_config(&node.node_type, &node.config) {
            report
                .errors
                .push(format!("node '{}' config invalid: {}", node.label(), e));
        }
    }

    for conn in &workflow.connections {
        check_connection(workflow, registry, conn, &mut report);
    }

    for node in &workflow.nodes {
        let connected = workflow
            .connections
            .iter()
            .any(|c| c.from.node == node.id || c.to.node == node.id);
        if !connected && workflow.nodes.len() > 1 {
            report
                .warnings
                .push(format!("node '{}' is not connected", node.label()));
        }
    }

    report.is_valid = report.errors.is_empty();
    report
}

/// Cycle detection by three-coloring depth-first traversal: white is
/// unvisited, gray is on the current DFS path, black is fully
/// processed. Reaching a gray node again means a cycle.
fn check_acyclic(workflow: &Workflow, report: &mut ValidationReport) {
    let mut colors: HashMap<NodeId, Color> = workflow
        .nodes
        .iter()
        .map(|n| (n.id, Color::White))
        .collect();

    for node in &workflow.nodes {
        if colors.get(&node.id) == Some(&Color::White)
            && dfs_finds_cycle(workflow, node.id, &mut colors)
        {
            let label = workflow
                .find_node(node.id)
                .map(|n| n.label().to_string())
                .unwrap_or_else(|| node.id.to_string());
            report
                .errors
                .push(format!("cycle detected involving node '{}'", label));
            return;
        }
    }
}

fn dfs_finds_cycle(workflow: &Workflow, id: NodeId, colors: &mut HashMap<NodeId, Color>) -> bool {
    colors.insert(id, Color::Gray);
    for conn in &workflow.connections {
        if conn.from.node != id {
            continue;
        }
        match colors.get(&conn.to.node) {
            Some(Color::Gray) => return true,
            Some(Color::White) => {
                if dfs_finds_cycle(workflow, conn.to.node, colors) {
                    return true;
                }
            }
            // Black, or an endpoint that is not a node at all; the
            // connection checks report the latter.
            _ => {}
        }
    }
    colors.insert(id, Color::Black);
    false
}

fn check_connection(
    workflow: &Workflow,
    registry: &NodeRegistry,
    conn: &loomcore::Connection,
    report: &mut ValidationReport,
) {
    let from = match workflow.find_node(conn.from.node) {
        Some(n) => n,
        None => {
            report.errors.push(format!(
                "connection {} references missing source node {}",
                conn.id, conn.from.node
            ));
            return;
        }
    };
    let to = match workflow.find_node(conn.to.node) {
        Some(n) => n,
        None => {
            report.errors.push(format!(
                "connection {} references missing target node {}",
                conn.id, conn.to.node
            ));
            return;
        }
    };

    // Port declarations come from the registry when the type resolves;
    // unknown types were already reported above.
    if let Some(meta) = registry.metadata(&from.node_type) {
        if !meta.output_names().iter().any(|p| p == &conn.from.port) {
            report.errors.push(format!(
                "node '{}' has no output port '{}'",
                from.label(),
                conn.from.port
            ));
        }
    }
    if let Some(meta) = registry.metadata(&to.node_type) {
        if !meta.input_names().iter().any(|p| p == &conn.to.port) {
            report.errors.push(format!(
                "node '{}' has no input port '{}'",
                to.label(),
                conn.to.port
            ));
        }
    }
}
