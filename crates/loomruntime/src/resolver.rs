use loomcore::{NodeId, Workflow, WorkflowError};
use std::collections::HashSet;

/// Resolve a total execution order over the workflow's nodes.
///
/// Depth-first: nodes are taken in insertion order; each node's
/// producers (nodes with a connection into it, in connection
/// declaration order) are appended before the node itself. Nodes with
/// no ordering constraint between them therefore come out in insertion
/// order, which makes the result deterministic for a fixed
/// construction sequence. Revisiting a node already on the DFS path
/// raises `CyclicDependency`.
pub fn resolve_order(workflow: &Workflow) -> Result<Vec<NodeId>, WorkflowError> {
    let mut order = Vec::with_capacity(workflow.nodes.len());
    let mut done = HashSet::new();
    let mut in_progress = HashSet::new();

    for node in &workflow.nodes {
        visit(workflow, node.id, &mut done, &mut in_progress, &mut order)?;
    }

    Ok(order)
}

fn visit(
    workflow: &Workflow,
    id: NodeId,
    done: &mut HashSet<NodeId>,
    in_progress: &mut HashSet<NodeId>,
    order: &mut Vec<NodeId>,
) -> Result<(), WorkflowError> {
    if done.contains(&id) {
        return Ok(());
    }
    if !in_progress.insert(id) {
        let label = workflow
            .find_node(id)
            .map(|n| n.label().to_string())
            .unwrap_or_else(|| id.to_string());
        return Err(WorkflowError::CyclicDependency(label));
    }

    for conn in &workflow.connections {
        // Producers first; connections to nodes outside the graph are
        // the validator's problem, not the resolver's.
        if conn.to.node == id && workflow.has_node(conn.from.node) {
            visit(workflow, conn.from.node, done, in_progress, order)?;
        }
    }

    in_progress.remove(&id);
    done.insert(id);
    order.push(id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use loomcore::{Connection, NodeSpec};

    fn spec(name: &str) -> NodeSpec {
        NodeSpec::new("test.pass").with_name(name)
    }

    #[test]
    fn producers_precede_consumers() {
        let mut workflow = Workflow::new("chain");
        let a = workflow.add_node(spec("a"));
        let b = workflow.add_node(spec("b"));
        let c = workflow.add_node(spec("c"));
        // Declared backwards to prove order comes from edges, not luck.
        workflow.add_connection(Connection::data(b, "value", c, "value"));
        workflow.add_connection(Connection::data(a, "value", b, "value"));

        assert_eq!(resolve_order(&workflow).unwrap(), vec![a, b, c]);
    }

    #[test]
    fn independent_nodes_keep_insertion_order() {
        let mut workflow = Workflow::new("independent");
        let first = workflow.add_node(spec("first"));
        let second = workflow.add_node(spec("second"));
        let third = workflow.add_node(spec("third"));

        assert_eq!(
            resolve_order(&workflow).unwrap(),
            vec![first, second, third]
        );
    }

    #[test]
    fn diamond_respects_edges_and_tie_break() {
        let mut workflow = Workflow::new("diamond");
        let source = workflow.add_node(spec("source"));
        let left = workflow.add_node(spec("left"));
        let right = workflow.add_node(spec("right"));
        let join = workflow.add_node(spec("join"));
        workflow.add_connection(Connection::data(source, "value", left, "value"));
        workflow.add_connection(Connection::data(source, "value", right, "value"));
        workflow.add_connection(Connection::data(left, "value", join, "a"));
        workflow.add_connection(Connection::data(right, "value", join, "b"));

        let order = resolve_order(&workflow).unwrap();
        assert_eq!(order, vec![source, left, right, join]);
    }

    #[test]
    fn order_is_a_permutation_respecting_all_edges() {
        let mut workflow = Workflow::new("permutation");
        let ids: Vec<_> = (0..6)
            .map(|i| workflow.add_node(spec(&format!("n{}", i))))
            .collect();
        workflow.add_connection(Connection::data(ids[4], "value", ids[1], "value"));
        workflow.add_connection(Connection::data(ids[0], "value", ids[4], "value"));
        workflow.add_connection(Connection::data(ids[5], "value", ids[2], "value"));
        workflow.add_connection(Connection::data(ids[1], "value", ids[3], "value"));

        let order = resolve_order(&workflow).unwrap();
        assert_eq!(order.len(), ids.len());
        for id in &ids {
            assert!(order.contains(id));
        }
        let position = |id| order.iter().position(|x| *x == id).unwrap();
        for conn in &workflow.connections {
            assert!(position(conn.from.node) < position(conn.to.node));
        }
    }

    #[test]
    fn cycle_raises() {
        let mut workflow = Workflow::new("cycle");
        let a = workflow.add_node(spec("a"));
        let b = workflow.add_node(spec("b"));
        workflow.add_connection(Connection::data(a, "value", b, "value"));
        workflow.add_connection(Connection::data(b, "value", a, "value"));

        let err = resolve_order(&workflow).unwrap_err();
        assert!(matches!(err, WorkflowError::CyclicDependency(_)));
    }

    #[test]
    fn self_loop_raises() {
        let mut workflow = Workflow::new("self");
        let a = workflow.add_node(spec("a"));
        workflow.add_connection(Connection::data(a, "value", a, "value"));

        assert!(matches!(
            resolve_order(&workflow),
            Err(WorkflowError::CyclicDependency(_))
        ));
    }
}
