//! Component path and node impact queries
//!
//! The interactive layer calls these on every node or component click, so
//! everything here is a pure function over already-parsed structures.
//!
//! Global invariants enforced:
//! - Deterministic: identical inputs yield identical, ordered results
//! - Unknown identifiers yield empty results, never errors

use crate::status::ComponentPath;
use crate::tree::RuleNode;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Final classification of a component: the last recorded step, else the
/// initial state, else `"unclassified"` for an unknown component.
pub fn final_classification(path: Option<&ComponentPath>) -> &str {
    match path {
        Some(path) => path
            .steps
            .last()
            .map(|step| step.classification.as_str())
            .unwrap_or(path.initial.as_str()),
        None => "unclassified",
    }
}

/// Node indices at which a component's classification actually changed,
/// in execution order.
///
/// Walks the stored steps with a previous-classification cursor starting
/// at the initial state; a node that fired without changing the outcome
/// is not affecting.
pub fn affecting_nodes(
    component_id: &str,
    paths: &BTreeMap<String, ComponentPath>,
) -> Vec<usize> {
    let Some(path) = paths.get(component_id) else {
        return Vec::new();
    };

    let mut affecting = Vec::new();
    let mut previous = path.initial.as_str();

    for step in &path.steps {
        if step.classification != previous {
            affecting.push(step.node_index);
            previous = step.classification.as_str();
        }
    }

    affecting
}

/// Components whose classification was changed by the given node, in
/// component-id order.
///
/// A full scan over the path map; datasets are tens of components by a
/// few dozen nodes, so no inverted index is kept. The per-component
/// walks are independent and run in parallel, with results merged back
/// into id order.
pub fn components_affected_by(
    node_index: usize,
    paths: &BTreeMap<String, ComponentPath>,
) -> Vec<String> {
    let mut affected: Vec<String> = paths
        .par_iter()
        .filter(|(id, _)| affecting_nodes(id.as_str(), paths).contains(&node_index))
        .map(|(id, _)| id.clone())
        .collect();
    affected.sort();
    affected
}

/// Indices of nodes that can produce the given classification on either
/// branch, ascending. Answers "which decision nodes can output X"
/// independent of any specific run.
pub fn nodes_for_classification(nodes: &[RuleNode], classification: &str) -> Vec<usize> {
    nodes
        .iter()
        .filter(|node| {
            node.if_true.as_str() == classification || node.if_false.as_str() == classification
        })
        .map(|node| node.index)
        .collect()
}
