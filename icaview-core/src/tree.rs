//! Decision tree parsing
//!
//! The denoising pipeline models its decision "tree" as a flat list of
//! rules executed in order, not a branching graph; the parsed form keeps
//! that shape. Node kind is decided once here by the `dec_` function-name
//! prefix rule, the single source of truth for decision-vs-calculation.
//!
//! Global invariants enforced:
//! - `RuleNode::index` equals the node's position in execution order
//! - Missing fields default (`0`, `"nochange"`, `""`), never error
//! - A document without a `nodes` array parses to `None`, not a panic

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Sentinel outcome label meaning "this branch leaves the classification
/// untouched".
pub const NOCHANGE: &str = "nochange";

/// Whether a rule changes classifications or only computes metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Decision,
    Calculation,
}

impl NodeKind {
    /// The `dec_` prefix is the sole discriminator; everything else
    /// (including `calc_` and unprefixed names like `manual_classify`)
    /// is a calculation step for display purposes.
    pub fn from_function_name(name: &str) -> NodeKind {
        if name.starts_with("dec_") {
            NodeKind::Decision
        } else {
            NodeKind::Calculation
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Decision => "decision",
            NodeKind::Calculation => "calculation",
        }
    }
}

/// Outcome of one branch of a decision node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoChange,
    Classified(String),
}

impl Outcome {
    pub fn from_raw(raw: Option<String>) -> Outcome {
        match raw {
            Some(label) if label != NOCHANGE && !label.is_empty() => Outcome::Classified(label),
            _ => Outcome::NoChange,
        }
    }

    /// Round-trips the `"nochange"` sentinel verbatim.
    pub fn as_str(&self) -> &str {
        match self {
            Outcome::NoChange => NOCHANGE,
            Outcome::Classified(label) => label,
        }
    }

    pub fn is_change(&self) -> bool {
        matches!(self, Outcome::Classified(_))
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One step of the decision tree, normalized from the raw document.
#[derive(Debug, Clone, Serialize)]
pub struct RuleNode {
    pub index: usize,
    pub function_name: String,
    pub kind: NodeKind,
    pub label: String,
    pub n_true: usize,
    pub n_false: usize,
    pub used_metrics: Vec<String>,
    pub decide_comps: String,
    pub if_true: Outcome,
    pub if_false: Outcome,
    pub operator: String,
    pub left: String,
    pub right: String,
    pub tag_if_true: String,
    pub tag_if_false: String,
    pub comment: String,
}

impl RuleNode {
    pub fn is_decision(&self) -> bool {
        self.kind == NodeKind::Decision
    }
}

/// Parsed decision tree: rules in execution order plus pass-through
/// metadata.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionTree {
    pub tree_id: String,
    pub info: String,
    pub report: String,
    pub nodes: Vec<RuleNode>,
    pub necessary_metrics: Vec<String>,
    pub generated_metrics: Vec<String>,
    pub intermediate_classifications: Vec<String>,
    pub classification_tags: Vec<String>,
}

// Raw fields stay as `Value` so a malformed leaf (a float count, a
// numeric label) degrades to its default instead of failing the node.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTreeDocument {
    tree_id: Value,
    info: Value,
    report: Value,
    necessary_metrics: Value,
    generated_metrics: Value,
    intermediate_classifications: Value,
    classification_tags: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNode {
    functionname: Value,
    outputs: RawOutputs,
    parameters: RawParameters,
    kwargs: RawKwargs,
    #[serde(rename = "_comment")]
    comment: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOutputs {
    node_label: Value,
    n_true: Value,
    n_false: Value,
    used_metrics: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawParameters {
    decide_comps: Value,
    if_true: Value,
    if_false: Value,
    op: Value,
    left: Value,
    right: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawKwargs {
    custom_node_label: Value,
    tag_if_true: Value,
    tag_if_false: Value,
}

/// Parse a raw decision-tree JSON document.
///
/// Returns `None` only when the value is not an object carrying a
/// `nodes` array; that means "nothing to show", not an error. Nodes
/// deserialize individually, so one malformed node falls back to
/// defaults without discarding the rest of the tree.
pub fn parse_decision_tree(raw: &Value) -> Option<DecisionTree> {
    let raw_nodes = raw.get("nodes")?.as_array()?;

    let doc: RawTreeDocument = serde_json::from_value(raw.clone()).unwrap_or_default();

    let nodes = raw_nodes
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let node: RawNode = serde_json::from_value(value.clone()).unwrap_or_default();
            build_node(index, node)
        })
        .collect();

    Some(DecisionTree {
        tree_id: text_field(&doc.tree_id).unwrap_or_else(|| "unknown".to_string()),
        info: text_field(&doc.info).unwrap_or_default(),
        report: text_field(&doc.report).unwrap_or_default(),
        nodes,
        necessary_metrics: string_list(&doc.necessary_metrics),
        generated_metrics: string_list(&doc.generated_metrics),
        intermediate_classifications: string_list(&doc.intermediate_classifications),
        classification_tags: string_list(&doc.classification_tags),
    })
}

fn build_node(index: usize, raw: RawNode) -> RuleNode {
    let function_name = text_field(&raw.functionname).unwrap_or_default();
    let kind = NodeKind::from_function_name(&function_name);

    // Label resolution: node output label, then custom kwarg, then a
    // synthesized positional label
    let label = text_field(&raw.outputs.node_label)
        .filter(|l| !l.is_empty())
        .or_else(|| text_field(&raw.kwargs.custom_node_label))
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| format!("Node {index}"));

    RuleNode {
        index,
        function_name,
        kind,
        label,
        n_true: count_field(&raw.outputs.n_true),
        n_false: count_field(&raw.outputs.n_false),
        used_metrics: string_list(&raw.outputs.used_metrics),
        decide_comps: value_display(&raw.parameters.decide_comps, "all"),
        if_true: Outcome::from_raw(text_field(&raw.parameters.if_true)),
        if_false: Outcome::from_raw(text_field(&raw.parameters.if_false)),
        operator: text_field(&raw.parameters.op).unwrap_or_default(),
        left: value_display(&raw.parameters.left, ""),
        right: value_display(&raw.parameters.right, ""),
        tag_if_true: text_field(&raw.kwargs.tag_if_true).unwrap_or_default(),
        tag_if_false: text_field(&raw.kwargs.tag_if_false).unwrap_or_default(),
        comment: text_field(&raw.comment).unwrap_or_default(),
    }
}

fn text_field(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// Component counts coerce from any non-negative number; anything else
/// reads as 0.
fn count_field(value: &Value) -> usize {
    value
        .as_u64()
        .map(|n| n as usize)
        .or_else(|| value.as_f64().map(|n| n.max(0.0) as usize))
        .unwrap_or(0)
}

/// Fields like `used_metrics` appear as either a string or a list of
/// strings in pipeline output.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Display form for polymorphic condition operands (metric name, number,
/// or list of classifications).
fn value_display(value: &Value, default: &str) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_nodes_returns_none() {
        assert!(parse_decision_tree(&json!(null)).is_none());
        assert!(parse_decision_tree(&json!({"tree_id": "x"})).is_none());
        assert!(parse_decision_tree(&json!({"nodes": "not-an-array"})).is_none());
    }

    #[test]
    fn test_empty_nodes_parses() {
        let tree = parse_decision_tree(&json!({"nodes": []})).unwrap();
        assert_eq!(tree.tree_id, "unknown");
        assert!(tree.nodes.is_empty());
    }

    #[test]
    fn test_indices_match_position() {
        let tree = parse_decision_tree(&json!({
            "tree_id": "minimal",
            "nodes": [
                {"functionname": "calc_kappa_elbow"},
                {"functionname": "dec_left_op_right"},
                {"functionname": "dec_variance_lessthan_thresholds"}
            ]
        }))
        .unwrap();

        let indices: Vec<usize> = tree.nodes.iter().map(|n| n.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_prefix_discrimination() {
        assert_eq!(
            NodeKind::from_function_name("dec_left_op_right"),
            NodeKind::Decision
        );
        assert_eq!(
            NodeKind::from_function_name("calc_kappa_elbow"),
            NodeKind::Calculation
        );
        // Unprefixed pipeline functions are not decisions
        assert_eq!(
            NodeKind::from_function_name("manual_classify"),
            NodeKind::Calculation
        );
        assert_eq!(NodeKind::from_function_name(""), NodeKind::Calculation);
    }

    #[test]
    fn test_label_resolution_order() {
        let tree = parse_decision_tree(&json!({
            "nodes": [
                {"outputs": {"node_label": "Kappa elbow"},
                 "kwargs": {"custom_node_label": "ignored"}},
                {"kwargs": {"custom_node_label": "Custom"}},
                {}
            ]
        }))
        .unwrap();

        assert_eq!(tree.nodes[0].label, "Kappa elbow");
        assert_eq!(tree.nodes[1].label, "Custom");
        assert_eq!(tree.nodes[2].label, "Node 2");
    }

    #[test]
    fn test_defaults() {
        let tree = parse_decision_tree(&json!({"nodes": [{}]})).unwrap();
        let node = &tree.nodes[0];

        assert_eq!(node.function_name, "");
        assert_eq!(node.n_true, 0);
        assert_eq!(node.n_false, 0);
        assert_eq!(node.if_true, Outcome::NoChange);
        assert_eq!(node.if_true.as_str(), "nochange");
        assert_eq!(node.decide_comps, "all");
        assert_eq!(node.operator, "");
    }

    #[test]
    fn test_outcomes_and_condition() {
        let tree = parse_decision_tree(&json!({
            "nodes": [{
                "functionname": "dec_left_op_right",
                "parameters": {
                    "if_true": "rejected",
                    "if_false": "nochange",
                    "op": ">",
                    "left": "rho",
                    "right": "kappa"
                },
                "outputs": {"n_true": 3, "n_false": 9}
            }]
        }))
        .unwrap();
        let node = &tree.nodes[0];

        assert!(node.is_decision());
        assert_eq!(node.if_true, Outcome::Classified("rejected".to_string()));
        assert_eq!(node.if_false, Outcome::NoChange);
        assert!(!node.if_false.is_change());
        assert_eq!((node.n_true, node.n_false), (3, 9));
        assert_eq!((node.operator.as_str(), node.left.as_str()), (">", "rho"));
    }

    #[test]
    fn test_malformed_fields_degrade_to_defaults() {
        let tree = parse_decision_tree(&json!({
            "tree_id": 7,
            "nodes": [
                {"functionname": "calc_kappa_elbow"},
                {"functionname": "dec_left_op_right",
                 "outputs": {"n_true": 3.5, "node_label": 12},
                 "parameters": {"if_true": 5, "if_false": "rejected"}}
            ]
        }))
        .unwrap();

        assert_eq!(tree.tree_id, "unknown");
        let node = &tree.nodes[1];
        assert_eq!(node.function_name, "dec_left_op_right");
        assert_eq!(node.n_true, 3);
        assert_eq!(node.if_true, Outcome::NoChange);
        assert_eq!(node.if_false, Outcome::Classified("rejected".to_string()));
        assert_eq!(node.label, "Node 1");
    }

    #[test]
    fn test_one_bad_node_keeps_the_rest() {
        let tree = parse_decision_tree(&json!({
            "nodes": [
                {"functionname": "calc_kappa_elbow"},
                {"functionname": "dec_left_op_right", "outputs": "broken"},
                {"functionname": "dec_variance_lessthan_thresholds"}
            ]
        }))
        .unwrap();

        assert_eq!(tree.nodes.len(), 3);
        // A node whose outputs block is not an object falls back whole
        assert_eq!(tree.nodes[1].function_name, "");
        assert_eq!(tree.nodes[1].label, "Node 1");
        assert!(tree.nodes[2].is_decision());
        assert_eq!(
            tree.nodes[2].function_name,
            "dec_variance_lessthan_thresholds"
        );
    }

    #[test]
    fn test_polymorphic_fields() {
        let tree = parse_decision_tree(&json!({
            "nodes": [{
                "outputs": {"used_metrics": ["kappa", "rho"]},
                "parameters": {"decide_comps": ["provisional accept", "unclassified"],
                               "right": 0.98}
            }]
        }))
        .unwrap();
        let node = &tree.nodes[0];

        assert_eq!(node.used_metrics, vec!["kappa", "rho"]);
        assert_eq!(node.decide_comps, "provisional accept, unclassified");
        assert_eq!(node.right, "0.98");
    }
}
