//! Status table parsing
//!
//! The pipeline's status table logs, per component, the classification in
//! effect after each node that acted on it. Columns named `Node <n>` are
//! positional: `<n>` is the executing node's index in the decision tree,
//! so a path's steps sorted by node index read in execution order.
//!
//! Global invariants enforced:
//! - Steps are sparse: an empty cell means the node did not act on the
//!   component, and no step is synthesized for it
//! - Steps are stored ascending by node index
//! - Duplicate component rows: last row wins

use crate::table::TsvTable;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Classification recorded immediately after one node acted on a
/// component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathStep {
    pub node_index: usize,
    pub classification: String,
}

/// Full classification history of one component.
///
/// The classification at the end of `steps` (or `initial` when empty) is
/// the component's final state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentPath {
    pub component: String,
    pub initial: String,
    pub steps: Vec<PathStep>,
}

fn node_column_regex() -> &'static Regex {
    static NODE_RE: OnceLock<Regex> = OnceLock::new();
    NODE_RE.get_or_init(|| Regex::new(r"^Node (\d+)$").unwrap())
}

/// Node columns discovered from the header, as (column index, node index)
/// pairs sorted by node index. Enumerated once per table, not per row.
fn node_columns(table: &TsvTable) -> Vec<(usize, usize)> {
    let re = node_column_regex();
    let mut columns: Vec<(usize, usize)> = table
        .columns
        .iter()
        .enumerate()
        .filter_map(|(col, name)| {
            let caps = re.captures(name)?;
            let node_index: usize = caps[1].parse().ok()?;
            Some((col, node_index))
        })
        .collect();
    columns.sort_by_key(|&(_, node_index)| node_index);
    columns
}

/// Parse a status table into per-component classification paths.
///
/// Component id comes from the `Component` (or `component`) column; rows
/// without one are skipped. Initial classification falls back through
/// `initialized classification`, `initial classification`, then
/// `"unclassified"`.
pub fn parse_status_table(table: &TsvTable) -> BTreeMap<String, ComponentPath> {
    let mut paths = BTreeMap::new();
    if table.is_empty() {
        return paths;
    }

    let component_col = table
        .column_index("Component")
        .or_else(|| table.column_index("component"));
    let Some(component_col) = component_col else {
        return paths;
    };

    let initial_col = table
        .column_index("initialized classification")
        .or_else(|| table.column_index("initial classification"));
    let node_cols = node_columns(table);

    for record in &table.records {
        let component = table.cell(record, component_col);
        if component.is_empty() {
            continue;
        }

        let initial = initial_col
            .map(|col| table.cell(record, col))
            .filter(|c| !c.is_empty())
            .unwrap_or("unclassified");

        let steps = node_cols
            .iter()
            .filter_map(|&(col, node_index)| {
                let classification = table.cell(record, col);
                // Empty cell: the node never acted on this component
                if classification.is_empty() {
                    return None;
                }
                Some(PathStep {
                    node_index,
                    classification: classification.to_string(),
                })
            })
            .collect();

        // Last row wins for duplicate component ids
        paths.insert(
            component.to_string(),
            ComponentPath {
                component: component.to_string(),
                initial: initial.to_string(),
                steps,
            },
        );
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> BTreeMap<String, ComponentPath> {
        parse_status_table(&TsvTable::parse(text))
    }

    #[test]
    fn test_empty_table() {
        assert!(parse("").is_empty());
        assert!(parse("Component\tNode 0\n").is_empty());
    }

    #[test]
    fn test_missing_component_column() {
        assert!(parse("id\tNode 0\nICA_00\trejected\n").is_empty());
    }

    #[test]
    fn test_basic_path() {
        let paths = parse(
            "Component\tinitialized classification\tNode 0\tNode 1\n\
             ICA_00\tunclassified\tunclassified\trejected\n",
        );
        let path = &paths["ICA_00"];

        assert_eq!(path.initial, "unclassified");
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.steps[1].node_index, 1);
        assert_eq!(path.steps[1].classification, "rejected");
    }

    #[test]
    fn test_sparse_cells_produce_no_steps() {
        let paths = parse(
            "Component\tinitialized classification\tNode 3\tNode 5\n\
             ICA_01\tunclassified\t\taccepted\n",
        );
        let path = &paths["ICA_01"];

        // Node 3 never touched this component
        assert_eq!(path.steps.len(), 1);
        assert_eq!(path.steps[0].node_index, 5);
    }

    #[test]
    fn test_steps_sorted_by_node_index() {
        let paths = parse(
            "Component\tNode 10\tNode 2\nICA_02\taccepted\tunclassified\n",
        );
        let indices: Vec<usize> = paths["ICA_02"].steps.iter().map(|s| s.node_index).collect();
        assert_eq!(indices, vec![2, 10]);
    }

    #[test]
    fn test_initial_fallbacks() {
        let paths = parse("component\tinitial classification\nICA_03\tprovisional accept\n");
        assert_eq!(paths["ICA_03"].initial, "provisional accept");

        let paths = parse("Component\nICA_04\n");
        assert_eq!(paths["ICA_04"].initial, "unclassified");
    }

    #[test]
    fn test_rows_without_id_skipped() {
        let paths = parse("Component\tNode 0\n\trejected\nICA_05\taccepted\n");
        assert_eq!(paths.len(), 1);
        assert!(paths.contains_key("ICA_05"));
    }

    #[test]
    fn test_duplicate_component_last_wins() {
        let paths = parse(
            "Component\tinitialized classification\n\
             ICA_06\taccepted\n\
             ICA_06\trejected\n",
        );
        assert_eq!(paths["ICA_06"].initial, "rejected");
    }

    #[test]
    fn test_non_node_columns_ignored() {
        let paths = parse(
            "Component\tNode 1\tNode X\tNodes 2\tnode 3\nICA_07\trejected\ta\tb\tc\n",
        );
        assert_eq!(paths["ICA_07"].steps.len(), 1);
    }
}
