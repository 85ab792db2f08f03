//! Reclassification, export, and output rendering
//!
//! Global invariants enforced:
//! - Export preserves the original column order
//! - Deterministic ordering in every rendering
//! - Byte-for-byte identical output across runs

use crate::metrics::{ComponentTable, MetricValue, CLASSIFICATION_COLUMN};
use crate::tree::DecisionTree;
use std::collections::BTreeMap;

/// Set the `classification` cell for one component. Returns false when
/// the component id is unknown; the table is untouched in that case.
pub fn set_classification(
    table: &mut ComponentTable,
    component_id: &str,
    classification: &str,
) -> bool {
    let Some(row) = table.row_mut(component_id) else {
        return false;
    };
    row.insert(
        CLASSIFICATION_COLUMN.to_string(),
        MetricValue::Text(classification.to_string()),
    );
    if !table.columns.iter().any(|c| c == CLASSIFICATION_COLUMN) {
        table.columns.push(CLASSIFICATION_COLUMN.to_string());
    }
    true
}

/// Tally of components per classification label, in label order.
pub fn classification_counts(table: &ComponentTable) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for row in &table.rows {
        let label = row
            .get(CLASSIFICATION_COLUMN)
            .and_then(MetricValue::as_text)
            .unwrap_or("unclassified");
        *counts.entry(label.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Render the component table back to TSV in original column order.
///
/// Integral numbers render without a trailing `.0` so an exported table
/// re-reads cell-for-cell identical.
pub fn render_tsv(table: &ComponentTable) -> String {
    let mut output = String::new();
    output.push_str(&table.columns.join("\t"));
    output.push('\n');

    for row in &table.rows {
        let cells: Vec<String> = table
            .columns
            .iter()
            .map(|col| row.get(col).map(render_cell).unwrap_or_default())
            .collect();
        output.push_str(&cells.join("\t"));
        output.push('\n');
    }

    output
}

fn render_cell(value: &MetricValue) -> String {
    match value {
        MetricValue::Text(s) => s.clone(),
        MetricValue::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{n}")
            }
        }
    }
}

/// Render the component table as pretty JSON (rows as objects).
pub fn render_table_json(table: &ComponentTable) -> String {
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = table
        .rows
        .iter()
        .map(|row| {
            table
                .columns
                .iter()
                .filter_map(|col| {
                    let value = row.get(col)?;
                    let json = serde_json::to_value(value).ok()?;
                    Some((col.clone(), json))
                })
                .collect()
        })
        .collect();
    serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
}

/// Render the decision tree as a text flow listing.
pub fn render_tree_text(tree: &DecisionTree) -> String {
    let mut output = String::new();
    output.push_str(&format!("Decision tree: {}\n", tree.tree_id));
    output.push_str(&format!(
        "{:<6} {:<12} {:<40} {:<10} {:<10} {}\n",
        "NODE", "KIND", "LABEL", "N_TRUE", "N_FALSE", "OUTCOMES"
    ));

    for node in &tree.nodes {
        let outcomes = if node.is_decision() {
            format!(
                "true -> {}, false -> {}",
                node.if_true.as_str(),
                node.if_false.as_str()
            )
        } else {
            "-".to_string()
        };
        output.push_str(&format!(
            "{:<6} {:<12} {:<40} {:<10} {:<10} {}\n",
            node.index,
            node.kind.as_str(),
            truncate_or_pad(&node.label, 40),
            node.n_true,
            node.n_false,
            outcomes
        ));
        if node.is_decision() && !node.operator.is_empty() {
            output.push_str(&format!(
                "       condition: {} {} {}\n",
                node.left, node.operator, node.right
            ));
        }
    }

    output
}

/// Render the decision tree as pretty JSON.
pub fn render_tree_json(tree: &DecisionTree) -> String {
    serde_json::to_string_pretty(tree).unwrap_or_else(|_| "{}".to_string())
}

/// Truncate or pad string to fixed width
///
/// Truncation floors to a char boundary so multi-byte labels never split
/// mid-character.
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.len() > width {
        let mut end = width.saturating_sub(3);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    } else {
        format!("{:<width$}", s, width = width)
    }
}
