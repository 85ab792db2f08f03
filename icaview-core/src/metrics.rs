//! Component metric table and rank computation
//!
//! Global invariants enforced:
//! - Ranks are computed once per loaded dataset, in place
//! - Rank 1 is the largest value; ties share the first-occurrence rank
//! - Non-numeric cells never produce a rank and never panic

use crate::table::TsvTable;
use serde::Serialize;
use std::collections::HashMap;

pub const COMPONENT_COLUMN: &str = "Component";
pub const CLASSIFICATION_COLUMN: &str = "classification";

const KAPPA: &str = "kappa";
const RHO: &str = "rho";
const VARIANCE: &str = "normalized variance explained";
const KAPPA_RANK: &str = "kappa rank";
const RHO_RANK: &str = "rho rank";
const VARIANCE_RANK: &str = "variance explained rank";

/// One cell of the component metric table.
///
/// TSV cells parse as `Number` when they parse as `f64`, otherwise `Text`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    pub fn parse(cell: &str) -> MetricValue {
        match cell.parse::<f64>() {
            Ok(n) => MetricValue::Number(n),
            Err(_) => MetricValue::Text(cell.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            MetricValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetricValue::Number(_) => None,
            MetricValue::Text(s) => Some(s),
        }
    }
}

/// One row of the component metric table, keyed by column name.
pub type ComponentRow = HashMap<String, MetricValue>;

/// Component metric table with original column order preserved for export.
///
/// Arbitrary extra columns (e.g. `external regressor correlation *`) pass
/// through untouched; only the three rank columns are added by
/// [`rank_components`].
#[derive(Debug, Clone, Default)]
pub struct ComponentTable {
    pub columns: Vec<String>,
    pub rows: Vec<ComponentRow>,
}

impl ComponentTable {
    /// Decode a parsed TSV table into typed rows.
    ///
    /// The `Component` column is always kept as text so numeric-looking
    /// ids stay usable as lookup keys.
    pub fn from_tsv(table: &TsvTable) -> ComponentTable {
        let rows = table
            .records
            .iter()
            .map(|record| {
                table
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(i, col)| {
                        let cell = table.cell(record, i);
                        let value = if col == COMPONENT_COLUMN {
                            MetricValue::Text(cell.to_string())
                        } else {
                            MetricValue::parse(cell)
                        };
                        (col.clone(), value)
                    })
                    .collect()
            })
            .collect();

        ComponentTable {
            columns: table.columns.clone(),
            rows,
        }
    }

    /// Component identifier of a row, if the `Component` cell is present.
    pub fn component_id(row: &ComponentRow) -> Option<&str> {
        row.get(COMPONENT_COLUMN).and_then(MetricValue::as_text)
    }

    /// Row for a given component id.
    pub fn row(&self, component_id: &str) -> Option<&ComponentRow> {
        self.rows
            .iter()
            .find(|row| Self::component_id(row) == Some(component_id))
    }

    pub fn row_mut(&mut self, component_id: &str) -> Option<&mut ComponentRow> {
        self.rows
            .iter_mut()
            .find(|row| Self::component_id(row) == Some(component_id))
    }

    fn ensure_column(&mut self, name: &str) {
        if !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_string());
        }
    }
}

/// Annotate every row with `variance explained rank`, `kappa rank`, and
/// `rho rank` (1 = highest value).
///
/// Rank rule: rank = 1 + position of the value's first occurrence in a
/// descending-sorted copy. Equal values therefore all share the
/// first-occurrence rank (`[5,5,3]` ranks as `[1,1,3]`). Rows whose metric
/// cell is missing or non-numeric get no rank cell.
pub fn rank_components(table: &mut ComponentTable) {
    let variance = extract_metric(table, VARIANCE);
    let kappa = extract_metric(table, KAPPA);
    let rho = extract_metric(table, RHO);

    write_ranks(table, VARIANCE_RANK, &rank_descending(&variance));
    write_ranks(table, KAPPA_RANK, &rank_descending(&kappa));
    write_ranks(table, RHO_RANK, &rank_descending(&rho));
}

/// Metric column as f64s, preserving row order; missing or non-numeric
/// cells become NaN so they occupy a slot without ever matching a rank.
fn extract_metric(table: &ComponentTable, metric: &str) -> Vec<f64> {
    table
        .rows
        .iter()
        .map(|row| {
            row.get(metric)
                .and_then(MetricValue::as_f64)
                .unwrap_or(f64::NAN)
        })
        .collect()
}

/// Descending ranks via the sorted-copy/first-occurrence rule.
///
/// NaN slots are left out of the sorted copy so the comparator stays
/// consistent and numeric ranks do not depend on where non-numeric rows
/// sit; a NaN input itself yields `None`.
fn rank_descending(values: &[f64]) -> Vec<Option<usize>> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    values
        .iter()
        .map(|v| sorted.iter().position(|s| s == v).map(|i| i + 1))
        .collect()
}

fn write_ranks(table: &mut ComponentTable, column: &str, ranks: &[Option<usize>]) {
    table.ensure_column(column);
    for (row, rank) in table.rows.iter_mut().zip(ranks) {
        if let Some(rank) = rank {
            row.insert(column.to_string(), MetricValue::Number(*rank as f64));
        }
    }
}
