//! Dataset discovery and loading
//!
//! A dataset is one denoising-pipeline output folder, located by filename
//! convention: component metrics `*_metrics.tsv` (excluding PCA tables),
//! decision tree `*decision_tree.json`, status table `*status_table.tsv`,
//! mixing matrix `*mixing.tsv`. The metrics table is required; everything
//! else degrades to an empty view with a warning, matching how the
//! reviewer UI treats partial outputs.

use crate::metrics::{rank_components, ComponentTable};
use crate::status::{parse_status_table, ComponentPath};
use crate::table::TsvTable;
use crate::tree::{parse_decision_tree, DecisionTree};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Mixing matrix: one column per component, one record per volume.
#[derive(Debug, Clone, Default)]
pub struct Mixing {
    pub components: Vec<String>,
    series: Vec<Vec<f64>>,
}

impl Mixing {
    /// Decode a mixing TSV into column-major series. Cells that do not
    /// parse as numbers read as 0.0 rather than dropping the volume.
    pub fn from_tsv(table: &TsvTable) -> Mixing {
        let components = table.columns.clone();
        let mut series = vec![Vec::with_capacity(table.records.len()); components.len()];

        for record in &table.records {
            for (col, column_series) in series.iter_mut().enumerate() {
                let value = table.cell(record, col).parse::<f64>().unwrap_or(0.0);
                column_series.push(value);
            }
        }

        Mixing { components, series }
    }

    /// Time series for one component, by column name.
    pub fn series(&self, component_id: &str) -> Option<&[f64]> {
        let col = self.components.iter().position(|c| c == component_id)?;
        Some(&self.series[col])
    }

    /// Number of volumes (time points).
    pub fn n_volumes(&self) -> usize {
        self.series.first().map(Vec::len).unwrap_or(0)
    }
}

/// One loaded pipeline output folder.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub components: ComponentTable,
    pub tree: Option<DecisionTree>,
    pub paths: BTreeMap<String, ComponentPath>,
    pub mixing: Option<Mixing>,
}

/// First file in sorted directory order whose name ends with `suffix`.
pub fn find_dataset_file(dir: &Path, suffix: &str) -> Option<PathBuf> {
    find_file_with(dir, |name| name.ends_with(suffix))
}

fn find_file_with(dir: &Path, matches: impl Fn(&str) -> bool) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    // Sort for deterministic discovery
    files.sort();

    files.into_iter().find(|path| {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(&matches)
    })
}

fn read_tsv(path: &Path) -> Result<TsvTable> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read table: {}", path.display()))?;
    Ok(TsvTable::parse(&text))
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON document: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse JSON document: {}", path.display()))
}

/// Load a pipeline output folder.
///
/// The component metrics table is required and is ranked once at load.
/// The decision tree, status table, and mixing matrix are optional;
/// missing files leave the corresponding view empty.
pub fn load_dataset(dir: &Path) -> Result<Dataset> {
    let metrics_path = find_file_with(dir, |name| {
        name.ends_with("_metrics.tsv") && !name.contains("PCA")
    })
    .with_context(|| {
        format!(
            "No component metrics table (*_metrics.tsv) found in {}",
            dir.display()
        )
    })?;

    let mut components = ComponentTable::from_tsv(&read_tsv(&metrics_path)?);
    rank_components(&mut components);

    let tree = match find_dataset_file(dir, "decision_tree.json") {
        Some(path) => {
            let raw = read_json(&path)?;
            let tree = parse_decision_tree(&raw);
            if tree.is_none() {
                eprintln!(
                    "warning: {} has no usable decision tree nodes",
                    path.display()
                );
            }
            tree
        }
        None => {
            eprintln!(
                "warning: no decision tree (*decision_tree.json) in {}",
                dir.display()
            );
            None
        }
    };

    let paths = match find_dataset_file(dir, "status_table.tsv") {
        Some(path) => parse_status_table(&read_tsv(&path)?),
        None => {
            eprintln!(
                "warning: no status table (*status_table.tsv) in {}",
                dir.display()
            );
            BTreeMap::new()
        }
    };

    let mixing = match find_dataset_file(dir, "mixing.tsv") {
        Some(path) => Some(Mixing::from_tsv(&read_tsv(&path)?)),
        None => None,
    };

    Ok(Dataset {
        components,
        tree,
        paths,
        mixing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixing_column_major_series() {
        let table = TsvTable::parse("ICA_00\tICA_01\n1.0\t4.0\n2.0\t5.0\n3.0\t6.0\n");
        let mixing = Mixing::from_tsv(&table);

        assert_eq!(mixing.n_volumes(), 3);
        assert_eq!(mixing.series("ICA_01"), Some(&[4.0, 5.0, 6.0][..]));
        assert_eq!(mixing.series("ICA_07"), None);
    }

    #[test]
    fn test_mixing_unparseable_cell_reads_zero() {
        let table = TsvTable::parse("ICA_00\n1.0\nx\n3.0\n");
        let mixing = Mixing::from_tsv(&table);
        assert_eq!(mixing.series("ICA_00"), Some(&[1.0, 0.0, 3.0][..]));
    }

    #[test]
    fn test_find_dataset_file_missing_dir() {
        assert!(find_dataset_file(Path::new("/nonexistent"), ".tsv").is_none());
    }
}
