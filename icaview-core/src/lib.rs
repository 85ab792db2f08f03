//! icaview core library - ICA decomposition review for fMRI denoising outputs

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Query functions are pure: no shared mutable state, no I/O
// - Malformed or partial inputs degrade to empty results, never panics
// - Deterministic iteration order must be explicit
// - Identical input yields byte-for-byte identical output

pub mod dataset;
pub mod impact;
pub mod metrics;
pub mod report;
pub mod spectrum;
pub mod status;
pub mod table;
pub mod tree;

pub use dataset::{load_dataset, Dataset, Mixing};
pub use impact::{
    affecting_nodes, components_affected_by, final_classification, nodes_for_classification,
};
pub use metrics::{rank_components, ComponentTable, MetricValue};
pub use report::{classification_counts, render_tsv, set_classification};
pub use spectrum::{compute_power_spectrum, power_to_decibels, PowerSpectrum};
pub use status::{parse_status_table, ComponentPath, PathStep};
pub use table::TsvTable;
pub use tree::{parse_decision_tree, DecisionTree, NodeKind, Outcome, RuleNode};
