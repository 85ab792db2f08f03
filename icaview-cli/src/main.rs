//! icaview CLI - inspect ICA decompositions and edit classifications

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output

use anyhow::Context;
use clap::{Parser, Subcommand};
use icaview_core::report::{
    classification_counts, render_table_json, render_tree_json, render_tree_text, render_tsv,
    set_classification,
};
use icaview_core::{
    affecting_nodes, components_affected_by, compute_power_spectrum, final_classification,
    load_dataset, power_to_decibels, Dataset, MetricValue,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "icaview")]
#[command(about = "Reviewer tool for ICA decompositions from fMRI denoising pipelines")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dataset overview: components, classification tallies, top components
    Summary {
        /// Pipeline output folder
        dir: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// List the decision tree flow
    Tree {
        /// Pipeline output folder
        dir: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Show one component's classification path
    Component {
        /// Pipeline output folder
        dir: PathBuf,

        /// Component identifier (e.g. ICA_00)
        id: String,
    },
    /// Show one tree node and the components it affected
    Node {
        /// Pipeline output folder
        dir: PathBuf,

        /// Node index in execution order
        index: usize,
    },
    /// Power spectrum of a component's mixing time series
    Spectrum {
        /// Pipeline output folder
        dir: PathBuf,

        /// Component identifier (e.g. ICA_00)
        id: String,

        /// Repetition time in seconds (frequency axis scale)
        #[arg(long, default_value_t = 1.0)]
        tr: f64,

        /// Report power in decibels relative to the peak
        #[arg(long)]
        db: bool,
    },
    /// Reclassify a component and export the edited metrics table
    Classify {
        /// Pipeline output folder
        dir: PathBuf,

        /// Component identifier (e.g. ICA_00)
        id: String,

        /// New classification label (e.g. accepted, rejected)
        label: String,

        /// Write the edited table to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Summary { dir, format } => {
            let dataset = load_dataset(&dir)?;
            match format {
                OutputFormat::Text => print!("{}", summary_text(&dataset)),
                OutputFormat::Json => println!("{}", render_table_json(&dataset.components)),
            }
        }
        Commands::Tree { dir, format } => {
            let dataset = load_dataset(&dir)?;
            let tree = dataset
                .tree
                .as_ref()
                .context("dataset has no decision tree")?;
            match format {
                OutputFormat::Text => print!("{}", render_tree_text(tree)),
                OutputFormat::Json => println!("{}", render_tree_json(tree)),
            }
        }
        Commands::Component { dir, id } => {
            let dataset = load_dataset(&dir)?;
            print!("{}", component_text(&dataset, &id));
        }
        Commands::Node { dir, index } => {
            let dataset = load_dataset(&dir)?;
            print!("{}", node_text(&dataset, index)?);
        }
        Commands::Spectrum { dir, id, tr, db } => {
            let dataset = load_dataset(&dir)?;
            let mixing = dataset
                .mixing
                .as_ref()
                .context("dataset has no mixing matrix (*mixing.tsv)")?;
            let series = mixing
                .series(&id)
                .with_context(|| format!("no mixing time series for component {id}"))?;

            let spectrum = compute_power_spectrum(series, tr);
            let values = if db {
                power_to_decibels(&spectrum.power, None)
            } else {
                spectrum.power.clone()
            };

            let unit = if db { "dB" } else { "power" };
            println!("{:<12} {}", "FREQ", unit);
            for (freq, value) in spectrum.frequencies.iter().zip(&values) {
                println!("{:<12.6} {:.6}", freq, value);
            }
        }
        Commands::Classify {
            dir,
            id,
            label,
            output,
        } => {
            let mut dataset = load_dataset(&dir)?;
            if !set_classification(&mut dataset.components, &id, &label) {
                anyhow::bail!("unknown component: {id}");
            }

            let exported = render_tsv(&dataset.components);
            match output {
                Some(path) => {
                    std::fs::write(&path, exported)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("{id} -> {label}; exported to {}", path.display());
                }
                None => print!("{exported}"),
            }
        }
    }

    Ok(())
}

/// Text summary: counts, classification tallies, top components by kappa
fn summary_text(dataset: &Dataset) -> String {
    let mut output = String::new();
    let table = &dataset.components;

    output.push_str(&format!("Components: {}\n", table.rows.len()));
    if let Some(mixing) = &dataset.mixing {
        output.push_str(&format!("Volumes: {}\n", mixing.n_volumes()));
    }
    if let Some(tree) = &dataset.tree {
        output.push_str(&format!(
            "Decision tree: {} ({} nodes)\n",
            tree.tree_id,
            tree.nodes.len()
        ));
    }

    output.push_str("\nClassifications:\n");
    for (label, count) in classification_counts(table) {
        output.push_str(&format!("  {:<24} {}\n", label, count));
    }

    // Components in kappa-rank order
    let mut ranked: Vec<(&str, f64, f64)> = table
        .rows
        .iter()
        .filter_map(|row| {
            let id = icaview_core::ComponentTable::component_id(row)?;
            let rank = row.get("kappa rank").and_then(MetricValue::as_f64)?;
            let kappa = row.get("kappa").and_then(MetricValue::as_f64)?;
            Some((id, rank, kappa))
        })
        .collect();
    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    output.push_str(&format!(
        "\n{:<12} {:<12} {}\n",
        "COMPONENT", "KAPPA RANK", "KAPPA"
    ));
    for (id, rank, kappa) in ranked {
        output.push_str(&format!("{:<12} {:<12} {:.4}\n", id, rank as usize, kappa));
    }

    output
}

/// Text report of one component's classification history
fn component_text(dataset: &Dataset, id: &str) -> String {
    let mut output = String::new();
    let path = dataset.paths.get(id);

    output.push_str(&format!("Component: {id}\n"));
    output.push_str(&format!(
        "Final classification: {}\n",
        final_classification(path)
    ));

    let Some(path) = path else {
        output.push_str("No status table entry for this component.\n");
        return output;
    };

    output.push_str(&format!("Initial: {}\n\nPath:\n", path.initial));
    let affecting = affecting_nodes(id, &dataset.paths);
    for step in &path.steps {
        let marker = if affecting.contains(&step.node_index) {
            "*"
        } else {
            " "
        };
        let label = dataset
            .tree
            .as_ref()
            .and_then(|t| t.nodes.get(step.node_index))
            .map(|n| n.label.as_str())
            .unwrap_or("");
        output.push_str(&format!(
            "{} Node {:<4} {:<24} {}\n",
            marker, step.node_index, step.classification, label
        ));
    }

    output.push_str(&format!(
        "\nAffecting nodes (* = classification changed): {:?}\n",
        affecting
    ));
    output
}

/// Text report of one tree node and its impact
fn node_text(dataset: &Dataset, index: usize) -> anyhow::Result<String> {
    let tree = dataset
        .tree
        .as_ref()
        .context("dataset has no decision tree")?;
    let node = tree
        .nodes
        .get(index)
        .with_context(|| format!("no node with index {index}"))?;

    let mut output = String::new();
    output.push_str(&format!("Node {}: {}\n", node.index, node.label));
    output.push_str(&format!("Function: {}\n", node.function_name));
    output.push_str(&format!("Kind: {}\n", node.kind.as_str()));
    if node.is_decision() {
        if !node.operator.is_empty() {
            output.push_str(&format!(
                "Condition: {} {} {}\n",
                node.left, node.operator, node.right
            ));
        }
        output.push_str(&format!(
            "If true -> {} ({} components), if false -> {} ({} components)\n",
            node.if_true.as_str(),
            node.n_true,
            node.if_false.as_str(),
            node.n_false
        ));
    }
    if !node.comment.is_empty() {
        output.push_str(&format!("Comment: {}\n", node.comment));
    }

    let affected = components_affected_by(index, &dataset.paths);
    if affected.is_empty() {
        output.push_str("\nNo components were reclassified by this node.\n");
    } else {
        output.push_str(&format!("\nComponents reclassified here ({}):\n", affected.len()));
        for id in &affected {
            output.push_str(&format!(
                "  {:<12} final: {}\n",
                id,
                final_classification(dataset.paths.get(id))
            ));
        }
    }

    Ok(output)
}
