//! Output formats for a built closure.
//!
//! ## Tree Format (Default)
//! ```text
//! app 3.0
//!   result hash: 0m3kx...
//!   binary hash: 9f86d0...
//! └── ccc-app-3.0 app 3.0 [1b4xq2...]
//!     └── bbb-bar-2.0 unknown
//!
//! 1 of 2 store paths unknown
//! ```
//!
//! The tree starts at the artifact's own store path and lists what each path refers to below
//! it. When the artifact is not in the graph, every path nothing refers to is a starting point.
//!
//! JSON carries `null` for metadata the annotator could not determine; DOT and tree output
//! show `unknown`.

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use petgraph::graph::NodeIndex;
use std::collections::HashSet;
use std::fmt::Write as _;

use crate::closure::Closure;
use crate::graph::{DependencyGraph, GraphNode};

/// Placeholder for metadata that could not be determined.
pub const UNKNOWN: &str = "unknown";

/// How the `graph` command prints its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Artifact descriptor and annotated graph as pretty JSON
    Json,
    /// Annotated graph as a DOT digraph
    Dot,
    /// Dependency tree with box-drawing characters
    Tree,
}

/// Render `closure` in `format`.
///
/// # Errors
///
/// Fails only if JSON serialization fails.
pub fn render(closure: &Closure, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => render_json(closure),
        OutputFormat::Dot => Ok(closure.graph.to_dot(Some(UNKNOWN))),
        OutputFormat::Tree => Ok(render_tree(closure)),
    }
}

fn render_json(closure: &Closure) -> Result<String> {
    let json = serde_json::json!({
        "artifact": closure.artifact,
        "graph": closure.graph.snapshot(),
        "unknown": closure.unknown_count(),
    });
    Ok(serde_json::to_string_pretty(&json)?)
}

fn render_tree(closure: &Closure) -> String {
    let artifact = &closure.artifact;
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", artifact.name.cyan().bold(), artifact.version);
    let _ = writeln!(out, "  result hash: {}", artifact.result_hash);
    let binary_hash = if artifact.binary_hash.is_empty() { "none" } else { &artifact.binary_hash };
    let _ = writeln!(out, "  binary hash: {binary_hash}");

    let graph = &closure.graph;
    if graph.node_count() == 0 {
        out.push_str("No dependencies found.\n");
        return out;
    }

    let roots = tree_roots(closure);

    let mut displayed = HashSet::new();
    let mut duplicates = false;
    for (i, root) in roots.iter().enumerate() {
        let is_last = i == roots.len() - 1;
        write_node(graph, *root, "", is_last, &mut displayed, &mut duplicates, &mut out);
    }

    if duplicates {
        let _ = writeln!(out, "\n{}", "(*) = already shown above".bright_black());
    }
    let unknown = closure.unknown_count();
    if unknown > 0 {
        let _ = writeln!(out, "\n{unknown} of {} store paths {UNKNOWN}", graph.node_count());
    }
    out
}

/// Where the tree starts: the artifact's node, else every top-level node, else (all nodes on
/// cycles) every node.
fn tree_roots(closure: &Closure) -> Vec<NodeIndex> {
    let graph = &closure.graph;
    let store_path = &closure.artifact.store_path;
    let artifact = graph.find_index(&store_path.to_string_lossy()).or_else(|| {
        store_path.file_name().and_then(|name| graph.find_index(&name.to_string_lossy()))
    });
    if let Some(index) = artifact {
        return vec![index];
    }

    let top_level = graph.top_level();
    if top_level.is_empty() { graph.node_indices().collect() } else { top_level }
}

fn write_node(
    graph: &DependencyGraph,
    index: NodeIndex,
    prefix: &str,
    is_last: bool,
    displayed: &mut HashSet<NodeIndex>,
    duplicates: &mut bool,
    out: &mut String,
) {
    let Some(node) = graph.node(index) else {
        return;
    };
    let connector = if is_last { "└── " } else { "├── " };
    let is_duplicate = !displayed.insert(index);
    let marker = if is_duplicate { " (*)".bright_black().to_string() } else { String::new() };
    let _ = writeln!(out, "{prefix}{connector}{}{marker}", node_label(node));

    if is_duplicate {
        *duplicates = true;
        return;
    }

    let children: Vec<NodeIndex> = graph.references(index).collect();
    let child_prefix = if is_last { format!("{prefix}    ") } else { format!("{prefix}│   ") };
    // petgraph yields neighbours newest-first
    for (i, child) in children.iter().rev().enumerate() {
        let is_last_child = i == children.len() - 1;
        write_node(graph, *child, &child_prefix, is_last_child, displayed, duplicates, out);
    }
}

fn node_label(node: &GraphNode) -> String {
    let path = node.store_name();
    match (node.name(), node.version(), node.hash()) {
        (Some(name), Some(version), Some(hash)) => {
            format!("{path} {} {version} [{}]", name.cyan(), short_hash(hash).bright_black())
        }
        _ => format!("{path} {}", UNKNOWN.yellow()),
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
