//! Dependency graph parsing and representation.
//!
//! The store's graph-query tool prints the closure as a DOT digraph whose node IDs are quoted
//! store path names (base names, without the store root). Each edge points from a reference to
//! the path that refers to it, so the build output is the node with no outgoing edges. Turning that text into a [`DependencyGraph`] happens in two phases:
//!
//! 1. **parse** ([`parser::parse`]): DOT text to a syntax tree; failures are
//!    [`ClosureError::GraphParse`].
//! 2. **analyse** ([`analyse`]): syntax tree to a petgraph [`DiGraph`]; every node used by an
//!    edge must be declared by a node statement somewhere in the document, and edge operators must
//!    match the graph kind. Failures are [`ClosureError::GraphAnalysis`].
//!
//! After parsing, the structure is fixed: the annotator only fills in per-node attributes.

pub mod lexer;
pub mod parser;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use crate::core::{ClosureError, Result};
use crate::store::{AppIdentity, clean_name};
use parser::{GraphAst, Stmt};

/// Attribute key for a node's tree digest.
pub const ATTR_HASH: &str = "hash";
/// Attribute key for a node's package name.
pub const ATTR_NAME: &str = "name";
/// Attribute key for a node's package version.
pub const ATTR_VERSION: &str = "version";

/// A node of the closure graph: one store path plus its annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    /// Node ID exactly as written by the graph tool (still quoted)
    pub id: String,
    /// Annotation attributes; empty until the annotator succeeds for this node
    pub attrs: BTreeMap<String, String>,
}

impl GraphNode {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attrs: BTreeMap::new(),
        }
    }

    /// Store path name with DOT quoting removed.
    pub fn store_name(&self) -> String {
        clean_name(&self.id)
    }

    /// Tree digest, if annotated.
    pub fn hash(&self) -> Option<&str> {
        self.attrs.get(ATTR_HASH).map(String::as_str)
    }

    /// Package name, if annotated.
    pub fn name(&self) -> Option<&str> {
        self.attrs.get(ATTR_NAME).map(String::as_str)
    }

    /// Package version, if annotated.
    pub fn version(&self) -> Option<&str> {
        self.attrs.get(ATTR_VERSION).map(String::as_str)
    }

    /// Whether the annotator filled in this node.
    pub fn is_annotated(&self) -> bool {
        self.hash().is_some()
    }

    /// Record the hash and identity of this node.
    pub fn annotate(&mut self, hash: String, identity: AppIdentity) {
        self.attrs.insert(ATTR_HASH.to_string(), hash);
        self.attrs.insert(ATTR_NAME.to_string(), identity.name);
        self.attrs.insert(ATTR_VERSION.to_string(), identity.version);
    }
}

/// Directed closure graph.
///
/// Edges keep the direction the graph tool emitted: `reference -> referrer`. Nodes are never added or removed after
/// [`parse_dependency_graph`]; only their attributes change.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<GraphNode, ()>,
    node_map: HashMap<String, NodeIndex>,
    /// Graph ID from the DOT header
    pub name: Option<String>,
}

impl DependencyGraph {
    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of nodes carrying annotations.
    pub fn annotated_count(&self) -> usize {
        self.graph.node_weights().filter(|n| n.is_annotated()).count()
    }

    /// All node indices.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// All nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    /// Node at `index`.
    pub fn node(&self, index: NodeIndex) -> Option<&GraphNode> {
        self.graph.node_weight(index)
    }

    /// Mutable node at `index`.
    pub fn node_mut(&mut self, index: NodeIndex) -> Option<&mut GraphNode> {
        self.graph.node_weight_mut(index)
    }

    /// Look up a node by its store path name (quoted or not).
    pub fn find(&self, name: &str) -> Option<&GraphNode> {
        self.find_index(name).and_then(|i| self.graph.node_weight(i))
    }

    /// Index of the node named `name` (quoted or not).
    pub fn find_index(&self, name: &str) -> Option<NodeIndex> {
        self.node_map.get(&clean_name(name)).copied()
    }

    /// Edges as `(from, to)` node pairs.
    pub fn edges(&self) -> impl Iterator<Item = (&GraphNode, &GraphNode)> {
        self.graph.raw_edges().iter().map(|e| (&self.graph[e.source()], &self.graph[e.target()]))
    }

    /// Store paths that `index` refers to (its direct dependencies).
    pub fn references(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(index, Direction::Incoming)
    }

    /// Nodes nothing else refers to, in index order.
    pub fn top_level(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&i| self.graph.neighbors_directed(i, Direction::Outgoing).next().is_none())
            .collect()
    }

    fn ensure_node(&mut self, raw: &str) -> NodeIndex {
        let key = clean_name(raw);
        if let Some(&index) = self.node_map.get(&key) {
            index
        } else {
            let index = self.graph.add_node(GraphNode::new(raw));
            self.node_map.insert(key, index);
            index
        }
    }

    /// Serializable view of the graph; unannotated nodes have `null` metadata.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self
                .nodes()
                .map(|n| NodeView {
                    path: n.store_name(),
                    hash: n.hash().map(str::to_string),
                    name: n.name().map(str::to_string),
                    version: n.version().map(str::to_string),
                })
                .collect(),
            edges: self.edges().map(|(a, b)| (a.store_name(), b.store_name())).collect(),
        }
    }

    /// Render the graph back to DOT, carrying the annotations as node attributes.
    ///
    /// With a `placeholder`, unannotated nodes get every annotation key set to it; without one
    /// they are written bare.
    pub fn to_dot(&self, placeholder: Option<&str>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph {} {{", self.name.as_deref().unwrap_or("G"));
        for node in self.nodes() {
            let attrs: Vec<String> = match placeholder {
                Some(value) if !node.is_annotated() => [ATTR_HASH, ATTR_NAME, ATTR_VERSION]
                    .iter()
                    .map(|k| format!("{k} = {}", quote(value)))
                    .collect(),
                _ => node.attrs.iter().map(|(k, v)| format!("{k} = {}", quote(v))).collect(),
            };
            if attrs.is_empty() {
                let _ = writeln!(out, "{};", quote(&node.store_name()));
            } else {
                let _ = writeln!(out, "{} [{}];", quote(&node.store_name()), attrs.join(", "));
            }
        }
        for (from, to) in self.edges() {
            let _ = writeln!(out, "{} -> {};", quote(&from.store_name()), quote(&to.store_name()));
        }
        out.push_str("}\n");
        out
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\\\""))
}

/// JSON-friendly view of a [`DependencyGraph`].
#[derive(Debug, Clone, Serialize)]
pub struct GraphSnapshot {
    /// Nodes in parse order
    pub nodes: Vec<NodeView>,
    /// Edges as `(from, to)` store path names
    pub edges: Vec<(String, String)>,
}

/// One node of a [`GraphSnapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct NodeView {
    /// Store path name
    pub path: String,
    /// Tree digest, `null` when unknown
    pub hash: Option<String>,
    /// Package name, `null` when unknown
    pub name: Option<String>,
    /// Package version, `null` when unknown
    pub version: Option<String>,
}

/// Parse the graph tool's DOT output into a [`DependencyGraph`].
///
/// # Examples
///
/// ```rust
/// use nix_closure::graph::parse_dependency_graph;
///
/// let graph = parse_dependency_graph(
///     r#"digraph G {
///     "aaa-foo-1.0" [label = "foo-1.0"];
///     "bbb-bar-2.0" [label = "bar-2.0"];
///     "bbb-bar-2.0" -> "aaa-foo-1.0";
///     }"#,
/// )
/// .unwrap();
/// assert_eq!(graph.node_count(), 2);
/// assert_eq!(graph.edge_count(), 1);
/// ```
///
/// # Errors
///
/// [`ClosureError::GraphParse`] for invalid syntax, [`ClosureError::GraphAnalysis`] for
/// inconsistent graphs.
pub fn parse_dependency_graph(raw: &str) -> Result<DependencyGraph> {
    let ast = parser::parse(raw)?;
    analyse(&ast)
}

/// Build a [`DependencyGraph`] from a parsed DOT document.
///
/// # Errors
///
/// Returns [`ClosureError::GraphAnalysis`] when an edge references a node that no node statement
/// declares, or when an edge operator does not match the graph kind.
pub fn analyse(ast: &GraphAst) -> Result<DependencyGraph> {
    let mut graph = DependencyGraph {
        name: ast.id.clone(),
        ..DependencyGraph::default()
    };

    for stmt in &ast.stmts {
        if let Stmt::Node {
            id,
            ..
        } = stmt
        {
            graph.ensure_node(id);
        }
    }

    for stmt in &ast.stmts {
        let Stmt::Edge {
            chain,
            directed,
            line,
            ..
        } = stmt
        else {
            continue;
        };

        if *directed != ast.directed {
            let (op, kind) = if *directed { ("->", "graph") } else { ("--", "digraph") };
            return Err(ClosureError::GraphAnalysis {
                message: format!("edge operator '{op}' used in a {kind} (line {line})"),
            });
        }

        let mut indices = Vec::with_capacity(chain.len());
        for id in chain {
            let index = graph.node_map.get(&clean_name(id)).copied().ok_or_else(|| {
                ClosureError::GraphAnalysis {
                    message: format!("edge on line {line} references undeclared node {id}"),
                }
            })?;
            indices.push(index);
        }

        for pair in indices.windows(2) {
            if !graph.graph.contains_edge(pair[0], pair[1]) {
                graph.graph.add_edge(pair[0], pair[1], ());
            }
        }
    }

    tracing::debug!(
        target: "graph",
        "Analysed graph with {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}
