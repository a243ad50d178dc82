//! Closure construction: artifact, dependency graph and per-node annotations.
//!
//! [`ClosureBuilder::build`] runs the stages strictly in order:
//!
//! 1. resolve the output symlink into an [`ArtifactDescriptor`] (fatal on failure)
//! 2. ask the [`GraphSource`] for the DOT graph of the resolved store path
//! 3. parse it into a [`DependencyGraph`]
//! 4. [`annotate`] every node concurrently (best effort)
//!
//! Either a complete [`Closure`] is returned or an error; nothing partial escapes.
//!
//! # Examples
//!
//! ```rust,no_run
//! use nix_closure::closure::{ClosureBuilder, NixStoreGraph};
//! use std::path::Path;
//!
//! # async fn example() -> nix_closure::core::Result<()> {
//! let builder = ClosureBuilder::new(NixStoreGraph::default()).max_parallel(16);
//! let closure = builder.build(Path::new("."), "result").await?;
//! println!("{} {} has {} dependencies", closure.artifact.name, closure.artifact.version,
//!     closure.graph.node_count());
//! # Ok(())
//! # }
//! ```

pub mod annotate;

pub use annotate::{AnnotateOptions, annotate};

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::artifact::{ArtifactDescriptor, resolve_artifact};
use crate::constants::{DEFAULT_GRAPH_TOOL, GRAPH_TOOL_TIMEOUT};
use crate::core::Result;
use crate::graph::{DependencyGraph, parse_dependency_graph};
use crate::store::StoreCommand;
use crate::utils::progress::ProgressBar;

/// Supplier of the DOT dependency graph for a store path.
pub trait GraphSource: Send + Sync {
    /// Return the DOT graph describing the closure of `store_path`.
    fn query_graph(&self, store_path: &Path) -> impl Future<Output = Result<String>> + Send;
}

/// [`GraphSource`] backed by the store's command-line tool (`<tool> -q --graph <path>`).
#[derive(Debug, Clone)]
pub struct NixStoreGraph {
    tool: String,
    timeout: Option<Duration>,
}

impl Default for NixStoreGraph {
    fn default() -> Self {
        Self::new(DEFAULT_GRAPH_TOOL)
    }
}

impl NixStoreGraph {
    /// Use `tool` with the default timeout.
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            timeout: Some(GRAPH_TOOL_TIMEOUT),
        }
    }

    /// Override the timeout (`None` waits forever).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl GraphSource for NixStoreGraph {
    async fn query_graph(&self, store_path: &Path) -> Result<String> {
        let output = StoreCommand::query_graph(&self.tool, store_path)
            .with_timeout(self.timeout)
            .execute()
            .await?;
        if !output.stderr.trim().is_empty() {
            tracing::debug!(target: "store", "{} stderr: {}", self.tool, output.stderr.trim());
        }
        Ok(output.stdout)
    }
}

/// The complete result of a closure build.
#[derive(Debug, Clone)]
pub struct Closure {
    /// The top-level build output
    pub artifact: ArtifactDescriptor,
    /// Every store path it depends on, annotated where possible
    pub graph: DependencyGraph,
}

impl Closure {
    /// Nodes the annotator could not fill in.
    pub fn unknown_count(&self) -> usize {
        self.graph.node_count() - self.graph.annotated_count()
    }
}

/// Builds a [`Closure`] from a build output directory.
#[derive(Debug, Clone)]
pub struct ClosureBuilder<S> {
    source: S,
    options: AnnotateOptions,
}

impl<S: GraphSource> ClosureBuilder<S> {
    /// Create a builder that queries `source`, with default store root and parallelism.
    pub fn new(source: S) -> Self {
        Self {
            source,
            options: AnnotateOptions::default(),
        }
    }

    /// Set the store root.
    pub fn store_root(mut self, store_root: impl Into<PathBuf>) -> Self {
        self.options.store_root = store_root.into();
        self
    }

    /// Bound the number of concurrent annotation workers.
    pub fn max_parallel(mut self, max_parallel: usize) -> Self {
        self.options.max_parallel = max_parallel;
        self
    }

    /// Stop waiting for annotation workers after `deadline`.
    pub fn annotate_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.options.deadline = deadline;
        self
    }

    /// Report annotation progress on `progress`.
    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.options.progress = Some(progress);
        self
    }

    /// Build the closure of `output_dir/symlink_name`.
    ///
    /// # Errors
    ///
    /// - [`crate::core::ClosureError::SymlinkError`] or
    ///   [`crate::core::ClosureError::ArtifactResolution`] if the artifact cannot be resolved;
    ///   the graph source is not queried in that case
    /// - whatever the [`GraphSource`] fails with
    /// - [`crate::core::ClosureError::GraphParse`] or
    ///   [`crate::core::ClosureError::GraphAnalysis`] for unusable graph output
    pub async fn build(&self, output_dir: &Path, symlink_name: &str) -> Result<Closure> {
        let dir = output_dir.to_path_buf();
        let link = symlink_name.to_string();
        let store_root = self.options.store_root.clone();
        let artifact =
            tokio::task::spawn_blocking(move || resolve_artifact(&dir, &link, &store_root))
                .await
                .unwrap_or_else(|e| std::panic::resume_unwind(e.into_panic()))?;
        tracing::info!(
            target: "closure",
            "Resolved {} {} at {}",
            artifact.name,
            artifact.version,
            artifact.store_path.display()
        );

        let dot = self.source.query_graph(&artifact.store_path).await?;
        let graph = parse_dependency_graph(&dot)?;
        let graph = annotate(graph, &self.options).await;

        Ok(Closure {
            artifact,
            graph,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::ClosureError;
    use crate::test_utils::{CannedGraph, StoreFixture};

    fn sample_store() -> (StoreFixture, String) {
        let fixture = StoreFixture::new();
        let app = fixture.add_package("ccc-app-3.0", &[("bin/app", b"app binary")]);
        fixture.add_package("aaa-foo-1.0", &[("lib/libfoo.so", b"foo")]);
        fixture.add_package("bbb-bar-2.0", &[("lib/libbar.so", b"bar")]);
        fixture.link_result("result", &app);
        let dot = fixture.dot_graph(
            &["ccc-app-3.0", "bbb-bar-2.0", "aaa-foo-1.0"],
            &[("ccc-app-3.0", "bbb-bar-2.0"), ("bbb-bar-2.0", "aaa-foo-1.0")],
        );
        (fixture, dot)
    }

    #[tokio::test]
    async fn test_build_complete_closure() {
        let (fixture, dot) = sample_store();
        let source = CannedGraph::new(dot);
        let builder =
            ClosureBuilder::new(source.clone()).store_root(fixture.store_root()).max_parallel(2);

        let closure = builder.build(fixture.output_dir(), "result").await.unwrap();

        assert_eq!(closure.artifact.name, "app");
        assert_eq!(closure.artifact.version, "3.0");
        assert_eq!(closure.graph.node_count(), 3);
        assert_eq!(closure.graph.edge_count(), 2);
        assert_eq!(closure.unknown_count(), 0);
        assert_eq!(source.queries(), vec![fixture.store_root().join("ccc-app-3.0")]);
    }

    #[tokio::test]
    async fn test_build_stops_before_query_when_artifact_fails() {
        let fixture = StoreFixture::new();
        let source = CannedGraph::new("digraph G {}");
        let builder = ClosureBuilder::new(source.clone()).store_root(fixture.store_root());

        let err = builder.build(fixture.output_dir(), "result").await.unwrap_err();
        assert!(matches!(err, ClosureError::SymlinkError { .. }));
        assert!(source.queries().is_empty());
    }

    #[tokio::test]
    async fn test_build_propagates_source_failure() {
        let (fixture, _) = sample_store();
        let builder = ClosureBuilder::new(CannedGraph::failing("daemon unreachable"))
            .store_root(fixture.store_root());

        let err = builder.build(fixture.output_dir(), "result").await.unwrap_err();
        match err {
            ClosureError::ExternalTool {
                stderr,
                ..
            } => assert_eq!(stderr, "daemon unreachable"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_build_propagates_parse_failure() {
        let (fixture, _) = sample_store();
        let builder = ClosureBuilder::new(CannedGraph::new("digraph G { \"a\" -> "))
            .store_root(fixture.store_root());

        let err = builder.build(fixture.output_dir(), "result").await.unwrap_err();
        assert!(matches!(err, ClosureError::GraphParse { .. }));
    }

    #[tokio::test]
    async fn test_missing_dependency_is_unknown_not_error() {
        let (fixture, _) = sample_store();
        let dot = fixture.dot_graph(
            &["ccc-app-3.0", "zzz-gone-9.9"],
            &[("ccc-app-3.0", "zzz-gone-9.9")],
        );
        let builder = ClosureBuilder::new(CannedGraph::new(dot)).store_root(fixture.store_root());

        let closure = builder.build(fixture.output_dir(), "result").await.unwrap();
        assert_eq!(closure.graph.node_count(), 2);
        assert_eq!(closure.unknown_count(), 1);
    }

    #[tokio::test]
    async fn test_nix_store_graph_reports_tool_failure() {
        let source = NixStoreGraph::new("false").with_timeout(Some(Duration::from_secs(5)));
        let err = source.query_graph(Path::new("/nix/store/aaa-foo-1.0")).await.unwrap_err();
        assert!(matches!(err, ClosureError::ExternalTool { tool, .. } if tool == "false"));
    }

    #[tokio::test]
    async fn test_nix_store_graph_missing_tool() {
        let source = NixStoreGraph::new("nix-closure-definitely-not-installed");
        let err = source.query_graph(Path::new("/nix/store/aaa-foo-1.0")).await.unwrap_err();
        assert!(matches!(err, ClosureError::ExternalTool { .. }));
    }
}
