//! Parallel per-node annotation.
//!
//! Every node of a [`DependencyGraph`] names a store path. Annotating a node means hashing that
//! path's tree and parsing its identity; each node is handled by its own blocking task and at
//! most `max_parallel` tasks run at once. Workers only *return* their result, and the single
//! coordinating task writes all results into the graph, so the graph is never shared across
//! threads.
//!
//! Per-node failures are not errors. A store path that is missing, unreadable or unparseable is
//! left unannotated and logged at debug level; rendering shows such nodes as unknown.
//!
//! With a deadline, nodes whose workers had not reported back in time also stay unannotated.
//! Workers still hashing when the deadline fires are told to stop, so they do not outlive the
//! call.

use futures::stream::{self, StreamExt};
use petgraph::graph::NodeIndex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::constants::{DEFAULT_STORE_ROOT, default_max_parallel};
use crate::graph::DependencyGraph;
use crate::hash::tree_hash_until;
use crate::store::{AppIdentity, parse_identity, store_location};
use crate::utils::progress::ProgressBar;

/// Settings for [`annotate`].
#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    /// Store root used to locate and parse node names
    pub store_root: PathBuf,
    /// Upper bound on concurrently running workers (values below 1 are treated as 1)
    pub max_parallel: usize,
    /// Give up waiting for workers after this long
    pub deadline: Option<Duration>,
    /// Progress bar advanced once per finished node
    pub progress: Option<ProgressBar>,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from(DEFAULT_STORE_ROOT),
            max_parallel: default_max_parallel(),
            deadline: None,
            progress: None,
        }
    }
}

/// Result of one successful worker.
#[derive(Debug)]
struct NodeAnnotation {
    index: NodeIndex,
    hash: String,
    identity: AppIdentity,
}

/// Annotate every node of `graph` with its tree hash, name and version.
///
/// Nodes and edges are left untouched; only node attributes are added. The returned graph has
/// exactly one annotation per node whose worker succeeded.
pub async fn annotate(mut graph: DependencyGraph, options: &AnnotateOptions) -> DependencyGraph {
    let jobs: Vec<(NodeIndex, String)> = graph
        .node_indices()
        .filter_map(|index| graph.node(index).map(|node| (index, node.store_name())))
        .collect();
    let total = jobs.len();
    let concurrency = options.max_parallel.max(1);
    let start = Instant::now();
    let cancel = Arc::new(AtomicBool::new(false));

    tracing::debug!(
        target: "closure",
        "Annotating {} store paths with up to {} workers",
        total,
        concurrency
    );
    if let Some(progress) = &options.progress {
        progress.set_length(total as u64);
        progress.set_message("Annotating store paths");
    }

    let workers = stream::iter(jobs)
        .map(|(index, name)| {
            let store_root = options.store_root.clone();
            let progress = options.progress.clone();
            let cancel = Arc::clone(&cancel);
            async move {
                let task_name = name.clone();
                let result = tokio::task::spawn_blocking(move || {
                    annotate_node(index, &name, &store_root, &cancel)
                })
                .await;
                if let Some(progress) = &progress {
                    progress.inc(1);
                }
                result.unwrap_or_else(|e| {
                    tracing::warn!(target: "closure", "Worker for {} failed: {}", task_name, e);
                    None
                })
            }
        })
        .buffer_unordered(concurrency);

    let results: Vec<Option<NodeAnnotation>> = match options.deadline {
        Some(deadline) => workers.take_until(tokio::time::sleep(deadline)).collect().await,
        None => workers.collect().await,
    };
    // stop workers abandoned by the deadline
    cancel.store(true, Ordering::Relaxed);

    let reported = results.len();
    let mut annotated = 0;
    for annotation in results.into_iter().flatten() {
        if let Some(node) = graph.node_mut(annotation.index) {
            node.annotate(annotation.hash, annotation.identity);
            annotated += 1;
        }
    }

    if reported < total {
        tracing::warn!(
            target: "closure",
            "Annotation deadline reached; {} of {} store paths left unknown",
            total - reported,
            total
        );
    }
    if let Some(progress) = &options.progress {
        progress.finish_and_clear();
    }

    tracing::info!(
        target: "closure",
        "Annotated {}/{} store paths in {:.2}s",
        annotated,
        total,
        start.elapsed().as_secs_f64()
    );
    graph
}

/// Hash and identify one store path. Runs on a blocking thread.
fn annotate_node(
    index: NodeIndex,
    name: &str,
    store_root: &Path,
    cancel: &AtomicBool,
) -> Option<NodeAnnotation> {
    if cancel.load(Ordering::Relaxed) {
        return None;
    }
    let identity = match parse_identity(name, store_root) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!(target: "closure", "Leaving {} unannotated: {}", name, e);
            return None;
        }
    };

    let location = store_location(name, store_root);
    let hash = match tree_hash_until(&location, cancel) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::debug!(target: "closure", "Leaving {} unannotated: {}", name, e);
            return None;
        }
    };

    Some(NodeAnnotation {
        index,
        hash,
        identity,
    })
}
