//! nix-closure - hash and annotate the dependency closure of a Nix build output
//!
//! Given the directory a `nix build` ran in, nix-closure follows the `result` symlink into the
//! store, computes a content hash of the build output (and of the executable or container image
//! inside it), asks the store for the output's dependency graph, and annotates every store path
//! in that graph with its NAR hash, package name and version.
//!
//! # Architecture Overview
//!
//! ```text
//!  output dir ──► artifact::resolve_artifact ──► ArtifactDescriptor
//!                          │
//!                          ▼ resolved store path
//!               closure::GraphSource (nix-store -q --graph)
//!                          │ DOT text
//!                          ▼
//!               graph::parse_dependency_graph ──► DependencyGraph
//!                          │
//!                          ▼
//!               closure::annotate (bounded parallel hashing) ──► Closure
//! ```
//!
//! # Core Modules
//!
//! - [`artifact`] - Resolve the build output symlink into an artifact descriptor
//! - [`closure`] - Orchestrate a closure build and annotate graph nodes concurrently
//! - [`graph`] - Parse DOT into a petgraph-backed dependency graph
//! - [`hash`] - NAR serialization, Nix base32 and SHA-256 content hashing
//! - [`store`] - Store path identity parsing and store tool invocation
//!
//! ## Supporting Modules
//! - [`cli`] - Command-line interface
//! - [`config`] - User configuration (`~/.nix-closure/config.toml`)
//! - [`constants`] - Defaults and well-known names
//! - [`core`] - Error types and user-facing error formatting
//! - [`utils`] - Progress reporting
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use nix_closure::closure::{ClosureBuilder, NixStoreGraph};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let closure = ClosureBuilder::new(NixStoreGraph::default())
//!     .build(Path::new("."), "result")
//!     .await?;
//! for node in closure.graph.nodes() {
//!     println!("{} {:?}", node.store_name(), node.hash());
//! }
//! # Ok(())
//! # }
//! ```

// Core functionality modules
pub mod artifact;
pub mod closure;
pub mod graph;
pub mod hash;
pub mod store;

// Supporting modules
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
