//! Test fixtures for building fake stores
//!
//! A [`StoreFixture`] owns a temporary directory laid out like a real installation:
//!
//! ```text
//! <tmp>/
//! ├── store/           # stand-in for /nix/store
//! │   └── <digest>-<name>-<version>/...
//! └── out/             # directory `nix build` would run in
//!     └── result -> ../store/<digest>-<name>-<version>
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::closure::GraphSource;
use crate::core::{ClosureError, Result};

/// A temporary store with an output directory next to it.
#[derive(Debug)]
pub struct StoreFixture {
    _temp: TempDir,
    store_root: PathBuf,
    output_dir: PathBuf,
}

impl Default for StoreFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreFixture {
    /// Create an empty store and output directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let store_root = temp.path().join("store");
        let output_dir = temp.path().join("out");
        fs::create_dir_all(&store_root).expect("create store root");
        fs::create_dir_all(&output_dir).expect("create output dir");
        Self {
            _temp: temp,
            store_root,
            output_dir,
        }
    }

    /// Root of the fake store.
    pub fn store_root(&self) -> &Path {
        &self.store_root
    }

    /// Directory holding the output symlink.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create a store path named `name` containing `files` (paths relative to the package).
    ///
    /// Files under `bin/` are made executable on Unix.
    ///
    /// # Panics
    ///
    /// Panics on any I/O failure.
    pub fn add_package(&self, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let pkg = self.store_root.join(name);
        fs::create_dir_all(&pkg).expect("create package dir");
        for (relative, content) in files {
            let path = pkg.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create package subdir");
            }
            fs::write(&path, content).expect("write package file");

            #[cfg(unix)]
            if relative.starts_with("bin/") {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                    .expect("chmod package binary");
            }
        }
        pkg
    }

    /// Point `output_dir/link_name` at `target`.
    ///
    /// # Panics
    ///
    /// Panics if the symlink cannot be created.
    #[cfg(unix)]
    pub fn link_result(&self, link_name: &str, target: &Path) {
        std::os::unix::fs::symlink(target, self.output_dir.join(link_name))
            .expect("create result symlink");
    }

    /// Render a DOT graph the way the store's graph query does for the given store path names.
    ///
    /// Each `(referrer, reference)` pair in `edges` says the first path depends on the second.
    /// As the store tool does, node IDs are bare names and the edge is written
    /// `"reference" -> "referrer"`.
    pub fn dot_graph(&self, names: &[&str], edges: &[(&str, &str)]) -> String {
        let mut out = String::from("digraph G {\n");
        for name in names {
            let label = name.split_once('-').map_or(*name, |(_, rest)| rest);
            out.push_str(&format!(
                "\"{name}\" [label = \"{label}\", shape = box, style = filled, fillcolor = \"#ff0000\"];\n"
            ));
        }
        for (referrer, reference) in edges {
            out.push_str(&format!("\"{reference}\" -> \"{referrer}\" [color = \"black\"];\n"));
        }
        out.push_str("}\n");
        out
    }
}

/// A [`GraphSource`] returning fixed text and recording every query.
#[derive(Debug, Clone)]
pub struct CannedGraph {
    dot: std::result::Result<String, String>,
    queries: Arc<Mutex<Vec<PathBuf>>>,
}

impl CannedGraph {
    /// Always answer with `dot`.
    pub fn new(dot: impl Into<String>) -> Self {
        Self {
            dot: Ok(dot.into()),
            queries: Arc::default(),
        }
    }

    /// Always fail like a broken graph tool printing `stderr`.
    pub fn failing(stderr: impl Into<String>) -> Self {
        Self {
            dot: Err(stderr.into()),
            queries: Arc::default(),
        }
    }

    /// Store paths queried so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the query log mutex is poisoned.
    pub fn queries(&self) -> Vec<PathBuf> {
        self.queries.lock().expect("query log poisoned").clone()
    }
}

impl GraphSource for CannedGraph {
    async fn query_graph(&self, store_path: &Path) -> Result<String> {
        self.queries.lock().expect("query log poisoned").push(store_path.to_path_buf());
        self.dot.clone().map_err(|stderr| ClosureError::ExternalTool {
            tool: "canned".to_string(),
            stderr,
        })
    }
}
