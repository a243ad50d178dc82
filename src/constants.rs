//! Global constants used throughout the nix-closure codebase.
//!
//! Timeouts, parallelism parameters and well-known file names live here so the
//! magic values are discoverable in one place.

use std::time::Duration;

/// Default location of the content-addressed store.
pub const DEFAULT_STORE_ROOT: &str = "/nix/store";

/// Default graph-query tool, invoked as `<tool> -q --graph <path>`.
pub const DEFAULT_GRAPH_TOOL: &str = "nix-store";

/// Default name of the build output symlink created by `nix build`.
pub const DEFAULT_RESULT_SYMLINK: &str = "result";

/// Timeout for the external graph-query tool (5 minutes).
///
/// Querying a large closure is quick, but the store daemon may be busy with a build.
pub const GRAPH_TOOL_TIMEOUT: Duration = Duration::from_secs(300);

/// Minimum number of concurrent hashing workers regardless of CPU count.
pub const MIN_PARALLELISM: usize = 10;

/// Multiplier applied to CPU core count for default parallelism.
///
/// Tree hashing is I/O bound, so more workers than cores keeps the disk busy.
pub const PARALLELISM_CORE_MULTIPLIER: usize = 2;

/// Name of the directory holding a package's executables.
pub const BIN_DIR: &str = "bin";

/// File names recognised as an OCI image manifest, in lookup order.
///
/// `mainfest.json` is the misspelt name written by earlier image builders.
pub const MANIFEST_FILE_NAMES: [&str; 2] = ["manifest.json", "mainfest.json"];

/// Scheme prefix stripped from the manifest config digest.
pub const SHA256_DIGEST_PREFIX: &str = "sha256:";

/// Default parallelism: `max(MIN_PARALLELISM, cores * PARALLELISM_CORE_MULTIPLIER)`.
pub fn default_max_parallel() -> usize {
    let cores = std::thread::available_parallelism().map(usize::from).unwrap_or(1);
    (cores * PARALLELISM_CORE_MULTIPLIER).max(MIN_PARALLELISM)
}
