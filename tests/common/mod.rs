//! Common helpers for nix-closure integration tests
//!
//! The store fixtures themselves live in `nix_closure::test_utils`; this module adds the pieces
//! only the binary tests need: a stand-in graph tool and a config file pointing at it.

// Not every test file uses every helper
#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};

use nix_closure::utils::progress::NO_PROGRESS_ENV;

/// `nix-closure` binary with progress output disabled and `RUST_LOG` cleared.
pub fn nix_closure_cmd() -> Command {
    let mut cmd = Command::cargo_bin("nix-closure").expect("binary built");
    cmd.env(NO_PROGRESS_ENV, "1").env_remove("RUST_LOG");
    cmd
}

/// Write a shell script that behaves like `nix-store -q --graph <path>` and prints `dot`.
///
/// Any other argument list makes it exit with status 2.
#[cfg(unix)]
pub fn write_graph_tool(dir: &Path, dot: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let dot_file = dir.join("graph.dot");
    fs::write(&dot_file, dot).expect("write dot file");

    let script = dir.join("fake-nix-store");
    let body = format!(
        "#!/bin/sh\n\
         if [ \"$1\" != \"-q\" ] || [ \"$2\" != \"--graph\" ] || [ -z \"$3\" ]; then\n\
         \x20 echo \"unexpected arguments: $*\" >&2\n\
         \x20 exit 2\n\
         fi\n\
         cat '{}'\n",
        dot_file.display()
    );
    fs::write(&script, body).expect("write graph tool");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod graph tool");
    script
}

/// Write a config file using `store_root` and `graph_tool`.
pub fn write_config(dir: &Path, store_root: &Path, graph_tool: &Path) -> PathBuf {
    let path = dir.join("config.toml");
    let content = format!(
        "store_root = '{}'\ngraph_tool = '{}'\ntool_timeout_secs = 30\nmax_parallel = 4\n",
        store_root.display(),
        graph_tool.display()
    );
    fs::write(&path, content).expect("write config");
    path
}
