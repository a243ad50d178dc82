//! The `hash` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::hash::{file_hash, tree_hash};

/// Print the NAR tree digest of a path, or the SHA-256 of a single file with `--flat`.
#[derive(Args, Debug)]
pub struct HashCommand {
    /// File or directory to hash
    pub path: PathBuf,

    /// Hash the file's bytes (hex) instead of its NAR serialization (Nix base32)
    #[arg(long)]
    pub flat: bool,
}

impl HashCommand {
    /// Run the command.
    ///
    /// # Errors
    ///
    /// Fails when the path cannot be read.
    pub async fn execute(self) -> Result<()> {
        let path = self.path;
        let flat = self.flat;
        let digest = tokio::task::spawn_blocking(move || {
            if flat { file_hash(&path) } else { tree_hash(&path) }
        })
        .await
        .context("hashing task failed")??;

        println!("{digest}");
        Ok(())
    }
}
