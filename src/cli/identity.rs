//! The `identity` command.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::CliContext;
use crate::store::parse_identity;

/// Print the name, version and digest encoded in a store path name.
#[derive(Args, Debug)]
pub struct IdentityCommand {
    /// Store path, absolute or relative to the store root
    pub store_path: String,

    /// Store root (overrides the config file)
    #[arg(long)]
    pub store_root: Option<PathBuf>,

    /// Print JSON instead of `key: value` lines
    #[arg(long)]
    pub json: bool,
}

impl IdentityCommand {
    /// Run the command.
    ///
    /// # Errors
    ///
    /// Fails when the name does not have `<digest>-<name>-<version>` form.
    pub fn execute(self, ctx: &CliContext) -> Result<()> {
        let store_root = self.store_root.as_deref().unwrap_or(&ctx.config.store_root);
        let identity = parse_identity(&self.store_path, store_root)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&identity)?);
        } else {
            println!("name: {}", identity.name);
            println!("version: {}", identity.version);
            println!("digest: {}", identity.result_digest);
        }
        Ok(())
    }
}
