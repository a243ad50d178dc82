//! The `graph` command: build and print the annotated closure of a build output.
//!
//! ```bash
//! nix-closure graph                          # ./result, tree output
//! nix-closure graph ../app --symlink result-bin --format json
//! nix-closure graph --max-parallel 4 --format dot > closure.dot
//! ```

use anyhow::{Result, bail};
use clap::Args;
use std::path::PathBuf;

use super::CliContext;
use super::render::{OutputFormat, render};
use crate::closure::{ClosureBuilder, NixStoreGraph};
use crate::constants::DEFAULT_RESULT_SYMLINK;
use crate::utils::progress::ProgressBar;

/// Arguments of the `graph` command.
#[derive(Args, Debug)]
pub struct GraphCommand {
    /// Directory containing the build output symlink
    #[arg(default_value = ".")]
    pub output_dir: PathBuf,

    /// Name of the build output symlink
    #[arg(long, default_value = DEFAULT_RESULT_SYMLINK)]
    pub symlink: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Tree)]
    pub format: OutputFormat,

    /// Maximum concurrent hashing workers (overrides the config file)
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Store root (overrides the config file)
    #[arg(long)]
    pub store_root: Option<PathBuf>,
}

impl GraphCommand {
    /// Run the command.
    ///
    /// # Errors
    ///
    /// Fails when the closure cannot be built or `--max-parallel` is zero.
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let config = &ctx.config;
        let max_parallel = self.max_parallel.unwrap_or_else(|| config.max_parallel());
        if max_parallel == 0 {
            bail!("--max-parallel must be at least 1");
        }
        let store_root = self.store_root.unwrap_or_else(|| config.store_root.clone());

        let source = NixStoreGraph::new(&config.graph_tool).with_timeout(config.tool_timeout());
        let mut builder = ClosureBuilder::new(source)
            .store_root(store_root)
            .max_parallel(max_parallel)
            .annotate_deadline(config.annotate_deadline());
        if ctx.progress {
            builder = builder.progress(ProgressBar::new(0));
        }

        let closure = builder.build(&self.output_dir, &self.symlink).await?;
        let unknown = closure.unknown_count();
        if unknown > 0 {
            tracing::warn!(
                "{} of {} store paths could not be hashed and are shown as unknown",
                unknown,
                closure.graph.node_count()
            );
        }

        print!("{}", render(&closure, self.format)?);
        Ok(())
    }
}
