//! Command-line interface for nix-closure.
//!
//! # Available Commands
//!
//! - `graph` - Resolve a build output, fetch its dependency graph and annotate every store path
//! - `hash` - Print the tree digest (or flat SHA-256) of a path
//! - `identity` - Print the name, version and digest encoded in a store path name
//!
//! # Global Options
//!
//! - `--verbose`/`-v`: debug logging
//! - `--quiet`/`-q`: errors only, no progress bar
//! - `--config`/`-c`: alternative config file (default `~/.nix-closure/config.toml`)
//! - `--no-progress`: never draw a progress bar
//!
//! `RUST_LOG` takes precedence over `--verbose` and `--quiet` when set.
//!
//! ```bash
//! nix-closure graph ./my-project --format json
//! nix-closure hash /nix/store/abc-hello-2.12
//! nix-closure identity /nix/store/abc-hello-2.12
//! ```

pub mod graph;
pub mod hash;
pub mod identity;
pub mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Settings shared by every subcommand after global flags and the config file are merged.
#[derive(Debug, Clone)]
pub struct CliContext {
    /// Loaded configuration
    pub config: Config,
    /// Whether progress bars may be drawn
    pub progress: bool,
}

/// Root command and global options.
#[derive(Parser, Debug)]
#[command(
    name = "nix-closure",
    about = "Hash and annotate the dependency closure of a Nix build output",
    version,
    long_about = "nix-closure resolves the `result` symlink of a build, asks the store for its \
                  dependency graph, and annotates every store path with its NAR hash, name and \
                  version."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to an alternative config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build and print the annotated closure of a build output.
    ///
    /// See [`graph::GraphCommand`] for options.
    Graph(graph::GraphCommand),

    /// Print the content hash of a file or directory.
    Hash(hash::HashCommand),

    /// Print the identity encoded in a store path name.
    Identity(identity::IdentityCommand),
}

impl Cli {
    /// Initialize logging, load the configuration and run the selected command.
    ///
    /// # Errors
    ///
    /// Returns the command's failure, or a configuration loading error.
    pub async fn execute(self) -> Result<()> {
        self.init_logging();

        let config = Config::load_with_optional(self.config.clone()).await?;
        let ctx = CliContext {
            config,
            progress: !self.no_progress && !self.quiet,
        };

        match self.command {
            Commands::Graph(cmd) => cmd.execute(&ctx).await,
            Commands::Hash(cmd) => cmd.execute().await,
            Commands::Identity(cmd) => cmd.execute(&ctx),
        }
    }

    /// Default log directive derived from `--verbose`/`--quiet`.
    fn log_directive(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }

    fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.log_directive()));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(self.verbose)
            .try_init();
    }
}
