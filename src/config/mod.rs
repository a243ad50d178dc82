//! User configuration for nix-closure.
//!
//! Settings are read from a TOML file, by default `~/.nix-closure/config.toml`
//! (`%LOCALAPPDATA%\nix-closure\config.toml` on Windows). A missing file means defaults;
//! every key is optional. Command-line flags override what the file says.
//!
//! ```toml
//! store_root = "/nix/store"
//! graph_tool = "nix-store"
//! tool_timeout_secs = 300      # 0 disables the timeout
//! max_parallel = 16            # defaults to max(10, 2 * cores)
//! annotate_timeout_secs = 600  # unset means wait for every node
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::constants::{
    DEFAULT_GRAPH_TOOL, DEFAULT_STORE_ROOT, GRAPH_TOOL_TIMEOUT, default_max_parallel,
};
use crate::core::ClosureError;

/// Name of the per-user configuration directory.
const CONFIG_DIR_NAME: &str = ".nix-closure";

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the content-addressed store
    pub store_root: PathBuf,
    /// Graph-query tool, invoked as `<tool> -q --graph <path>`
    pub graph_tool: String,
    /// Timeout for the graph-query tool in seconds; 0 disables it
    pub tool_timeout_secs: u64,
    /// Maximum concurrent annotation workers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,
    /// Deadline for the whole annotation phase in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotate_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from(DEFAULT_STORE_ROOT),
            graph_tool: DEFAULT_GRAPH_TOOL.to_string(),
            tool_timeout_secs: GRAPH_TOOL_TIMEOUT.as_secs(),
            max_parallel: None,
            annotate_timeout_secs: None,
        }
    }
}

impl Config {
    /// Platform-specific default location of the config file.
    ///
    /// # Errors
    ///
    /// Fails when the home (or local data) directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("nix-closure")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(CONFIG_DIR_NAME)
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Load from `path`, or from [`Config::default_path`] when `None`.
    ///
    /// A file that does not exist yields the defaults. An explicitly given path that does not
    /// exist is an error.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is not valid TOML, or holds invalid values.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ClosureError::ConfigError {
                        message: format!("config file {} does not exist", path.display()),
                    }
                    .into());
                }
                Self::load_from(&path).await
            }
            None => match Self::default_path() {
                Ok(path) if path.exists() => Self::load_from(&path).await,
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load from a specific file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is not valid TOML, or holds invalid values.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`ClosureError::ConfigError`] for an empty tool name, an empty store root or a
    /// zero `max_parallel`.
    pub fn validate(&self) -> Result<(), ClosureError> {
        if self.graph_tool.trim().is_empty() {
            return Err(ClosureError::ConfigError {
                message: "graph_tool must not be empty".to_string(),
            });
        }
        if self.store_root.as_os_str().is_empty() {
            return Err(ClosureError::ConfigError {
                message: "store_root must not be empty".to_string(),
            });
        }
        if self.max_parallel == Some(0) {
            return Err(ClosureError::ConfigError {
                message: "max_parallel must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Graph tool timeout, `None` when disabled.
    pub fn tool_timeout(&self) -> Option<Duration> {
        (self.tool_timeout_secs > 0).then(|| Duration::from_secs(self.tool_timeout_secs))
    }

    /// Annotation deadline, if configured.
    pub fn annotate_deadline(&self) -> Option<Duration> {
        self.annotate_timeout_secs.map(Duration::from_secs)
    }

    /// Configured worker bound, or the CPU-based default.
    pub fn max_parallel(&self) -> usize {
        self.max_parallel.unwrap_or_else(default_max_parallel)
    }
}
