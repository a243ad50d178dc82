//! Error handling for nix-closure
//!
//! The error system follows two rules:
//! 1. **Strongly-typed errors** ([`ClosureError`]) for the library, so callers can match on the
//!    failing stage of a closure build.
//! 2. **User-friendly messages** ([`ErrorContext`]) for the CLI, carrying details and an
//!    actionable suggestion next to the error itself.
//!
//! # Propagation
//!
//! Artifact resolution, graph parsing and external tool failures are fatal and propagate to the
//! caller. Failures while annotating a single graph node are *not* errors: the annotator records
//! the node as unknown and moves on (see [`crate::closure::annotate`]).
//!
//! # Examples
//!
//! ```rust,no_run
//! use nix_closure::core::{ClosureError, user_friendly_error};
//!
//! let error = ClosureError::MalformedPath {
//!     path: "glibc".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for closure operations.
///
/// Each variant names the stage that failed. I/O errors are kept as their source so the
/// `std::io::ErrorKind` stays available to [`user_friendly_error`].
#[derive(Error, Debug)]
pub enum ClosureError {
    /// A storage path does not follow the `<digest>-<name>-<version>` convention.
    #[error("Malformed store path '{path}': expected <digest>-<name>-<version>")]
    MalformedPath {
        /// The offending path, with the store root stripped
        path: String,
    },

    /// A file or directory could not be read while hashing.
    #[error("Failed to read '{}'", path.display())]
    ReadError {
        /// Path of the entry that could not be read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The build output is not a readable symlink.
    #[error("'{}' is not a readable symlink", path.display())]
    SymlinkError {
        /// The output path that was expected to be a symlink
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A `bin/` directory exists but holds no entries.
    #[error("No result binary found in '{}'", dir.display())]
    NoBinaryFound {
        /// The empty `bin/` directory
        dir: PathBuf,
    },

    /// The container image manifest is unreadable or has no config digest.
    #[error("Invalid image manifest '{}': {reason}", path.display())]
    ManifestError {
        /// Path of the manifest file
        path: PathBuf,
        /// Why the manifest was rejected
        reason: String,
    },

    /// Resolving the top-level artifact failed at the named stage.
    #[error("Failed to resolve artifact ({stage})")]
    ArtifactResolution {
        /// Stage that failed: "hash", "identity" or "binary"
        stage: &'static str,
        /// The underlying failure
        #[source]
        source: Box<ClosureError>,
    },

    /// The graph description is not valid DOT.
    #[error("Failed to parse graph at line {line}: {message}")]
    GraphParse {
        /// 1-based line of the offending token
        line: usize,
        /// Parser diagnostic
        message: String,
    },

    /// The graph description parsed but is inconsistent.
    #[error("Failed to analyse graph: {message}")]
    GraphAnalysis {
        /// Analysis diagnostic
        message: String,
    },

    /// The external graph-query tool failed.
    #[error("External tool '{tool}' failed")]
    ExternalTool {
        /// Tool that was invoked
        tool: String,
        /// Captured diagnostic output (or the spawn/timeout reason)
        stderr: String,
    },

    /// Configuration file problems.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },
}

impl ClosureError {
    /// Wrap an I/O failure on `path` as a [`ClosureError::ReadError`].
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Wrap a failure as [`ClosureError::ArtifactResolution`] for `stage`.
    pub fn artifact(stage: &'static str, source: Self) -> Self {
        Self::ArtifactResolution {
            stage,
            source: Box::new(source),
        }
    }
}

/// Result alias used across the library.
pub type Result<T, E = ClosureError> = std::result::Result<T, E>;

/// Error wrapper that adds a user-facing suggestion and details.
///
/// The CLI converts every failure into an `ErrorContext` before printing it.
#[derive(Debug)]
pub struct ErrorContext {
    /// The headline message
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with only a headline.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error context to stderr with terminal colors.
    ///
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with an actionable suggestion.
///
/// [`ClosureError`] variants get tailored suggestions; everything else is shown with its
/// `anyhow` context chain as details.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(closure_error) = error.downcast_ref::<ClosureError>() {
        return create_error_context(closure_error);
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new("Invalid configuration file")
            .with_details(toml_error.to_string())
            .with_suggestion("Check the TOML syntax of your nix-closure config file");
    }

    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    let ctx = ErrorContext::new(error.to_string());
    if chain.is_empty() { ctx } else { ctx.with_details(chain.join(": ")) }
}

fn create_error_context(error: &ClosureError) -> ErrorContext {
    let ctx = ErrorContext::new(error.to_string());
    match error {
        ClosureError::MalformedPath { .. } => ctx
            .with_details("Store paths are named <digest>-<name>-<version>")
            .with_suggestion("Pass a path inside the store, e.g. /nix/store/<digest>-hello-2.12"),
        ClosureError::ReadError { source, .. } => {
            let ctx = ctx.with_details(source.to_string());
            if source.kind() == std::io::ErrorKind::PermissionDenied {
                ctx.with_suggestion("Check that the store path is readable by the current user")
            } else {
                ctx.with_suggestion("Check that the path exists and has not been garbage collected")
            }
        }
        ClosureError::SymlinkError { source, .. } => ctx
            .with_details(source.to_string())
            .with_suggestion("Run 'nix build' first so the output symlink exists"),
        ClosureError::NoBinaryFound { .. } => ctx
            .with_details("The package has a bin/ directory but it is empty")
            .with_suggestion("Make sure the package installs its executable into $out/bin"),
        ClosureError::ManifestError { .. } => ctx
            .with_suggestion("The manifest must be an OCI image manifest with a config.digest"),
        ClosureError::ArtifactResolution { source, .. } => {
            let inner = create_error_context(source);
            let ctx = ctx.with_details(inner.message);
            match inner.suggestion {
                Some(suggestion) => ctx.with_suggestion(suggestion),
                None => ctx,
            }
        }
        ClosureError::GraphParse { .. } | ClosureError::GraphAnalysis { .. } => ctx
            .with_details("The graph query tool produced output that is not a valid DOT graph")
            .with_suggestion("Run the graph query manually and inspect its output"),
        ClosureError::ExternalTool { tool, stderr } => {
            let ctx = ctx.with_details(stderr.trim().to_string());
            if which::which(tool).is_err() {
                ctx.with_suggestion(format!(
                    "'{tool}' was not found in PATH; install Nix or set graph_tool in the config"
                ))
            } else {
                ctx.with_suggestion("Check that the output path is a valid store path")
            }
        }
        ClosureError::ConfigError { .. } => {
            ctx.with_suggestion("Fix or remove ~/.nix-closure/config.toml")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ClosureError::MalformedPath {
            path: "glibc".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Malformed store path 'glibc': expected <digest>-<name>-<version>"
        );

        let error = ClosureError::GraphParse {
            line: 3,
            message: "expected '{'".to_string(),
        };
        assert_eq!(error.to_string(), "Failed to parse graph at line 3: expected '{'");
    }

    #[test]
    fn test_artifact_wraps_source() {
        let error = ClosureError::artifact(
            "identity",
            ClosureError::MalformedPath {
                path: "x".to_string(),
            },
        );
        let source = std::error::Error::source(&error).unwrap();
        assert!(source.to_string().contains("Malformed store path"));
    }

    #[test]
    fn test_user_friendly_read_error() {
        let error = ClosureError::read(
            "/nix/store/missing",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let ctx = user_friendly_error(error.into());
        assert!(ctx.message.contains("/nix/store/missing"));
        assert_eq!(ctx.details.as_deref(), Some("gone"));
        assert!(ctx.suggestion.unwrap().contains("garbage collected"));
    }

    #[test]
    fn test_user_friendly_nested_artifact_error() {
        let error = ClosureError::artifact(
            "binary",
            ClosureError::NoBinaryFound {
                dir: PathBuf::from("/nix/store/abc-app-1.0/bin"),
            },
        );
        let ctx = user_friendly_error(error.into());
        assert_eq!(ctx.message, "Failed to resolve artifact (binary)");
        assert!(ctx.details.unwrap().contains("No result binary"));
        assert!(ctx.suggestion.unwrap().contains("$out/bin"));
    }

    #[test]
    fn test_user_friendly_generic_error() {
        let error = anyhow::anyhow!("root cause").context("while doing things");
        let ctx = user_friendly_error(error);
        assert_eq!(ctx.message, "while doing things");
        assert_eq!(ctx.details.as_deref(), Some("root cause"));
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new("boom").with_details("why").with_suggestion("fix it");
        assert_eq!(ctx.to_string(), "boom\nDetails: why\nSuggestion: fix it");
    }
}
