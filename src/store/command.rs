//! Builder for invoking the store's command-line tools.
//!
//! Every external call goes through [`StoreCommand`] so output capture, timeouts and error
//! reporting behave the same way for each tool.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::{DEFAULT_GRAPH_TOOL, GRAPH_TOOL_TIMEOUT};
use crate::core::{ClosureError, Result};

/// Builder for a single store tool invocation.
///
/// # Examples
///
/// ```rust,no_run
/// use nix_closure::store::StoreCommand;
///
/// # async fn example() -> nix_closure::core::Result<()> {
/// let output = StoreCommand::query_graph("nix-store", "/nix/store/abc-hello-2.12")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct StoreCommand {
    program: String,
    args: Vec<String>,
    timeout_duration: Option<Duration>,
}

impl Default for StoreCommand {
    fn default() -> Self {
        Self {
            program: DEFAULT_GRAPH_TOOL.to_string(),
            args: Vec::new(),
            timeout_duration: Some(GRAPH_TOOL_TIMEOUT),
        }
    }
}

impl StoreCommand {
    /// Create a builder for `program` with the default timeout.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// `<tool> -q --graph <path>`
    pub fn query_graph(program: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self::new(program).args(["-q", "--graph"]).arg(path.as_ref().display().to_string())
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set a custom timeout for the command (None for no timeout).
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Run the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`ClosureError::ExternalTool`] when the process cannot be spawned, exits with a
    /// non-zero status, or exceeds the timeout. The error carries the captured stderr.
    pub async fn execute(self) -> Result<StoreCommandOutput> {
        let start = std::time::Instant::now();
        let command_line = format!("{} {}", self.program, self.args.join(" "));
        tracing::debug!(target: "store", "Executing command: {}", command_line);

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output_future = cmd.output();
        let output = match self.timeout_duration {
            Some(duration) => match timeout(duration, output_future).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        target: "store",
                        "Command timed out after {} seconds: {}",
                        duration.as_secs(),
                        command_line
                    );
                    return Err(ClosureError::ExternalTool {
                        tool: self.program,
                        stderr: format!("timed out after {} seconds", duration.as_secs()),
                    });
                }
            },
            None => output_future.await,
        }
        .map_err(|e| ClosureError::ExternalTool {
            tool: self.program.clone(),
            stderr: format!("failed to execute: {e}"),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(
                target: "store",
                "Command failed with exit code: {:?}",
                output.status.code()
            );
            if !stderr.is_empty() {
                tracing::debug!(target: "store", "Error: {}", stderr.trim());
            }
            return Err(ClosureError::ExternalTool {
                tool: self.program,
                stderr,
            });
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(target: "store::perf", "{} took {:.2}s", self.program, elapsed.as_secs_f64());
        } else {
            tracing::debug!(target: "store::perf", "{} took {}ms", self.program, elapsed.as_millis());
        }

        Ok(StoreCommandOutput {
            stdout,
            stderr,
        })
    }
}

/// Captured output of a successful store command.
#[derive(Debug, Clone)]
pub struct StoreCommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error (warnings from the tool)
    pub stderr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_graph_builder() {
        let cmd = StoreCommand::query_graph("nix-store", "/nix/store/abc-hello-2.12");
        assert_eq!(cmd.program, "nix-store");
        assert_eq!(cmd.args, vec!["-q", "--graph", "/nix/store/abc-hello-2.12"]);
        assert_eq!(cmd.timeout_duration, Some(GRAPH_TOOL_TIMEOUT));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_captures_stdout() {
        let output = StoreCommand::new("sh").args(["-c", "echo digraph"]).execute().await.unwrap();
        assert_eq!(output.stdout.trim(), "digraph");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_nonzero_exit_carries_stderr() {
        let err = StoreCommand::new("sh")
            .args(["-c", "echo 'path is not valid' >&2; exit 1"])
            .execute()
            .await
            .unwrap_err();
        match err {
            ClosureError::ExternalTool { tool, stderr } => {
                assert_eq!(tool, "sh");
                assert!(stderr.contains("path is not valid"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_missing_program() {
        let err = StoreCommand::new("nix-closure-no-such-tool").execute().await.unwrap_err();
        assert!(matches!(err, ClosureError::ExternalTool { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_timeout() {
        let err = StoreCommand::new("sleep")
            .arg("5")
            .with_timeout(Some(Duration::from_millis(100)))
            .execute()
            .await
            .unwrap_err();
        match err {
            ClosureError::ExternalTool { stderr, .. } => assert!(stderr.contains("timed out")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
