//! Running external command-line tools.
//!
//! [`ToolCommand`] describes a program plus a fixed argument prefix (so that
//! `npx -y @mermaid-js/mermaid-cli` works as well as a plain `mmdc`) and a
//! time limit. A run that exceeds the limit is killed.

use std::{ffi::OsString, process::Stdio, time::Duration};

use log::{debug, trace, warn};
use thiserror::Error;
use tokio::process::Command;

/// Errors from running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The program could not be started (missing, not executable, ...).
    #[error("failed to start `{tool}`: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but reported failure.
    #[error("`{tool}` exited with {}: {stderr}", .code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}")))]
    Exit {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The program succeeded without writing its output file.
    #[error("`{0}` produced no output")]
    EmptyOutput(String),

    /// The program was killed after running past its time limit.
    #[error("`{tool}` did not finish within {} seconds", .timeout.as_secs())]
    Timeout { tool: String, timeout: Duration },
}

impl ToolError {
    /// Returns the diagnostics the tool wrote, if it exited with an error.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Exit { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// An external program with a fixed argument prefix and a time limit.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    prefix_args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Creates a tool command.
    ///
    /// # Arguments
    ///
    /// * `program` - Executable name or path, resolved through `PATH`.
    /// * `prefix_args` - Arguments placed before the per-run arguments.
    /// * `timeout` - Wall-clock limit for a single run.
    pub fn new(program: impl Into<String>, prefix_args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            prefix_args,
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the tool with `args` appended to the prefix and waits for it.
    ///
    /// Returns captured stdout on success.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Spawn`] if the process cannot be started,
    /// [`ToolError::Exit`] with the captured stderr on a non-zero exit, and
    /// [`ToolError::Timeout`] if the time limit elapses. A timed out process is
    /// killed.
    pub async fn run<I, S>(&self, args: I) -> Result<Vec<u8>, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let args: Vec<OsString> = self
            .prefix_args
            .iter()
            .map(OsString::from)
            .chain(args.into_iter().map(Into::into))
            .collect();
        debug!(tool = self.program, args:? = args; "Running external tool");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Spawn {
                tool: self.program.clone(),
                source,
            })?;

        // Dropping the pending future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(|source| ToolError::Spawn {
                tool: self.program.clone(),
                source,
            })?,
            Err(_) => {
                warn!(tool = self.program, timeout_secs = self.timeout.as_secs(); "External tool timed out");
                return Err(ToolError::Timeout {
                    tool: self.program.clone(),
                    timeout: self.timeout,
                });
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(ToolError::Exit {
                tool: self.program.clone(),
                code: output.status.code(),
                stderr,
            });
        }

        if !stderr.is_empty() {
            trace!(tool = self.program, stderr; "External tool diagnostics");
        }
        Ok(output.stdout)
    }
}
