//! Runs external reporting commands and hands back their output untouched.

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use super::error::{ProbeError, ProbeResult};

/// Exit statuses a POSIX shell uses for "found but not executable" and
/// "command not found".
const SHELL_NOT_EXECUTABLE: i32 = 126;
const SHELL_NOT_FOUND: i32 = 127;

/// What a finished command left on its two output streams.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit status; `None` when the command was killed by a signal.
    pub status: Option<i32>,
}

impl ToolOutput {
    pub fn from_stdout(text: impl Into<String>) -> Self {
        ToolOutput {
            stdout: text.into(),
            status: Some(0),
            ..ToolOutput::default()
        }
    }

    /// Anything the command wrote to stderr, as a reportable error. A quiet
    /// non-zero exit, such as a `grep` with no match, yields `None`.
    pub fn diagnostic(&self, command: &str) -> Option<ProbeError> {
        let message = self.stderr.trim();
        if message.is_empty() {
            return None;
        }
        Some(ProbeError::ToolReported {
            command: command.to_string(),
            status: self.status,
            message: message.to_string(),
        })
    }
}

pub trait ToolRelay {
    /// Runs `command` and returns its output streams verbatim.
    fn run(&self, command: &str) -> impl Future<Output = ProbeResult<ToolOutput>>;
}

/// Executes commands through a shell so pipelines like `lspci | grep -i vga`
/// work as written.
#[derive(Clone, Debug)]
pub struct ShellRelay {
    shell: String,
    timeout: Option<Duration>,
}

impl Default for ShellRelay {
    fn default() -> Self {
        Self::new("sh", None)
    }
}

impl ShellRelay {
    pub fn new(shell: impl Into<String>, timeout: Option<Duration>) -> Self {
        ShellRelay {
            shell: shell.into(),
            timeout: timeout.filter(|t| !t.is_zero()),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl ToolRelay for ShellRelay {
    async fn run(&self, command: &str) -> ProbeResult<ToolOutput> {
        debug!(command, shell = %self.shell, "running external tool");
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let child = cmd.output();

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child).await.map_err(|_| {
                ProbeError::ToolTimedOut {
                    command: command.to_string(),
                    timeout: limit,
                }
            })?,
            None => child.await,
        }
        .map_err(|e| ProbeError::ToolUnavailable {
            command: command.to_string(),
            reason: e.to_string(),
        })?;

        if let Some(code @ (SHELL_NOT_EXECUTABLE | SHELL_NOT_FOUND)) = output.status.code() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match stderr.trim() {
                "" => format!("shell exited with status {code}"),
                message => message.to_string(),
            };
            return Err(ProbeError::ToolUnavailable {
                command: command.to_string(),
                reason,
            });
        }

        debug!(command, status = ?output.status, bytes = output.stdout.len(), "external tool finished");
        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
        })
    }
}
