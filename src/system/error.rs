use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors raised while reading host counters or relaying external tools.
///
/// Every variant is recoverable at the report level: the driver turns it
/// into a diagnostic line and moves on to the next section.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// A counter record was present but malformed or too short.
    #[error("failed to parse {}: {detail}", .path.display())]
    Parse { path: PathBuf, detail: String },

    /// The process exited between enumeration and inspection.
    #[error("process {pid} not found")]
    ProcessNotFound { pid: u32 },

    /// A counter file exists but cannot be read by this user.
    #[error("permission denied reading {}", .path.display())]
    PermissionDenied { path: PathBuf },

    /// An external command could not be launched.
    #[error("`{command}` unavailable: {reason}")]
    ToolUnavailable { command: String, reason: String },

    /// An external command ran but complained on its error stream, for
    /// example a firewall listing refused to a non-root user.
    #[error("`{command}` {}: {message}", exit_label(.status))]
    ToolReported {
        command: String,
        status: Option<i32>,
        message: String,
    },

    /// An external command outlived the configured timeout and was killed.
    #[error("`{command}` timed out after {}s", .timeout.as_secs())]
    ToolTimedOut { command: String, timeout: Duration },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type ProbeResult<T> = Result<T, ProbeError>;

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exited with status {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

impl ProbeError {
    pub(crate) fn parse(path: &Path, detail: impl Into<String>) -> Self {
        ProbeError::Parse {
            path: path.to_path_buf(),
            detail: detail.into(),
        }
    }

    /// Classifies an I/O failure on a system-wide counter file.
    pub(crate) fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::PermissionDenied => ProbeError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => ProbeError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// Classifies an I/O failure on a per-process record. A missing record
    /// means the process is gone, which is expected during a scan.
    pub(crate) fn from_process_io(pid: u32, path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => ProbeError::ProcessNotFound { pid },
            // ESRCH surfaces when the task exits while its record is open.
            _ if source.raw_os_error() == Some(libc::ESRCH) => ProbeError::ProcessNotFound { pid },
            _ => ProbeError::from_io(path, source),
        }
    }
}
