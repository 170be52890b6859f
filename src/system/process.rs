use std::fs::{self, ReadDir};
use std::path::PathBuf;

use tracing::{debug, trace, warn};

use super::cpu::{ClockContext, process_usage_percent};
use super::error::{ProbeError, ProbeResult};
use super::procfs::{ProcFs, StatusFields};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub pid: u32,
    pub name: String,
}

/// One-shot scan of the process registry.
///
/// Yields processes in directory order, which is not numeric order. Entries
/// that disappear mid-scan are skipped. Collect and sort for a stable view.
pub struct Processes {
    root: PathBuf,
    entries: ReadDir,
}

impl ProcFs {
    pub fn processes(&self) -> ProbeResult<Processes> {
        let entries =
            fs::read_dir(self.root()).map_err(|e| ProbeError::from_io(self.root(), e))?;
        Ok(Processes {
            root: self.root().to_path_buf(),
            entries,
        })
    }
}

impl Iterator for Processes {
    type Item = ProcessIdentity;

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.entries.by_ref() {
            let Ok(entry) = entry else {
                continue;
            };
            let file_name = entry.file_name();
            let Some(pid) = file_name.to_str().and_then(parse_pid) else {
                continue;
            };
            if !entry.file_type().is_ok_and(|t| t.is_dir()) {
                continue;
            }
            let comm = self.root.join(file_name).join("comm");
            match fs::read_to_string(&comm) {
                Ok(contents) => {
                    let name = contents.lines().next().unwrap_or_default().to_string();
                    return Some(ProcessIdentity { pid, name });
                }
                Err(err) => trace!(pid, %err, "skipping vanished process"),
            }
        }
        None
    }
}

/// Accepts only names made entirely of ASCII digits.
fn parse_pid(name: &str) -> Option<u32> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok().filter(|&pid| pid > 0)
}

/// State of one process at inspection time.
#[derive(Debug)]
pub struct ProcessReport {
    pub pid: u32,
    pub status: StatusFields,
    /// Lifetime-average CPU share; `None` when the stat record or the clock
    /// capture was unusable.
    pub cpu_percent: Option<f64>,
    /// Why `cpu_percent` is missing.
    pub cpu_error: Option<ProbeError>,
}

/// Inspects a single process against one clock capture.
///
/// The capture is taken as a result so that an unreadable uptime costs the
/// CPU figure only, like a broken stat record does.
pub struct Inspector<'a> {
    procfs: &'a ProcFs,
    clock: ProbeResult<ClockContext>,
}

impl<'a> Inspector<'a> {
    pub fn new(procfs: &'a ProcFs, clock: ProbeResult<ClockContext>) -> Self {
        Inspector { procfs, clock }
    }

    /// Fails with [`ProbeError::ProcessNotFound`] when the process is gone.
    /// A broken stat record or clock only drops the CPU figure.
    pub fn inspect(self, pid: u32) -> ProbeResult<ProcessReport> {
        let counters = self.procfs.read_process_counters(pid)?;
        let clock = self.clock;
        let cpu = counters
            .times
            .and_then(|times| clock.map(|clock| process_usage_percent(&times, &clock)));
        let (cpu_percent, cpu_error) = match cpu {
            Ok(percent) => {
                debug!(pid, percent, "estimated process cpu usage");
                (Some(percent), None)
            }
            Err(err) => {
                warn!(pid, %err, "cpu usage unavailable for process");
                (None, Some(err))
            }
        };
        Ok(ProcessReport {
            pid,
            status: counters.status,
            cpu_percent,
            cpu_error,
        })
    }
}
