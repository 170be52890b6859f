//! Readers for the raw counter records under the procfs mount.
//!
//! `ProcFs` carries the mount root so tests can point it at a synthetic
//! tree. Each read opens, consumes and closes its file within the call.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::cpu::{ClockContext, ProcessCpuTimes, SystemCounters};
use super::error::{ProbeError, ProbeResult};
use super::platform;

pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Whole-line token indices are 13, 14 and 21; after the `)` closing the
/// command name they shift down by two.
const UTIME_FIELD: usize = 11;
const STIME_FIELD: usize = 12;
const STARTTIME_FIELD: usize = 19;

/// `Key:` prefixes of the status lines relayed verbatim.
const NAME_KEY: &str = "Name:";
const STATE_KEY: &str = "State:";
const VM_RSS_KEY: &str = "VmRSS:";

#[derive(Clone, Debug)]
pub struct ProcFs {
    root: PathBuf,
    ticks_per_second: Option<u64>,
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

/// The status lines of interest, kept exactly as the kernel printed them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusFields {
    pub name: Option<String>,
    pub state: Option<String>,
    pub vm_rss: Option<String>,
}

impl StatusFields {
    /// Present lines in display order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        [&self.name, &self.state, &self.vm_rss]
            .into_iter()
            .filter_map(|line| line.as_deref())
    }
}

/// One process's counters. The status record is required; a stat record
/// that failed to read or parse is kept as an error so callers can still
/// report the status fields.
#[derive(Debug)]
pub struct ProcessCounters {
    pub pid: u32,
    pub status: StatusFields,
    pub times: ProbeResult<ProcessCpuTimes>,
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ProcFs {
            root: root.into(),
            ticks_per_second: None,
        }
    }

    /// Pins the tick rate instead of querying the runtime.
    pub fn with_ticks_per_second(mut self, ticks_per_second: Option<u64>) -> Self {
        self.ticks_per_second = ticks_per_second.filter(|&t| t > 0);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pid_dir(&self, pid: u32) -> PathBuf {
        self.root.join(pid.to_string())
    }

    pub fn read_system_counters(&self) -> ProbeResult<SystemCounters> {
        let path = self.root.join("stat");
        debug!(path = %path.display(), "reading system counters");
        let contents = fs::read_to_string(&path).map_err(|e| ProbeError::from_io(&path, e))?;
        parse_system_counters(&path, &contents)
    }

    /// Seconds since boot.
    pub fn read_uptime(&self) -> ProbeResult<f64> {
        let path = self.root.join("uptime");
        let contents = fs::read_to_string(&path).map_err(|e| ProbeError::from_io(&path, e))?;
        parse_uptime(&path, &contents)
    }

    pub fn ticks_per_second(&self) -> u64 {
        if let Some(rate) = self.ticks_per_second {
            return rate;
        }
        platform::ticks_per_second().unwrap_or_else(|| {
            warn!(
                fallback = platform::FALLBACK_TICKS_PER_SECOND,
                "clock tick rate unavailable, assuming default"
            );
            platform::FALLBACK_TICKS_PER_SECOND
        })
    }

    /// Captures tick rate and uptime together for one report.
    pub fn clock_context(&self) -> ProbeResult<ClockContext> {
        let ticks_per_second = self.ticks_per_second();
        let uptime_seconds = self.read_uptime()?;
        debug!(ticks_per_second, uptime_seconds, "captured clock context");
        Ok(ClockContext {
            ticks_per_second,
            uptime_seconds,
        })
    }

    pub fn read_process_status(&self, pid: u32) -> ProbeResult<StatusFields> {
        let path = self.pid_dir(pid).join("status");
        let contents =
            fs::read_to_string(&path).map_err(|e| ProbeError::from_process_io(pid, &path, e))?;
        Ok(parse_status(&contents))
    }

    pub fn read_process_times(&self, pid: u32) -> ProbeResult<ProcessCpuTimes> {
        let path = self.pid_dir(pid).join("stat");
        let contents =
            fs::read_to_string(&path).map_err(|e| ProbeError::from_process_io(pid, &path, e))?;
        parse_process_stat(&path, &contents)
    }

    /// Reads status and stat for `pid`. Fails only when the status record is
    /// unreadable; stat problems land in [`ProcessCounters::times`].
    pub fn read_process_counters(&self, pid: u32) -> ProbeResult<ProcessCounters> {
        debug!(pid, "reading process counters");
        let status = self.read_process_status(pid)?;
        let times = self.read_process_times(pid);
        Ok(ProcessCounters { pid, status, times })
    }
}

/// Parses `cpu  user nice system idle ...` from the first line.
pub fn parse_system_counters(path: &Path, contents: &str) -> ProbeResult<SystemCounters> {
    let line = contents
        .lines()
        .next()
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| ProbeError::parse(path, "missing aggregate cpu line"))?;

    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some(label) if label.parse::<u64>().is_err() => {}
        _ => return Err(ProbeError::parse(path, "missing label token")),
    }

    let mut values = [0u64; 4];
    for (i, slot) in values.iter_mut().enumerate() {
        let token = tokens.next().ok_or_else(|| {
            ProbeError::parse(path, format!("expected 4 counters, found {i}"))
        })?;
        *slot = token
            .parse()
            .map_err(|_| ProbeError::parse(path, format!("invalid counter '{token}'")))?;
    }

    let [user, nice, system, idle] = values;
    Ok(SystemCounters {
        user,
        nice,
        system,
        idle,
    })
}

pub fn parse_uptime(path: &Path, contents: &str) -> ProbeResult<f64> {
    let token = contents
        .split_whitespace()
        .next()
        .ok_or_else(|| ProbeError::parse(path, "empty uptime record"))?;
    let seconds: f64 = token
        .parse()
        .map_err(|_| ProbeError::parse(path, format!("invalid uptime '{token}'")))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ProbeError::parse(path, format!("invalid uptime '{token}'")));
    }
    Ok(seconds)
}

/// Keeps the `Name:`, `State:` and `VmRSS:` lines verbatim. Kernel threads
/// have no `VmRSS:` line, so every field is optional.
pub fn parse_status(contents: &str) -> StatusFields {
    let mut fields = StatusFields::default();
    for line in contents.lines() {
        let slot = if line.starts_with(NAME_KEY) {
            &mut fields.name
        } else if line.starts_with(STATE_KEY) {
            &mut fields.state
        } else if line.starts_with(VM_RSS_KEY) {
            &mut fields.vm_rss
        } else {
            continue;
        };
        if slot.is_none() {
            *slot = Some(line.to_string());
        }
    }
    fields
}

/// Extracts utime, stime and starttime from a stat record.
pub fn parse_process_stat(path: &Path, contents: &str) -> ProbeResult<ProcessCpuTimes> {
    let line = contents.lines().next().unwrap_or_default();
    // comm may contain spaces and parens, so count from the last ')'
    let after_comm = line
        .rfind(')')
        .map(|i| &line[i + 1..])
        .ok_or_else(|| ProbeError::parse(path, "missing command name field"))?;
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    if fields.len() <= STARTTIME_FIELD {
        return Err(ProbeError::parse(
            path,
            format!(
                "expected at least {} tokens, found {}",
                STARTTIME_FIELD + 3,
                fields.len() + 2
            ),
        ));
    }

    let field = |index: usize, name: &str| -> ProbeResult<u64> {
        fields[index]
            .parse()
            .map_err(|_| ProbeError::parse(path, format!("invalid {name} '{}'", fields[index])))
    };

    Ok(ProcessCpuTimes {
        utime: field(UTIME_FIELD, "utime")?,
        stime: field(STIME_FIELD, "stime")?,
        starttime: field(STARTTIME_FIELD, "starttime")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> &'static Path {
        Path::new("/proc/test")
    }

    /// Builds a stat line with every numeric field zero except the three
    /// the estimator reads.
    fn stat_line(comm: &str, utime: u64, stime: u64, starttime: u64) -> String {
        let mut fields = vec!["0".to_string(); 50];
        fields[0] = "S".to_string();
        fields[UTIME_FIELD] = utime.to_string();
        fields[STIME_FIELD] = stime.to_string();
        fields[STARTTIME_FIELD] = starttime.to_string();
        format!("1234 ({comm}) {}\n", fields.join(" "))
    }

    #[test]
    fn parses_aggregate_cpu_line() {
        let contents = "cpu  500 0 250 250 10 0 3 0 0 0\ncpu0 250 0 125 125 5 0 1 0 0 0\n";
        let counters = parse_system_counters(path(), contents).unwrap();
        assert_eq!(
            counters,
            SystemCounters {
                user: 500,
                nice: 0,
                system: 250,
                idle: 250,
            }
        );
        assert_eq!(counters.total(), 1000);
    }

    #[test]
    fn empty_stat_record_is_parse_error() {
        let err = parse_system_counters(path(), "").unwrap_err();
        assert!(matches!(err, ProbeError::Parse { .. }));
    }

    #[test]
    fn missing_label_is_parse_error() {
        let err = parse_system_counters(path(), "500 0 250 250\n").unwrap_err();
        assert!(err.to_string().contains("missing label"));
    }

    #[test]
    fn short_cpu_line_is_parse_error() {
        let err = parse_system_counters(path(), "cpu 1 2 3\n").unwrap_err();
        assert!(err.to_string().contains("expected 4 counters, found 3"));
    }

    #[test]
    fn non_numeric_counter_is_parse_error() {
        let err = parse_system_counters(path(), "cpu 1 2 x 4\n").unwrap_err();
        assert!(err.to_string().contains("invalid counter 'x'"));
    }

    #[test]
    fn parses_uptime_first_field() {
        let uptime = parse_uptime(path(), "350735.47 234388.90\n").unwrap();
        assert!((uptime - 350_735.47).abs() < 1e-6);
    }

    #[test]
    fn status_lines_are_kept_verbatim() {
        let contents = "Name:\tsystemd\nUmask:\t0000\nState:\tS (sleeping)\nTgid:\t1\nVmRSS:\t   12345 kB\nThreads:\t1\n";
        let status = parse_status(contents);
        assert_eq!(status.name.as_deref(), Some("Name:\tsystemd"));
        assert_eq!(status.state.as_deref(), Some("State:\tS (sleeping)"));
        assert_eq!(status.vm_rss.as_deref(), Some("VmRSS:\t   12345 kB"));
        assert_eq!(status.lines().count(), 3);
    }

    #[test]
    fn kernel_thread_status_has_no_rss() {
        let status = parse_status("Name:\tkthreadd\nState:\tS (sleeping)\n");
        assert!(status.vm_rss.is_none());
        assert_eq!(
            status.lines().collect::<Vec<_>>(),
            vec!["Name:\tkthreadd", "State:\tS (sleeping)"]
        );
    }

    #[test]
    fn parses_stat_times() {
        let times = parse_process_stat(path(), &stat_line("bash", 100, 50, 1000)).unwrap();
        assert_eq!(
            times,
            ProcessCpuTimes {
                utime: 100,
                stime: 50,
                starttime: 1000,
            }
        );
    }

    #[test]
    fn comm_with_spaces_and_parens_does_not_shift_fields() {
        let times =
            parse_process_stat(path(), &stat_line("Web Content (x)", 7, 3, 42)).unwrap();
        assert_eq!(times.utime, 7);
        assert_eq!(times.stime, 3);
        assert_eq!(times.starttime, 42);
    }

    #[test]
    fn short_stat_record_is_parse_error() {
        // 21 whole-line tokens: one short of starttime
        let line = format!("1 (init) S {}", vec!["0"; 18].join(" "));
        assert_eq!(line.split_whitespace().count(), 21);
        let err = parse_process_stat(path(), &line).unwrap_err();
        assert!(matches!(err, ProbeError::Parse { .. }));
        assert!(err.to_string().contains("found 21"));
    }

    #[test]
    fn exactly_twenty_two_tokens_is_enough() {
        let mut fields = vec!["0"; 18];
        fields[UTIME_FIELD - 1] = "9";
        let line = format!("1 (init) S {} 77", fields.join(" "));
        assert_eq!(line.split_whitespace().count(), 22);
        let times = parse_process_stat(path(), &line).unwrap();
        assert_eq!(times.utime, 9);
        assert_eq!(times.starttime, 77);
    }

    #[test]
    fn stat_without_comm_is_parse_error() {
        let err = parse_process_stat(path(), "1 init S 0 0").unwrap_err();
        assert!(err.to_string().contains("missing command name"));
    }
}
