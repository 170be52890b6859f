//! Sequences the report sections and formats them as plain text.
//!
//! Sections are independent: a failure is written inline in place of the
//! section's data, echoed to the error stream, and the next section runs.

use std::fmt::Write as _;
use std::io::{self, Write};

use clap::ValueEnum;
use tracing::{debug, warn};

use crate::config::Config;
use crate::format::{format_megabytes, format_percent, truncate_unicode};
use crate::system::cpu::system_usage_percent;
use crate::system::process::{Inspector, ProcessIdentity};
use crate::system::procfs::ProcFs;
use crate::system::relay::ToolRelay;
use crate::system::summary::SummarySource;
use crate::system::{ProbeError, ProbeResult};

const BANNER: &str = "=== System Information Tool ===";
const SECTION_RULE: &str = "=========================";
const PID_COLUMN_WIDTH: usize = 10;
const NAME_COLUMN_WIDTH: usize = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum Section {
    #[value(name = "system")]
    SystemInfo,
    #[value(name = "cpu")]
    CpuUsage,
    Processes,
    #[value(name = "process")]
    ProcessDetail,
    Network,
    Hardware,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::SystemInfo,
        Section::CpuUsage,
        Section::Processes,
        Section::ProcessDetail,
        Section::Network,
        Section::Hardware,
    ];

    pub fn title(self, pid: u32) -> String {
        match self {
            Section::SystemInfo => "System Information".to_string(),
            Section::CpuUsage => "CPU Usage".to_string(),
            Section::Processes => "Running Processes".to_string(),
            Section::ProcessDetail => format!("Process Details (PID: {pid})"),
            Section::Network => "Network Information".to_string(),
            Section::Hardware => "Hardware Information".to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ReportOutcome {
    pub failed: Vec<Section>,
}

impl ReportOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A rendered section body plus the errors met while producing it.
#[derive(Default)]
struct Rendered {
    body: String,
    /// Errors that cost the section some or all of its data.
    failures: Vec<ProbeError>,
    /// Errors worth reporting that still left a complete section.
    notes: Vec<ProbeError>,
}

impl Rendered {
    fn failed(err: ProbeError) -> Self {
        Rendered {
            body: format!("Unavailable: {err}\n"),
            failures: vec![err],
            ..Rendered::default()
        }
    }
}

impl From<ProbeResult<String>> for Rendered {
    fn from(result: ProbeResult<String>) -> Self {
        match result {
            Ok(body) => Rendered {
                body,
                ..Rendered::default()
            },
            Err(err) => Rendered::failed(err),
        }
    }
}

pub struct ReportDriver<'a, S, R> {
    procfs: &'a ProcFs,
    summary: S,
    relay: R,
    config: &'a Config,
    skip: Vec<Section>,
}

impl<'a, S: SummarySource, R: ToolRelay> ReportDriver<'a, S, R> {
    pub fn new(procfs: &'a ProcFs, summary: S, relay: R, config: &'a Config) -> Self {
        ReportDriver {
            procfs,
            summary,
            relay,
            config,
            skip: Vec::new(),
        }
    }

    pub fn skip(mut self, sections: impl IntoIterator<Item = Section>) -> Self {
        self.skip.extend(sections);
        self
    }

    /// Writes the whole report to `out` and diagnostics to `err`. Only write
    /// failures on those streams are returned as errors.
    pub async fn run<W: Write, E: Write>(
        &mut self,
        out: &mut W,
        err: &mut E,
    ) -> io::Result<ReportOutcome> {
        let pid = self.config.general.pid;
        let mut outcome = ReportOutcome::default();

        writeln!(out, "{BANNER}")?;
        writeln!(out)?;

        for section in Section::ALL {
            if self.skip.contains(&section) {
                debug!(?section, "section skipped");
                continue;
            }
            debug!(?section, "rendering section");
            let title = section.title(pid);
            let rendered = self.render(section).await;

            writeln!(out, "=== {title} ===")?;
            out.write_all(rendered.body.as_bytes())?;
            writeln!(out, "{SECTION_RULE}")?;
            writeln!(out)?;

            for failure in &rendered.failures {
                warn!(?section, error = %failure, "section failed");
                writeln!(err, "Error: {title}: {failure}")?;
            }
            for note in &rendered.notes {
                writeln!(err, "Error: {title}: {note}")?;
            }
            if !rendered.failures.is_empty() {
                outcome.failed.push(section);
            }
        }

        out.flush()?;
        Ok(outcome)
    }

    async fn render(&mut self, section: Section) -> Rendered {
        match section {
            Section::SystemInfo => self.system_info().into(),
            Section::CpuUsage => self.cpu_usage().into(),
            Section::Processes => self.process_listing().into(),
            Section::ProcessDetail => self.process_detail(),
            Section::Network => {
                let tools = &self.config.tools;
                let commands = [
                    ("Active Connections", tools.connections.as_str()),
                    ("Firewall Rules", tools.firewall.as_str()),
                ];
                relay_all(&self.relay, &commands).await
            }
            Section::Hardware => {
                let tools = &self.config.tools;
                let commands = [
                    ("GPU Information", tools.gpu.as_str()),
                    ("Disk Information", tools.disks.as_str()),
                    ("CPU Temperature", tools.temperature.as_str()),
                ];
                relay_all(&self.relay, &commands).await
            }
        }
    }

    fn system_info(&mut self) -> ProbeResult<String> {
        let summary = self.summary.summary()?;
        let mut body = String::new();
        let _ = writeln!(body, "Total RAM: {}", format_megabytes(summary.memory_total));
        let _ = writeln!(body, "Free RAM: {}", format_megabytes(summary.memory_free));
        let _ = writeln!(body, "Number of CPUs: {}", summary.cpu_count);
        Ok(body)
    }

    fn cpu_usage(&self) -> ProbeResult<String> {
        let counters = self.procfs.read_system_counters()?;
        let usage = system_usage_percent(&counters);
        debug!(?counters, usage, "system cpu usage");
        Ok(format!("CPU Usage: {}\n", format_percent(usage)))
    }

    fn process_listing(&self) -> ProbeResult<String> {
        let mut processes: Vec<ProcessIdentity> = self.procfs.processes()?.collect();
        if self.config.general.sort_processes {
            processes.sort_unstable_by_key(|p| p.pid);
        }
        debug!(count = processes.len(), "enumerated processes");

        let mut body = String::new();
        let _ = writeln!(body, "{:<w$}Process Name", "PID", w = PID_COLUMN_WIDTH);
        let _ = writeln!(body, "{}", "-".repeat(PID_COLUMN_WIDTH + NAME_COLUMN_WIDTH));
        for process in &processes {
            let _ = writeln!(
                body,
                "{:<w$}{}",
                process.pid,
                truncate_unicode(&process.name, NAME_COLUMN_WIDTH),
                w = PID_COLUMN_WIDTH
            );
        }
        Ok(body)
    }

    fn process_detail(&self) -> Rendered {
        let pid = self.config.general.pid;
        let inspector = Inspector::new(self.procfs, self.procfs.clock_context());
        let report = match inspector.inspect(pid) {
            Ok(report) => report,
            Err(err) => return Rendered::failed(err),
        };

        let mut rendered = Rendered::default();
        for line in report.status.lines() {
            let _ = writeln!(rendered.body, "{line}");
        }
        if let Some(percent) = report.cpu_percent {
            let _ = writeln!(rendered.body, "CPU Usage: {}", format_percent(percent));
        }
        rendered.notes.extend(report.cpu_error);
        rendered
    }
}

/// Runs each labelled command in turn; one failing tool does not stop the rest.
/// Stderr from a tool that did run becomes a note, its stdout is still shown.
async fn relay_all<R: ToolRelay>(relay: &R, commands: &[(&str, &str)]) -> Rendered {
    let mut rendered = Rendered::default();
    for &(label, command) in commands {
        let _ = writeln!(rendered.body, "{label}:");
        match relay.run(command).await {
            Ok(output) => {
                let text = &output.stdout;
                rendered.body.push_str(text);
                if !text.is_empty() && !text.ends_with('\n') {
                    rendered.body.push('\n');
                }
                if let Some(note) = output.diagnostic(command) {
                    debug!(command, status = ?output.status, "tool wrote to stderr");
                    rendered.notes.push(note);
                }
            }
            Err(err) => {
                let _ = writeln!(rendered.body, "Unavailable: {err}");
                rendered.failures.push(err);
            }
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_follow_report_order() {
        let titles: Vec<String> = Section::ALL.iter().map(|s| s.title(1)).collect();
        assert_eq!(
            titles,
            vec![
                "System Information",
                "CPU Usage",
                "Running Processes",
                "Process Details (PID: 1)",
                "Network Information",
                "Hardware Information",
            ]
        );
    }

    #[test]
    fn skip_names_parse() {
        assert_eq!(Section::from_str("system", true), Ok(Section::SystemInfo));
        assert_eq!(Section::from_str("process", true), Ok(Section::ProcessDetail));
        assert_eq!(Section::from_str("hardware", true), Ok(Section::Hardware));
        assert!(Section::from_str("gpu", true).is_err());
    }

    #[test]
    fn failed_result_renders_unavailable_line() {
        let rendered = Rendered::failed(ProbeError::ProcessNotFound { pid: 9 });
        assert_eq!(rendered.body, "Unavailable: process 9 not found\n");
        assert_eq!(rendered.failures.len(), 1);
    }
}
