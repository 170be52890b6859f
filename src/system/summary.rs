use std::path::Path;

use sysinfo::System;

use super::error::{ProbeError, ProbeResult};

/// Host-wide memory and CPU totals for the summary section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemSummary {
    pub memory_total: u64,
    pub memory_free: u64,
    pub cpu_count: usize,
}

pub trait SummarySource {
    fn summary(&mut self) -> ProbeResult<SystemSummary>;
}

/// Fixed values, used when the caller already has the numbers.
impl SummarySource for SystemSummary {
    fn summary(&mut self) -> ProbeResult<SystemSummary> {
        Ok(self.clone())
    }
}

pub struct SysinfoSummary {
    sys: System,
}

impl Default for SysinfoSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoSummary {
    pub fn new() -> Self {
        SysinfoSummary { sys: System::new() }
    }
}

impl SummarySource for SysinfoSummary {
    fn summary(&mut self) -> ProbeResult<SystemSummary> {
        self.sys.refresh_memory();
        self.sys.refresh_cpu_all();

        let memory_total = self.sys.total_memory();
        if memory_total == 0 {
            return Err(ProbeError::parse(
                Path::new("/proc/meminfo"),
                "total memory reported as zero",
            ));
        }

        Ok(SystemSummary {
            memory_total,
            memory_free: self.sys.free_memory(),
            cpu_count: self.sys.cpus().len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_summary_returns_itself() {
        let mut fixed = SystemSummary {
            memory_total: 8,
            memory_free: 2,
            cpu_count: 4,
        };
        assert_eq!(fixed.summary().unwrap(), fixed.clone());
    }

    #[test]
    fn host_summary_is_consistent() {
        let mut source = SysinfoSummary::new();
        if let Ok(summary) = source.summary() {
            assert!(summary.memory_free <= summary.memory_total);
        }
    }
}
