//! CPU usage estimation from cumulative kernel tick counters.
//!
//! Everything here is pure arithmetic over values already read from procfs.
//! Degenerate inputs such as zero total ticks, a process that started
//! "after" the uptime sample, or an unknown tick rate produce `0.0` so that
//! no NaN or infinity ever reaches the report.

/// Aggregate time-in-state counters from the first line of the system stat
/// record, in clock ticks since boot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemCounters {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
}

impl SystemCounters {
    pub fn total(&self) -> u64 {
        self.user
            .saturating_add(self.nice)
            .saturating_add(self.system)
            .saturating_add(self.idle)
    }
}

/// Per-process tick counters from the stat record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessCpuTimes {
    /// Ticks scheduled in user mode.
    pub utime: u64,
    /// Ticks scheduled in kernel mode.
    pub stime: u64,
    /// Process start, in ticks after boot.
    pub starttime: u64,
}

impl ProcessCpuTimes {
    pub fn total_ticks(&self) -> u64 {
        self.utime.saturating_add(self.stime)
    }
}

/// Tick rate and uptime captured together, once per report.
///
/// Per-process estimates compare a start time in ticks against uptime in
/// seconds, so both must come from the same capture to stay consistent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockContext {
    pub ticks_per_second: u64,
    pub uptime_seconds: f64,
}

impl ClockContext {
    pub fn ticks_to_seconds(&self, ticks: u64) -> f64 {
        if self.ticks_per_second == 0 {
            return 0.0;
        }
        ticks as f64 / self.ticks_per_second as f64
    }

    /// Seconds the process has existed, as seen from this capture.
    pub fn elapsed_since(&self, starttime_ticks: u64) -> f64 {
        self.uptime_seconds - self.ticks_to_seconds(starttime_ticks)
    }
}

/// Share of non-idle time since boot, in percent. Zero total ticks yields 0.0.
pub fn system_usage_percent(counters: &SystemCounters) -> f64 {
    let total = counters.total();
    if total == 0 {
        return 0.0;
    }
    let usage = 100.0 - (counters.idle as f64 * 100.0 / total as f64);
    // idle <= total, so anything outside the range is float rounding
    usage.clamp(0.0, 100.0)
}

/// Average CPU share of a process over its lifetime, in percent.
///
/// Unbounded above: a multi-threaded process can exceed 100. Returns 0.0
/// when the elapsed time is not positive or the tick rate is unknown.
pub fn process_usage_percent(times: &ProcessCpuTimes, clock: &ClockContext) -> f64 {
    if clock.ticks_per_second == 0 {
        return 0.0;
    }
    let elapsed = clock.elapsed_since(times.starttime);
    if !elapsed.is_finite() || elapsed <= 0.0 {
        return 0.0;
    }
    let cpu_seconds = clock.ticks_to_seconds(times.total_ticks());
    let usage = 100.0 * (cpu_seconds / elapsed);
    if usage.is_finite() { usage } else { 0.0 }
}
