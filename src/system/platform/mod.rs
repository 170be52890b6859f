/// Kernel tick rate assumed when the runtime query fails (`USER_HZ`).
pub const FALLBACK_TICKS_PER_SECOND: u64 = 100;

pub trait ClockExtensions {
    /// Clock ticks per second used by the procfs counters, if the runtime
    /// can report it.
    fn ticks_per_second() -> Option<u64>;
}

#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(target_os = "linux"))]
mod unsupported;

#[cfg(target_os = "linux")]
use linux as platform_impl;
#[cfg(not(target_os = "linux"))]
use unsupported as platform_impl;

pub fn ticks_per_second() -> Option<u64> {
    platform_impl::Platform::ticks_per_second()
}
