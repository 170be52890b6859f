use super::ClockExtensions;

pub struct Platform;

impl ClockExtensions for Platform {
    fn ticks_per_second() -> Option<u64> {
        // SAFETY: sysconf only reads a runtime constant.
        let rate = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        u64::try_from(rate).ok().filter(|&r| r > 0)
    }
}
