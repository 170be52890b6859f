use super::ClockExtensions;

pub struct Platform;

impl ClockExtensions for Platform {
    fn ticks_per_second() -> Option<u64> {
        None
    }
}
