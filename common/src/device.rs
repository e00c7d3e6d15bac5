//! Device level collaborators: wall clock, blocking sleep and reset.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Source of wall clock time for sample timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// System time shifted to the configured local timezone.
///
/// The system time itself is synchronized once during setup (SNTP on the
/// device) and never touched by the loop.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Clock for a whole-hour offset east of UTC. Out of range offsets fall
    /// back to UTC.
    pub fn with_offset_hours(hours: i32) -> Self {
        let offset = hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                log::warn!("Timezone offset {hours}h out of range, using UTC");
                Self::utc_offset()
            });

        Self::new(offset)
    }

    fn utc_offset() -> FixedOffset {
        Utc.fix()
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(Self::utc_offset())
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Blocking sleep.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Unconditional restart of the whole device.
///
/// On hardware this does not return. Hosts that cannot restart the process
/// return, and are then expected to rebuild every component from scratch.
pub trait DeviceReset {
    fn reset(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_applies_offset() {
        let clock = SystemClock::with_offset_hours(-5);
        assert_eq!(clock.now().offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn out_of_range_offset_is_utc() {
        let clock = SystemClock::with_offset_hours(30);
        assert_eq!(clock.now().offset().local_minus_utc(), 0);
    }
}
