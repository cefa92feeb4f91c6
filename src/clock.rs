//! Time sources for the windowed sampler.
//!
//! Window alignment is performed against the Unix epoch, so the clock
//! trades in [`SystemTime`] rather than the monotonic `Instant`. Only
//! whole-second arithmetic is required of implementations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A source of timestamps for sampler operations that were not handed
/// an explicit one.
pub trait Clock: Send + Sync {
    /// The current time as this clock sees it. Must be non-decreasing
    /// across calls from a single logical producer.
    fn now(&self) -> SystemTime;
}

/// The wall clock. This is the default time source.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A hand-advanced clock for deterministic tests.
///
/// Starts at the Unix epoch and only moves when told to.
///
/// # Examples
/// ```
/// use std::time::{Duration, UNIX_EPOCH};
/// use windowed_quantiles::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// assert_eq!(clock.now(), UNIX_EPOCH);
/// clock.advance(Duration::from_secs(42));
/// assert_eq!(clock.now(), UNIX_EPOCH + Duration::from_secs(42));
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    offset_secs: AtomicU64,
}

impl ManualClock {
    /// A clock sitting at the Unix epoch.
    pub fn new() -> ManualClock {
        ManualClock::default()
    }

    /// Move the clock forward by `step`, truncated to whole seconds.
    pub fn advance(&self, step: Duration) {
        self.offset_secs.fetch_add(step.as_secs(), Ordering::Relaxed);
    }

    /// Park the clock at `since_epoch` past the Unix epoch, truncated
    /// to whole seconds.
    pub fn set(&self, since_epoch: Duration) {
        self.offset_secs.store(since_epoch.as_secs(), Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.offset_secs.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn manual_clock_advances_and_sets() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), UNIX_EPOCH);

        clock.advance(Duration::from_secs(10));
        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now(), UNIX_EPOCH + Duration::from_secs(15));

        clock.set(Duration::from_secs(3));
        assert_eq!(clock.now(), UNIX_EPOCH + Duration::from_secs(3));
    }
}
