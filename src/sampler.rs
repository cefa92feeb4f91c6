//! Rolling two-bucket window over a pair of sketches.
//!
//! A naive sketch accumulates forever, so its quantiles drift toward
//! all-time history. The sampler here restricts influence to recent
//! data by partitioning time into fixed-width windows aligned to the
//! Unix epoch and keeping exactly two of them live: the window
//! currently filling and the one just completed. Readers are always
//! served the completed window, which gives stable, non-partial
//! results and avoids flicker while the current bucket fills.

use std::mem;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::ckms::{default_targets, Ckms};
use crate::clock::{Clock, SystemClock};
use crate::error::Error;
use crate::snapshot::Snapshot;

/// Stock window width: thirty seconds.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(30);

/// The sampling surface a metrics collaborator consumes.
///
/// The `_at` variants take explicit timestamps for deterministic
/// replay and testing; the plain variants read the implementation's
/// clock. All methods take `&self` so an implementor can sit behind a
/// shared reference in a registry.
pub trait Sampler {
    /// Drop all recorded state.
    fn clear(&self);

    /// Number of observations a snapshot taken now would represent.
    fn size(&self) -> u64;

    /// Number of observations a snapshot taken at `timestamp` would
    /// represent.
    fn size_at(&self, timestamp: SystemTime) -> u64;

    /// Record `value` now.
    fn update(&self, value: i64);

    /// Record `value` as having been observed at `timestamp`.
    fn update_at(&self, value: i64, timestamp: SystemTime);

    /// An immutable view of the distribution as of now.
    fn snapshot(&self) -> Snapshot;

    /// An immutable view of the distribution as of `timestamp`.
    fn snapshot_at(&self, timestamp: SystemTime) -> Snapshot;
}

// The pair of live buckets plus the left edge of the filling one,
// guarded as a unit by the sampler's mutex.
#[derive(Debug)]
struct Windows {
    prev: Ckms,
    cur: Ckms,
    cur_begin: SystemTime,
}

/// A [`Sampler`] feeding a rotating pair of [`Ckms`] sketches.
///
/// Updates land in the current window's sketch; snapshots read the
/// previous, completed window. Updates dated before the current window
/// began are silently dropped, and a gap of two or more windows with
/// no traffic discards both buckets.
///
/// # Examples
/// ```
/// use std::time::{Duration, UNIX_EPOCH};
/// use windowed_quantiles::{Sampler, WindowedSampler};
///
/// let sampler = WindowedSampler::new(Duration::from_secs(30)).unwrap();
/// for i in 0..10 {
///     sampler.update_at(42, UNIX_EPOCH + Duration::from_secs(i));
/// }
/// // 35 s is inside the second window, so the snapshot covers the
/// // first one.
/// let snapshot = sampler.snapshot_at(UNIX_EPOCH + Duration::from_secs(35));
/// assert_eq!(snapshot.size(), 10);
/// assert_eq!(snapshot.median(), 42.0);
/// ```
#[derive(Debug)]
pub struct WindowedSampler<C = SystemClock> {
    clock: C,
    window_size: Duration,
    inner: Mutex<Windows>,
}

impl WindowedSampler<SystemClock> {
    /// A sampler over the wall clock with the stock quantile targets.
    ///
    /// `window_size` is truncated to whole seconds and must be at
    /// least one second.
    pub fn new(window_size: Duration) -> Result<WindowedSampler, Error> {
        WindowedSampler::build(window_size, Ckms::from_targets(default_targets()), SystemClock)
    }

    /// A sampler over the wall clock tracking custom quantile targets.
    pub fn with_quantiles(
        window_size: Duration,
        targets: &[(f64, f64)],
    ) -> Result<WindowedSampler, Error> {
        WindowedSampler::build(window_size, Ckms::new(targets)?, SystemClock)
    }
}

impl<C: Clock> WindowedSampler<C> {
    /// A sampler over a caller-provided clock with the stock quantile
    /// targets.
    pub fn with_clock(window_size: Duration, clock: C) -> Result<WindowedSampler<C>, Error> {
        WindowedSampler::build(window_size, Ckms::from_targets(default_targets()), clock)
    }

    fn build(
        window_size: Duration,
        template: Ckms,
        clock: C,
    ) -> Result<WindowedSampler<C>, Error> {
        let window_size = Duration::from_secs(window_size.as_secs());
        if window_size.is_zero() {
            return Err(Error::InvalidArgument(
                "window size must be at least one second",
            ));
        }
        Ok(WindowedSampler {
            clock,
            window_size,
            inner: Mutex::new(Windows {
                prev: template.clone(),
                cur: template,
                cur_begin: UNIX_EPOCH,
            }),
        })
    }

    /// The configured window width.
    pub fn window_size(&self) -> Duration {
        self.window_size
    }

    /// Like [`Sampler::snapshot_at`], with all reported values divided
    /// by `divisor`.
    pub fn snapshot_with_divisor(&self, timestamp: SystemTime, divisor: u64) -> Snapshot {
        let mut windows = self.inner.lock();
        if self.advance_windows(&mut windows, timestamp) {
            Snapshot::from_sketch_with_divisor(&windows.prev, divisor)
        } else {
            Snapshot::from_values_with_divisor(Vec::new(), divisor)
        }
    }

    // Left edge of the window containing `timestamp`, aligned to the
    // epoch.
    fn window_start(&self, timestamp: SystemTime) -> SystemTime {
        let since_epoch = timestamp
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        UNIX_EPOCH + Duration::from_secs(since_epoch - since_epoch % self.window_size.as_secs())
    }

    // Bring the bucket pair up to date with `timestamp`. Returns false
    // for timestamps before the current window, which are not
    // rewritable.
    fn advance_windows(&self, windows: &mut Windows, timestamp: SystemTime) -> bool {
        if timestamp < windows.cur_begin {
            return false;
        }

        let next_begin = windows.cur_begin + self.window_size;
        if timestamp < next_begin {
            return true;
        }

        if timestamp < next_begin + self.window_size {
            // The filling window is complete; it becomes the readable
            // one.
            trace!("rotating sample window");
            mem::swap(&mut windows.prev, &mut windows.cur);
            windows.cur.reset();
            windows.cur_begin = next_begin;
        } else {
            // No traffic for at least two whole windows. Nothing live
            // remains representative.
            debug!("sample gap exceeded two windows, dropping both buckets");
            windows.prev.reset();
            windows.cur.reset();
            windows.cur_begin = self.window_start(timestamp);
        }
        true
    }
}

impl<C: Clock> Sampler for WindowedSampler<C> {
    fn clear(&self) {
        let mut windows = self.inner.lock();
        windows.prev.reset();
        windows.cur.reset();
        windows.cur_begin = UNIX_EPOCH;
    }

    fn size(&self) -> u64 {
        self.size_at(self.clock.now())
    }

    fn size_at(&self, timestamp: SystemTime) -> u64 {
        self.snapshot_at(timestamp).size()
    }

    fn update(&self, value: i64) {
        self.update_at(value, self.clock.now());
    }

    fn update_at(&self, value: i64, timestamp: SystemTime) {
        let mut windows = self.inner.lock();
        if self.advance_windows(&mut windows, timestamp) {
            windows.cur.insert(value as f64);
        }
    }

    fn snapshot(&self) -> Snapshot {
        self.snapshot_at(self.clock.now())
    }

    fn snapshot_at(&self, timestamp: SystemTime) -> Snapshot {
        self.snapshot_with_divisor(timestamp, 1)
    }
}
