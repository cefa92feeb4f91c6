//! Biased quantile estimation over unbounded streams.
//!
//! This module implements the targeted-quantile variant of Cormode,
//! Korn, Muthukrishnan and Srivastava's "Effective Computation of
//! Biased Quantiles over Data Streams". Rather than holding every
//! observation, the sketch keeps a compressed summary whose rank error
//! is tightest around a configured set of target quantiles and looser
//! everywhere else. Memory stays sublinear in the stream length at the
//! price of ε-approximate answers.
//!
//! Insertion follows the batch method: raw observations land in a
//! bounded scratch buffer and are folded into the sorted summary either
//! when the buffer fills or when a query arrives. Each fold is chased
//! by a single compression pass that merges neighboring summary tuples
//! wherever the bias function permits.

use std::sync::Arc;

#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};
use tracing::debug;

mod entry;

pub(crate) use self::entry::default_targets;
use self::entry::Entry;
pub use self::entry::Quantile;

use crate::error::Error;

/// Capacity of the pending-observation buffer. Hitting it triggers one
/// fold-and-compress cycle, which bounds both the scratch memory and
/// the worst-case latency of a single insert.
pub const BUFFER_CAP: usize = 500;

/// A streaming sketch answering quantile queries within a per-target
/// error bound.
///
/// Alongside the quantile summary the sketch tracks exact lifetime
/// aggregates of everything it has seen: count, min, max, sum, and
/// running variance moments. Those are exact because they need O(1)
/// state; only rank queries are approximate.
///
/// A sketch is not safe for concurrent mutation. Wrap it in a
/// [`WindowedSampler`](crate::WindowedSampler) or provide external
/// synchronization.
///
/// # Examples
/// ```
/// use windowed_quantiles::Ckms;
///
/// let mut sketch = Ckms::default();
/// for _ in 0..100 {
///     sketch.insert(25.0);
/// }
/// assert_eq!(sketch.get(0.5), 25.0);
/// assert_eq!(sketch.get(0.99), 25.0);
/// assert_eq!(sketch.count(), 100);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct Ckms {
    targets: Arc<[Quantile]>,

    // Observations already folded into `samples`. The public count()
    // also includes whatever is still sitting in the buffer.
    merged: u64,

    // The summary proper, sorted non-decreasing by value. A Vec wins
    // over the paper's linked list on cache locality, and the batch
    // fold amortizes the shifting cost.
    samples: Vec<Entry>,

    // Raw observations awaiting a fold, unsorted until then.
    buffer: Vec<f64>,

    // Lifetime aggregates, maintained on every insert regardless of
    // buffering. `welford_mean`/`welford_sq` are the online variance
    // moments.
    min: f64,
    max: f64,
    sum: f64,
    welford_mean: f64,
    welford_sq: f64,
}

impl Default for Ckms {
    /// A sketch tracking the stock targets, P99 and P50 within 0.1%.
    fn default() -> Ckms {
        Ckms::from_targets(default_targets())
    }
}

impl Ckms {
    /// Create a sketch tracking the given `(quantile, error)` pairs.
    ///
    /// The list must be non-empty, every quantile in `(0, 1]` and
    /// every error in `[0, 1)`; anything else is an
    /// [`Error::InvalidArgument`].
    ///
    /// # Examples
    /// ```
    /// use windowed_quantiles::Ckms;
    ///
    /// let sketch = Ckms::new(&[(0.5, 0.001), (0.9, 0.001), (0.99, 0.0005)]).unwrap();
    /// assert_eq!(sketch.count(), 0);
    /// assert!(Ckms::new(&[]).is_err());
    /// ```
    pub fn new(targets: &[(f64, f64)]) -> Result<Ckms, Error> {
        if targets.is_empty() {
            return Err(Error::InvalidArgument(
                "at least one quantile target is required",
            ));
        }
        let targets = targets
            .iter()
            .map(|&(q, e)| Quantile::new(q, e))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Ckms::from_targets(targets.into()))
    }

    pub(crate) fn from_targets(targets: Arc<[Quantile]>) -> Ckms {
        Ckms {
            targets,
            merged: 0,
            samples: Vec::new(),
            buffer: Vec::with_capacity(BUFFER_CAP),
            min: 0.0,
            max: 0.0,
            sum: 0.0,
            welford_mean: 0.0,
            welford_sq: 0.0,
        }
    }

    /// The quantile targets this sketch was built with.
    pub fn targets(&self) -> &[Quantile] {
        &self.targets
    }

    /// Absorb one observation.
    ///
    /// Non-finite values would corrupt the sorted summary, so NaN and
    /// the infinities are discarded. Everything else is accepted;
    /// insertion itself never fails.
    pub fn insert(&mut self, value: f64) {
        if !value.is_finite() {
            debug!(value, "discarding non-finite observation");
            return;
        }
        self.update_aggregates(value);
        self.buffer.push(value);
        if self.buffer.len() == BUFFER_CAP {
            self.insert_batch();
            self.compress();
        }
    }

    /// Answer an ε-approximate query at quantile `q`.
    ///
    /// The error bound holds for the configured targets; any other `q`
    /// is answered best-effort. An empty sketch answers 0.
    ///
    /// Querying drains the pending buffer, so this takes `&mut self`.
    pub fn get(&mut self, q: f64) -> f64 {
        self.flush();
        self.query_merged(q)
    }

    /// Restore the freshly-constructed state, keeping the targets.
    pub fn reset(&mut self) {
        self.merged = 0;
        self.samples.clear();
        self.buffer.clear();
        self.min = 0.0;
        self.max = 0.0;
        self.sum = 0.0;
        self.welford_mean = 0.0;
        self.welford_sq = 0.0;
    }

    /// Number of observations absorbed, buffered or folded.
    pub fn count(&self) -> u64 {
        self.merged + self.buffer.len() as u64
    }

    /// True when nothing has been observed since construction or the
    /// last reset.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Smallest observation seen, 0 when empty.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest observation seen, 0 when empty.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Sum of all observations seen.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Arithmetic mean of all observations seen, 0 when empty.
    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum / count as f64
        }
    }

    /// Sample variance of all observations seen, 0 below two
    /// observations.
    pub fn variance(&self) -> f64 {
        let count = self.count();
        if count > 1 {
            self.welford_sq / (count - 1) as f64
        } else {
            0.0
        }
    }

    /// Sample standard deviation of all observations seen.
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Fold buffered observations into the summary and compress.
    pub(crate) fn flush(&mut self) {
        self.insert_batch();
        self.compress();
    }

    /// The query walk over the folded summary. Callers must have
    /// drained the buffer first; [`get`](Ckms::get) does, and a
    /// snapshot drains once at creation.
    pub(crate) fn query_merged(&self, q: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }

        let desired = (q * self.merged as f64) as u64;
        let bound = desired as f64 + self.allowable_error(desired as usize) / 2.0;

        let mut rank_min = 0u64;
        for i in 1..self.samples.len() {
            let prev = &self.samples[i - 1];
            let cur = &self.samples[i];

            rank_min += prev.g;

            if (rank_min + cur.g + cur.delta) as f64 > bound {
                return prev.value;
            }
        }

        self.samples[self.samples.len() - 1].value
    }

    // The bias function f(rank): the loosest rank slack any target will
    // tolerate at this rank, given the current summary size. An empty
    // summary tolerates size + 1. A NaN branch value (an infinite-u
    // target evaluated exactly at the summary size) loses the strict
    // comparison and is skipped.
    fn allowable_error(&self, rank: usize) -> f64 {
        let size = self.samples.len();
        let mut min_error = (size + 1) as f64;

        for target in self.targets.iter() {
            let error = if rank as f64 <= target.quantile() * size as f64 {
                target.u * (size - rank) as f64
            } else {
                target.v * rank as f64
            };
            if error < min_error {
                min_error = error;
            }
        }

        min_error
    }

    // Fold the buffer into the summary with the cursor method: sort
    // the buffer, then advance a single index pair through the summary
    // as the (now ascending) buffered values are placed. The boundary
    // test granting delta = 0 is `idx == 1`, not `idx == 0`; an entry
    // placed at the very front of a multi-entry summary is charged the
    // full slack. Historical behavior, load-bearing for compression
    // accounting downstream.
    fn insert_batch(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        self.buffer.sort_by(|a, b| a.total_cmp(b));

        let mut start = 0;
        if self.samples.is_empty() {
            self.samples.push(Entry {
                value: self.buffer[0],
                g: 1,
                delta: 0,
            });
            start = 1;
            self.merged += 1;
        }

        let mut idx = 1usize;
        let mut item = 0usize;

        for i in start..self.buffer.len() {
            let v = self.buffer[i];
            while idx < self.samples.len() && self.samples[item].value < v {
                item = idx;
                idx += 1;
            }

            if self.samples[item].value > v {
                idx -= 1;
            }

            let delta = if idx == 1 || idx + 1 == self.samples.len() {
                0
            } else {
                self.allowable_error(idx + 1).floor() as u64 + 1
            };

            self.samples.insert(idx, Entry { value: v, g: 1, delta });
            self.merged += 1;
            item = idx;
            idx += 1;
        }

        self.buffer.clear();
    }

    // One left-to-right pass merging each summary entry into its
    // successor where the bias function allows. Indices are not
    // re-adjusted after a removal, so a freshly merged entry may be
    // merged again with its own successor within the same pass. Single
    // pass, not run to fixpoint.
    fn compress(&mut self) {
        if self.samples.len() < 2 {
            return;
        }

        let mut idx = 1usize;
        let mut next = 0usize;

        while idx < self.samples.len() {
            let prev = next;
            next = idx;
            idx += 1;

            let combined = self.samples[prev].g + self.samples[next].g + self.samples[next].delta;
            if (combined as f64) <= self.allowable_error(idx - 1) {
                let prev_g = self.samples[prev].g;
                self.samples[next].g += prev_g;
                self.samples.remove(prev);
            }
        }
    }

    fn update_aggregates(&mut self, value: f64) {
        let observed = self.count();
        if observed == 0 {
            self.min = value;
            self.max = value;
        } else {
            if value < self.min {
                self.min = value;
            }
            if value > self.max {
                self.max = value;
            }
        }
        self.sum += value;

        if observed == 0 {
            self.welford_mean = value;
            self.welford_sq = 0.0;
        } else {
            let old_mean = self.welford_mean;
            self.welford_mean = old_mean + (value - old_mean) / (observed + 1) as f64;
            self.welford_sq += (value - old_mean) * (value - self.welford_mean);
        }
    }
}
