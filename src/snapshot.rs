//! Frozen read-views over a distribution.
//!
//! A [`Snapshot`] is produced by value: it owns either a sorted copy of
//! raw observations or a drained copy of a sketch, and never changes
//! after creation no matter what happens to its source. That makes it
//! safe to hand to an exporter thread without holding any lock.

use tracing::debug;

use crate::ckms::Ckms;

#[derive(Debug, Clone)]
enum Backing {
    /// Raw observations, sorted ascending at construction.
    Values(Vec<f64>),
    /// An owned sketch copy with its pending buffer already folded, so
    /// reads need no mutation.
    Sketch(Ckms),
}

/// An immutable view of a distribution at a point in time.
///
/// All returned values are scaled by the reciprocal of the divisor the
/// snapshot was created with; a divisor converts units (say,
/// nanoseconds to milliseconds) without touching the source data.
/// Variance scales by the square of that factor.
///
/// # Examples
/// ```
/// use windowed_quantiles::Snapshot;
///
/// let snapshot = Snapshot::from_values(vec![5.0, 1.0, 2.0, 3.0, 4.0]);
/// assert_eq!(snapshot.size(), 5);
/// assert_eq!(snapshot.median(), 3.0);
/// assert_eq!(snapshot.min(), 1.0);
/// assert_eq!(snapshot.max(), 5.0);
/// assert_eq!(snapshot.sum(), 15.0);
/// ```
#[derive(Debug, Clone)]
pub struct Snapshot {
    backing: Backing,
    scale: f64,
}

impl Snapshot {
    /// A snapshot over an explicit set of observations.
    pub fn from_values(values: Vec<f64>) -> Snapshot {
        Snapshot::from_values_with_divisor(values, 1)
    }

    /// A snapshot over an explicit set of observations, with all
    /// reported values divided by `divisor`.
    pub fn from_values_with_divisor(mut values: Vec<f64>, divisor: u64) -> Snapshot {
        values.sort_by(|a, b| a.total_cmp(b));
        Snapshot {
            backing: Backing::Values(values),
            scale: divisor_scale(divisor),
        }
    }

    /// A snapshot of a sketch's current state.
    pub fn from_sketch(sketch: &Ckms) -> Snapshot {
        Snapshot::from_sketch_with_divisor(sketch, 1)
    }

    /// A snapshot of a sketch's current state, with all reported
    /// values divided by `divisor`.
    ///
    /// The sketch is copied and the copy's pending observations folded
    /// once, up front; later inserts into the source are not
    /// reflected.
    pub fn from_sketch_with_divisor(sketch: &Ckms, divisor: u64) -> Snapshot {
        let mut owned = sketch.clone();
        owned.flush();
        Snapshot {
            backing: Backing::Sketch(owned),
            scale: divisor_scale(divisor),
        }
    }

    /// Number of observations this snapshot represents.
    pub fn size(&self) -> u64 {
        match &self.backing {
            Backing::Values(values) => values.len() as u64,
            Backing::Sketch(sketch) => sketch.count(),
        }
    }

    /// True when the snapshot represents no observations.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// The value at `quantile`.
    ///
    /// Vector-backed snapshots interpolate linearly between the two
    /// straddling observations; sketch-backed snapshots answer within
    /// the sketch's error bound. Empty snapshots answer 0.
    pub fn value_at(&self, quantile: f64) -> f64 {
        let raw = match &self.backing {
            Backing::Values(values) => interpolate(values, quantile),
            Backing::Sketch(sketch) => sketch.query_merged(quantile),
        };
        raw * self.scale
    }

    /// The median value.
    pub fn median(&self) -> f64 {
        self.value_at(0.5)
    }

    /// The value at the 75th percentile.
    pub fn percentile_75(&self) -> f64 {
        self.value_at(0.75)
    }

    /// The value at the 95th percentile.
    pub fn percentile_95(&self) -> f64 {
        self.value_at(0.95)
    }

    /// The value at the 98th percentile.
    pub fn percentile_98(&self) -> f64 {
        self.value_at(0.98)
    }

    /// The value at the 99th percentile.
    pub fn percentile_99(&self) -> f64 {
        self.value_at(0.99)
    }

    /// The value at the 99.9th percentile.
    pub fn percentile_999(&self) -> f64 {
        self.value_at(0.999)
    }

    /// Smallest represented observation, 0 when empty.
    pub fn min(&self) -> f64 {
        let raw = match &self.backing {
            Backing::Values(values) => values.first().copied().unwrap_or(0.0),
            Backing::Sketch(sketch) => sketch.min(),
        };
        raw * self.scale
    }

    /// Largest represented observation, 0 when empty.
    pub fn max(&self) -> f64 {
        let raw = match &self.backing {
            Backing::Values(values) => values.last().copied().unwrap_or(0.0),
            Backing::Sketch(sketch) => sketch.max(),
        };
        raw * self.scale
    }

    /// Sum of the represented observations.
    pub fn sum(&self) -> f64 {
        let raw = match &self.backing {
            Backing::Values(values) => values.iter().sum(),
            Backing::Sketch(sketch) => sketch.sum(),
        };
        raw * self.scale
    }

    /// Arithmetic mean of the represented observations, 0 when empty.
    pub fn mean(&self) -> f64 {
        let raw = match &self.backing {
            Backing::Values(values) => {
                if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            }
            Backing::Sketch(sketch) => sketch.mean(),
        };
        raw * self.scale
    }

    /// Sample variance of the represented observations, 0 below two
    /// observations.
    pub fn variance(&self) -> f64 {
        let raw = match &self.backing {
            Backing::Values(values) => {
                if values.len() < 2 {
                    0.0
                } else {
                    let mean = values.iter().sum::<f64>() / values.len() as f64;
                    let squares: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
                    squares / (values.len() - 1) as f64
                }
            }
            Backing::Sketch(sketch) => sketch.variance(),
        };
        raw * self.scale * self.scale
    }

    /// Sample standard deviation of the represented observations.
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// The represented observations, scaled and in ascending order.
    ///
    /// Sketch-backed snapshots do not retain raw observations and
    /// answer an empty vector.
    pub fn values(&self) -> Vec<f64> {
        match &self.backing {
            Backing::Values(values) => values.iter().map(|v| v * self.scale).collect(),
            Backing::Sketch(_) => Vec::new(),
        }
    }
}

fn divisor_scale(divisor: u64) -> f64 {
    if divisor == 0 {
        debug!("snapshot divisor of zero treated as one");
        1.0
    } else {
        1.0 / divisor as f64
    }
}

// Classic rank interpolation over a sorted array: pick the fractional
// position q * (n + 1), clamp to the ends, and blend the straddling
// neighbors. Out-of-range quantiles land on the clamps.
fn interpolate(values: &[f64], quantile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let pos = quantile * (values.len() + 1) as f64;
    if pos < 1.0 {
        return values[0];
    }
    if pos >= values.len() as f64 {
        return values[values.len() - 1];
    }

    let lower = values[pos as usize - 1];
    let upper = values[pos as usize];
    lower + (pos - pos.floor()) * (upper - lower)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn vector_backed_quantiles() {
        let snapshot = Snapshot::from_values(vec![3.0, 1.0, 2.0, 4.0, 5.0]);
        assert_eq!(snapshot.size(), 5);
        assert_eq!(snapshot.median(), 3.0);
        assert_eq!(snapshot.value_at(0.0), 1.0);
        assert_eq!(snapshot.value_at(1.0), 5.0);
        // pos = 0.75 * 6 = 4.5, halfway between the 4th and 5th values
        assert_eq!(snapshot.percentile_75(), 4.5);
    }

    #[test]
    fn vector_backed_aggregates() {
        let snapshot = Snapshot::from_values(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(snapshot.min(), 1.0);
        assert_eq!(snapshot.max(), 5.0);
        assert_eq!(snapshot.sum(), 15.0);
        assert!((snapshot.mean() - 3.0).abs() < 1e-12);
        assert!((snapshot.variance() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn empty_snapshot_answers_zero() {
        let snapshot = Snapshot::from_values(Vec::new());
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.size(), 0);
        assert_eq!(snapshot.median(), 0.0);
        assert_eq!(snapshot.min(), 0.0);
        assert_eq!(snapshot.max(), 0.0);
        assert_eq!(snapshot.sum(), 0.0);
        assert_eq!(snapshot.variance(), 0.0);
        assert!(snapshot.values().is_empty());
    }

    #[test]
    fn sketch_backed_snapshot_is_detached() {
        let mut sketch = Ckms::default();
        for _ in 0..50 {
            sketch.insert(7.0);
        }

        let snapshot = Snapshot::from_sketch(&sketch);
        assert_eq!(snapshot.size(), 50);
        assert_eq!(snapshot.median(), 7.0);

        // Later traffic into the source must not leak into the view.
        for _ in 0..50 {
            sketch.insert(900.0);
        }
        assert_eq!(snapshot.size(), 50);
        assert_eq!(snapshot.median(), 7.0);
        assert_eq!(snapshot.max(), 7.0);
    }

    #[test]
    fn divisor_scales_reported_values() {
        let snapshot = Snapshot::from_values_with_divisor(vec![1000.0, 3000.0], 1000);
        assert_eq!(snapshot.min(), 1.0);
        assert_eq!(snapshot.max(), 3.0);
        assert_eq!(snapshot.sum(), 4.0);
        assert_eq!(snapshot.values(), vec![1.0, 3.0]);
        // size is a count of observations, never scaled
        assert_eq!(snapshot.size(), 2);
    }

    #[test]
    fn divisor_applies_to_sketch_backing() {
        let mut sketch = Ckms::default();
        for _ in 0..30 {
            sketch.insert(2000.0);
        }
        let snapshot = Snapshot::from_sketch_with_divisor(&sketch, 1000);
        assert_eq!(snapshot.median(), 2.0);
        assert_eq!(snapshot.max(), 2.0);
        assert_eq!(snapshot.size(), 30);
    }

    #[test]
    fn zero_divisor_is_treated_as_one() {
        let snapshot = Snapshot::from_values_with_divisor(vec![5.0], 0);
        assert_eq!(snapshot.max(), 5.0);
    }

    #[test]
    fn values_come_back_sorted() {
        let snapshot = Snapshot::from_values(vec![9.0, 1.0, 5.0]);
        assert_eq!(snapshot.values(), vec![1.0, 5.0, 9.0]);
    }
}
