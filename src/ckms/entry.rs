use std::sync::Arc;

#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A quantile the sketch is asked to track, paired with the rank error
/// the caller will tolerate at that quantile.
///
/// Construction precomputes the two slopes of the bias function: `u`
/// governs ranks at or below the target and `v` ranks above it. Error
/// is allowed to shrink to zero, which pins the target exactly; the
/// default configuration never does this but callers tracking the
/// maximum (`quantile == 1.0`) commonly do.
///
/// # Examples
/// ```
/// use windowed_quantiles::Quantile;
///
/// let p99 = Quantile::new(0.99, 0.001).unwrap();
/// assert_eq!(p99.quantile(), 0.99);
/// assert!(Quantile::new(1.5, 0.001).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct Quantile {
    quantile: f64,
    error: f64,
    pub(crate) u: f64,
    pub(crate) v: f64,
}

impl Quantile {
    /// Create a target for `quantile` in `(0, 1]` with rank error
    /// `error` in `[0, 1)`.
    pub fn new(quantile: f64, error: f64) -> Result<Quantile, Error> {
        if !(quantile > 0.0 && quantile <= 1.0) {
            return Err(Error::InvalidArgument("quantile must be in (0, 1]"));
        }
        if !(error >= 0.0 && error < 1.0) {
            return Err(Error::InvalidArgument("quantile error must be in [0, 1)"));
        }
        Ok(Quantile::from_parts(quantile, error))
    }

    // `u` diverges as quantile approaches 1; a literal division there
    // would produce 0/0 for a zero-error maximum target. Clamped to
    // +inf so the slope stays out of reach of every strict comparison
    // downstream.
    pub(crate) fn from_parts(quantile: f64, error: f64) -> Quantile {
        let u = if 1.0 - quantile <= 0.0 {
            f64::INFINITY
        } else {
            2.0 * error / (1.0 - quantile)
        };
        Quantile {
            quantile,
            error,
            u,
            v: 2.0 * error / quantile,
        }
    }

    /// The tracked quantile, in `(0, 1]`.
    pub fn quantile(&self) -> f64 {
        self.quantile
    }

    /// The tolerated rank error at the tracked quantile.
    pub fn error(&self) -> f64 {
        self.error
    }
}

/// The stock target list: P99 and P50, each within a tenth of a percent.
pub(crate) fn default_targets() -> Arc<[Quantile]> {
    vec![
        Quantile::from_parts(0.99, 0.001),
        Quantile::from_parts(0.5, 0.001),
    ]
    .into()
}

/// One tuple of the sample summary. `value` is an observation the
/// sketch elected to keep, `g` the number of observations it stands in
/// for beyond its predecessor, and `delta` the rank slack it was
/// charged at insertion.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub(crate) struct Entry {
    pub value: f64,
    pub g: u64,
    pub delta: u64,
}

// The only ordering-relevant component of an Entry is its value; g and
// delta are rank bookkeeping.
impl PartialEq for Entry {
    fn eq(&self, other: &Entry) -> bool {
        self.value == other.value
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn target_validation() {
        assert!(Quantile::new(0.5, 0.001).is_ok());
        assert!(Quantile::new(1.0, 0.0).is_ok());
        assert!(Quantile::new(0.0, 0.001).is_err());
        assert!(Quantile::new(-0.5, 0.001).is_err());
        assert!(Quantile::new(1.01, 0.001).is_err());
        assert!(Quantile::new(0.5, -0.001).is_err());
        assert!(Quantile::new(0.5, 1.0).is_err());
        assert!(Quantile::new(f64::NAN, 0.001).is_err());
        assert!(Quantile::new(0.5, f64::NAN).is_err());
    }

    #[test]
    fn max_target_slope_is_infinite_not_nan() {
        let pinned_max = Quantile::new(1.0, 0.0).unwrap();
        assert!(pinned_max.u.is_infinite());
        assert_eq!(pinned_max.v, 0.0);

        let p100 = Quantile::new(1.0, 0.001).unwrap();
        assert!(p100.u.is_infinite());
    }
}
