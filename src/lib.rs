//! Windowed ε-approximate quantiles for telemetry streams.
//!
//! Tracking latency percentiles over an unbounded stream runs into two
//! walls at once: exact order statistics want memory linear in the
//! stream, and an all-time summary stops saying anything about what
//! the system is doing right now. This crate addresses both. A
//! [`Ckms`] sketch answers quantile queries within a configured error
//! bound from a compressed summary whose accuracy is biased toward the
//! quantiles you actually export, and a [`WindowedSampler`] rotates a
//! pair of those sketches through fixed time windows so the exported
//! numbers only ever reflect recent observations.
//!
//! Readers take a [`Snapshot`], an owned frozen view that can cross a
//! thread boundary and be queried without any lock.
//!
//! ```
//! use std::time::{Duration, UNIX_EPOCH};
//! use windowed_quantiles::{Sampler, WindowedSampler};
//!
//! let sampler = WindowedSampler::new(Duration::from_secs(30)).unwrap();
//! for i in 0..30 {
//!     sampler.update_at(12, UNIX_EPOCH + Duration::from_secs(i));
//! }
//!
//! let snapshot = sampler.snapshot_at(UNIX_EPOCH + Duration::from_secs(45));
//! assert_eq!(snapshot.size(), 30);
//! assert_eq!(snapshot.value_at(0.99), 12.0);
//! ```

#![deny(missing_docs)]

pub mod ckms;
pub mod clock;
pub mod sampler;
pub mod snapshot;

mod error;

pub use crate::ckms::{Ckms, Quantile, BUFFER_CAP};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::error::Error;
pub use crate::sampler::{Sampler, WindowedSampler, DEFAULT_WINDOW};
pub use crate::snapshot::Snapshot;
