//! Construction-time error reporting.
//!
//! The runtime surface of this crate is deliberately infallible: inserts
//! never fail, past-dated updates are dropped, and queries against empty
//! state answer zero. The only thing left to report is a configuration
//! the caller handed us that cannot produce a working estimator.

/// Errors raised while constructing a sketch or sampler.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration parameter is outside its legal range.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}
