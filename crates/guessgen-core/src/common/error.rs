//! Error types for guess generation.
//!
//! This module defines the central `Error` enum shared by the sampling engine
//! and the job service. Only precondition violations surface here: running
//! out of unique combinations is not an error, callers receive a short result
//! instead.
//!
//! ## Error Cases
//! - `PoolTooSmall`: The sampler was invoked with fewer than six candidates.
//! - `ValueOutOfRange`: A value outside `1..=60` was supplied for a pool or
//!   guess.
//! - `DuplicateValue`: A guess was constructed with repeated values.
//! - `SetTooLarge`: An enumeration was requested over more elements than a
//!   bitmask can represent.
//! - `InvalidRequest`: The generation request was malformed or out of bounds.

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for guess generation.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The candidate pool holds fewer values than a guess needs.
    #[error("Candidate pool too small: {len} values, need at least {required}")]
    PoolTooSmall { len: usize, required: usize },

    /// A value fell outside the `1..=60` range.
    #[error("Value {value} out of range 1..=60")]
    ValueOutOfRange { value: u32 },

    /// A guess contained the same value twice.
    #[error("Duplicate value {value} in guess")]
    DuplicateValue { value: u8 },

    /// The enumeration universe does not fit in the bitmask.
    #[error("Cannot enumerate subsets of {n} elements (max {max})")]
    SetTooLarge { n: usize, max: usize },

    /// The generation request was invalid or exceeded constraints.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },
}
