//! Error types for compression, access, and persistence operations.

use thiserror::Error;

/// Errors surfaced by the compressor at operation boundaries.
#[derive(Debug, Error)]
pub enum NeatsError {
    /// Invalid configuration (`bpc` out of range, empty input).
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// An input value cannot be represented by any model family within the
    /// residual bound, even after promoting internal arithmetic to 128 bits.
    #[error("value {value} at position {position} is not representable within the residual bound")]
    NumericUnrepresentable {
        /// Position of the offending element in the input sequence.
        position: usize,
        /// The offending value.
        value: i64,
    },

    /// A malformed or corrupted serialized stream was rejected during `load`.
    #[error("invalid serialized stream: {0}")]
    FormatInvalid(String),

    /// The underlying byte source or sink failed; propagated unchanged.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
