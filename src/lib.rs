//! # neats-rs
//!
//! Lossless compression for integer time series with fast random access
//! and vectorised full decompression.
//!
//! ## Overview
//!
//! The input sequence is partitioned into variable-length segments. For
//! each segment the compressor fits one of five model families —
//! constant, linear, quadratic, radical, exponential — and stores the
//! rounded coefficients plus one small signed residual per position. The
//! residual width `bpc` (*bits per correction*) is fixed up front, so the
//! residual stream is randomly indexable; a succinct rank index over the
//! segment-start bit-vector makes point queries O(1) amortised.
//!
//! Compression is one-shot: the sequence length is known at build time
//! and the built representation is immutable. All read-only operations
//! are safe to call concurrently from any number of threads.
//!
//! ## Quick Start
//!
//! ```rust
//! use neats_rs::NeatsCompressor;
//!
//! // Bound every residual to 8 bits.
//! let mut compressor = NeatsCompressor::new(8).unwrap();
//!
//! let data: Vec<i64> = (0..10_000).map(|i| 3 * i - 42).collect();
//! compressor.partition(&data).unwrap();
//!
//! // Point queries, full decompression, and range scans are exact.
//! assert_eq!(compressor.value_at(7777), data[7777]);
//! let mut out = vec![0i64; compressor.size()];
//! compressor.simd_decompress(&mut out);
//! assert_eq!(out, data);
//! ```
//!
//! ## Choosing `bpc`
//!
//! `bpc` trades segment length against residual cost: every position pays
//! `bpc` bits, and a model stays feasible while its predictions remain
//! within `eps = 2^(bpc-1) - 1` of the data. Smooth series compress well
//! at small widths; noisy series need the width of their noise floor,
//! and beyond that segments collapse to single elements and the size
//! approaches `N * bpc` plus per-segment overhead.
//!
//! Real-valued inputs are out of scope: convert to fixed point first and
//! feed the resulting integers.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(dead_code)]

mod bitpack;
mod codec;
mod error;
mod hull;
mod model;
mod partition;
mod simd;
mod store;

pub use codec::NeatsCompressor;
pub use error::NeatsError;
pub use store::SpaceUsage;

/// Convenience type alias for Results with NeatsError.
pub type Result<T> = std::result::Result<T, NeatsError>;
