//! The compressor facade tying the pipeline together.
//!
//! A [`NeatsCompressor`] is configured with a residual width, built once
//! from an in-memory sequence, and immutable afterwards: every read-only
//! operation may then be called freely (and, because nothing mutates,
//! concurrently from any number of threads). `partition` and `load` are
//! the only mutators and replace the built state wholesale.

use std::io::{Read, Write};

use crate::error::NeatsError;
use crate::partition;
use crate::simd;
use crate::store::{SegmentStore, SpaceUsage};

/// Lossless compressor for `i64` time series with O(1) random access.
///
/// The input is partitioned into variable-length segments, each fitted by
/// one of five model families; per-position residuals are stored in a
/// fixed number of bits (`bpc`), so reconstruction is exact.
///
/// # Example
/// ```
/// use neats_rs::NeatsCompressor;
///
/// let data: Vec<i64> = (0..1000).map(|i| 2 * i + 7).collect();
/// let mut compressor = NeatsCompressor::new(8).unwrap();
/// compressor.partition(&data).unwrap();
///
/// assert_eq!(compressor.value_at(500), 1007);
/// let mut out = vec![0i64; compressor.size()];
/// compressor.decompress(&mut out);
/// assert_eq!(out, data);
/// ```
#[derive(Clone, Debug)]
pub struct NeatsCompressor {
    bpc: u8,
    store: Option<SegmentStore>,
}

impl NeatsCompressor {
    /// Construct an empty compressor bounding residuals to `bpc` bits.
    ///
    /// Every stored residual `r` satisfies `-(eps + 1) <= r <= eps` with
    /// `eps = 2^(bpc - 1) - 1`. Widths outside `1..=63` are a
    /// configuration error.
    pub fn new(bpc: u8) -> Result<Self, NeatsError> {
        if !(1..=63).contains(&bpc) {
            return Err(NeatsError::ConfigInvalid(format!(
                "bpc must be in 1..=63, got {}",
                bpc
            )));
        }
        Ok(NeatsCompressor { bpc, store: None })
    }

    /// Build the compressed representation from `data`.
    ///
    /// Replaces any previously built state. Fails with
    /// [`NeatsError::ConfigInvalid`] on empty input and with
    /// [`NeatsError::NumericUnrepresentable`] if some element cannot be
    /// covered by any model family within the residual bound.
    pub fn partition(&mut self, data: &[i64]) -> Result<(), NeatsError> {
        if data.is_empty() {
            return Err(NeatsError::ConfigInvalid(
                "input sequence is empty".into(),
            ));
        }
        let segments = partition::partition(data, self.bpc)?;
        self.store = Some(SegmentStore::build(data, &segments, self.bpc));
        Ok(())
    }

    #[inline]
    fn store(&self) -> &SegmentStore {
        self.store
            .as_ref()
            .expect("no sequence has been compressed")
    }

    /// The stored value at position `i`, O(1) amortised.
    ///
    /// # Panics
    /// Panics if nothing has been compressed or `i` is out of range.
    #[inline]
    pub fn value_at(&self, i: usize) -> i64 {
        self.store().value_at(i)
    }

    /// Reconstruct the full sequence into `out`
    /// (`out.len() == self.size()`).
    pub fn decompress(&self, out: &mut [i64]) {
        self.store().decompress(out);
    }

    /// Vectorised [`decompress`](Self::decompress); bit-identical output.
    ///
    /// `out` should be aligned to the vector width (32 bytes).
    pub fn simd_decompress(&self, out: &mut [i64]) {
        simd::simd_decompress(self.store(), out);
    }

    /// Reconstruct positions `[lo, hi)` into `out`
    /// (`out.len() == hi - lo`).
    ///
    /// Walks only the segments intersecting the range, batched like
    /// [`simd_decompress`](Self::simd_decompress).
    pub fn scan(&self, lo: usize, hi: usize, out: &mut [i64]) {
        simd::simd_scan(self.store(), lo, hi, out);
    }

    /// Number of compressed elements; zero before the first build.
    pub fn size(&self) -> usize {
        self.store.as_ref().map_or(0, SegmentStore::len)
    }

    /// Number of emitted segments; zero before the first build.
    pub fn segment_count(&self) -> usize {
        self.store.as_ref().map_or(0, SegmentStore::segment_count)
    }

    /// Total footprint of the built representation in bits.
    pub fn size_in_bits(&self) -> usize {
        self.space_usage().total_bits()
    }

    /// Bit-size breakdown of the built representation.
    pub fn space_usage(&self) -> SpaceUsage {
        self.store
            .as_ref()
            .map_or_else(SpaceUsage::default, SegmentStore::space_usage)
    }

    /// Residual width in bits.
    pub fn bits_per_residual(&self) -> u8 {
        self.bpc
    }

    /// Write the built representation to `sink`; returns bytes written.
    ///
    /// The stream is a pure function of the input sequence and `bpc`.
    pub fn serialize<W: Write>(&self, sink: W) -> Result<usize, NeatsError> {
        match &self.store {
            Some(store) => store.serialize(sink),
            None => Err(NeatsError::ConfigInvalid(
                "no sequence has been compressed".into(),
            )),
        }
    }

    /// Replace this compressor's state with a previously serialized one.
    ///
    /// On any failure the existing state is left untouched.
    pub fn load<R: Read>(&mut self, source: R) -> Result<(), NeatsError> {
        let store = SegmentStore::load(source)?;
        self.bpc = store.bpc();
        self.store = Some(store);
        Ok(())
    }
}
