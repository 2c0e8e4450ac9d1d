//! The bit-packed segment store.
//!
//! Packs the output of the partitioner into four flat arrays — start
//! positions, model tags, per-model coefficient columns, and the residual
//! stream — plus a constant-time rank index over the segment-start
//! bit-vector, so that locating the segment of any position is O(1).
//!
//! ## Serialized layout (little-endian)
//!
//! | Field | Width |
//! |---|---|
//! | magic `"NTS1"` | 4 B |
//! | format version | 2 B |
//! | bpc | 1 B |
//! | bank ordinal | 1 B |
//! | element count `N` | 8 B |
//! | segment count | 8 B |
//! | segment-start bit-vector | `⌈N / 8⌉` B |
//! | tags | `⌈count · 3 / 8⌉` B |
//! | coefficient columns, in tag order | varies |
//! | residuals | `⌈N · bpc / 8⌉` B |
//! | CRC-32 of all preceding bytes | 4 B |
//!
//! The rank index is a deterministic function of the start bit-vector and
//! is rebuilt at load time rather than stored.

use std::io::{Read, Write};

use sucds::bit_vectors::{Access, Rank, Rank9Sel};
use sucds::Serializable;

use crate::bitpack::{bits_for, BitBuffer};
use crate::error::NeatsError;
use crate::model::{Coefficients, Model, ModelKind, BANK_ORDINAL, BANK_SIZE, TAG_BITS};
use crate::partition::{epsilon_for, SegmentRec};

/// Magic bytes opening a serialized stream.
const MAGIC: &[u8; 4] = b"NTS1";

/// Serialized format version.
const FORMAT_VERSION: u16 = 1;

/// Upper bound on a plausible element count in a serialized header; a
/// larger value is treated as corruption before any allocation happens.
const MAX_PLAUSIBLE_N: u64 = 1 << 48;

/// Encode a residual as a `bpc`-bit two's-complement value.
///
/// The storable range `[-(eps + 1), eps]` is exactly the `bpc`-bit
/// two's-complement range, so truncating the wrapped representation to
/// `bpc` bits is lossless.
#[inline]
fn encode_residual(r: i128, bpc: u8) -> u64 {
    (r as u64) & ((1u64 << bpc) - 1)
}

/// Sign-extend a `bpc`-bit two's-complement value.
#[inline]
fn decode_residual(raw: u64, bpc: u8) -> i64 {
    let shift = 64 - bpc as u32;
    ((raw << shift) as i64) >> shift
}

/// Coefficient columns for the two-parameter families.
#[derive(Clone, Debug, Default)]
struct AffineColumns {
    slopes: Vec<f32>,
    intercepts: Vec<f64>,
}

/// Per-model coefficient storage, columnar, in tag order.
#[derive(Clone, Debug, Default)]
struct CoeffBank {
    constant: Vec<f64>,
    linear: AffineColumns,
    quad_a2: Vec<f32>,
    quad_a1: Vec<f32>,
    quad_a0: Vec<f64>,
    radical: AffineColumns,
    exponential: AffineColumns,
}

impl CoeffBank {
    fn count(&self, kind: ModelKind) -> usize {
        match kind {
            ModelKind::Constant => self.constant.len(),
            ModelKind::Linear => self.linear.slopes.len(),
            ModelKind::Quadratic => self.quad_a2.len(),
            ModelKind::Radical => self.radical.slopes.len(),
            ModelKind::Exponential => self.exponential.slopes.len(),
        }
    }

    /// Append the model's coefficients and return their index within the
    /// family's column.
    fn push(&mut self, model: &Model) -> usize {
        let idx = self.count(model.kind);
        match (model.kind, model.coeffs) {
            (ModelKind::Constant, Coefficients::Constant(c0)) => self.constant.push(c0),
            (ModelKind::Quadratic, Coefficients::Quadratic { a2, a1, a0 }) => {
                self.quad_a2.push(a2);
                self.quad_a1.push(a1);
                self.quad_a0.push(a0);
            }
            (kind, Coefficients::Affine { slope, intercept }) => {
                let col = match kind {
                    ModelKind::Linear => &mut self.linear,
                    ModelKind::Radical => &mut self.radical,
                    ModelKind::Exponential => &mut self.exponential,
                    _ => unreachable!("affine tuple for {:?}", kind),
                };
                col.slopes.push(slope);
                col.intercepts.push(intercept);
            }
            _ => unreachable!("coefficient tuple does not match model kind"),
        }
        idx
    }

    fn get(&self, kind: ModelKind, idx: usize) -> Model {
        let coeffs = match kind {
            ModelKind::Constant => Coefficients::Constant(self.constant[idx]),
            ModelKind::Quadratic => Coefficients::Quadratic {
                a2: self.quad_a2[idx],
                a1: self.quad_a1[idx],
                a0: self.quad_a0[idx],
            },
            ModelKind::Linear => Coefficients::Affine {
                slope: self.linear.slopes[idx],
                intercept: self.linear.intercepts[idx],
            },
            ModelKind::Radical => Coefficients::Affine {
                slope: self.radical.slopes[idx],
                intercept: self.radical.intercepts[idx],
            },
            ModelKind::Exponential => Coefficients::Affine {
                slope: self.exponential.slopes[idx],
                intercept: self.exponential.intercepts[idx],
            },
        };
        Model { kind, coeffs }
    }

    fn coefficient_bits(&self) -> usize {
        self.constant.len() * 64
            + (self.linear.slopes.len() + self.radical.slopes.len() + self.exponential.slopes.len())
                * (32 + 64)
            + self.quad_a2.len() * (32 + 32 + 64)
    }

    fn write(&self, buf: &mut Vec<u8>) {
        for v in &self.constant {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        for v in &self.linear.slopes {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        for v in &self.linear.intercepts {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        for v in &self.quad_a2 {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        for v in &self.quad_a1 {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        for v in &self.quad_a0 {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        for col in [&self.radical, &self.exponential] {
            for v in &col.slopes {
                buf.extend_from_slice(&v.to_le_bytes());
            }
            for v in &col.intercepts {
                buf.extend_from_slice(&v.to_le_bytes());
            }
        }
    }
}

/// An immutable compressed sequence with O(1) point access.
#[derive(Clone, Debug)]
pub struct SegmentStore {
    bpc: u8,
    n: usize,
    /// Segment-start bit-vector (`1` iff the position starts a segment)
    /// with its rank sidecar.
    index: Rank9Sel,
    /// Absolute start position per segment, width `⌈log2 N⌉`.
    starts: BitBuffer,
    /// Model tag per segment, width 3.
    tags: BitBuffer,
    /// Index into the family's coefficient column per segment.
    coeff_idx: BitBuffer,
    bank: CoeffBank,
    /// Two's-complement residuals, width `bpc`, one per input position.
    residuals: BitBuffer,
}

/// Bit-size breakdown of a built store.
///
/// The components sum to [`total_bits`](SpaceUsage::total_bits), which is
/// what `size_in_bits` reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpaceUsage {
    /// The residual stream, `N · bpc`.
    pub residual_bits: usize,
    /// All coefficient columns.
    pub coefficient_bits: usize,
    /// Model tags.
    pub tag_bits: usize,
    /// The segment-start bit-vector.
    pub start_flag_bits: usize,
    /// The rank/select sidecar over the start bit-vector.
    pub rank_index_bits: usize,
    /// The packed start-position array.
    pub start_position_bits: usize,
    /// The packed per-family coefficient indices.
    pub coefficient_index_bits: usize,
}

impl SpaceUsage {
    /// Total footprint in bits.
    pub fn total_bits(&self) -> usize {
        self.residual_bits
            + self.coefficient_bits
            + self.tag_bits
            + self.start_flag_bits
            + self.rank_index_bits
            + self.start_position_bits
            + self.coefficient_index_bits
    }

    /// Compressed size relative to `n` raw 64-bit elements.
    pub fn compression_ratio(&self, n: usize) -> f64 {
        self.total_bits() as f64 / (n as f64 * 64.0)
    }
}

impl SegmentStore {
    /// Pack a segment list over `data` into the store.
    pub fn build(data: &[i64], segments: &[SegmentRec], bpc: u8) -> Self {
        let n = data.len();
        let seg_count = segments.len();
        let eps = epsilon_for(bpc);

        let mut start_flags = BitBuffer::with_capacity(1, n);
        let mut starts = BitBuffer::with_capacity(bits_for(n), seg_count);
        let mut tags = BitBuffer::with_capacity(TAG_BITS, seg_count);
        let mut coeff_idx = BitBuffer::with_capacity(bits_for(seg_count), seg_count);
        let mut bank = CoeffBank::default();
        let mut residuals = BitBuffer::with_capacity(bpc as usize, n);

        for seg in segments {
            starts.push(seg.start as u64);
            tags.push(seg.model.kind.tag() as u64);
            coeff_idx.push(bank.push(&seg.model) as u64);
            for k in 0..seg.len {
                start_flags.push(u64::from(k == 0));
                let pred = seg.model.predict(k as u64 + 1) as i128;
                let r = data[seg.start + k] as i128 - pred;
                debug_assert!(r >= -(eps as i128) - 1 && r <= eps as i128);
                residuals.push(encode_residual(r, bpc));
            }
        }

        let index = Rank9Sel::from_bits((0..n).map(|i| start_flags.get(i) == 1));
        SegmentStore {
            bpc,
            n,
            index,
            starts,
            tags,
            coeff_idx,
            bank,
            residuals,
        }
    }

    /// Number of stored elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Residual width in bits.
    #[inline]
    pub fn bpc(&self) -> u8 {
        self.bpc
    }

    /// Number of segments.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.starts.len()
    }

    /// `(start, len)` of segment `k`.
    #[inline]
    pub fn segment_bounds(&self, k: usize) -> (usize, usize) {
        let s = self.starts.get(k) as usize;
        let end = if k + 1 < self.segment_count() {
            self.starts.get(k + 1) as usize
        } else {
            self.n
        };
        (s, end - s)
    }

    /// `(segment index, start, len)` of the segment containing position
    /// `i`, O(1).
    #[inline]
    pub fn segment_of(&self, i: usize) -> (usize, usize, usize) {
        debug_assert!(i < self.n);
        let k = self.index.rank1(i + 1).expect("position in range") - 1;
        let (s, l) = self.segment_bounds(k);
        (k, s, l)
    }

    /// The fitted model of segment `k`, O(1).
    #[inline]
    pub fn model(&self, k: usize) -> Model {
        let kind = ModelKind::from_tag(self.tags.get(k) as u8).expect("validated tag");
        self.bank.get(kind, self.coeff_idx.get(k) as usize)
    }

    /// Signed residual at position `i`, O(1).
    #[inline]
    pub fn residual(&self, i: usize) -> i64 {
        decode_residual(self.residuals.get(i), self.bpc)
    }

    /// Decode `out.len()` consecutive signed residuals starting at `pos`.
    pub fn residual_run(&self, pos: usize, out: &mut [i64]) {
        let bpc = self.bpc;
        let mut chunk = [0u64; 128];
        let mut done = 0;
        while done < out.len() {
            let take = (out.len() - done).min(chunk.len());
            self.residuals.read_run(pos + done, &mut chunk[..take]);
            for (slot, &raw) in out[done..done + take].iter_mut().zip(chunk.iter()) {
                *slot = decode_residual(raw, bpc);
            }
            done += take;
        }
    }

    /// The stored value at position `i`, O(1).
    #[inline]
    pub fn value_at(&self, i: usize) -> i64 {
        let (k, s, _) = self.segment_of(i);
        let model = self.model(k);
        model.predict((i - s + 1) as u64) + self.residual(i)
    }

    /// Reconstruct the full sequence into `out`.
    ///
    /// # Panics
    /// Panics if `out.len() != self.len()`.
    pub fn decompress(&self, out: &mut [i64]) {
        assert_eq!(out.len(), self.n, "output buffer length mismatch");
        for k in 0..self.segment_count() {
            let (s, l) = self.segment_bounds(k);
            let model = self.model(k);
            let dst = &mut out[s..s + l];
            self.residual_run(s, dst);
            for (off, slot) in dst.iter_mut().enumerate() {
                *slot += model.predict(off as u64 + 1);
            }
        }
    }

    /// Reconstruct positions `[lo, hi)` into `out`, walking only the
    /// intersecting segments.
    ///
    /// # Panics
    /// Panics if the range is out of bounds or `out.len() != hi - lo`.
    pub fn scan(&self, lo: usize, hi: usize, out: &mut [i64]) {
        assert!(lo <= hi && hi <= self.n, "scan range out of bounds");
        assert_eq!(out.len(), hi - lo, "output buffer length mismatch");
        if lo == hi {
            return;
        }
        let (mut k, _, _) = self.segment_of(lo);
        let mut pos = lo;
        while pos < hi {
            let (s, l) = self.segment_bounds(k);
            let stop = (s + l).min(hi);
            let model = self.model(k);
            let dst = &mut out[pos - lo..stop - lo];
            self.residual_run(pos, dst);
            let base_j = pos - s;
            for (off, slot) in dst.iter_mut().enumerate() {
                *slot += model.predict((base_j + off) as u64 + 1);
            }
            pos = stop;
            k += 1;
        }
    }

    /// Bit-size breakdown of the store.
    pub fn space_usage(&self) -> SpaceUsage {
        let index_total = self.index.size_in_bytes() * 8;
        SpaceUsage {
            residual_bits: self.residuals.bits(),
            coefficient_bits: self.bank.coefficient_bits(),
            tag_bits: self.tags.bits(),
            start_flag_bits: self.n,
            rank_index_bits: index_total.saturating_sub(self.n),
            start_position_bits: self.starts.bits(),
            coefficient_index_bits: self.coeff_idx.bits(),
        }
    }

    /// Write the store to `sink`; returns the number of bytes written.
    ///
    /// The output is a pure function of the store contents, so two builds
    /// over the same input serialize byte-identically.
    pub fn serialize<W: Write>(&self, mut sink: W) -> Result<usize, NeatsError> {
        let mut buf = Vec::with_capacity(
            24 + self.n.div_ceil(8) + self.tags.byte_len() + self.residuals.byte_len(),
        );
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf.push(self.bpc);
        buf.push(BANK_ORDINAL);
        buf.extend_from_slice(&(self.n as u64).to_le_bytes());
        buf.extend_from_slice(&(self.segment_count() as u64).to_le_bytes());
        let mut flags = BitBuffer::with_capacity(1, self.n);
        for i in 0..self.n {
            let bit = self.index.access(i).expect("bit in range");
            flags.push(u64::from(bit));
        }
        buf.extend_from_slice(&flags.to_bytes());
        buf.extend_from_slice(&self.tags.to_bytes());
        self.bank.write(&mut buf);
        buf.extend_from_slice(&self.residuals.to_bytes());
        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        sink.write_all(&buf)?;
        Ok(buf.len())
    }

    /// Rebuild a store from a serialized stream.
    ///
    /// Rejects a mismatched magic, unsupported version, malformed section,
    /// or failing checksum with [`NeatsError::FormatInvalid`].
    pub fn load<R: Read>(mut source: R) -> Result<Self, NeatsError> {
        let mut hasher = crc32fast::Hasher::new();

        let mut header = [0u8; 24];
        fill(&mut source, &mut header)?;
        hasher.update(&header);

        if &header[0..4] != MAGIC {
            return Err(NeatsError::FormatInvalid("bad magic bytes".into()));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != FORMAT_VERSION {
            return Err(NeatsError::FormatInvalid(format!(
                "unsupported format version {}",
                version
            )));
        }
        let bpc = header[6];
        if !(1..=63).contains(&bpc) {
            return Err(NeatsError::FormatInvalid(format!("bpc {} out of range", bpc)));
        }
        if header[7] != BANK_ORDINAL {
            return Err(NeatsError::FormatInvalid(format!(
                "unknown model bank ordinal {}",
                header[7]
            )));
        }
        let n = u64::from_le_bytes(header[8..16].try_into().expect("8 bytes"));
        let seg_count = u64::from_le_bytes(header[16..24].try_into().expect("8 bytes"));
        if n == 0 || n > MAX_PLAUSIBLE_N {
            return Err(NeatsError::FormatInvalid(format!(
                "implausible element count {}",
                n
            )));
        }
        if seg_count == 0 || seg_count > n {
            return Err(NeatsError::FormatInvalid(format!(
                "implausible segment count {}",
                seg_count
            )));
        }
        let n = n as usize;
        let seg_count = seg_count as usize;

        let flag_bytes = read_section(&mut source, &mut hasher, n.div_ceil(8))?;
        let tag_bytes =
            read_section(&mut source, &mut hasher, (seg_count * TAG_BITS).div_ceil(8))?;
        let tags = BitBuffer::from_bytes(&tag_bytes, TAG_BITS, seg_count)?;

        let mut counts = [0usize; BANK_SIZE];
        for k in 0..seg_count {
            let tag = tags.get(k) as u8;
            match ModelKind::from_tag(tag) {
                Some(kind) => counts[kind.tag() as usize] += 1,
                None => {
                    return Err(NeatsError::FormatInvalid(format!(
                        "unknown model tag {}",
                        tag
                    )))
                }
            }
        }

        let bank = read_bank(&mut source, &mut hasher, &counts)?;
        let residual_bytes =
            read_section(&mut source, &mut hasher, (n * bpc as usize).div_ceil(8))?;
        let residuals = BitBuffer::from_bytes(&residual_bytes, bpc as usize, n)?;

        let mut crc_bytes = [0u8; 4];
        fill(&mut source, &mut crc_bytes)?;
        if hasher.finalize() != u32::from_le_bytes(crc_bytes) {
            return Err(NeatsError::FormatInvalid("checksum mismatch".into()));
        }

        let start_flags = BitBuffer::from_bytes(&flag_bytes, 1, n)?;
        if start_flags.get(0) != 1 {
            return Err(NeatsError::FormatInvalid(
                "first position does not start a segment".into(),
            ));
        }
        let mut starts = BitBuffer::with_capacity(bits_for(n), seg_count);
        let mut ones = 0usize;
        for i in 0..n {
            if start_flags.get(i) == 1 {
                ones += 1;
                if ones > seg_count {
                    break;
                }
                starts.push(i as u64);
            }
        }
        if ones != seg_count {
            return Err(NeatsError::FormatInvalid(format!(
                "segment-start bit-vector holds {} starts, header says {}",
                ones, seg_count
            )));
        }

        // The per-family coefficient index is a function of the tags.
        let mut coeff_idx = BitBuffer::with_capacity(bits_for(seg_count), seg_count);
        let mut seen = [0u64; BANK_SIZE];
        for k in 0..seg_count {
            let t = tags.get(k) as usize;
            coeff_idx.push(seen[t]);
            seen[t] += 1;
        }

        let index = Rank9Sel::from_bits((0..n).map(|i| start_flags.get(i) == 1));
        Ok(SegmentStore {
            bpc,
            n,
            index,
            starts,
            tags,
            coeff_idx,
            bank,
            residuals,
        })
    }
}

fn fill<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<(), NeatsError> {
    source.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            NeatsError::FormatInvalid("truncated stream".into())
        } else {
            NeatsError::Io(e)
        }
    })
}

fn read_section<R: Read>(
    source: &mut R,
    hasher: &mut crc32fast::Hasher,
    len: usize,
) -> Result<Vec<u8>, NeatsError> {
    let mut buf = vec![0u8; len];
    fill(source, &mut buf)?;
    hasher.update(&buf);
    Ok(buf)
}

fn read_f32_column<R: Read>(
    source: &mut R,
    hasher: &mut crc32fast::Hasher,
    count: usize,
) -> Result<Vec<f32>, NeatsError> {
    let bytes = read_section(source, hasher, count * 4)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes(c.try_into().expect("4 bytes")))
        .collect())
}

fn read_f64_column<R: Read>(
    source: &mut R,
    hasher: &mut crc32fast::Hasher,
    count: usize,
) -> Result<Vec<f64>, NeatsError> {
    let bytes = read_section(source, hasher, count * 8)?;
    Ok(bytes
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes(c.try_into().expect("8 bytes")))
        .collect())
}

fn read_bank<R: Read>(
    source: &mut R,
    hasher: &mut crc32fast::Hasher,
    counts: &[usize; BANK_SIZE],
) -> Result<CoeffBank, NeatsError> {
    let constant = read_f64_column(source, hasher, counts[0])?;
    let linear = AffineColumns {
        slopes: read_f32_column(source, hasher, counts[1])?,
        intercepts: read_f64_column(source, hasher, counts[1])?,
    };
    let quad_a2 = read_f32_column(source, hasher, counts[2])?;
    let quad_a1 = read_f32_column(source, hasher, counts[2])?;
    let quad_a0 = read_f64_column(source, hasher, counts[2])?;
    let radical = AffineColumns {
        slopes: read_f32_column(source, hasher, counts[3])?,
        intercepts: read_f64_column(source, hasher, counts[3])?,
    };
    let exponential = AffineColumns {
        slopes: read_f32_column(source, hasher, counts[4])?,
        intercepts: read_f64_column(source, hasher, counts[4])?,
    };
    Ok(CoeffBank {
        constant,
        linear,
        quad_a2,
        quad_a1,
        quad_a0,
        radical,
        exponential,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;

    fn build_store(data: &[i64], bpc: u8) -> SegmentStore {
        let segs = partition(data, bpc).unwrap();
        SegmentStore::build(data, &segs, bpc)
    }

    fn sample_data() -> Vec<i64> {
        let mut data: Vec<i64> = (0..200).map(|i| 3 * i - 50).collect();
        data.extend((0..100).map(|i| 1000 - 7 * i));
        data.extend([4i64; 64]);
        data
    }

    #[test]
    fn test_point_contracts() {
        let data = sample_data();
        let store = build_store(&data, 4);
        assert_eq!(store.len(), data.len());
        for (i, &y) in data.iter().enumerate() {
            let (k, s, l) = store.segment_of(i);
            assert!(s <= i && i < s + l);
            let (s2, l2) = store.segment_bounds(k);
            assert_eq!((s, l), (s2, l2));
            assert_eq!(store.value_at(i), y, "mismatch at {}", i);
            let r = store.residual(i);
            assert!((-8..=7).contains(&r));
        }
    }

    #[test]
    fn test_decompress_matches_input() {
        let data = sample_data();
        let store = build_store(&data, 4);
        let mut out = vec![0i64; data.len()];
        store.decompress(&mut out);
        assert_eq!(out, data);
    }

    #[test]
    fn test_scan_matches_slices() {
        let data = sample_data();
        let store = build_store(&data, 4);
        for (lo, hi) in [(0, 0), (0, 1), (5, 64), (190, 230), (0, data.len())] {
            let mut out = vec![0i64; hi - lo];
            store.scan(lo, hi, &mut out);
            assert_eq!(out, &data[lo..hi], "range {}..{}", lo, hi);
        }
    }

    #[test]
    fn test_serialize_is_deterministic() {
        let data = sample_data();
        let store1 = build_store(&data, 5);
        let store2 = build_store(&data, 5);
        let mut a = Vec::new();
        let mut b = Vec::new();
        store1.serialize(&mut a).unwrap();
        store2.serialize(&mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_serialize_load_fixed_point() {
        let data = sample_data();
        let store = build_store(&data, 4);
        let mut bytes = Vec::new();
        let written = store.serialize(&mut bytes).unwrap();
        assert_eq!(written, bytes.len());

        let loaded = SegmentStore::load(&bytes[..]).unwrap();
        assert_eq!(loaded.len(), store.len());
        assert_eq!(loaded.segment_count(), store.segment_count());
        for i in 0..data.len() {
            assert_eq!(loaded.value_at(i), data[i]);
        }
        let mut again = Vec::new();
        loaded.serialize(&mut again).unwrap();
        assert_eq!(again, bytes);
    }

    #[test]
    fn test_load_rejects_bad_magic() {
        let data = sample_data();
        let store = build_store(&data, 4);
        let mut bytes = Vec::new();
        store.serialize(&mut bytes).unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            SegmentStore::load(&bytes[..]),
            Err(NeatsError::FormatInvalid(_))
        ));
    }

    #[test]
    fn test_load_rejects_bad_version() {
        let data = sample_data();
        let store = build_store(&data, 4);
        let mut bytes = Vec::new();
        store.serialize(&mut bytes).unwrap();
        bytes[4] = 0xFF;
        assert!(matches!(
            SegmentStore::load(&bytes[..]),
            Err(NeatsError::FormatInvalid(_))
        ));
    }

    #[test]
    fn test_load_rejects_flipped_payload_byte() {
        let data = sample_data();
        let store = build_store(&data, 4);
        let mut bytes = Vec::new();
        store.serialize(&mut bytes).unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0x40;
        assert!(matches!(
            SegmentStore::load(&bytes[..]),
            Err(NeatsError::FormatInvalid(_))
        ));
    }

    #[test]
    fn test_load_rejects_truncation() {
        let data = sample_data();
        let store = build_store(&data, 4);
        let mut bytes = Vec::new();
        store.serialize(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            SegmentStore::load(&bytes[..]),
            Err(NeatsError::FormatInvalid(_))
        ));
    }

    #[test]
    fn test_space_usage_components_sum() {
        let data = sample_data();
        let store = build_store(&data, 4);
        let usage = store.space_usage();
        assert_eq!(
            usage.total_bits(),
            usage.residual_bits
                + usage.coefficient_bits
                + usage.tag_bits
                + usage.start_flag_bits
                + usage.rank_index_bits
                + usage.start_position_bits
                + usage.coefficient_index_bits
        );
        assert_eq!(usage.residual_bits, data.len() * 4);
        assert!(usage.compression_ratio(data.len()) < 1.0);
    }
}
