//! Vectorised full decompression and range scan.
//!
//! Semantics are identical to the sequential paths: one segment at a time,
//! residual runs decoded in blocks and added to the model predictions.
//! Prediction itself stays scalar in both paths so they agree bit for
//! bit; the wide win comes from the batched residual decode and the
//! 4-lane residual-plus-prediction add, which uses AVX2 when the CPU has
//! it and falls back to scalar code otherwise.
//!
//! Callers are expected to hand in a buffer aligned to the vector width
//! (32 bytes). The kernels use unaligned loads, so a misaligned buffer
//! degrades throughput instead of faulting.

use crate::store::SegmentStore;

/// Elements processed per residual-decode block.
const BLOCK: usize = 1024;

/// Reconstruct the full sequence into `out`, batching per segment.
///
/// # Panics
/// Panics if `out.len()` differs from the stored element count.
pub fn simd_decompress(store: &SegmentStore, out: &mut [i64]) {
    assert_eq!(out.len(), store.len(), "output buffer length mismatch");
    let mut preds = [0i64; BLOCK];
    for k in 0..store.segment_count() {
        let (s, l) = store.segment_bounds(k);
        let model = store.model(k);
        let mut done = 0;
        while done < l {
            let take = (l - done).min(BLOCK);
            let dst = &mut out[s + done..s + done + take];
            store.residual_run(s + done, dst);
            for (off, p) in preds[..take].iter_mut().enumerate() {
                *p = model.predict((done + off) as u64 + 1);
            }
            add_arrays(&preds[..take], dst);
            done += take;
        }
    }
}

/// Reconstruct positions `[lo, hi)` into `out`, walking only the
/// intersecting segments and batching exactly like
/// [`simd_decompress`]; partial head and tail segments are handled by
/// offsetting the prediction position.
///
/// # Panics
/// Panics if the range is out of bounds or `out.len() != hi - lo`.
pub fn simd_scan(store: &SegmentStore, lo: usize, hi: usize, out: &mut [i64]) {
    assert!(lo <= hi && hi <= store.len(), "scan range out of bounds");
    assert_eq!(out.len(), hi - lo, "output buffer length mismatch");
    if lo == hi {
        return;
    }
    let mut preds = [0i64; BLOCK];
    let (mut k, _, _) = store.segment_of(lo);
    let mut pos = lo;
    while pos < hi {
        let (s, l) = store.segment_bounds(k);
        let stop = (s + l).min(hi);
        let model = store.model(k);
        while pos < stop {
            let take = (stop - pos).min(BLOCK);
            let dst = &mut out[pos - lo..pos - lo + take];
            store.residual_run(pos, dst);
            let base_j = pos - s;
            for (off, p) in preds[..take].iter_mut().enumerate() {
                *p = model.predict((base_j + off) as u64 + 1);
            }
            add_arrays(&preds[..take], dst);
            pos += take;
        }
        k += 1;
    }
}

/// `dst[i] += preds[i]`, dispatched to the widest available kernel.
fn add_arrays(preds: &[i64], dst: &mut [i64]) {
    debug_assert_eq!(preds.len(), dst.len());
    #[cfg(target_arch = "x86_64")]
    {
        if std::is_x86_feature_detected!("avx2") {
            // SAFETY: AVX2 presence was just checked.
            unsafe { add_arrays_avx2(preds, dst) };
            return;
        }
    }
    add_arrays_scalar(preds, dst);
}

#[inline]
fn add_arrays_scalar(preds: &[i64], dst: &mut [i64]) {
    for (slot, &p) in dst.iter_mut().zip(preds.iter()) {
        *slot += p;
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn add_arrays_avx2(preds: &[i64], dst: &mut [i64]) {
    use std::arch::x86_64::*;

    const LANES: usize = 4;
    let n = dst.len();
    let wide_end = n - (n % LANES);

    let mut i = 0;
    while i < wide_end {
        let a = _mm256_loadu_si256(preds.as_ptr().add(i) as *const __m256i);
        let b = _mm256_loadu_si256(dst.as_ptr().add(i) as *const __m256i);
        let sum = _mm256_add_epi64(a, b);
        _mm256_storeu_si256(dst.as_mut_ptr().add(i) as *mut __m256i, sum);
        i += LANES;
    }

    // Tail shorter than one vector.
    add_arrays_scalar(&preds[i..], &mut dst[i..]);
}
