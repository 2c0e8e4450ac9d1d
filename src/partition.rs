//! The piecewise optimal approximator.
//!
//! Grows one fitter per model family in parallel from the current start,
//! closes each on infeasibility, and emits the candidate that saves the
//! most bits. Every candidate is re-verified against its storage-rounded
//! coefficients with 128-bit arithmetic before scoring, so an emitted
//! segment never owes its length to precision the stored coefficients do
//! not have.

use crate::bitpack::bits_for;
use crate::error::NeatsError;
use crate::model::{score, FamilyFitter, Model, BANK, BANK_SIZE};

/// One emitted segment: absolute start, covered length, fitted model.
#[derive(Clone, Copy, Debug)]
pub struct SegmentRec {
    /// Absolute start position in the input.
    pub start: usize,
    /// Number of covered elements, `>= 1`.
    pub len: usize,
    /// The fitted model with storage-rounded coefficients.
    pub model: Model,
}

/// Maximum residual magnitude for a given residual width.
#[inline]
pub fn epsilon_for(bpc: u8) -> i64 {
    (1i64 << (bpc - 1)) - 1
}

/// Longest prefix of `window` whose residuals against the rounded model
/// fit the storable range `[-(eps + 1), eps]`.
fn verified_len(model: &Model, window: &[i64], eps: i64) -> usize {
    let lo = -(eps as i128) - 1;
    let hi = eps as i128;
    for (k, &y) in window.iter().enumerate() {
        let pred = model.predict(k as u64 + 1) as i128;
        let r = y as i128 - pred;
        if r < lo || r > hi {
            return k;
        }
    }
    window.len()
}

/// Partition `data` into segments under the residual bound implied by
/// `bpc`.
///
/// The caller guarantees `bpc ∈ [1, 63]` and a non-empty input; the only
/// runtime failure is [`NeatsError::NumericUnrepresentable`], raised when
/// some element cannot be covered by any family (possible only for
/// magnitudes the prediction arithmetic cannot reach, around 2⁵³ and
/// beyond).
pub fn partition(data: &[i64], bpc: u8) -> Result<Vec<SegmentRec>, NeatsError> {
    debug_assert!((1..=63).contains(&bpc));
    debug_assert!(!data.is_empty());

    let n = data.len();
    let eps = epsilon_for(bpc);
    let start_bits = bits_for(n);
    let mut segments = Vec::new();
    let mut p = 0usize;

    while p < n {
        let mut fitters: [Option<FamilyFitter>; BANK_SIZE] =
            BANK.map(|kind| Some(FamilyFitter::open(kind)));
        let mut models: [Option<Model>; BANK_SIZE] = [None; BANK_SIZE];
        let mut lens = [0usize; BANK_SIZE];
        let mut live = BANK_SIZE;

        let mut i = p;
        while live > 0 && i < n {
            let j = (i - p + 1) as u64;
            let y = data[i];
            for (m, slot) in fitters.iter_mut().enumerate() {
                if let Some(fitter) = slot {
                    if fitter.add(j, y, eps) {
                        lens[m] = i - p + 1;
                    } else {
                        models[m] = fitter.finalise(lens[m]);
                        *slot = None;
                        live -= 1;
                    }
                }
            }
            i += 1;
        }
        // Fitters still alive at the end of the input close there.
        for (m, slot) in fitters.iter().enumerate() {
            if let Some(fitter) = slot {
                models[m] = fitter.finalise(lens[m]);
            }
        }

        // Score the survivors on their verified lengths; ties fall to the
        // narrower coefficient tuple, then the smaller tag (the bank is
        // iterated in tag order, so never replacing on a full tie suffices).
        let mut best: Option<(i64, usize, usize)> = None; // (score, width, slot)
        let mut best_len = 0usize;
        for (m, kind) in BANK.iter().enumerate() {
            let Some(model) = &models[m] else { continue };
            let claimed = lens[m];
            if claimed == 0 {
                continue;
            }
            let ver = verified_len(model, &data[p..p + claimed], eps);
            if ver == 0 {
                continue;
            }
            let sc = score(*kind, ver, bpc, start_bits);
            let width = kind.coeff_bits();
            let better = match best {
                None => true,
                Some((bs, bw, _)) => sc > bs || (sc == bs && width < bw),
            };
            if better {
                best = Some((sc, width, m));
                best_len = ver;
            }
        }

        let Some((_, _, m)) = best else {
            return Err(NeatsError::NumericUnrepresentable {
                position: p,
                value: data[p],
            });
        };
        segments.push(SegmentRec {
            start: p,
            len: best_len,
            model: models[m].expect("winning slot holds a model"),
        });
        p += best_len;
    }

    Ok(segments)
}
