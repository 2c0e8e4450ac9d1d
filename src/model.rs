//! The model bank: family tags, warps, coefficients, and prediction.
//!
//! Positions inside a segment are 1-based (`j = i - start + 1`), which
//! keeps the radical and exponential warps total. Prediction is a single
//! scalar function shared by the build and every read path, so residuals
//! computed at build time reproduce bit for bit at query time.

use crate::hull::{ConstFitter, ParabolaFitter, StripFitter};

/// Number of families in the bank.
pub const BANK_SIZE: usize = 5;

/// Bits used to store a model tag (`⌈log2 BANK_SIZE⌉`).
pub const TAG_BITS: usize = 3;

/// Identifier of the frozen bank ordering, recorded in the serialized
/// header.
pub const BANK_ORDINAL: u8 = 1;

/// The model families, in frozen tag order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ModelKind {
    /// `f(j) = c0`
    Constant = 0,
    /// `f(j) = a·j + b`
    Linear = 1,
    /// `f(j) = a2·j² + a1·j + a0`
    Quadratic = 2,
    /// `f(j) = a·√j + b`
    Radical = 3,
    /// `f(j) = exp(a·j + b)`
    Exponential = 4,
}

/// The frozen bank, in tag order.
pub const BANK: [ModelKind; BANK_SIZE] = [
    ModelKind::Constant,
    ModelKind::Linear,
    ModelKind::Quadratic,
    ModelKind::Radical,
    ModelKind::Exponential,
];

impl ModelKind {
    /// Decode a tag; `None` for values outside the bank.
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ModelKind::Constant),
            1 => Some(ModelKind::Linear),
            2 => Some(ModelKind::Quadratic),
            3 => Some(ModelKind::Radical),
            4 => Some(ModelKind::Exponential),
            _ => None,
        }
    }

    /// The stable tag of this family.
    #[inline]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Storage width of the coefficient tuple in bits.
    pub const fn coeff_bits(self) -> usize {
        match self {
            ModelKind::Constant => 64,
            ModelKind::Quadratic => 32 + 32 + 64,
            _ => 32 + 64,
        }
    }
}

/// Coefficient tuple of a fitted model, already rounded to storage width.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Coefficients {
    /// Single constant, stored as `f64`.
    Constant(f64),
    /// Slope stored as `f32`, intercept as `f64`; shared by the linear,
    /// radical, and exponential families.
    Affine {
        /// Slope in warped coordinates.
        slope: f32,
        /// Intercept in warped coordinates.
        intercept: f64,
    },
    /// Quadratic and linear terms stored as `f32`, constant as `f64`.
    Quadratic {
        /// Coefficient of `j²`.
        a2: f32,
        /// Coefficient of `j`.
        a1: f32,
        /// Constant term.
        a0: f64,
    },
}

/// A fitted model: family tag plus rounded coefficients.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Model {
    /// Family tag.
    pub kind: ModelKind,
    /// Rounded coefficient tuple.
    pub coeffs: Coefficients,
}

impl Model {
    /// Integer prediction at 1-based in-segment position `j`.
    ///
    /// The floating-point value is rounded half away from zero and clipped
    /// to the `i64` range; non-finite intermediates clip the same way, so
    /// a degenerate model yields bounded (if useless) predictions rather
    /// than undefined behaviour.
    #[inline]
    pub fn predict(&self, j: u64) -> i64 {
        let x = j as f64;
        let v = match (self.kind, self.coeffs) {
            (ModelKind::Constant, Coefficients::Constant(c0)) => c0,
            (ModelKind::Linear, Coefficients::Affine { slope, intercept }) => {
                slope as f64 * x + intercept
            }
            (ModelKind::Radical, Coefficients::Affine { slope, intercept }) => {
                slope as f64 * x.sqrt() + intercept
            }
            (ModelKind::Exponential, Coefficients::Affine { slope, intercept }) => {
                (slope as f64 * x + intercept).exp()
            }
            (ModelKind::Quadratic, Coefficients::Quadratic { a2, a1, a0 }) => {
                a2 as f64 * x * x + a1 as f64 * x + a0
            }
            _ => unreachable!("coefficient tuple does not match model kind"),
        };
        let r = v.round();
        if r.is_nan() {
            0
        } else {
            // `as` saturates at the i64 range boundaries.
            r as i64
        }
    }
}

/// One live fitter per family, feeding the shared hull machinery through
/// the family's warp.
#[derive(Clone, Debug)]
pub enum FamilyFitter {
    /// d = 1 interval fitter.
    Constant(ConstFitter),
    /// d = 2 hull fitter under this family's warp.
    Strip(ModelKind, StripFitter),
    /// d = 3 half-space fitter.
    Quadratic(ParabolaFitter),
}

impl FamilyFitter {
    /// Open a fresh fitter for `kind`.
    pub fn open(kind: ModelKind) -> Self {
        match kind {
            ModelKind::Constant => FamilyFitter::Constant(ConstFitter::new()),
            ModelKind::Quadratic => FamilyFitter::Quadratic(ParabolaFitter::new()),
            k => FamilyFitter::Strip(k, StripFitter::new()),
        }
    }

    /// Feed the value at 1-based in-segment position `j` under tolerance
    /// `eps`; returns `false` on infeasibility.
    pub fn add(&mut self, j: u64, y: i64, eps: i64) -> bool {
        match self {
            FamilyFitter::Constant(f) => f.add(y, eps),
            FamilyFitter::Quadratic(f) => {
                let u = j as f64;
                let yf = y as f64;
                let e = eps as f64;
                f.add(u, yf - e, yf + e)
            }
            FamilyFitter::Strip(kind, f) => {
                let yf = y as f64;
                let e = eps as f64;
                match kind {
                    ModelKind::Linear => f.add(j as f64, yf - e, yf + e),
                    ModelKind::Radical => f.add((j as f64).sqrt(), yf - e, yf + e),
                    ModelKind::Exponential => {
                        // Both log-band edges must exist and stay away from
                        // the singularity at zero; values at or below the
                        // tolerance make this family infeasible here.
                        if y <= eps {
                            return false;
                        }
                        f.add(j as f64, (yf - e).ln(), (yf + e).ln())
                    }
                    _ => unreachable!("strip fitter opened for {:?}", kind),
                }
            }
        }
    }

    /// Close the fitter and extract the storage-rounded model, or `None`
    /// if it never accepted a point.
    pub fn finalise(&self, len: usize) -> Option<Model> {
        if len == 0 {
            return None;
        }
        Some(match self {
            FamilyFitter::Constant(f) => Model {
                kind: ModelKind::Constant,
                coeffs: Coefficients::Constant(f.coefficient()),
            },
            FamilyFitter::Strip(kind, f) => {
                let (slope, intercept) = f.coefficients();
                Model {
                    kind: *kind,
                    coeffs: Coefficients::Affine {
                        slope: slope as f32,
                        intercept,
                    },
                }
            }
            FamilyFitter::Quadratic(f) => {
                let [a, b, c] = f.coefficients();
                Model {
                    kind: ModelKind::Quadratic,
                    coeffs: Coefficients::Quadratic {
                        a2: a as f32,
                        a1: b as f32,
                        a0: c,
                    },
                }
            }
        })
    }
}

/// Per-segment overhead of a family in bits: tag, coefficients, start
/// position.
#[inline]
pub fn overhead_bits(kind: ModelKind, start_bits: usize) -> usize {
    TAG_BITS + kind.coeff_bits() + start_bits
}

/// Bits saved over the naïve 64-bit-per-element encoding by covering
/// `len` elements with one segment of this family.
#[inline]
pub fn score(kind: ModelKind, len: usize, bpc: u8, start_bits: usize) -> i64 {
    len as i64 * (64 - bpc as i64) - overhead_bits(kind, start_bits) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip() {
        for kind in BANK {
            assert_eq!(ModelKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ModelKind::from_tag(5), None);
        assert_eq!(ModelKind::from_tag(255), None);
    }

    #[test]
    fn test_bank_is_tag_ordered() {
        for (i, kind) in BANK.iter().enumerate() {
            assert_eq!(kind.tag() as usize, i);
        }
        assert!(BANK_SIZE <= 1 << TAG_BITS);
    }

    #[test]
    fn test_predict_constant() {
        let m = Model {
            kind: ModelKind::Constant,
            coeffs: Coefficients::Constant(41.5),
        };
        assert_eq!(m.predict(1), 42);
        assert_eq!(m.predict(1000), 42);
    }

    #[test]
    fn test_predict_linear() {
        let m = Model {
            kind: ModelKind::Linear,
            coeffs: Coefficients::Affine {
                slope: 2.0,
                intercept: -2.0,
            },
        };
        for j in 1..=10u64 {
            assert_eq!(m.predict(j), 2 * j as i64 - 2);
        }
    }

    #[test]
    fn test_predict_quadratic() {
        let m = Model {
            kind: ModelKind::Quadratic,
            coeffs: Coefficients::Quadratic {
                a2: 1.0,
                a1: 0.0,
                a0: 0.0,
            },
        };
        for j in 1..=100u64 {
            assert_eq!(m.predict(j), (j * j) as i64);
        }
    }

    #[test]
    fn test_predict_saturates() {
        let m = Model {
            kind: ModelKind::Exponential,
            coeffs: Coefficients::Affine {
                slope: 100.0,
                intercept: 0.0,
            },
        };
        // exp overflows to infinity; the cast clips at the i64 boundary.
        assert_eq!(m.predict(50), i64::MAX);
    }

    #[test]
    fn test_exponential_fitter_rejects_small_values() {
        let mut f = FamilyFitter::open(ModelKind::Exponential);
        assert!(!f.add(1, 0, 3));
        assert!(f.finalise(0).is_none());
    }

    #[test]
    fn test_family_fitter_linear_roundtrip() {
        let mut f = FamilyFitter::open(ModelKind::Linear);
        let mut accepted = 0;
        for j in 1..=50u64 {
            let y = 3 * j as i64 + 4;
            if f.add(j, y, 1) {
                accepted = j as usize;
            } else {
                break;
            }
        }
        assert_eq!(accepted, 50);
        let m = f.finalise(accepted).unwrap();
        for j in 1..=50u64 {
            let y = 3 * j as i64 + 4;
            let r = y - m.predict(j);
            assert!((-2..=1).contains(&r), "residual {} at {}", r, j);
        }
    }

    #[test]
    fn test_overhead_and_score() {
        // A longer segment always scores at least as well within a family.
        assert!(score(ModelKind::Linear, 10, 8, 20) > score(ModelKind::Linear, 9, 8, 20));
        // The constant family has the smallest overhead.
        for kind in &BANK[1..] {
            assert!(overhead_bits(*kind, 10) > overhead_bits(ModelKind::Constant, 10));
        }
    }
}
