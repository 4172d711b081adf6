//! Cell-by-cell comparison of two distance matrices.

use crate::error::{Error, Result};
use crate::matrix::DistanceMatrix;

/// Largest absolute difference accepted between two engines' results.
pub const DEFAULT_TOLERANCE: f64 = 1e-7;

/// The first cell, in row-major order, whose divergence exceeds the tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mismatch {
    pub row: usize,
    pub col: usize,
    pub expected: f64,
    pub actual: f64,
    pub divergence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verification {
    /// Every cell is within tolerance.
    Match { max_divergence: f64 },
    Mismatch(Mismatch),
}

impl Verification {
    pub fn is_match(&self) -> bool {
        matches!(self, Verification::Match { .. })
    }

    /// Turns a mismatch into [`Error::VerificationFailed`].
    pub fn into_result(self) -> Result<f64> {
        match self {
            Verification::Match { max_divergence } => Ok(max_divergence),
            Verification::Mismatch(mismatch) => Err(Error::VerificationFailed(mismatch)),
        }
    }
}

/// Compares `actual` against `expected`, stopping at the first cell whose
/// absolute difference is not within `tolerance`. A NaN difference counts as
/// a mismatch.
pub fn verify(
    expected: &DistanceMatrix,
    actual: &DistanceMatrix,
    tolerance: f64,
) -> Result<Verification> {
    if expected.size() != actual.size() {
        return Err(Error::ShapeMismatch {
            expected: expected.as_slice().len(),
            found: actual.as_slice().len(),
        });
    }

    let n = expected.size();
    let mut max_divergence = 0.0_f64;
    for (idx, (&e, &a)) in expected.as_slice().iter().zip(actual.as_slice()).enumerate() {
        let divergence = (e - a).abs();
        if !(divergence <= tolerance) {
            return Ok(Verification::Mismatch(Mismatch {
                row: idx / n,
                col: idx % n,
                expected: e,
                actual: a,
                divergence,
            }));
        }
        max_divergence = max_divergence.max(divergence);
    }

    Ok(Verification::Match { max_divergence })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(values: &[f64]) -> DistanceMatrix {
        let size = (values.len() as f64).sqrt() as usize;
        DistanceMatrix::from_vec(size, values.to_vec()).unwrap()
    }

    #[test]
    fn identical_matrices_match() {
        let m = matrix(&[0.0, 0.3, 0.3, 0.0]);
        assert_eq!(
            verify(&m, &m, DEFAULT_TOLERANCE).unwrap(),
            Verification::Match { max_divergence: 0.0 }
        );
    }

    #[test]
    fn divergence_within_tolerance_matches() {
        let a = matrix(&[0.0, 0.3, 0.3, 0.0]);
        let b = matrix(&[0.0, 0.3 + 5e-8, 0.3, 0.0]);
        let result = verify(&a, &b, DEFAULT_TOLERANCE).unwrap();
        assert!(result.is_match());
    }

    #[test]
    fn reports_first_mismatch_in_row_major_order() {
        let a = matrix(&[0.0, 0.1, 0.2, 0.1, 0.0, 0.3, 0.2, 0.3, 0.0]);
        let b = matrix(&[0.0, 0.1, 0.2, 0.1, 0.0, 0.5, 0.9, 0.3, 0.0]);
        let Verification::Mismatch(mismatch) = verify(&a, &b, DEFAULT_TOLERANCE).unwrap() else {
            panic!("expected a mismatch");
        };
        assert_eq!((mismatch.row, mismatch.col), (1, 2));
        assert_eq!(mismatch.expected, 0.3);
        assert_eq!(mismatch.actual, 0.5);
        assert!((mismatch.divergence - 0.2).abs() < 1e-12);
    }

    #[test]
    fn nan_is_a_mismatch() {
        let a = matrix(&[0.0]);
        let b = matrix(&[f64::NAN]);
        assert!(!verify(&a, &b, 1.0).unwrap().is_match());
    }

    #[test]
    fn different_sizes_are_an_error() {
        let err = verify(&DistanceMatrix::zeros(2), &DistanceMatrix::zeros(3), 0.0).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: 4, found: 9 }));
    }

    #[test]
    fn empty_matrices_match() {
        let empty = DistanceMatrix::zeros(0);
        assert!(verify(&empty, &empty, DEFAULT_TOLERANCE).unwrap().is_match());
    }

    #[test]
    fn mismatch_converts_to_error() {
        let a = matrix(&[0.0]);
        let b = matrix(&[1.0]);
        let err = verify(&a, &b, DEFAULT_TOLERANCE).unwrap().into_result().unwrap_err();
        assert!(matches!(err, Error::VerificationFailed(Mismatch { row: 0, col: 0, .. })));
    }
}
