//! Immutable vector sets and the generators that feed the benchmark.

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

/// `n` vectors of equal length `dim`, stored row-major in one flat buffer.
///
/// Construction guarantees every vector has the same length, only finite
/// components, and a squared magnitude whose square is finite and non-zero.
/// Every product `|a|² |b|²` in the kernel then stays representable.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSet {
    data: Vec<f64>,
    len: usize,
    dim: usize,
}

impl VectorSet {
    pub fn new(vectors: Vec<Vec<f64>>) -> Result<Self> {
        let Some(dim) = vectors.first().map(Vec::len) else {
            return Ok(Self::empty());
        };
        if dim == 0 {
            return Err(Error::DegenerateVector { index: 0 });
        }

        let mut data = Vec::with_capacity(vectors.len() * dim);
        for (index, vector) in vectors.iter().enumerate() {
            if vector.len() != dim {
                return Err(Error::DimensionMismatch {
                    index,
                    expected: dim,
                    found: vector.len(),
                });
            }
            data.extend_from_slice(vector);
        }

        Self::from_flat(dim, data)
    }

    /// Builds a set from a row-major buffer holding `data.len() / dim` vectors.
    pub fn from_flat(dim: usize, data: Vec<f64>) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::empty());
        }
        if dim == 0 {
            return Err(Error::DegenerateVector { index: 0 });
        }
        if data.len() % dim != 0 {
            return Err(Error::DimensionMismatch {
                index: data.len() / dim,
                expected: dim,
                found: data.len() % dim,
            });
        }

        for (row, vector) in data.chunks_exact(dim).enumerate() {
            if let Some(col) = vector.iter().position(|x| !x.is_finite()) {
                return Err(Error::NonFiniteComponent { row, col });
            }
            if vector.iter().all(|&x| x == 0.0) {
                return Err(Error::DegenerateVector { index: row });
            }
            let magnitude = vector.iter().map(|x| x * x).sum::<f64>();
            let product = magnitude * magnitude;
            if !(product > 0.0 && product.is_finite()) {
                return Err(Error::MagnitudeOutOfRange {
                    index: row,
                    magnitude,
                });
            }
        }

        let len = data.len() / dim;
        Ok(Self { data, len, dim })
    }

    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            len: 0,
            dim: 0,
        }
    }

    /// Number of vectors.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Length shared by every vector; 0 for an empty set.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn vector(&self, index: usize) -> &[f64] {
        &self.data[index * self.dim..(index + 1) * self.dim]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on a zero chunk size
        self.data.chunks_exact(self.dim.max(1))
    }

    /// The row-major buffer uploaded to the device.
    pub fn as_flat(&self) -> &[f64] {
        &self.data
    }
}

/// Which generator produces the benchmark dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DatasetKind {
    /// Deterministic ramp: component `k` of vector `i` is `i + k + 2.1`.
    Synthetic,
    /// Seeded uniform components in `[0, 1)`.
    Random,
}

impl DatasetKind {
    pub fn generate(self, samples: usize, dimensions: usize, seed: u64) -> Result<VectorSet> {
        match self {
            DatasetKind::Synthetic => synthetic(samples, dimensions),
            DatasetKind::Random => random(samples, dimensions, seed),
        }
    }
}

pub fn synthetic(samples: usize, dimensions: usize) -> Result<VectorSet> {
    let data = (0..samples)
        .flat_map(|i| (1..=dimensions).map(move |m| i as f64 + m as f64 + 1.1))
        .collect();
    VectorSet::from_flat(dimensions, data)
}

pub fn random(samples: usize, dimensions: usize, seed: u64) -> Result<VectorSet> {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..samples * dimensions)
        .map(|_| rng.gen_range(0.0..1.0))
        .collect();
    VectorSet::from_flat(dimensions, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_vectors() {
        let err = VectorSet::new(vec![vec![1.0, 2.0], vec![3.0], vec![4.0, 5.0]]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                index: 1,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn rejects_zero_vectors() {
        let err = VectorSet::new(vec![vec![1.0, 2.0], vec![0.0, 0.0]]).unwrap_err();
        assert!(matches!(err, Error::DegenerateVector { index: 1 }));
    }

    #[test]
    fn rejects_empty_vectors_in_non_empty_set() {
        let err = VectorSet::new(vec![vec![], vec![]]).unwrap_err();
        assert!(matches!(err, Error::DegenerateVector { index: 0 }));
    }

    #[test]
    fn rejects_magnitude_that_overflows() {
        let err = VectorSet::new(vec![vec![1.0, 2.0], vec![1e100, 1e100]]).unwrap_err();
        assert!(matches!(err, Error::MagnitudeOutOfRange { index: 1, .. }));

        let err = VectorSet::new(vec![vec![1e160]]).unwrap_err();
        assert!(matches!(err, Error::MagnitudeOutOfRange { index: 0, .. }));
    }

    #[test]
    fn rejects_magnitude_that_underflows() {
        let err = VectorSet::new(vec![vec![1e-200, 1e-200]]).unwrap_err();
        assert!(matches!(err, Error::MagnitudeOutOfRange { index: 0, .. }));

        let err = VectorSet::new(vec![vec![1e-100]]).unwrap_err();
        assert!(matches!(err, Error::MagnitudeOutOfRange { index: 0, .. }));
    }

    #[test]
    fn accepted_extremes_keep_zero_self_distance() {
        let set = VectorSet::new(vec![vec![1e70, 1e70], vec![1e-70, 3e-70]]).unwrap();
        for v in set.iter() {
            assert_eq!(crate::kernel::cosine_distance(v, v), 0.0);
        }
    }

    #[test]
    fn rejects_nan() {
        let err = VectorSet::new(vec![vec![1.0, f64::NAN]]).unwrap_err();
        assert!(matches!(err, Error::NonFiniteComponent { row: 0, col: 1 }));
    }

    #[test]
    fn rejects_trailing_partial_vector() {
        assert!(VectorSet::from_flat(3, vec![1.0; 7]).is_err());
    }

    #[test]
    fn empty_set() {
        let set = VectorSet::new(Vec::new()).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.dim(), 0);
        assert_eq!(set.iter().count(), 0);
    }

    #[test]
    fn rows_are_row_major() {
        let set = VectorSet::new(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.vector(1), &[3.0, 4.0]);
        assert_eq!(set.as_flat(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn synthetic_ramp() {
        let set = synthetic(3, 4).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.dim(), 4);
        assert!((set.vector(0)[0] - 2.1).abs() < 1e-12);
        assert!((set.vector(2)[3] - 7.1).abs() < 1e-12);
    }

    #[test]
    fn random_is_seeded() {
        let a = random(4, 8, 7).unwrap();
        let b = random(4, 8, 7).unwrap();
        let c = random(4, 8, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_flat().iter().all(|x| (0.0..1.0).contains(x)));
    }
}
