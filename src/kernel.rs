//! Cosine distance between two vectors.
//!
//! The per-pair arithmetic here is mirrored line for line by
//! `shaders/cosine_distance.wgsl`, so both engines accumulate in the same order.

/// Computes `max(0, 1 - a·b / sqrt(|a|² |b|²))`.
///
/// Both slices must have the same length. A zero-magnitude input yields a
/// non-finite quotient; `VectorSet` rejects such vectors before they get here.
pub fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have the same length");

    let mut dot = 0.0;
    let mut mag_a = 0.0;
    let mut mag_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    (1.0 - dot / (mag_a * mag_b).sqrt()).max(0.0)
}

/// Splits a flattened index over an `n`×`n` grid into `(row, col)`.
#[inline]
pub fn decode_index(idx: usize, n: usize) -> (usize, usize) {
    (idx / n, idx % n)
}
