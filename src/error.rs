//! Error types for cosine-gpu.

use thiserror::Error;

use crate::verify::Mismatch;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A vector's length differs from the first vector in the set.
    #[error("vector {index} has length {found}, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    /// A vector with zero magnitude has no defined cosine distance.
    #[error("vector {index} has zero magnitude")]
    DegenerateVector { index: usize },

    /// The squared magnitude is too large or too small for `|a|² |b|²` to be
    /// computed without overflow or underflow.
    #[error("vector {index} has squared magnitude {magnitude:e}, outside the representable range")]
    MagnitudeOutOfRange { index: usize, magnitude: f64 },

    #[error("component {col} of vector {row} is not finite")]
    NonFiniteComponent { row: usize, col: usize },

    /// Two buffers or matrices that must agree in size do not.
    #[error("shape mismatch: expected {expected} elements, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("no compatible GPU adapter found")]
    NoAdapter,

    /// The adapter lacks a capability the compute pipeline needs.
    #[error("unsupported device: {0}")]
    UnsupportedDevice(String),

    #[error("failed to request device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    /// Device memory could not be allocated, written or read back.
    #[error("device resource acquisition failed: {0}")]
    ResourceAcquisition(String),

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("benchmark task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("configuration error: {0}")]
    Config(String),

    /// Raised by the driver when the two engines disagree.
    #[error(
        "results differ at ({}, {}): expected {}, actual {}, divergence {:e}",
        .0.row, .0.col, .0.expected, .0.actual, .0.divergence
    )]
    VerificationFailed(Mismatch),
}

/// Result type for cosine-gpu operations.
pub type Result<T> = std::result::Result<T, Error>;
