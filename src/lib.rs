//! Pairwise cosine-distance matrices on a rayon thread pool and on a wgpu
//! compute device, with cross-verification of the two results.

pub mod config;
pub mod cpu;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod gpu;
pub mod harness;
pub mod kernel;
pub mod matrix;
pub mod verify;

pub use cpu::CpuEngine;
pub use dataset::{DatasetKind, VectorSet};
pub use engine::DistanceEngine;
pub use error::{Error, Result};
pub use gpu::{GpuEngine, GpuOptions};
pub use harness::{BenchmarkHarness, BenchmarkReport, LogSink, ReportSink};
pub use kernel::cosine_distance;
pub use matrix::DistanceMatrix;
pub use verify::{verify, Mismatch, Verification, DEFAULT_TOLERANCE};
