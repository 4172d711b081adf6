#![allow(dead_code)]

use cosine_gpu::{CpuEngine, DistanceEngine, DistanceMatrix, GpuEngine, GpuOptions};
use tokio::runtime::Runtime;

/// Builds the GPU engine. Panics when no f64-capable adapter is present;
/// callers only run with the `gpu-tests` feature.
pub fn gpu_engine() -> GpuEngine {
    let runtime = Runtime::new().unwrap();
    runtime
        .block_on(GpuEngine::new(GpuOptions::default()))
        .expect("gpu-tests needs an f64-capable GPU adapter")
}

/// The CPU engine, plus the GPU engine when built with `gpu-tests`.
pub fn engines() -> Vec<Box<dyn DistanceEngine>> {
    let mut engines: Vec<Box<dyn DistanceEngine>> = vec![Box::new(CpuEngine::new(4).unwrap())];
    if cfg!(feature = "gpu-tests") {
        engines.push(Box::new(gpu_engine()));
    }
    engines
}

pub fn assert_symmetric(matrix: &DistanceMatrix, tolerance: f64, context: &str) {
    for i in 0..matrix.size() {
        for j in 0..i {
            let (a, b) = (matrix.get(i, j), matrix.get(j, i));
            assert!(
                (a - b).abs() <= tolerance,
                "{context}: d({i}, {j}) = {a} but d({j}, {i}) = {b}"
            );
        }
    }
}
