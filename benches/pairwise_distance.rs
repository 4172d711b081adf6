// /benches/pairwise_distance.rs

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Runtime;
use cosine_gpu::dataset::synthetic;
use cosine_gpu::{CpuEngine, GpuEngine, GpuOptions};

const DIMENSIONS: usize = 1_000;

fn cpu_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pairwise Cosine/CPU");
    let engine = CpuEngine::with_available_parallelism().unwrap();

    for &size in &[16, 64, 128, 300] {
        let set = synthetic(size, DIMENSIONS).unwrap();
        group.bench_with_input(BenchmarkId::new("Vectors", size), &set, |bencher, set| {
            bencher.iter(|| engine.compute(set));
        });
    }
    group.finish();
}

fn gpu_benchmark(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let engine = match runtime.block_on(GpuEngine::new(GpuOptions::default())) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("skipping GPU benchmarks: {err}");
            return;
        }
    };

    let mut group = c.benchmark_group("Pairwise Cosine/GPU");

    // Set longer measurement time for GPU to get reliable samples
    group.sample_size(50).measurement_time(std::time::Duration::from_secs(10));

    for &size in &[16, 64, 128, 300] {
        let set = synthetic(size, DIMENSIONS).unwrap();
        // Warm-up outside the measurement.
        runtime.block_on(engine.compute(&set)).unwrap();
        group.bench_with_input(BenchmarkId::new("Vectors", size), &set, |bencher, set| {
            bencher.iter(|| runtime.block_on(engine.compute(set)).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, cpu_benchmark, gpu_benchmark);
criterion_main!(benches);
