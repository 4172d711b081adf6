//! Warm-up, timed runs and cross-checking of two engines.

use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::dataset::VectorSet;
use crate::engine::DistanceEngine;
use crate::error::Result;
use crate::verify::{verify, Verification};

#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    pub accelerator_name: String,
    pub cpu_name: String,
    pub samples: usize,
    pub dimensions: usize,
    /// Accelerator setup (device and pipeline creation) plus one throwaway
    /// dispatch.
    pub warmup: Duration,
    pub accelerator: Duration,
    pub cpu: Duration,
    /// `cpu / accelerator`; `None` when the accelerator run took no measurable time.
    pub speedup: Option<f64>,
    pub verification: Verification,
}

/// Receives the outcome of a benchmark run.
pub trait ReportSink {
    fn report(&mut self, report: &BenchmarkReport);
}

/// Writes reports through the `log` facade.
#[derive(Debug, Default)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn report(&mut self, report: &BenchmarkReport) {
        info!(
            "dataset: {} vectors x {} dimensions",
            report.samples, report.dimensions
        );
        info!("warm-up: {:?}", report.warmup);
        info!("{}: {:?}", report.accelerator_name, report.accelerator);
        info!("{}: {:?}", report.cpu_name, report.cpu);
        match report.speedup {
            Some(speedup) => info!("speed-up: {speedup:.2}x"),
            None => info!("speed-up: n/a"),
        }
        match report.verification {
            Verification::Match { max_divergence } => {
                info!("verification passed, max divergence {max_divergence:e}")
            }
            Verification::Mismatch(m) => error!(
                "verification failed at ({}, {}): expected {}, actual {}",
                m.row, m.col, m.expected, m.actual
            ),
        }
    }
}

pub struct BenchmarkHarness {
    tolerance: f64,
}

impl BenchmarkHarness {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Warms up the accelerator, times both engines on `set` and verifies the
    /// accelerator's matrix against the CPU's.
    pub fn run(
        &self,
        set: &VectorSet,
        accelerator: &dyn DistanceEngine,
        cpu: &dyn DistanceEngine,
    ) -> Result<BenchmarkReport> {
        // The first dispatch pays for driver-side shader compilation on top
        // of the pipeline build already done when the engine was created.
        let warmup_set = VectorSet::from_flat(1, vec![1.0])?;
        let (_, first_dispatch) = timed(|| accelerator.execute(&warmup_set))?;
        let warmup = accelerator.setup_time() + first_dispatch;

        let (accelerator_result, accelerator_time) = timed(|| accelerator.execute(set))?;
        let (cpu_result, cpu_time) = timed(|| cpu.execute(set))?;

        let verification = verify(&cpu_result, &accelerator_result, self.tolerance)?;

        let accelerator_secs = accelerator_time.as_secs_f64();
        let speedup = (accelerator_secs > 0.0).then(|| cpu_time.as_secs_f64() / accelerator_secs);
        if speedup.is_none() {
            warn!("{} finished too fast to time, no speed-up", accelerator.name());
        }

        Ok(BenchmarkReport {
            accelerator_name: accelerator.name().to_string(),
            cpu_name: cpu.name().to_string(),
            samples: set.len(),
            dimensions: set.dim(),
            warmup,
            accelerator: accelerator_time,
            cpu: cpu_time,
            speedup,
            verification,
        })
    }
}

fn timed<T>(f: impl FnOnce() -> Result<T>) -> Result<(T, Duration)> {
    let start = Instant::now();
    let value = f()?;
    Ok((value, start.elapsed()))
}
