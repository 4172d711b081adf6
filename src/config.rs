use clap::{Parser, ValueEnum};

use crate::cpu::available_threads;
use crate::dataset::DatasetKind;
use crate::error::{Error, Result};
use crate::gpu::GpuOptions;
use crate::verify::DEFAULT_TOLERANCE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PowerPreference {
    None,
    Low,
    High,
}

impl From<PowerPreference> for wgpu::PowerPreference {
    fn from(value: PowerPreference) -> Self {
        match value {
            PowerPreference::None => wgpu::PowerPreference::None,
            PowerPreference::Low => wgpu::PowerPreference::LowPower,
            PowerPreference::High => wgpu::PowerPreference::HighPerformance,
        }
    }
}

/// Pairwise cosine distances on GPU and CPU, cross-checked.
#[derive(Parser, Debug, Clone)]
#[command(name = "cosine-gpu", version)]
pub struct BenchConfig {
    /// Number of vectors
    #[arg(long, env = "COSINE_GPU_SAMPLES", default_value_t = 300)]
    pub samples: usize,

    /// Length of every vector
    #[arg(long, env = "COSINE_GPU_DIMENSIONS", default_value_t = 8000)]
    pub dimensions: usize,

    #[arg(long, env = "COSINE_GPU_DATASET", value_enum, default_value_t = DatasetKind::Synthetic)]
    pub dataset: DatasetKind,

    /// Seed for the random dataset
    #[arg(long, env = "COSINE_GPU_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Largest accepted absolute difference between the two engines
    #[arg(long, env = "COSINE_GPU_TOLERANCE", default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: f64,

    /// CPU worker threads (defaults to available parallelism)
    #[arg(long, env = "COSINE_GPU_THREADS")]
    pub threads: Option<usize>,

    #[arg(long, env = "COSINE_GPU_POWER_PREFERENCE", value_enum, default_value_t = PowerPreference::High)]
    pub power_preference: PowerPreference,

    /// Print every GPU adapter and exit
    #[arg(long)]
    pub list_devices: bool,
}

impl BenchConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::Config(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if self.threads == Some(0) {
            return Err(Error::Config("threads must be at least 1".into()));
        }
        Ok(())
    }

    pub fn threads(&self) -> usize {
        self.threads.unwrap_or_else(available_threads)
    }

    pub fn gpu_options(&self) -> GpuOptions {
        GpuOptions {
            power_preference: self.power_preference.into(),
            ..GpuOptions::default()
        }
    }
}
