//! Multi-threaded CPU engine.

use std::num::NonZeroUsize;
use std::thread;

use log::{debug, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::dataset::VectorSet;
use crate::engine::DistanceEngine;
use crate::error::{Error, Result};
use crate::kernel::{cosine_distance, decode_index};
use crate::matrix::DistanceMatrix;

/// Fills the distance matrix on a dedicated rayon pool.
///
/// The flattened range `[0, n²)` is cut into one contiguous chunk per worker.
/// Chunks are disjoint slices of the output buffer, so workers never share a
/// cell and need no locking.
pub struct CpuEngine {
    pool: ThreadPool,
    threads: usize,
    name: String,
}

impl CpuEngine {
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(Error::Config("CPU engine needs at least one thread".into()));
        }
        let available = available_threads();
        if threads > available {
            warn!("cpu: {threads} workers oversubscribe {available} hardware threads");
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("cosine-cpu-{i}"))
            .build()?;
        Ok(Self {
            pool,
            threads,
            name: format!("CPU ({threads} threads)"),
        })
    }

    /// One worker per available hardware thread.
    pub fn with_available_parallelism() -> Result<Self> {
        Self::new(available_threads())
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn compute(&self, set: &VectorSet) -> DistanceMatrix {
        let n = set.len();
        let mut distances = DistanceMatrix::zeros(n);
        if n == 0 {
            return distances;
        }

        let cells = n * n;
        let chunk_len = cells.div_ceil(self.threads);
        debug!(
            "cpu: {} cells across {} workers, {} cells per chunk",
            cells, self.threads, chunk_len
        );

        self.pool.install(|| {
            distances
                .as_mut_slice()
                .par_chunks_mut(chunk_len)
                .enumerate()
                .for_each(|(chunk, cells)| {
                    let start = chunk * chunk_len;
                    for (offset, cell) in cells.iter_mut().enumerate() {
                        let (i, j) = decode_index(start + offset, n);
                        *cell = cosine_distance(set.vector(i), set.vector(j));
                    }
                });
        });

        distances
    }
}

impl DistanceEngine for CpuEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, set: &VectorSet) -> Result<DistanceMatrix> {
        Ok(self.compute(set))
    }
}

pub fn available_threads() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
