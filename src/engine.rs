use std::time::Duration;

use crate::dataset::VectorSet;
use crate::error::Result;
use crate::matrix::DistanceMatrix;

/// A parallel strategy for filling the pairwise cosine-distance matrix.
///
/// `execute` blocks until every cell is written. Implementations must produce
/// the same values as [`crate::kernel::cosine_distance`] for every pair.
pub trait DistanceEngine {
    /// Short label used in reports.
    fn name(&self) -> &str;

    fn execute(&self, set: &VectorSet) -> Result<DistanceMatrix>;

    /// One-time initialisation cost already paid when the engine was built,
    /// such as shader and pipeline compilation.
    fn setup_time(&self) -> Duration {
        Duration::ZERO
    }
}
