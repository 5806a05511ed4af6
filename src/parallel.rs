//! Parallel processing configuration
//!
//! Raster building runs on the calling thread except for the per-cell
//! masking pass of large grids, which uses Rayon's global pool. Hosts size
//! that pool once at startup through [`ParallelConfig`].

use crate::errors::{NcSliceError, Result};
use rayon::ThreadPoolBuilder;

/// Grids with at least this many cells are masked in parallel
pub const PARALLEL_CELL_THRESHOLD: usize = 65_536;

/// Configuration for the Rayon global pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Use every available CPU core
    pub fn all_cores() -> Self {
        Self {
            num_threads: Some(num_cpus::get()),
        }
    }

    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
        }
    }

    /// Set up the global Rayon thread pool.
    ///
    /// Only the first call in a process can size the pool; later calls
    /// report [`NcSliceError::ThreadPool`].
    pub fn setup_global_pool(&self) -> Result<()> {
        match self.num_threads {
            Some(0) => Err(NcSliceError::ThreadPool(
                "thread count must be at least 1".to_string(),
            )),
            Some(num_threads) => {
                ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build_global()
                    .map_err(|e| {
                        NcSliceError::ThreadPool(format!(
                            "Failed to initialize thread pool with {} threads: {}",
                            num_threads, e
                        ))
                    })?;
                tracing::info!(threads = num_threads, "configured parallel processing");
                Ok(())
            }
            None => {
                tracing::debug!(
                    threads = rayon::current_num_threads(),
                    "using default thread pool"
                );
                Ok(())
            }
        }
    }

    /// Threads in the pool currently in effect
    pub fn current_threads(&self) -> usize {
        rayon::current_num_threads()
    }
}
