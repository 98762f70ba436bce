//! Parallel processing utilities using Rayon.
//!
//! Heaps and merges are single-threaded; parallelism only applies to bulk
//! region sorting.

/// Minimum number of items before enabling parallelization.
/// Below this threshold, sequential processing is faster due to
/// thread spawn overhead.
pub const PARALLEL_THRESHOLD: usize = 10_000;

/// Configure the global thread pool. `None` keeps Rayon's default.
pub fn init_thread_pool(threads: Option<usize>) -> Result<(), rayon::ThreadPoolBuildError> {
    match threads {
        Some(n) => rayon::ThreadPoolBuilder::new().num_threads(n).build_global(),
        None => Ok(()),
    }
}
