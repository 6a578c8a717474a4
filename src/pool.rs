//! Worker pool for per-file jobs.

use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Build a pool with `threads` workers; 0 uses one per core.
pub fn build_pool(threads: usize) -> Result<ThreadPool, ThreadPoolBuildError> {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|idx| format!("holepunch-worker-{idx}"))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_thread_count() {
        let pool = build_pool(2).unwrap();
        assert_eq!(pool.current_num_threads(), 2);
        assert_eq!(pool.install(|| 1 + 1), 2);
    }

    #[test]
    fn zero_means_all_cores() {
        let pool = build_pool(0).unwrap();
        assert!(pool.current_num_threads() >= 1);
    }
}
