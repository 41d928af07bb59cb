/// Concurrency management for retrograph.
/// Configures the global thread pool used by the parallel frontend.

use anyhow::Result;

/// Initialize the global rayon thread pool with controlled worker count.
/// Reserves ~50% of CPU capacity so the host stays responsive while large
/// workspaces are parsed.
pub fn init_thread_pool() -> Result<()> {
    let cores = num_cpus::get();
    let workers = std::cmp::max(1, cores / 2);

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()?;

    println!(
        "[retrograph] Initialized thread pool: {} workers (system has {} cores)",
        workers, cores
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_thread_pool_tolerates_reinit() {
        // The global pool may already be initialized by another test; both
        // Ok (first init) and Err (already built) are acceptable.
        let result = init_thread_pool();
        assert!(result.is_ok() || result.is_err());
    }
}
