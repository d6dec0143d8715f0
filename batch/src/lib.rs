//! Parallel execution of independent, seeded simulation jobs
//!
//! Each job is identified by a `job_id` in `0..num_jobs`. The builder closure
//! receives that id, derives whatever it needs from it (seed, parameter cell,
//! repetition number) and returns the job's result. Results come back in
//! `job_id` order no matter how rayon schedules the work.
//!
//! # Example: a 100-job seed sweep
//!
//! ```rust
//! use batch::{ParallelRunner, simple_progress_reporter};
//!
//! let results = ParallelRunner::new(100, |job_id| {
//!     let seed = 42 + job_id as u64;
//!     seed * 2
//! })
//! .progress(simple_progress_reporter(10))
//! .num_threads(4)
//! .run();
//!
//! assert_eq!(results.len(), 100);
//! assert_eq!(results[3], Ok(90));
//! ```
//!
//! # Determinism
//!
//! Results are deterministic when:
//! 1. The builder uses `job_id` to derive unique seeds
//! 2. Each job owns a seeded RNG (e.g. `StdRng::seed_from_u64(seed)`)
//! 3. No mutable state is shared across jobs
//!
//! Running the same batch twice produces identical results regardless of
//! execution order or thread count.
//!
//! # Error Handling
//!
//! Panics in individual jobs are caught and returned as `Err(String)`.
//! The remaining jobs keep running.

use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Executes independent jobs in parallel
///
/// The builder `F` must be `Fn(usize) -> R + Send + Sync`: it takes the
/// job id and returns that job's output.
pub struct ParallelRunner<R, F>
where
    F: Fn(usize) -> R + Send + Sync,
    R: Send,
{
    num_jobs: usize,
    builder: F,
    num_threads: Option<usize>,
    progress_callback: Option<Arc<dyn Fn(usize, usize) + Send + Sync>>,
}

impl<R, F> ParallelRunner<R, F>
where
    F: Fn(usize) -> R + Send + Sync,
    R: Send,
{
    /// Create a new runner for `num_jobs` jobs built by `builder`
    pub fn new(num_jobs: usize, builder: F) -> Self {
        ParallelRunner {
            num_jobs,
            builder,
            num_threads: None,
            progress_callback: None,
        }
    }

    /// Set number of threads (defaults to rayon's global pool)
    ///
    /// `num_threads(1)` runs every job on a single worker, one after another.
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Set progress callback, called with `(completed, total)` after each job
    pub fn progress<P>(mut self, callback: P) -> Self
    where
        P: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Execute all jobs and return results in `job_id` order
    ///
    /// - `Ok(R)` for jobs that completed
    /// - `Err(String)` carrying the panic message for jobs that panicked
    pub fn run(self) -> Vec<Result<R, String>> {
        let progress_counter = AtomicUsize::new(0);

        let pool = self.num_threads.and_then(|n| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| {
                    log::warn!("could not build a {n}-thread pool ({e}), using the global pool");
                })
                .ok()
        });

        let execute = || {
            (0..self.num_jobs)
                .into_par_iter()
                .map(|job_id| {
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        (self.builder)(job_id)
                    }));

                    let completed = progress_counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref callback) = self.progress_callback {
                        callback(completed, self.num_jobs);
                    }

                    result.map_err(|panic| {
                        if let Some(s) = panic.downcast_ref::<&str>() {
                            s.to_string()
                        } else if let Some(s) = panic.downcast_ref::<String>() {
                            s.clone()
                        } else {
                            "Unknown panic".to_string()
                        }
                    })
                })
                .collect()
        };

        if let Some(pool) = pool {
            pool.install(execute)
        } else {
            execute()
        }
    }
}

/// Progress callback that logs every `interval` completed jobs
pub fn simple_progress_reporter(interval: usize) -> impl Fn(usize, usize) + Send + Sync {
    let interval = interval.max(1);
    move |completed, total| {
        if completed % interval == 0 || completed == total {
            log::info!("completed {}/{} jobs", completed, total);
        }
    }
}
