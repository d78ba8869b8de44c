//! Point-level dispatch for sweeps.
//!
//! An [`Executor`] is built once per run. With more than one worker requested
//! (and the `parallel` feature enabled) it owns a dedicated rayon pool, and
//! every worker thread mutates its own clone of the system handle. Otherwise
//! inputs run in order against the live handle. Either way
//! [`Executor::map`] returns results in input order.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
#[cfg(feature = "parallel")]
use crate::error::SweepError;

/// Runs per-point closures for every phase of one sweep run
pub struct Executor {
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl Executor {
    /// Executor with `num_cpus` workers; one worker never starts a pool
    #[cfg(feature = "parallel")]
    pub fn new(num_cpus: usize) -> Result<Self> {
        if num_cpus <= 1 {
            return Ok(Self::sequential());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_cpus)
            .build()
            .map_err(|e| SweepError::WorkerPool(e.to_string()))?;
        debug!(num_cpus, "worker pool started");
        Ok(Self { pool: Some(pool) })
    }

    #[cfg(not(feature = "parallel"))]
    pub fn new(_num_cpus: usize) -> Result<Self> {
        Ok(Self::sequential())
    }

    pub fn sequential() -> Self {
        Self {
            #[cfg(feature = "parallel")]
            pool: None,
        }
    }

    /// Number of threads points are spread over
    pub fn workers(&self) -> usize {
        self.pool_threads().unwrap_or(1)
    }

    #[cfg(feature = "parallel")]
    fn pool_threads(&self) -> Option<usize> {
        self.pool.as_ref().map(rayon::ThreadPool::current_num_threads)
    }

    #[cfg(not(feature = "parallel"))]
    fn pool_threads(&self) -> Option<usize> {
        None
    }

    /// Map `f` over `inputs`, preserving input order in the output.
    ///
    /// The first error aborts the whole map; no partial results are returned.
    pub fn map<H, T, R, F>(&self, handle: &mut H, inputs: Vec<T>, f: F) -> Result<Vec<R>>
    where
        H: Clone + Send + Sync,
        T: Send,
        R: Send,
        F: Fn(&mut H, T) -> Result<R> + Send + Sync,
    {
        debug!(points = inputs.len(), workers = self.workers(), "dispatching sweep points");
        self.dispatch(handle, inputs, f)
    }

    #[cfg(feature = "parallel")]
    fn dispatch<H, T, R, F>(&self, handle: &mut H, inputs: Vec<T>, f: F) -> Result<Vec<R>>
    where
        H: Clone + Send + Sync,
        T: Send,
        R: Send,
        F: Fn(&mut H, T) -> Result<R> + Send + Sync,
    {
        let Some(pool) = &self.pool else {
            return sequential(handle, inputs, f);
        };
        let template: &H = handle;
        pool.install(|| {
            inputs
                .into_par_iter()
                .map_init(|| template.clone(), |local, input| f(local, input))
                .collect()
        })
    }

    #[cfg(not(feature = "parallel"))]
    fn dispatch<H, T, R, F>(&self, handle: &mut H, inputs: Vec<T>, f: F) -> Result<Vec<R>>
    where
        F: Fn(&mut H, T) -> Result<R>,
    {
        sequential(handle, inputs, f)
    }
}

fn sequential<H, T, R, F>(handle: &mut H, inputs: Vec<T>, f: F) -> Result<Vec<R>>
where
    F: Fn(&mut H, T) -> Result<R>,
{
    inputs.into_iter().map(|input| f(handle, input)).collect()
}
