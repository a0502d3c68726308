//! Batch execution strategies.
//!
//! A batch is a list of independent [`Unit`]s, each owning its expression
//! and its own copy of the seeds. Every strategy builds a private reducer
//! per unit and writes the outcome into the slot of that unit, so the
//! output order always matches the input order and nothing is shared
//! between workers.

use std::num::NonZeroUsize;

use log::debug;

use crate::{differ::derive, error::DiffError, parser::Derivation, Scalar, Seed};

/// What one unit of a batch produces. A parse error stays inside the
/// [`Derivation`]; a [`DiffError`] aborts only this unit.
pub type Outcome<T> = Result<Derivation<T>, DiffError>;

#[derive(Clone, Debug, PartialEq)]
pub struct Unit<T> {
    pub expression: String,
    pub seeds: Vec<Seed<T>>,
}

impl<T: Scalar> Unit<T> {
    pub fn new(expression: impl Into<String>, seeds: Vec<Seed<T>>) -> Self {
        Self {
            expression: expression.into(),
            seeds,
        }
    }

    pub fn derive(&self) -> Outcome<T> {
        derive(&self.expression, &self.seeds)
    }
}

/// A way to run the units of a batch.
pub trait Executor {
    fn name(&self) -> &'static str;

    /// Runs every unit and returns their outcomes in input order.
    fn execute<T: Scalar>(&self, units: Vec<Unit<T>>) -> Vec<Outcome<T>>;
}

/// Configuration for the parallel strategies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverConfig {
    /// Size of the worker group of [`ParallelFor`].
    pub workers: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        }
    }
}

impl DriverConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

/// Runs the units one after another on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sequential;

impl Executor for Sequential {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn execute<T: Scalar>(&self, units: Vec<Unit<T>>) -> Vec<Outcome<T>> {
        debug!("{}: {} units", self.name(), units.len());
        units.iter().map(Unit::derive).collect()
    }
}

/// Spawns one thread per unit and joins them all before returning.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkerPool;

impl Executor for WorkerPool {
    fn name(&self) -> &'static str {
        "worker pool"
    }

    fn execute<T: Scalar>(&self, units: Vec<Unit<T>>) -> Vec<Outcome<T>> {
        debug!("{}: {} units", self.name(), units.len());
        std::thread::scope(|s| {
            let handles: Vec<_> = units
                .into_iter()
                .map(|unit| s.spawn(move || unit.derive()))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect()
        })
    }
}

#[cfg(feature = "rayon")]
pub use self::parallel_for::ParallelFor;

#[cfg(feature = "rayon")]
mod parallel_for {
    use std::sync::Arc;

    use log::debug;
    use rayon::prelude::*;
    use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

    use super::{DriverConfig, Executor, Outcome, Unit};
    use crate::Scalar;

    /// Spreads the units over a fixed-size rayon thread pool.
    #[derive(Clone, Debug)]
    pub struct ParallelFor {
        pool: Arc<ThreadPool>,
    }

    impl ParallelFor {
        pub fn new(config: &DriverConfig) -> Result<Self, ThreadPoolBuildError> {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.workers.max(1))
                .thread_name(|i| format!("dualgrad-worker-{i}"))
                .build()?;
            Ok(Self {
                pool: Arc::new(pool),
            })
        }

        pub fn workers(&self) -> usize {
            self.pool.current_num_threads()
        }
    }

    impl Executor for ParallelFor {
        fn name(&self) -> &'static str {
            "parallel for"
        }

        fn execute<T: Scalar>(&self, units: Vec<Unit<T>>) -> Vec<Outcome<T>> {
            debug!(
                "{}: {} units on {} workers",
                self.name(),
                units.len(),
                self.workers()
            );
            self.pool
                .install(|| units.par_iter().map(Unit::derive).collect())
        }
    }
}
