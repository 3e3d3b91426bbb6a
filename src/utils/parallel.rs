//! Abstraction layer for parallel iteration.
//!
//! With the `parallel` feature the engine's mutable batch iteration runs on Rayon; without
//! it, `par_iter_mut` falls back to the ordinary serial iterator so the engine is written once.
//!
//! [`with_workers`] scopes a closure to a pool of a chosen size, which is how the engine
//! honors a unit's parallelism hint.

#[cfg(feature = "parallel")]
pub use rayon::prelude::{IntoParallelRefMutIterator, ParallelIterator};

#[cfg(not(feature = "parallel"))]
pub use self::fallback::*;

/// Error raised when a dedicated worker pool cannot be created.
#[derive(Debug, thiserror::Error)]
#[error("failed to build a pool of {workers} workers: {details}")]
pub struct PoolError {
    pub workers: usize,
    pub details: String,
}

/// Runs `op` on a dedicated pool of `workers` threads.
///
/// Parallel iterators started inside `op` are confined to that pool, so a worker count of
/// one gives strictly sequential execution.
#[cfg(feature = "parallel")]
pub fn with_workers<R, F>(workers: usize, op: F) -> Result<R, PoolError>
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| PoolError {
            workers,
            details: e.to_string(),
        })?;
    Ok(pool.install(op))
}

/// Runs `op` on the calling thread; without the `parallel` feature every batch is sequential.
#[cfg(not(feature = "parallel"))]
pub fn with_workers<R, F>(_workers: usize, op: F) -> Result<R, PoolError>
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    Ok(op())
}

#[cfg(not(feature = "parallel"))]
mod fallback {
    pub use std::iter::Iterator as ParallelIterator;

    /// Shim trait to allow `par_iter_mut()` on types that implement `IntoIterator` for `&mut T`.
    pub trait IntoParallelRefMutIterator<'data> {
        type Item;
        type Iter: Iterator<Item = Self::Item>;
        fn par_iter_mut(&'data mut self) -> Self::Iter;
    }

    impl<'data, I: 'data + ?Sized> IntoParallelRefMutIterator<'data> for I
    where
        &'data mut I: IntoIterator,
    {
        type Item = <&'data mut I as IntoIterator>::Item;
        type Iter = <&'data mut I as IntoIterator>::IntoIter;
        fn par_iter_mut(&'data mut self) -> Self::Iter {
            self.into_iter()
        }
    }
}
