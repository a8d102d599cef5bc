//! Parallel map-collect executor
//!
//! Per-partition work is independent and side-effect-free, so the engine
//! only needs a data-parallel map that preserves input order and fails the
//! whole batch on the first worker error.

use jsplit_core::Result;
use rayon::prelude::*;

/// Apply `worker` to every item in parallel, collecting results in input
/// order. Any worker error aborts the batch.
pub fn map_collect<T, U, F>(items: Vec<T>, worker: F) -> Result<Vec<U>>
where
    T: Send,
    U: Send,
    F: Fn(T) -> Result<U> + Send + Sync,
{
    items.into_par_iter().map(worker).collect()
}
