//! Batch distribution for replicate runs.
//!
//! Splits trials into contiguous batches so long runs can report progress between
//! batches while each batch still runs in parallel.

use crate::combat::engine::{Simulation, TrialResult};
use crate::optimizer::monte_carlo::run_replicate_range;
use crate::parallel::pool::WorkerPool;

/// Split `total` items into up to `num_batches` ranges `[start, end)`.
/// Batches are as equal in size as possible; later batches may be smaller.
///
/// # Example
/// ```
/// # use catsim::parallel::batch_ranges;
/// let ranges = batch_ranges(100, 4);
/// assert_eq!(ranges, vec![(0, 25), (25, 50), (50, 75), (75, 100)]);
/// ```
pub fn batch_ranges(total: usize, num_batches: usize) -> Vec<(usize, usize)> {
    if total == 0 || num_batches == 0 {
        return Vec::new();
    }
    let num_batches = num_batches.min(total);
    let base = total / num_batches;
    let remainder = total % num_batches;
    let mut ranges = Vec::with_capacity(num_batches);
    let mut start = 0;
    for i in 0..num_batches {
        let size = base + usize::from(i < remainder);
        let end = start + size;
        ranges.push((start, end));
        start = end;
    }
    ranges
}

/// Runs `replicates` trials in `num_batches` parallel batches inside `pool`, calling
/// `on_progress(done, total)` after each batch. Output equals a single parallel run.
pub fn run_replicates_with_progress<F>(
    sim: &Simulation,
    replicates: usize,
    seed: u64,
    num_batches: usize,
    pool: &WorkerPool,
    mut on_progress: F,
) -> Vec<TrialResult>
where
    F: FnMut(usize, usize) + Send,
{
    pool.install(|| {
        on_progress(0, replicates);
        let mut trials = Vec::with_capacity(replicates);
        for (start, end) in batch_ranges(replicates, num_batches) {
            trials.extend(run_replicate_range(sim, start..end, seed, true));
            on_progress(end, replicates);
        }
        trials
    })
}
