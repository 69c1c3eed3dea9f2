pub mod batch;
pub mod pool;

pub use batch::{batch_ranges, run_replicates_with_progress};
pub use pool::WorkerPool;
