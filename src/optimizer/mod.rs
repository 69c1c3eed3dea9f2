//! Replicate runs, their summary statistics, and stat weights built on top of them.

pub mod monte_carlo;
pub mod stat_weights;
pub mod summary;

pub use monte_carlo::{
    run_replicate_range, run_replicates, run_replicates_parallel, simulate, simulate_with_trials,
};
pub use stat_weights::{
    compute_stat_weights, StatWeight, StatWeightOutcome, StatWeightRequest, StatWeightTable,
    WeightedStat, MIN_REPLICATES_FOR_WEIGHTS,
};
pub use summary::{summarize, DpsStats, OomStats, ReplicateSummary, TrinketUptime};
