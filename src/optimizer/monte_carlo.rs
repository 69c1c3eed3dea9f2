use std::time::Instant;

use rayon::prelude::*;
use tracing::info;

use crate::combat::engine::{Simulation, TrialResult};
use crate::optimizer::summary::{summarize, ReplicateSummary};

/// Runs `replicates` trials one after another. Trial `i` uses the stream for
/// `seed + i`, so the output matches [run_replicates_parallel] exactly.
pub fn run_replicates(sim: &Simulation, replicates: usize, seed: u64) -> Vec<TrialResult> {
    run_replicates_with_parallelism(sim, 0..replicates, seed, false)
}

/// Like [run_replicates] but spreads trials across the current Rayon pool.
/// Results are returned in trial order.
pub fn run_replicates_parallel(sim: &Simulation, replicates: usize, seed: u64) -> Vec<TrialResult> {
    run_replicates_with_parallelism(sim, 0..replicates, seed, true)
}

/// Trials `range` of a replicate run; used for batched progress reporting.
pub fn run_replicate_range(
    sim: &Simulation,
    range: std::ops::Range<usize>,
    seed: u64,
    parallel: bool,
) -> Vec<TrialResult> {
    run_replicates_with_parallelism(sim, range, seed, parallel)
}

fn run_replicates_with_parallelism(
    sim: &Simulation,
    range: std::ops::Range<usize>,
    seed: u64,
    parallel: bool,
) -> Vec<TrialResult> {
    let run_one = |index: usize| sim.run_replicate(seed, index as u64);
    if parallel {
        range.into_par_iter().map(run_one).collect()
    } else {
        range.map(run_one).collect()
    }
}

/// Parallel replicate run folded into summary statistics, logged at info level.
pub fn simulate(sim: &Simulation, replicates: usize, seed: u64) -> ReplicateSummary {
    simulate_with_trials(sim, replicates, seed).1
}

/// Like [simulate] but also hands back the per-trial results, in trial order.
pub fn simulate_with_trials(sim: &Simulation, replicates: usize, seed: u64) -> (Vec<TrialResult>, ReplicateSummary) {
    info!(
        replicates,
        seed,
        fight_length = sim.fight_length(),
        "starting replicate run"
    );
    let started = Instant::now();
    let trials = run_replicates_parallel(sim, replicates, seed);
    let summary = summarize(&trials);
    info!(
        replicates,
        mean_dps = summary.dps.mean,
        std_dev = summary.dps.std_dev,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "replicate run finished"
    );
    (trials, summary)
}

/// Mean DPS and mean time-to-oom over a replicate run, without keeping the trials.
pub fn mean_dps_and_oom(sim: &Simulation, replicates: usize, seed: u64, parallel: bool) -> (f64, f64) {
    if replicates == 0 {
        return (0.0, 0.0);
    }
    let trials = run_replicates_with_parallelism(sim, 0..replicates, seed, parallel);
    let n = trials.len() as f64;
    let dps = trials.iter().map(|t| t.dps).sum::<f64>() / n;
    let oom = trials
        .iter()
        .map(|t| t.time_to_oom.unwrap_or(t.fight_length))
        .sum::<f64>()
        / n;
    (dps, oom)
}
