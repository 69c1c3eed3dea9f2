//! Run one replicate batch sequentially and once in parallel, then print timings and speedup.
//!
//! Usage: cargo run --release --bin benchmark_parallel_speedup

use std::time::Instant;

use catsim::combat::{FighterConfig, Simulation};
use catsim::optimizer::monte_carlo::{run_replicates, run_replicates_parallel};

fn main() -> Result<(), catsim::ConfigError> {
    let seed = 12345u64;
    let replicates = 2000;
    let sim = Simulation::builder(FighterConfig::default()).fight_length(180.0).build()?;

    println!("Replicates: {replicates} trials of {} s", sim.fight_length());
    println!();

    let t0 = Instant::now();
    let sequential = run_replicates(&sim, replicates, seed);
    let elapsed_seq = t0.elapsed();
    let seq_ms = elapsed_seq.as_secs_f64() * 1000.0;
    println!("Sequential:  {seq_ms:.2} ms  ({:.1} trials/s)", replicates as f64 / elapsed_seq.as_secs_f64());

    let t0 = Instant::now();
    let parallel = run_replicates_parallel(&sim, replicates, seed);
    let elapsed_par = t0.elapsed();
    let par_ms = elapsed_par.as_secs_f64() * 1000.0;
    println!("Parallel:    {par_ms:.2} ms  ({:.1} trials/s)", replicates as f64 / elapsed_par.as_secs_f64());

    println!();
    println!("Speedup:     {:.2}x faster (parallel vs sequential)", seq_ms / par_ms);

    if sequential == parallel {
        println!("(Results match sequential vs parallel)");
    } else {
        eprintln!("sequential and parallel results differ");
        std::process::exit(1);
    }
    Ok(())
}
