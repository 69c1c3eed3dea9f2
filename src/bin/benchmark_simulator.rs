//! Time single trials and optionally append one line to a log file for trend tracking.
//!
//! Usage:
//!   cargo run --release --bin benchmark_simulator
//!   cargo run --release --bin benchmark_simulator -- --log
//!
//! --log  Append one row to benchmark_log.csv (date, trials_per_sec, trials_per_min, sim_seconds_per_sec, fight_length).

use std::fs::OpenOptions;
use std::io::Write;
use std::time::Instant;

use catsim::combat::{FighterConfig, Rng, Simulation};
use catsim::data::presets::equip;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log = std::env::args().any(|a| a == "--log");

    let fight_length = 180.0;
    let mut fighter = FighterConfig::default();
    let trinkets = equip(&mut fighter, &["bloodlust_brooch", "dragonspine_trophy"])?;
    let sim = Simulation::builder(fighter)
        .fight_length(fight_length)
        .trinkets(trinkets)
        .build()?;

    // Run for at least this long or this many trials
    const MIN_DURATION_MS: u128 = 2000;
    const MIN_TRIALS: u64 = 500;

    let start = Instant::now();
    let mut trials: u64 = 0;
    while start.elapsed().as_millis() < MIN_DURATION_MS || trials < MIN_TRIALS {
        let mut rng = Rng::for_trial(7, trials);
        let _ = sim.run_trial(&mut rng, fight_length);
        trials += 1;
    }
    let elapsed_secs = start.elapsed().as_secs_f64();

    let trials_per_sec = trials as f64 / elapsed_secs;
    let trials_per_min = trials_per_sec * 60.0;
    let sim_seconds_per_sec = trials_per_sec * fight_length;

    println!("Simulator benchmark ({fight_length} s fights):");
    println!("  Trials:      {trials}");
    println!("  Duration:    {elapsed_secs:.2} s");
    println!("  Trials/s:    {trials_per_sec:.2}");
    println!("  Trials/min:  {trials_per_min:.2}");
    println!("  Sim s/s:     {sim_seconds_per_sec:.2}");

    if log {
        let date = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let line = format!("{date},{trials_per_sec:.4},{trials_per_min:.4},{sim_seconds_per_sec:.4},{fight_length}\n");
        let path = "benchmark_log.csv";
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if file.metadata().map(|m| m.len() == 0).unwrap_or(true) {
            file.write_all(b"date,trials_per_sec,trials_per_min,sim_seconds_per_sec,fight_length\n")?;
        }
        file.write_all(line.as_bytes())?;
        file.flush()?;
        println!("Appended to {path}");
    }
    Ok(())
}
