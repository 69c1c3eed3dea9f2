use std::env;
use std::fs::File;
use std::path::Path;

use crate::combat::export_csv::{write_events_csv, write_timeline_csv, write_trials_csv};
use crate::combat::rng::Rng;
use crate::data::presets::all_presets;
use crate::data::scenario::{Scenario, DEFAULT_SCENARIO_PATH};
use crate::error::ScenarioError;
use crate::optimizer::monte_carlo::simulate_with_trials;
use crate::optimizer::stat_weights::{compute_stat_weights, StatWeightOutcome, StatWeightRequest};
use crate::server;

const USAGE: &str = "usage: catsim <serve|simulate|weights|trace|validate|presets> [scenario.yaml] \
[--replicates N] [--seed S] [--csv PATH] [--timeline PATH] [--mana] [--table]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    Simulate,
    Weights,
    Trace,
    Validate,
    Presets,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("serve") => Some(Command::Serve),
        Some("simulate") => Some(Command::Simulate),
        Some("weights") => Some(Command::Weights),
        Some("trace") => Some(Command::Trace),
        Some("validate") => Some(Command::Validate),
        Some("presets") => Some(Command::Presets),
        _ => None,
    }
}

/// Flags shared by the scenario-driven commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub scenario: Option<String>,
    pub replicates: Option<usize>,
    pub seed: Option<u64>,
    pub csv: Option<String>,
    pub timeline: Option<String>,
    pub mana: bool,
    pub table: bool,
}

pub fn parse_options(args: &[String]) -> Result<RunOptions, String> {
    let mut options = RunOptions::default();
    let mut rest = args.iter().skip(2);
    while let Some(arg) = rest.next() {
        let mut value = |flag: &str| rest.next().cloned().ok_or_else(|| format!("{flag} needs a value"));
        match arg.as_str() {
            "--replicates" => {
                let raw = value("--replicates")?;
                options.replicates = Some(raw.parse().map_err(|_| format!("invalid replicates '{raw}'"))?);
            }
            "--seed" => {
                let raw = value("--seed")?;
                options.seed = Some(raw.parse().map_err(|_| format!("invalid seed '{raw}'"))?);
            }
            "--csv" => options.csv = Some(value("--csv")?),
            "--timeline" => options.timeline = Some(value("--timeline")?),
            "--mana" => options.mana = true,
            "--table" => options.table = true,
            flag if flag.starts_with("--") => return Err(format!("unknown flag '{flag}'")),
            path if options.scenario.is_none() => options.scenario = Some(path.to_string()),
            extra => return Err(format!("unexpected argument '{extra}'")),
        }
    }
    Ok(options)
}

pub fn run_with_args(args: &[String]) -> i32 {
    let Some(command) = parse_command(args) else {
        eprintln!("{USAGE}");
        return 2;
    };
    if command == Command::Serve {
        return handle_serve();
    }
    if command == Command::Presets {
        return handle_presets();
    }

    let options = match parse_options(args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{USAGE}");
            return 2;
        }
    };
    let scenario = match load_scenario(&options) {
        Ok(scenario) => scenario,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };

    match command {
        Command::Simulate => handle_simulate(&scenario, &options),
        Command::Weights => handle_weights(&scenario, &options),
        Command::Trace => handle_trace(&scenario, &options),
        Command::Validate => handle_validate(&scenario, &options),
        Command::Serve | Command::Presets => 0,
    }
}

/// The named file, else the bundled default scenario when present, else built-in defaults.
fn load_scenario(options: &RunOptions) -> Result<Scenario, ScenarioError> {
    let mut scenario = match &options.scenario {
        Some(path) => Scenario::load(path)?,
        None if Path::new(DEFAULT_SCENARIO_PATH).exists() => Scenario::load(DEFAULT_SCENARIO_PATH)?,
        None => Scenario::default(),
    };
    if let Some(replicates) = options.replicates {
        scenario.replicates = replicates;
    }
    if let Some(seed) = options.seed {
        scenario.seed = seed;
    }
    scenario.include_mana_stats |= options.mana;
    Ok(scenario)
}

fn handle_serve() -> i32 {
    let bind_addr = env::var("CATSIM_BIND").unwrap_or_else(|_| server::DEFAULT_BIND_ADDR.to_string());
    match server::run_server(&bind_addr) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

fn handle_presets() -> i32 {
    match serde_json::to_string_pretty(&all_presets()) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize presets: {err}");
            1
        }
    }
}

fn handle_simulate(scenario: &Scenario, options: &RunOptions) -> i32 {
    let sim = match scenario.build() {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("invalid scenario: {err}");
            return 1;
        }
    };
    let (trials, summary) = simulate_with_trials(&sim, scenario.replicates, scenario.seed);

    if let Some(path) = &options.csv {
        let written = File::create(path)
            .map_err(csv::Error::from)
            .and_then(|file| write_trials_csv(file, &trials));
        if let Err(err) = written {
            eprintln!("failed to write {path}: {err}");
            return 1;
        }
    }

    if options.table {
        println!("replicates\tseed\tmean_dps\tmedian_dps\tstd_dev\tmean_time_to_oom");
        println!(
            "{}\t{}\t{:.3}\t{:.3}\t{:.3}\t{:.2}",
            summary.replicates,
            scenario.seed,
            summary.dps.mean,
            summary.dps.median,
            summary.dps.std_dev,
            summary.time_to_oom.mean_time_to_oom
        );
        return 0;
    }
    print_json(&summary, "simulation summary")
}

fn handle_weights(scenario: &Scenario, _options: &RunOptions) -> i32 {
    let mut sim = match scenario.build() {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("invalid scenario: {err}");
            return 1;
        }
    };
    let request =
        StatWeightRequest::new(scenario.replicates, scenario.seed).with_mana_stats(scenario.include_mana_stats);
    let outcome = compute_stat_weights(&mut sim, request);
    if let StatWeightOutcome::NotComputed { requested, required } = &outcome {
        eprintln!("stat weights not computed: {requested} replicates requested, at least {required} required");
    }
    print_json(&outcome, "stat weights")
}

fn handle_trace(scenario: &Scenario, options: &RunOptions) -> i32 {
    let sim = match scenario.build() {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("invalid scenario: {err}");
            return 1;
        }
    };
    let mut rng = Rng::new(scenario.seed);
    let traced = sim.run_traced(&mut rng, sim.fight_length());

    if let Some(path) = &options.csv {
        let written = File::create(path)
            .map_err(csv::Error::from)
            .and_then(|file| write_events_csv(file, &traced.events));
        if let Err(err) = written {
            eprintln!("failed to write {path}: {err}");
            return 1;
        }
    }
    if let Some(path) = &options.timeline {
        let written = File::create(path)
            .map_err(csv::Error::from)
            .and_then(|file| write_timeline_csv(file, &traced.timeline));
        if let Err(err) = written {
            eprintln!("failed to write {path}: {err}");
            return 1;
        }
    }
    print_json(&traced, "trace")
}

fn handle_validate(scenario: &Scenario, options: &RunOptions) -> i32 {
    let source = options.scenario.as_deref().unwrap_or("default scenario");
    match scenario.build() {
        Ok(sim) => {
            println!(
                "scenario valid: {source} (fight_length={}, trinkets={}, replicates={})",
                sim.fight_length(),
                sim.trinkets().len(),
                scenario.replicates
            );
            0
        }
        Err(err) => {
            eprintln!("validation failed: {err}");
            1
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T, what: &str) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize {what}: {err}");
            1
        }
    }
}
