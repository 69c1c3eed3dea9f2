use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::combat::engine::TracedTrial;
use crate::combat::export_csv::{to_csv_string, write_events_csv};
use crate::combat::rng::Rng;
use crate::data::encounter::BossDebuff;
use crate::data::presets::{self, all_presets, TrinketPreset};
use crate::data::scenario::Scenario;
use crate::data::strategy::{StrategyConfig, STRATEGY_KEYS};
use crate::error::ConfigError;
use crate::optimizer::monte_carlo::simulate;
use crate::optimizer::stat_weights::{compute_stat_weights, StatWeightOutcome, StatWeightRequest};
use crate::optimizer::summary::ReplicateSummary;

pub const MAX_REPLICATES: usize = 200_000;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    Parse(#[source] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Validation(String),
    #[error("failed to encode response: {0}")]
    Encode(String),
    #[error("preset `{0}` not found")]
    NotFound(String),
}

impl ApiError {
    fn encode(err: impl std::fmt::Display) -> Self {
        Self::Encode(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulateResponse {
    pub status: &'static str,
    pub engine: &'static str,
    pub replicates: usize,
    pub seed: u64,
    pub duration_ms: u64,
    pub summary: ReplicateSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeightsResponse {
    pub engine: &'static str,
    pub duration_ms: u64,
    pub outcome: StatWeightOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyInfo {
    pub defaults: StrategyConfig,
    pub keys: Vec<&'static str>,
    pub debuffs: Vec<&'static str>,
}

pub fn health_payload() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&serde_json::json!({
        "status": "ok",
        "service": "catsim-api",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// An empty body means the default scenario.
fn parse_scenario(body: &str) -> Result<Scenario, ApiError> {
    if body.trim().is_empty() {
        return Ok(Scenario::default());
    }
    let scenario: Scenario = serde_json::from_str(body).map_err(ApiError::Parse)?;
    if scenario.replicates == 0 || scenario.replicates > MAX_REPLICATES {
        return Err(ApiError::Validation(format!(
            "replicates must be between 1 and {MAX_REPLICATES}, got {}",
            scenario.replicates
        )));
    }
    Ok(scenario)
}

pub fn simulate_payload(body: &str) -> Result<String, ApiError> {
    let scenario = parse_scenario(body)?;
    let sim = scenario.build()?;
    let started = Instant::now();
    let summary = simulate(&sim, scenario.replicates, scenario.seed);
    let response = SimulateResponse {
        status: "ok",
        engine: "catsim",
        replicates: scenario.replicates,
        seed: scenario.seed,
        duration_ms: started.elapsed().as_millis() as u64,
        summary,
    };
    serde_json::to_string_pretty(&response).map_err(ApiError::encode)
}

pub fn weights_payload(body: &str) -> Result<String, ApiError> {
    let scenario = parse_scenario(body)?;
    let mut sim = scenario.build()?;
    let started = Instant::now();
    let request =
        StatWeightRequest::new(scenario.replicates, scenario.seed).with_mana_stats(scenario.include_mana_stats);
    let outcome = compute_stat_weights(&mut sim, request);
    let response = WeightsResponse {
        engine: "catsim",
        duration_ms: started.elapsed().as_millis() as u64,
        outcome,
    };
    serde_json::to_string_pretty(&response).map_err(ApiError::encode)
}

fn traced_trial(body: &str) -> Result<TracedTrial, ApiError> {
    let scenario = parse_scenario(body)?;
    let sim = scenario.build()?;
    let mut rng = Rng::new(scenario.seed);
    Ok(sim.run_traced(&mut rng, sim.fight_length()))
}

/// One logged trial at the exact target fight length.
pub fn trace_payload(body: &str) -> Result<String, ApiError> {
    let traced = traced_trial(body)?;
    serde_json::to_string_pretty(&traced).map_err(ApiError::encode)
}

pub fn trace_csv_payload(body: &str) -> Result<String, ApiError> {
    let traced = traced_trial(body)?;
    to_csv_string(|buf| write_events_csv(buf, &traced.events)).map_err(ApiError::encode)
}

pub fn presets_payload() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&all_presets())
}

pub fn preset_payload(name: &str) -> Result<String, ApiError> {
    let preset: TrinketPreset = presets::preset(name).map_err(|_| ApiError::NotFound(name.to_string()))?;
    serde_json::to_string_pretty(&preset).map_err(ApiError::encode)
}

pub fn strategy_payload() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&StrategyInfo {
        defaults: StrategyConfig::default(),
        keys: STRATEGY_KEYS.to_vec(),
        debuffs: BossDebuff::ALL.iter().map(|d| d.as_str()).collect(),
    })
}
