use serde::Serialize;

use crate::combat::engine::TrialResult;
use crate::combat::fighter::Breakdown;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DpsStats {
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl DpsStats {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };
        Self {
            mean,
            median,
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        }
    }
}

/// Average activations per trial and fraction of the fight the buff was up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrinketUptime {
    pub name: String,
    pub activations: f64,
    pub uptime: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OomStats {
    /// Mean time of running out of mana, counting the fight length for trials that never did.
    pub mean_time_to_oom: f64,
    pub fraction_out_of_mana: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplicateSummary {
    pub replicates: usize,
    pub mean_fight_length: f64,
    pub dps: DpsStats,
    pub dps_values: Vec<f64>,
    /// Per-ability casts and damage averaged over trials.
    pub breakdown: Breakdown,
    pub trinkets: Vec<TrinketUptime>,
    pub time_to_oom: OomStats,
}

/// Folds ordered trial results into summary statistics.
pub fn summarize(trials: &[TrialResult]) -> ReplicateSummary {
    let count = trials.len();
    let dps_values: Vec<f64> = trials.iter().map(|t| t.dps).collect();
    if count == 0 {
        return ReplicateSummary {
            replicates: 0,
            mean_fight_length: 0.0,
            dps: DpsStats::default(),
            dps_values,
            breakdown: Breakdown::default(),
            trinkets: Vec::new(),
            time_to_oom: OomStats::default(),
        };
    }
    let n = count as f64;

    let mut breakdown = Breakdown::default();
    for trial in trials {
        breakdown.accumulate(&trial.breakdown);
    }

    let trinkets = trials[0]
        .trinkets
        .iter()
        .enumerate()
        .map(|(i, first)| {
            let (activations, uptime) = trials.iter().fold((0.0, 0.0), |(acts, up), t| match t.trinkets.get(i) {
                Some(r) => (acts + f64::from(r.activations), up + r.uptime / t.fight_length),
                None => (acts, up),
            });
            TrinketUptime {
                name: first.name.clone(),
                activations: activations / n,
                uptime: uptime / n,
            }
        })
        .collect();

    let oom_sum: f64 = trials.iter().map(|t| t.time_to_oom.unwrap_or(t.fight_length)).sum();
    let oom_count = trials.iter().filter(|t| t.time_to_oom.is_some()).count();

    ReplicateSummary {
        replicates: count,
        mean_fight_length: trials.iter().map(|t| t.fight_length).sum::<f64>() / n,
        dps: DpsStats::from_values(&dps_values),
        dps_values,
        breakdown: breakdown.scaled(1.0 / n),
        trinkets,
        time_to_oom: OomStats {
            mean_time_to_oom: oom_sum / n,
            fraction_out_of_mana: oom_count as f64 / n,
        },
    }
}
