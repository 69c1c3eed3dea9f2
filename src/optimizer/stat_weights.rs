//! Marginal DPS per unit of each stat, from paired replicate runs.
//!
//! Every stat is bumped by a step large relative to simulation noise, the replicate run
//! is repeated with the same seed, and the DPS difference is linearized back to one unit.
//! Weights are those per-unit values divided by the attack power value.

use serde::Serialize;
use tracing::info;

use crate::combat::engine::Simulation;
use crate::combat::fighter::{FighterConfig, BASE_MISS_CHANCE};
use crate::combat::stats::swing_timer_for_rating;
use crate::optimizer::monte_carlo::mean_dps_and_oom;

pub const MIN_REPLICATES_FOR_WEIGHTS: usize = 20_000;

const AP_STEP: f64 = 80.0;
const HIT_STEP: f64 = 0.02;
const CRIT_STEP: f64 = 0.02;
/// 4% melee haste.
const HASTE_RATING_STEP: f64 = 63.08;
const ARMOR_PEN_STEP: f64 = 300.0;
const WEAPON_DAMAGE_STEP: f64 = 12.0;
/// Remaining miss chance below which a hit bump would cross the cap, so hit is lowered instead.
const HIT_CAP_MARGIN: f64 = 0.085;
const MANA_PER_INTELLECT: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightedStat {
    AttackPower,
    HitChance,
    CritChance,
    Haste,
    ArmorPenetration,
    WeaponDamage,
    Mana,
    Spirit,
    Mp5,
    Intellect,
}

impl WeightedStat {
    pub const DAMAGE: [WeightedStat; 6] = [
        WeightedStat::AttackPower,
        WeightedStat::HitChance,
        WeightedStat::CritChance,
        WeightedStat::Haste,
        WeightedStat::ArmorPenetration,
        WeightedStat::WeaponDamage,
    ];

    pub const MANA: [WeightedStat; 4] = [
        WeightedStat::Mana,
        WeightedStat::Spirit,
        WeightedStat::Mp5,
        WeightedStat::Intellect,
    ];

    /// The unit one weight is quoted in.
    pub fn unit(self) -> &'static str {
        match self {
            Self::AttackPower => "1 AP",
            Self::HitChance => "1% hit",
            Self::CritChance => "1% crit",
            Self::Haste => "1% haste",
            Self::ArmorPenetration => "1 armor pen",
            Self::WeaponDamage => "1 weapon damage",
            Self::Mana => "1 mana",
            Self::Spirit => "1 spirit",
            Self::Mp5 => "1 mp5",
            Self::Intellect => "1 intellect",
        }
    }
}

/// A stat bump: how to apply it and how many weight units it represents (signed).
#[derive(Debug, Clone, Copy)]
struct Perturbation {
    stat: WeightedStat,
    step: f64,
    units: f64,
}

impl Perturbation {
    fn for_stat(stat: WeightedStat, fighter: &FighterConfig, fight_length: f64) -> Self {
        let (step, units) = match stat {
            WeightedStat::AttackPower => (AP_STEP, AP_STEP),
            WeightedStat::HitChance => {
                let miss = (BASE_MISS_CHANCE - fighter.hit_chance).max(0.0);
                let sign = if miss < HIT_CAP_MARGIN { -1.0 } else { 1.0 };
                (sign * HIT_STEP, sign * HIT_STEP * 100.0)
            }
            WeightedStat::CritChance => (CRIT_STEP, CRIT_STEP * 100.0),
            WeightedStat::Haste => (HASTE_RATING_STEP, 4.0),
            WeightedStat::ArmorPenetration => (ARMOR_PEN_STEP, ARMOR_PEN_STEP),
            WeightedStat::WeaponDamage => (WEAPON_DAMAGE_STEP, WEAPON_DAMAGE_STEP),
            WeightedStat::Mana => {
                let step = fighter.shift_cost();
                (step, step)
            }
            WeightedStat::Spirit => {
                let step = fighter.shift_cost() / 50.0 / fighter.regen_factor();
                (step, step)
            }
            WeightedStat::Mp5 => {
                let step = (fighter.shift_cost() / (fight_length / 5.0)).ceil();
                (step, step)
            }
            WeightedStat::Intellect => {
                let step = fighter.shift_cost() / MANA_PER_INTELLECT;
                (step, step)
            }
        };
        Self { stat, step, units }
    }

    fn apply(&self, fighter: &mut FighterConfig) {
        match self.stat {
            WeightedStat::AttackPower => fighter.attack_power += self.step,
            WeightedStat::HitChance => fighter.hit_chance += self.step,
            WeightedStat::CritChance => fighter.crit_chance += self.step,
            WeightedStat::Haste => {
                fighter.swing_timer = swing_timer_for_rating(fighter.haste_rating() + self.step);
            }
            WeightedStat::ArmorPenetration => fighter.armor_pen += self.step,
            WeightedStat::WeaponDamage => fighter.bonus_damage += self.step,
            WeightedStat::Mana => fighter.mana += self.step,
            WeightedStat::Spirit => fighter.spirit += self.step,
            WeightedStat::Mp5 => fighter.mp5 += self.step,
            WeightedStat::Intellect => {
                fighter.intellect += self.step;
                fighter.mana += MANA_PER_INTELLECT * self.step;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatWeight {
    pub stat: WeightedStat,
    pub unit: &'static str,
    /// Raw change applied to the fighter for this measurement.
    pub step: f64,
    pub dps_delta: f64,
    /// Marginal DPS per weight unit.
    pub dps_per_unit: f64,
    /// `dps_per_unit` relative to one attack power.
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatWeightTable {
    pub replicates: usize,
    pub seed: u64,
    pub base_dps: f64,
    pub mean_time_to_oom: f64,
    pub weights: Vec<StatWeight>,
}

impl StatWeightTable {
    pub fn get(&self, stat: WeightedStat) -> Option<&StatWeight> {
        self.weights.iter().find(|w| w.stat == stat)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatWeightOutcome {
    Computed(StatWeightTable),
    /// Too few replicates for the differences to rise above noise.
    NotComputed { requested: usize, required: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatWeightRequest {
    pub replicates: usize,
    pub seed: u64,
    pub include_mana_stats: bool,
    pub parallel: bool,
}

impl StatWeightRequest {
    pub fn new(replicates: usize, seed: u64) -> Self {
        Self {
            replicates,
            seed,
            include_mana_stats: false,
            parallel: true,
        }
    }

    pub fn with_mana_stats(mut self, include: bool) -> Self {
        self.include_mana_stats = include;
        self
    }
}

/// Computes the weight table, or refuses below [`MIN_REPLICATES_FOR_WEIGHTS`].
/// The fighter configuration is restored after every perturbation.
pub fn compute_stat_weights(sim: &mut Simulation, request: StatWeightRequest) -> StatWeightOutcome {
    if request.replicates < MIN_REPLICATES_FOR_WEIGHTS {
        return StatWeightOutcome::NotComputed {
            requested: request.replicates,
            required: MIN_REPLICATES_FOR_WEIGHTS,
        };
    }

    let (base_dps, mean_time_to_oom) = mean_dps_and_oom(sim, request.replicates, request.seed, request.parallel);
    info!(base_dps, mean_time_to_oom, replicates = request.replicates, "computing stat weights");

    let mut stats = WeightedStat::DAMAGE.to_vec();
    if request.include_mana_stats {
        stats.extend(WeightedStat::MANA);
    }
    // Never going out of mana means extra mana is worth nothing.
    let mana_matters = mean_time_to_oom < sim.fight_length() - 1.0;

    let mut raw = Vec::with_capacity(stats.len());
    for stat in stats {
        let perturbation = Perturbation::for_stat(stat, sim.fighter(), sim.fight_length());
        let dps_delta = if WeightedStat::MANA.contains(&stat) && !mana_matters {
            0.0
        } else {
            let guard = sim.perturb(|f| perturbation.apply(f));
            let (dps, _) = mean_dps_and_oom(&guard, request.replicates, request.seed, request.parallel);
            dps - base_dps
        };
        info!(stat = stat.unit(), step = perturbation.step, dps_delta, "stat perturbation");
        raw.push((perturbation, dps_delta));
    }

    let ap_per_unit = raw
        .iter()
        .find(|(p, _)| p.stat == WeightedStat::AttackPower)
        .map_or(0.0, |(p, delta)| delta / p.units);

    let weights = raw
        .into_iter()
        .map(|(p, dps_delta)| {
            let dps_per_unit = dps_delta / p.units;
            let weight = if ap_per_unit.abs() < f64::EPSILON {
                0.0
            } else {
                dps_per_unit / ap_per_unit
            };
            StatWeight {
                stat: p.stat,
                unit: p.stat.unit(),
                step: p.step,
                dps_delta,
                dps_per_unit,
                weight,
            }
        })
        .collect();

    StatWeightOutcome::Computed(StatWeightTable {
        replicates: request.replicates,
        seed: request.seed,
        base_dps,
        mean_time_to_oom,
        weights,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_minimum_is_not_computed() {
        let mut sim = Simulation::builder(FighterConfig::default()).build().unwrap();
        let outcome = compute_stat_weights(&mut sim, StatWeightRequest::new(10, 1));
        assert_eq!(
            outcome,
            StatWeightOutcome::NotComputed {
                requested: 10,
                required: MIN_REPLICATES_FOR_WEIGHTS
            }
        );
    }

    #[test]
    fn hit_bump_flips_sign_near_the_cap() {
        let mut fighter = FighterConfig {
            hit_chance: 0.02,
            ..FighterConfig::default()
        };
        let up = Perturbation::for_stat(WeightedStat::HitChance, &fighter, 180.0);
        assert!(up.step > 0.0);
        assert_eq!(up.units, 2.0);
        fighter.hit_chance = 0.09;
        let down = Perturbation::for_stat(WeightedStat::HitChance, &fighter, 180.0);
        assert!(down.step < 0.0);
        assert_eq!(down.units, -2.0);
    }

    #[test]
    fn haste_bump_shortens_the_swing() {
        let mut fighter = FighterConfig::default();
        let before = fighter.swing_timer;
        Perturbation::for_stat(WeightedStat::Haste, &fighter, 180.0).apply(&mut fighter);
        assert!(fighter.swing_timer < before);
        assert!((fighter.swing_timer - 1.0 / (1.0 / before + 0.04)).abs() < 1e-9);
    }

    #[test]
    fn intellect_also_raises_the_pool() {
        let mut fighter = FighterConfig::default();
        let p = Perturbation::for_stat(WeightedStat::Intellect, &fighter, 180.0);
        let mana = fighter.mana;
        p.apply(&mut fighter);
        assert!((fighter.mana - mana - 15.0 * p.step).abs() < 1e-9);
    }
}
