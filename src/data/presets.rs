//! Named trinket presets with their passive stats.
//!
//! Passive ratings are folded into the fighter before trials start, so only the proc or
//! on-use part runs through the trinket state machine.

use serde::Serialize;

use crate::combat::fighter::{Ability, FighterConfig};
use crate::combat::stats::{StatKind, CRIT_RATING_PER_PERCENT, HIT_RATING_PER_PERCENT};
use crate::combat::trinket::{ProcTrigger, StatEffect, TriggerSource, TrinketBehavior, TrinketConfig};
use crate::error::ConfigError;

pub const PRESET_NAMES: [&str; 9] = [
    "bloodlust_brooch",
    "berserkers_call",
    "abacus",
    "drums_of_battle",
    "dragonspine_trophy",
    "hourglass",
    "tsunami_talisman",
    "naaru_sliver",
    "idol_of_the_white_stag",
];

/// Always-on stats granted just by equipping the item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PassiveStats {
    pub attack_power: f64,
    pub crit_rating: f64,
    pub hit_rating: f64,
}

impl PassiveStats {
    pub fn apply(&self, fighter: &mut FighterConfig) {
        fighter.attack_power += self.attack_power;
        fighter.crit_chance += self.crit_rating / CRIT_RATING_PER_PERCENT / 100.0;
        fighter.hit_chance += self.hit_rating / HIT_RATING_PER_PERCENT / 100.0;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrinketPreset {
    pub passive: PassiveStats,
    pub config: TrinketConfig,
}

fn ap(attack_power: f64) -> PassiveStats {
    PassiveStats {
        attack_power,
        ..PassiveStats::default()
    }
}

fn effect(stat: StatKind, amount: f64) -> Vec<StatEffect> {
    vec![StatEffect { stat, amount }]
}

fn trinket(
    name: &str,
    proc_name: &str,
    effects: Vec<StatEffect>,
    duration: f64,
    cooldown: f64,
    behavior: TrinketBehavior,
) -> TrinketConfig {
    TrinketConfig {
        name: name.to_string(),
        proc_name: proc_name.to_string(),
        effects,
        duration,
        cooldown,
        behavior,
    }
}

const ON_USE: TrinketBehavior = TrinketBehavior::Activated { delay: 0.0 };

pub fn preset(name: &str) -> Result<TrinketPreset, ConfigError> {
    use StatKind::{AttackPower, HasteRating};

    let (passive, config) = match name {
        "bloodlust_brooch" => (
            ap(72.0),
            trinket(name, "Lust for Battle", effect(AttackPower, 278.0), 20.0, 120.0, ON_USE),
        ),
        "berserkers_call" => (
            ap(90.0),
            trinket(name, "Call of the Berserker", effect(AttackPower, 360.0), 20.0, 120.0, ON_USE),
        ),
        "abacus" => (
            ap(64.0),
            trinket(name, "Haste", effect(HasteRating, 260.0), 10.0, 120.0, ON_USE),
        ),
        "drums_of_battle" => (
            PassiveStats::default(),
            trinket(name, "Drums of Battle", effect(HasteRating, 80.0), 30.0, 120.0, ON_USE),
        ),
        "dragonspine_trophy" => (
            ap(40.0),
            trinket(
                name,
                "Melee Haste",
                effect(HasteRating, 325.0),
                10.0,
                20.0,
                TrinketBehavior::Proc {
                    trigger: ProcTrigger::per_minute(1.0),
                },
            ),
        ),
        "hourglass" => (
            PassiveStats {
                crit_rating: 32.0,
                ..PassiveStats::default()
            },
            trinket(
                name,
                "Rage of the Unraveller",
                effect(AttackPower, 300.0),
                10.0,
                50.0,
                TrinketBehavior::Proc {
                    trigger: ProcTrigger::chance_on_crit(0.1),
                },
            ),
        ),
        "tsunami_talisman" => (
            PassiveStats {
                crit_rating: 38.0,
                hit_rating: 10.0,
                ..PassiveStats::default()
            },
            trinket(
                name,
                "Fury of the Crashing Waves",
                effect(AttackPower, 340.0),
                10.0,
                45.0,
                TrinketBehavior::Proc {
                    trigger: ProcTrigger::chance_on_crit(0.1),
                },
            ),
        ),
        "naaru_sliver" => (
            PassiveStats {
                hit_rating: 26.0,
                ..PassiveStats::default()
            },
            trinket(
                name,
                "Tenacity",
                effect(AttackPower, 44.0),
                20.0,
                45.0,
                TrinketBehavior::StackingProc {
                    trigger: ProcTrigger::chance_on_hit(0.1),
                    max_stacks: 10,
                    stack_chance: 1.0,
                },
            ),
        ),
        "idol_of_the_white_stag" => (
            PassiveStats::default(),
            trinket(
                name,
                "Wrath of the White Stag",
                effect(AttackPower, 94.0),
                20.0,
                0.0,
                TrinketBehavior::RefreshingProc {
                    trigger: ProcTrigger::chance_on_hit(1.0).from_source(TriggerSource::Ability(Ability::Mangle)),
                },
            ),
        ),
        _ => {
            return Err(ConfigError::UnknownTrinketPreset {
                name: name.to_string(),
                valid: PRESET_NAMES.iter().map(|n| n.to_string()).collect(),
            })
        }
    };
    Ok(TrinketPreset { passive, config })
}

/// Resolves preset names, folding their passive stats into `fighter`.
pub fn equip<S: AsRef<str>>(fighter: &mut FighterConfig, names: &[S]) -> Result<Vec<TrinketConfig>, ConfigError> {
    let presets = names
        .iter()
        .map(|n| preset(n.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(presets
        .into_iter()
        .map(|p| {
            p.passive.apply(fighter);
            p.config
        })
        .collect())
}

pub fn all_presets() -> Vec<TrinketPreset> {
    PRESET_NAMES.iter().filter_map(|n| preset(n).ok()).collect()
}
