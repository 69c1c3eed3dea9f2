//! The simulated cat: buffed base stats, per-trial resources, and one method per
//! action the rotation can take.
//!
//! Resources are private and only move through the action methods, which keep
//! `0 <= energy <= 100`, `0 <= combo_points <= 5` and `0 <= mana <= mana_pool`.

use std::collections::VecDeque;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::combat::damage::{roll_special, roll_white};
use crate::combat::engine::TIME_EPSILON;
use crate::combat::rng::Rng;
use crate::combat::stats::{haste_rating_for_swing, swing_timer_for_rating, StatKind};
use crate::data::encounter::EncounterParams;
use crate::error::ConfigError;

pub const MAX_ENERGY: f64 = 100.0;
pub const MAX_COMBO_POINTS: u8 = 5;
pub const ENERGY_PER_TICK: f64 = 20.0;
pub const TICK_INTERVAL: f64 = 2.0;

/// Miss chance with zero hit: 9% melee miss plus 6.5% dodge.
pub const BASE_MISS_CHANCE: f64 = 0.155;
/// Crit chance lost against a level 73 boss.
pub const CRIT_SUPPRESSION: f64 = 0.048;

pub const SHRED_COST: f64 = 42.0;
pub const CLAW_COST: f64 = 40.0;
pub const MANGLE_COST: f64 = 40.0;
pub const BITE_COST: f64 = 35.0;
pub const RIP_COST: f64 = 30.0;
/// Fraction of a builder's cost still paid when it misses.
pub const MISS_COST_FRACTION: f64 = 0.2;

pub const ACTION_GCD: f64 = 1.0;
pub const SHIFT_GCD: f64 = 1.5;
pub const SHIFT_ENERGY: f64 = 60.0;
pub const SHIFT_BASE_COST: f64 = 830.0;

pub const MANGLE_DURATION: f64 = 12.0;
pub const MANGLE_BONUS: f64 = 1.3;
pub const RIP_DURATION: f64 = 12.0;
pub const RIP_TICKS: usize = 6;

pub const BITE_ENERGY_COEFFICIENT: f64 = 4.1;
pub const TIGERS_FURY_DAMAGE: f64 = 40.0;

pub const INNERVATE_COST: f64 = 95.0;
pub const INNERVATE_DURATION: f64 = 20.0;
pub const INNERVATE_COOLDOWN: f64 = 360.0;

pub const OMEN_INTERNAL_COOLDOWN: f64 = 10.0;
const OMEN_PROCS_PER_MINUTE: f64 = 2.0;
const JOW_CHANCE: f64 = 0.5;
const JOW_MANA: f64 = 74.0;
const T4_CHANCE: f64 = 0.04;
const T4_ENERGY: f64 = 20.0;

const RUNE_DEFICIT: f64 = 1500.0;
const RUNE_MIN_MANA: f64 = 900.0;
const RUNE_MANA_SPREAD: f64 = 600.0;
const CONSUMABLE_COOLDOWN: f64 = 120.0;
const FEL_MANA_TICK: f64 = 400.0;
const FEL_MANA_INTERVAL: f64 = 3.0;
const FEL_MANA_DURATION: f64 = 24.0;
const SUPER_MANA_MIN: f64 = 1800.0;
const SUPER_MANA_SPREAD: f64 = 1200.0;

const BITE_LOW: [f64; 5] = [259.0, 428.0, 597.0, 766.0, 935.0];
const BITE_HIGH: [f64; 5] = [292.0, 461.0, 630.0, 799.0, 968.0];
const BITE_AP_COEFFICIENT: [f64; 5] = [0.05, 0.10, 0.15, 0.20, 0.25];
const RIP_TOTAL: [f64; 5] = [300.0, 498.0, 696.0, 894.0, 1092.0];
const RIP_AP_COEFFICIENT: [f64; 5] = [0.06, 0.12, 0.18, 0.24, 0.24];

/// Fully raid-buffed character stats and talent choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FighterConfig {
    pub attack_power: f64,
    /// Melee hit as a fraction; values past the 9% cap stand in for expertise.
    pub hit_chance: f64,
    pub crit_chance: f64,
    pub armor_pen: f64,
    /// Hasted swing timer in seconds.
    pub swing_timer: f64,
    pub mana: f64,
    pub intellect: f64,
    pub spirit: f64,
    pub mp5: f64,
    pub jow: bool,
    pub pot: bool,
    pub cheap_pot: bool,
    pub rune: bool,
    pub t4_bonus: bool,
    pub bonus_damage: f64,
    pub shred_bonus: f64,
    pub multiplier: f64,
    pub omen: bool,
    pub feral_aggression: u8,
    pub savage_fury: u8,
    pub natural_shapeshifter: u8,
    pub intensity: u8,
    pub weapon_speed: f64,
}

impl Default for FighterConfig {
    fn default() -> Self {
        Self {
            attack_power: 2800.0,
            hit_chance: 0.08,
            crit_chance: 0.35,
            armor_pen: 0.0,
            swing_timer: 0.9,
            mana: 5800.0,
            intellect: 250.0,
            spirit: 200.0,
            mp5: 0.0,
            jow: false,
            pot: true,
            cheap_pot: false,
            rune: true,
            t4_bonus: false,
            bonus_damage: 0.0,
            shred_bonus: 0.0,
            multiplier: 1.1,
            omen: true,
            feral_aggression: 0,
            savage_fury: 2,
            natural_shapeshifter: 3,
            intensity: 3,
            weapon_speed: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegenRates {
    pub base: f64,
    pub five_second_rule: f64,
    pub innervated: f64,
}

impl FighterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("swing_timer", self.swing_timer),
            ("weapon_speed", self.weapon_speed),
            ("intellect", self.intellect),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::invalid_parameter(
                    field,
                    format!("must be positive, got {value}"),
                ));
            }
        }
        let non_negative = [
            ("attack_power", self.attack_power),
            ("armor_pen", self.armor_pen),
            ("mana", self.mana),
            ("spirit", self.spirit),
            ("mp5", self.mp5),
            ("multiplier", self.multiplier),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid_parameter(
                    field,
                    format!("must be non-negative, got {value}"),
                ));
            }
        }
        for (field, value) in [("hit_chance", self.hit_chance), ("crit_chance", self.crit_chance)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid_parameter(
                    field,
                    format!("must be a fraction in [0, 1], got {value}"),
                ));
            }
        }
        let talents = [
            ("feral_aggression", self.feral_aggression, 5),
            ("savage_fury", self.savage_fury, 2),
            ("natural_shapeshifter", self.natural_shapeshifter, 3),
            ("intensity", self.intensity, 3),
        ];
        for (field, rank, max) in talents {
            if rank > max {
                return Err(ConfigError::invalid_parameter(
                    field,
                    format!("talent rank {rank} exceeds maximum {max}"),
                ));
            }
        }
        Ok(())
    }

    pub fn shift_cost(&self) -> f64 {
        SHIFT_BASE_COST * (1.0 - 0.1 * f64::from(self.natural_shapeshifter))
    }

    /// Spirit-to-mana conversion per 2 second tick.
    pub fn regen_factor(&self) -> f64 {
        0.009327 * self.intellect.sqrt() * 2.0
    }

    pub fn regen_rates(&self) -> RegenRates {
        let spirit_regen = self.spirit * self.regen_factor();
        let mp5_regen = self.mp5 / 5.0 * TICK_INTERVAL;
        RegenRates {
            base: spirit_regen + mp5_regen,
            five_second_rule: 0.1 * f64::from(self.intensity) * spirit_regen + mp5_regen,
            innervated: 5.0 * spirit_regen + mp5_regen,
        }
    }

    /// Mana level at or below which a mana potion is drunk. Fel Mana regenerates over
    /// 24 seconds, so the threshold budgets for the regen and shifting inside that window.
    pub fn pot_threshold(&self) -> f64 {
        if self.cheap_pot {
            return self.mana - 3000.0;
        }
        let rates = self.regen_rates();
        self.mana
            - 36.0
                * (FEL_MANA_TICK / FEL_MANA_INTERVAL + rates.five_second_rule / 2.0
                    + 37.0 * (1.0 / self.swing_timer + 2.0 / 5.0)
                    - self.shift_cost() / 5.0)
    }

    pub fn haste_rating(&self) -> f64 {
        haste_rating_for_swing(self.swing_timer)
    }
}

/// Temporary stat changes from trinkets, layered over [`FighterConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatBonuses {
    pub attack_power: f64,
    pub crit_chance: f64,
    pub hit_chance: f64,
    pub haste_rating: f64,
    pub armor_penetration: f64,
    pub weapon_damage: f64,
}

impl StatBonuses {
    pub fn add(&mut self, kind: StatKind, delta: f64) {
        let slot = match kind {
            StatKind::AttackPower => &mut self.attack_power,
            StatKind::CritChance => &mut self.crit_chance,
            StatKind::HitChance => &mut self.hit_chance,
            StatKind::HasteRating => &mut self.haste_rating,
            StatKind::ArmorPenetration => &mut self.armor_penetration,
            StatKind::WeaponDamage => &mut self.weapon_damage,
        };
        *slot += delta;
    }

    pub fn get(&self, kind: StatKind) -> f64 {
        match kind {
            StatKind::AttackPower => self.attack_power,
            StatKind::CritChance => self.crit_chance,
            StatKind::HitChance => self.hit_chance,
            StatKind::HasteRating => self.haste_rating,
            StatKind::ArmorPenetration => self.armor_penetration,
            StatKind::WeaponDamage => self.weapon_damage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DamageRange {
    pub low: f64,
    pub high: f64,
}

/// Per-ability damage bounds under the current buffs and boss debuffs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DamageParams {
    /// Armor multiplier times the overall damage multiplier.
    pub multiplier: f64,
    pub white: DamageRange,
    pub shred: DamageRange,
    pub claw: DamageRange,
    pub mangle: DamageRange,
    pub bite_multiplier: f64,
    /// Indexed by combo points minus one.
    pub bite: [DamageRange; 5],
    /// Damage per Rip tick, indexed by combo points minus one.
    pub rip_tick: [f64; 5],
}

impl DamageParams {
    pub fn compute(
        config: &FighterConfig,
        bonuses: &StatBonuses,
        encounter: &EncounterParams,
        tigers_fury: bool,
    ) -> Self {
        let attack_power = config.attack_power + bonuses.attack_power;
        let weapon_bonus = attack_power / 14.0
            + encounter.bonus_weapon_damage()
            + config.bonus_damage
            + bonuses.weapon_damage
            + if tigers_fury { TIGERS_FURY_DAMAGE } else { 0.0 };
        let armor_multiplier = encounter.armor_multiplier(config.armor_pen + bonuses.armor_penetration);
        let damage_multiplier = config.multiplier * encounter.damage_taken_multiplier();
        let multiplier = armor_multiplier * damage_multiplier;

        let white = DamageRange {
            low: (43.5 + weapon_bonus) * multiplier,
            high: (66.5 + weapon_bonus) * multiplier,
        };
        let shred_flat = (405.0 + config.shred_bonus) * multiplier;
        let shred = DamageRange {
            low: 2.25 * white.low + shred_flat,
            high: 2.25 * white.high + shred_flat,
        };
        let savage_fury = 1.0 + 0.1 * f64::from(config.savage_fury);
        let claw = DamageRange {
            low: savage_fury * (white.low + 190.0 * multiplier),
            high: savage_fury * (white.high + 190.0 * multiplier),
        };
        let mangle = DamageRange {
            low: savage_fury * (1.6 * white.low + 264.0 * multiplier),
            high: savage_fury * (1.6 * white.high + 264.0 * multiplier),
        };

        let bite_multiplier = multiplier * (1.0 + 0.03 * f64::from(config.feral_aggression));
        let bite = std::array::from_fn(|i| DamageRange {
            low: (BITE_LOW[i] + BITE_AP_COEFFICIENT[i] * attack_power) * bite_multiplier,
            high: (BITE_HIGH[i] + BITE_AP_COEFFICIENT[i] * attack_power) * bite_multiplier,
        });
        // Bleeds ignore armor.
        let rip_tick = std::array::from_fn(|i| {
            (RIP_TOTAL[i] + RIP_AP_COEFFICIENT[i] * attack_power) / RIP_TICKS as f64
                * damage_multiplier
        });

        Self {
            multiplier,
            white,
            shred,
            claw,
            mangle,
            bite_multiplier,
            bite,
            rip_tick,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    Melee,
    Mangle,
    Shred,
    Rip,
    Claw,
    FerociousBite,
    Shift,
}

impl Ability {
    pub const ALL: [Ability; 7] = [
        Ability::Melee,
        Ability::Mangle,
        Ability::Shred,
        Ability::Rip,
        Ability::Claw,
        Ability::FerociousBite,
        Ability::Shift,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Melee => "Melee",
            Self::Mangle => "Mangle",
            Self::Shred => "Shred",
            Self::Rip => "Rip",
            Self::Claw => "Claw",
            Self::FerociousBite => "Ferocious Bite",
            Self::Shift => "Shift",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    pub fn is_special(self) -> bool {
        !matches!(self, Self::Melee | Self::Shift)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AbilityTally {
    /// Whole counts for one trial; fractional once averaged over replicates.
    pub casts: f64,
    pub damage: f64,
}

/// Casts and damage per ability, always iterated in [`Ability::ALL`] order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Breakdown {
    tallies: [AbilityTally; 7],
}

impl Breakdown {
    pub fn get(&self, ability: Ability) -> AbilityTally {
        self.tallies[ability.index()]
    }

    pub fn record_cast(&mut self, ability: Ability) {
        self.tallies[ability.index()].casts += 1.0;
    }

    pub fn record_damage(&mut self, ability: Ability, damage: f64) {
        self.tallies[ability.index()].damage += damage;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Ability, AbilityTally)> + '_ {
        Ability::ALL.iter().map(|a| (*a, self.tallies[a.index()]))
    }

    pub fn total_damage(&self) -> f64 {
        self.tallies.iter().map(|t| t.damage).sum()
    }

    pub fn accumulate(&mut self, other: &Breakdown) {
        for (mine, theirs) in self.tallies.iter_mut().zip(other.tallies.iter()) {
            mine.casts += theirs.casts;
            mine.damage += theirs.damage;
        }
    }

    pub fn scaled(&self, factor: f64) -> Breakdown {
        let mut out = self.clone();
        for tally in &mut out.tallies {
            tally.casts *= factor;
            tally.damage *= factor;
        }
        out
    }
}

impl Serialize for Breakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tallies.len()))?;
        for (ability, tally) in self.iter() {
            map.serialize_entry(ability.as_str(), &tally)?;
        }
        map.end()
    }
}

/// What one action did, for the combat log and trinket proc checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttackOutcome {
    pub ability: Ability,
    pub damage: f64,
    pub missed: bool,
    pub crit: bool,
    pub clearcast: bool,
    pub t4_proc: bool,
}

impl AttackOutcome {
    pub fn landed(&self) -> bool {
        !self.missed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ManaConsumable {
    DarkRune,
    ManaPotion,
}

impl ManaConsumable {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DarkRune => "use Dark Rune",
            Self::ManaPotion => "use Mana Potion",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ShiftOutcome {
    pub rune_used: bool,
    pub potion_used: bool,
}

impl ShiftOutcome {
    /// Last consumable used, matching the log's single outcome column.
    pub fn consumable(&self) -> Option<ManaConsumable> {
        if self.potion_used {
            Some(ManaConsumable::ManaPotion)
        } else if self.rune_used {
            Some(ManaConsumable::DarkRune)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PotionRegen {
    ticks: VecDeque<f64>,
    end: f64,
}

#[derive(Debug, Clone)]
pub struct Fighter {
    config: FighterConfig,
    encounter: EncounterParams,
    bonuses: StatBonuses,
    tigers_fury: bool,
    params: DamageParams,
    regen: RegenRates,
    shift_cost: f64,
    pot_threshold: f64,
    omen_white_rate: f64,
    omen_special_rate: f64,

    energy: f64,
    combo_points: u8,
    mana: f64,

    gcd: f64,
    omen_proc: bool,
    omen_icd: f64,
    t4_proc: bool,
    rune_cd: f64,
    pot_cd: f64,
    potion: Option<PotionRegen>,
    innervate_cd: f64,
    innervated: bool,
    innervate_end: f64,
    five_second_rule: bool,
    last_cast_time: f64,
    cat_form: bool,

    breakdown: Breakdown,
}

impl Fighter {
    pub fn new(config: FighterConfig, encounter: EncounterParams) -> Self {
        let bonuses = StatBonuses::default();
        let params = DamageParams::compute(&config, &bonuses, &encounter, false);
        let omen_white_rate = OMEN_PROCS_PER_MINUTE / 60.0;
        let mut fighter = Self {
            regen: config.regen_rates(),
            shift_cost: config.shift_cost(),
            pot_threshold: config.pot_threshold(),
            omen_white_rate,
            omen_special_rate: omen_white_rate * config.weapon_speed,
            mana: config.mana,
            config,
            encounter,
            bonuses,
            tigers_fury: false,
            params,
            energy: MAX_ENERGY,
            combo_points: 0,
            gcd: 0.0,
            omen_proc: false,
            omen_icd: 0.0,
            t4_proc: false,
            rune_cd: 0.0,
            pot_cd: 0.0,
            potion: None,
            innervate_cd: 0.0,
            innervated: false,
            innervate_end: 0.0,
            five_second_rule: false,
            last_cast_time: f64::NEG_INFINITY,
            cat_form: true,
            breakdown: Breakdown::default(),
        };
        fighter.reset();
        fighter
    }

    /// Fresh start-of-fight state. Temporary stat bonuses are cleared as well.
    pub fn reset(&mut self) {
        self.bonuses = StatBonuses::default();
        self.tigers_fury = false;
        self.recompute_damage_params();
        self.energy = MAX_ENERGY;
        self.combo_points = 0;
        self.mana = self.config.mana;
        self.gcd = 0.0;
        self.omen_proc = false;
        self.omen_icd = 0.0;
        self.t4_proc = false;
        self.rune_cd = 0.0;
        self.pot_cd = 0.0;
        self.potion = None;
        self.innervate_cd = 0.0;
        self.innervated = false;
        self.innervate_end = 0.0;
        self.five_second_rule = false;
        self.last_cast_time = f64::NEG_INFINITY;
        self.cat_form = true;
        self.breakdown = Breakdown::default();
    }

    pub fn config(&self) -> &FighterConfig {
        &self.config
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn combo_points(&self) -> u8 {
        self.combo_points
    }

    pub fn mana(&self) -> f64 {
        self.mana
    }

    pub fn mana_pool(&self) -> f64 {
        self.config.mana
    }

    pub fn gcd(&self) -> f64 {
        self.gcd
    }

    pub fn omen_proc(&self) -> bool {
        self.omen_proc
    }

    pub fn cat_form(&self) -> bool {
        self.cat_form
    }

    pub fn shift_cost(&self) -> f64 {
        self.shift_cost
    }

    pub fn innervate_ready(&self) -> bool {
        self.innervate_cd < TIME_EPSILON
    }

    pub fn is_innervated(&self) -> bool {
        self.innervated
    }

    pub fn innervate_end(&self) -> f64 {
        self.innervate_end
    }

    pub fn five_second_rule(&self) -> bool {
        self.five_second_rule
    }

    pub fn tigers_fury(&self) -> bool {
        self.tigers_fury
    }

    pub fn damage_params(&self) -> &DamageParams {
        &self.params
    }

    pub fn bonuses(&self) -> &StatBonuses {
        &self.bonuses
    }

    pub fn breakdown(&self) -> &Breakdown {
        &self.breakdown
    }

    pub fn into_breakdown(self) -> Breakdown {
        self.breakdown
    }

    pub fn miss_chance(&self) -> f64 {
        (BASE_MISS_CHANCE - self.config.hit_chance - self.bonuses.hit_chance).max(0.0)
    }

    pub fn crit_chance(&self) -> f64 {
        (self.config.crit_chance + self.bonuses.crit_chance - CRIT_SUPPRESSION).clamp(0.0, 1.0)
    }

    /// Current swing timer, including haste-rating effects.
    pub fn swing_timer(&self) -> f64 {
        // Overlapping procs can leave rounding residue once they all expire.
        if self.bonuses.haste_rating.abs() < 1e-9 {
            return self.config.swing_timer;
        }
        swing_timer_for_rating(self.config.haste_rating() + self.bonuses.haste_rating)
    }

    pub fn weapon_speed(&self) -> f64 {
        self.config.weapon_speed
    }

    /// Scenario setup for tests and tools; values are clamped into their bounds.
    pub fn set_resources(&mut self, energy: f64, combo_points: u8, mana: f64) {
        self.energy = energy.clamp(0.0, MAX_ENERGY);
        self.combo_points = combo_points.min(MAX_COMBO_POINTS);
        self.mana = mana.clamp(0.0, self.config.mana);
    }

    /// Bank a free cast as if Omen of Clarity had just procced.
    pub fn grant_clearcast(&mut self) {
        self.omen_proc = true;
    }

    pub fn apply_stat(&mut self, kind: StatKind, delta: f64) {
        self.bonuses.add(kind, delta);
        if kind.affects_damage_ranges() {
            self.recompute_damage_params();
        }
    }

    pub fn revert_stat(&mut self, kind: StatKind, delta: f64) {
        self.apply_stat(kind, -delta);
    }

    pub fn set_tigers_fury(&mut self, active: bool) {
        if self.tigers_fury != active {
            self.tigers_fury = active;
            self.recompute_damage_params();
        }
    }

    /// Spend starting energy before the pull, e.g. on a pre-popped Tiger's Fury.
    pub fn spend_opening_energy(&mut self, amount: f64) {
        self.energy = (self.energy - amount).clamp(0.0, MAX_ENERGY);
    }

    fn recompute_damage_params(&mut self) {
        self.params = DamageParams::compute(&self.config, &self.bonuses, &self.encounter, self.tigers_fury);
    }

    pub fn decay_cooldowns(&mut self, elapsed: f64) {
        self.gcd = (self.gcd - elapsed).max(0.0);
        self.omen_icd = (self.omen_icd - elapsed).max(0.0);
        self.rune_cd = (self.rune_cd - elapsed).max(0.0);
        self.pot_cd = (self.pot_cd - elapsed).max(0.0);
        self.innervate_cd = (self.innervate_cd - elapsed).max(0.0);
    }

    /// Leaves the five-second rule once five seconds have passed since the last mana spend.
    pub fn update_five_second_rule(&mut self, time: f64) {
        if self.five_second_rule && time - self.last_cast_time >= 5.0 {
            self.five_second_rule = false;
        }
    }

    /// Returns true when Innervate fell off at `time`.
    pub fn expire_innervate(&mut self, time: f64) -> bool {
        if self.innervated && time >= self.innervate_end - TIME_EPSILON {
            self.innervated = false;
            return true;
        }
        false
    }

    pub fn next_potion_tick(&self) -> Option<f64> {
        self.potion.as_ref().and_then(|p| p.ticks.front().copied())
    }

    pub fn potion_end(&self) -> Option<f64> {
        self.potion.as_ref().map(|p| p.end)
    }

    /// Applies a Fel Mana tick if one is due at `time`.
    pub fn potion_tick(&mut self, time: f64) -> bool {
        let due = matches!(self.next_potion_tick(), Some(t) if (t - time).abs() < TIME_EPSILON);
        if !due {
            return false;
        }
        if let Some(potion) = self.potion.as_mut() {
            potion.ticks.pop_front();
        }
        self.gain_mana(FEL_MANA_TICK);
        true
    }

    /// Returns true when the potion's regen window closed at `time`.
    pub fn expire_potion(&mut self, time: f64) -> bool {
        match self.potion_end() {
            Some(end) if time > end - TIME_EPSILON => {
                self.potion = None;
                true
            }
            _ => false,
        }
    }

    /// Scheduled energy and spirit tick. Out of cat form, energy is lost.
    pub fn resource_tick(&mut self) {
        self.energy = if self.cat_form {
            (self.energy + ENERGY_PER_TICK).min(MAX_ENERGY)
        } else {
            0.0
        };
        let regen = if self.innervated {
            self.regen.innervated
        } else if self.five_second_rule {
            self.regen.five_second_rule
        } else {
            self.regen.base
        };
        self.gain_mana(regen);
    }

    fn gain_mana(&mut self, amount: f64) {
        self.mana = (self.mana + amount).min(self.config.mana);
    }

    fn secondary_procs(&mut self, special: bool, rng: &mut Rng) {
        if self.config.omen && self.omen_icd <= TIME_EPSILON {
            let rate = if special {
                self.omen_special_rate
            } else {
                self.omen_white_rate
            };
            if rng.roll(rate) {
                self.omen_proc = true;
                self.omen_icd = OMEN_INTERNAL_COOLDOWN;
            }
        }
        if self.config.jow && rng.roll(JOW_CHANCE) {
            self.gain_mana(JOW_MANA);
        }
        if self.config.t4_bonus && rng.roll(T4_CHANCE) {
            self.energy = (self.energy + T4_ENERGY).min(MAX_ENERGY);
            self.t4_proc = true;
        }
    }

    /// Consumes a banked clearcast if present, otherwise pays `cost`.
    fn pay(&mut self, cost: f64) -> bool {
        if self.omen_proc {
            self.omen_proc = false;
            true
        } else {
            self.energy = (self.energy - cost).max(0.0);
            false
        }
    }

    fn combo_index(&self) -> usize {
        usize::from(self.combo_points.clamp(1, MAX_COMBO_POINTS) - 1)
    }

    pub fn swing(&mut self, rng: &mut Rng) -> AttackOutcome {
        self.t4_proc = false;
        let white = self.params.white;
        let roll = roll_white(white.low, white.high, self.miss_chance(), self.crit_chance(), rng);
        if !roll.missed {
            self.secondary_procs(false, rng);
        }
        self.breakdown.record_cast(Ability::Melee);
        self.breakdown.record_damage(Ability::Melee, roll.damage);
        AttackOutcome {
            ability: Ability::Melee,
            damage: roll.damage,
            missed: roll.missed,
            crit: roll.crit,
            clearcast: false,
            t4_proc: self.t4_proc,
        }
    }

    fn execute_builder(
        &mut self,
        ability: Ability,
        range: DamageRange,
        cost: f64,
        bonus: f64,
        rng: &mut Rng,
    ) -> AttackOutcome {
        self.t4_proc = false;
        let roll = roll_special(range.low, range.high, self.miss_chance(), self.crit_chance(), rng);
        let damage = roll.damage * bonus;
        self.gcd = ACTION_GCD;

        let paid_cost = if roll.missed { cost * MISS_COST_FRACTION } else { cost };
        let clearcast = self.pay(paid_cost);

        let points = u8::from(!roll.missed) + u8::from(roll.crit);
        self.combo_points = (self.combo_points + points).min(MAX_COMBO_POINTS);

        if !roll.missed {
            self.secondary_procs(true, rng);
        }
        self.breakdown.record_cast(ability);
        self.breakdown.record_damage(ability, damage);
        AttackOutcome {
            ability,
            damage,
            missed: roll.missed,
            crit: roll.crit,
            clearcast,
            t4_proc: self.t4_proc,
        }
    }

    pub fn shred(&mut self, mangle_active: bool, rng: &mut Rng) -> AttackOutcome {
        let bonus = if mangle_active { MANGLE_BONUS } else { 1.0 };
        self.execute_builder(Ability::Shred, self.params.shred, SHRED_COST, bonus, rng)
    }

    pub fn claw(&mut self, rng: &mut Rng) -> AttackOutcome {
        self.execute_builder(Ability::Claw, self.params.claw, CLAW_COST, 1.0, rng)
    }

    /// Mangle; the caller applies the debuff when the outcome landed.
    pub fn mangle(&mut self, rng: &mut Rng) -> AttackOutcome {
        self.execute_builder(Ability::Mangle, self.params.mangle, MANGLE_COST, 1.0, rng)
    }

    /// Ferocious Bite. Excess energy above the cost adds damage; a miss spends
    /// neither energy nor combo points.
    pub fn bite(&mut self, rng: &mut Rng) -> AttackOutcome {
        self.t4_proc = false;
        let clearcast = self.omen_proc;
        self.omen_proc = false;

        let pre_cast_energy = self.energy;
        let excess_energy = if clearcast {
            pre_cast_energy
        } else {
            (pre_cast_energy - BITE_COST).max(0.0)
        };
        let bonus = excess_energy * BITE_ENERGY_COEFFICIENT * self.params.bite_multiplier;
        let range = self.params.bite[self.combo_index()];
        let roll = roll_special(
            range.low + bonus,
            range.high + bonus,
            self.miss_chance(),
            self.crit_chance(),
            rng,
        );
        self.gcd = ACTION_GCD;

        if !roll.missed {
            self.energy = 0.0;
            self.combo_points = 0;
            self.secondary_procs(true, rng);
        }
        self.breakdown.record_cast(Ability::FerociousBite);
        self.breakdown.record_damage(Ability::FerociousBite, roll.damage);
        AttackOutcome {
            ability: Ability::FerociousBite,
            damage: roll.damage,
            missed: roll.missed,
            crit: roll.crit,
            clearcast,
            t4_proc: self.t4_proc,
        }
    }

    /// Rip. Returns the outcome and the per-tick damage fixed at cast time (zero on a miss).
    /// Tick damage is recorded by the driver as ticks land.
    pub fn rip(&mut self, rng: &mut Rng) -> (AttackOutcome, f64) {
        self.t4_proc = false;
        let missed = rng.roll(self.miss_chance());
        let tick_damage = if missed {
            0.0
        } else {
            self.params.rip_tick[self.combo_index()]
        };
        self.gcd = ACTION_GCD;
        let clearcast = self.pay(RIP_COST);

        if !missed {
            self.combo_points = 0;
            self.secondary_procs(true, rng);
        }
        self.breakdown.record_cast(Ability::Rip);
        let outcome = AttackOutcome {
            ability: Ability::Rip,
            damage: 0.0,
            missed,
            crit: false,
            clearcast,
            t4_proc: self.t4_proc,
        };
        (outcome, tick_damage)
    }

    pub fn record_rip_tick(&mut self, damage: f64) {
        self.breakdown.record_damage(Ability::Rip, damage);
    }

    /// Powershift: back into cat at 60 energy for a mana cost, then use a rune or potion
    /// if either would be fully used.
    pub fn shift(&mut self, time: f64, rng: &mut Rng) -> ShiftOutcome {
        self.energy = SHIFT_ENERGY;
        self.gcd = SHIFT_GCD;
        self.breakdown.record_cast(Ability::Shift);
        self.mana = (self.mana - self.shift_cost).max(0.0);
        self.five_second_rule = true;
        self.last_cast_time = time;
        self.cat_form = true;

        let rune_used = self.use_rune(rng);
        let potion_used = self.use_potion(time, rng);
        ShiftOutcome {
            rune_used,
            potion_used,
        }
    }

    /// Innervate in caster form. Energy is lost until the next shift.
    pub fn innervate(&mut self, time: f64) {
        self.mana = (self.mana - INNERVATE_COST).max(0.0);
        self.innervate_end = time + INNERVATE_DURATION;
        self.innervated = true;
        self.cat_form = false;
        self.energy = 0.0;
        self.gcd = SHIFT_GCD;
        self.innervate_cd = INNERVATE_COOLDOWN;
    }

    fn use_rune(&mut self, rng: &mut Rng) -> bool {
        if !self.config.rune
            || self.rune_cd > TIME_EPSILON
            || self.mana > self.config.mana - RUNE_DEFICIT
        {
            return false;
        }
        self.gain_mana(RUNE_MIN_MANA + rng.next_f64() * RUNE_MANA_SPREAD);
        self.rune_cd = CONSUMABLE_COOLDOWN;
        true
    }

    fn use_potion(&mut self, time: f64, rng: &mut Rng) -> bool {
        if !self.config.pot || self.pot_cd > TIME_EPSILON || self.mana > self.pot_threshold {
            return false;
        }
        self.pot_cd = CONSUMABLE_COOLDOWN;
        if self.config.cheap_pot {
            self.gain_mana(SUPER_MANA_MIN + rng.next_f64() * SUPER_MANA_SPREAD);
        } else {
            let tick_count = (FEL_MANA_DURATION / FEL_MANA_INTERVAL).round() as usize;
            let ticks = (1..=tick_count)
                .map(|i| time + FEL_MANA_INTERVAL * i as f64)
                .collect();
            self.potion = Some(PotionRegen {
                ticks,
                end: time + FEL_MANA_DURATION,
            });
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::encounter::BossDebuffs;

    fn fighter(config: FighterConfig) -> Fighter {
        Fighter::new(config, EncounterParams::default())
    }

    fn never_miss() -> FighterConfig {
        FighterConfig {
            hit_chance: 0.2,
            omen: false,
            ..FighterConfig::default()
        }
    }

    #[test]
    fn shift_cost_scales_with_talent() {
        let mut config = FighterConfig::default();
        assert!((config.shift_cost() - 581.0).abs() < 1e-9);
        config.natural_shapeshifter = 0;
        assert!((config.shift_cost() - 830.0).abs() < 1e-9);
    }

    #[test]
    fn regen_rates_follow_spirit_and_mp5() {
        let config = FighterConfig {
            intellect: 400.0,
            spirit: 100.0,
            mp5: 50.0,
            ..FighterConfig::default()
        };
        let factor = 0.009327 * 20.0 * 2.0;
        let rates = config.regen_rates();
        assert!((rates.base - (100.0 * factor + 20.0)).abs() < 1e-9);
        assert!((rates.five_second_rule - (0.3 * 100.0 * factor + 20.0)).abs() < 1e-9);
        assert!((rates.innervated - (500.0 * factor + 20.0)).abs() < 1e-9);
    }

    #[test]
    fn builder_adds_combo_points_and_spends_energy() {
        let mut f = fighter(never_miss());
        let mut rng = Rng::new(1);
        let out = f.shred(false, &mut rng);
        assert!(out.landed());
        assert!((f.energy() - (MAX_ENERGY - SHRED_COST)).abs() < 1e-9);
        let expected = if out.crit { 2 } else { 1 };
        assert_eq!(f.combo_points(), expected);
        assert_eq!(f.gcd(), ACTION_GCD);
    }

    #[test]
    fn combo_points_cap_at_five() {
        let mut f = fighter(never_miss());
        let mut rng = Rng::new(2);
        for _ in 0..10 {
            f.set_resources(100.0, f.combo_points(), f.mana());
            f.claw(&mut rng);
        }
        assert_eq!(f.combo_points(), MAX_COMBO_POINTS);
    }

    #[test]
    fn clearcast_waives_cost_once() {
        let mut f = fighter(never_miss());
        let mut rng = Rng::new(3);
        f.set_resources(50.0, 0, 1000.0);
        f.grant_clearcast();
        let out = f.mangle(&mut rng);
        assert!(out.clearcast);
        assert_eq!(f.energy(), 50.0);
        assert!(!f.omen_proc());
        f.mangle(&mut rng);
        assert_eq!(f.energy(), 10.0);
    }

    #[test]
    fn missed_builder_costs_a_fifth() {
        let config = FighterConfig {
            hit_chance: 0.0,
            omen: false,
            ..FighterConfig::default()
        };
        let mut f = fighter(config);
        let mut rng = Rng::new(4);
        loop {
            f.set_resources(100.0, 0, f.mana());
            let out = f.claw(&mut rng);
            if out.missed {
                assert!((f.energy() - (100.0 - CLAW_COST * MISS_COST_FRACTION)).abs() < 1e-9);
                assert_eq!(f.combo_points(), 0);
                break;
            }
        }
    }

    #[test]
    fn bite_spends_everything_on_hit() {
        let mut f = fighter(never_miss());
        let mut rng = Rng::new(5);
        f.set_resources(80.0, 5, 1000.0);
        let out = f.bite(&mut rng);
        assert!(out.landed());
        assert_eq!(f.energy(), 0.0);
        assert_eq!(f.combo_points(), 0);
        let min = f.damage_params().bite[4].low + 45.0 * BITE_ENERGY_COEFFICIENT * f.damage_params().bite_multiplier;
        assert!(out.damage >= min - 1e-9);
    }

    #[test]
    fn missed_bite_keeps_energy_and_combo_points() {
        let config = FighterConfig {
            hit_chance: 0.0,
            omen: false,
            ..FighterConfig::default()
        };
        let mut f = fighter(config);
        let mut rng = Rng::new(6);
        loop {
            f.set_resources(70.0, 4, 1000.0);
            let out = f.bite(&mut rng);
            if out.missed {
                assert_eq!(f.energy(), 70.0);
                assert_eq!(f.combo_points(), 4);
                break;
            }
        }
    }

    #[test]
    fn rip_fixes_tick_damage_and_consumes_points() {
        let mut f = fighter(never_miss());
        let mut rng = Rng::new(7);
        f.set_resources(40.0, 5, 1000.0);
        let (out, tick) = f.rip(&mut rng);
        assert!(out.landed());
        assert!((tick - f.damage_params().rip_tick[4]).abs() < 1e-9);
        assert_eq!(f.combo_points(), 0);
        assert_eq!(f.energy(), 10.0);
        assert_eq!(f.breakdown().get(Ability::Rip).casts, 1.0);
    }

    #[test]
    fn shift_resets_energy_and_enters_five_second_rule() {
        let config = FighterConfig {
            rune: false,
            pot: false,
            ..FighterConfig::default()
        };
        let mut f = fighter(config);
        let mut rng = Rng::new(8);
        f.set_resources(5.0, 2, 3000.0);
        f.shift(10.0, &mut rng);
        assert_eq!(f.energy(), SHIFT_ENERGY);
        assert!((f.mana() - (3000.0 - f.shift_cost())).abs() < 1e-9);
        assert!(f.five_second_rule());
        assert_eq!(f.gcd(), SHIFT_GCD);
        f.update_five_second_rule(14.9);
        assert!(f.five_second_rule());
        f.update_five_second_rule(15.0);
        assert!(!f.five_second_rule());
    }

    #[test]
    fn rune_restores_mana_when_deep_enough() {
        let config = FighterConfig {
            pot: false,
            ..FighterConfig::default()
        };
        let mut f = fighter(config);
        let mut rng = Rng::new(9);
        f.set_resources(0.0, 0, 2000.0);
        let out = f.shift(1.0, &mut rng);
        assert!(out.rune_used);
        assert!(f.mana() >= 2000.0 - f.shift_cost() + RUNE_MIN_MANA);
        assert!(f.mana() <= f.mana_pool());
    }

    #[test]
    fn fel_mana_ticks_eight_times() {
        let config = FighterConfig {
            rune: false,
            ..FighterConfig::default()
        };
        let mut f = fighter(config);
        let mut rng = Rng::new(10);
        f.set_resources(0.0, 0, 600.0);
        assert!(f.shift(0.0, &mut rng).potion_used);
        let mut ticks = 0;
        while let Some(t) = f.next_potion_tick() {
            assert!(f.potion_tick(t));
            ticks += 1;
        }
        assert_eq!(ticks, 8);
        assert!(f.expire_potion(24.0));
        assert!(f.mana() <= f.mana_pool());
    }

    #[test]
    fn innervate_leaves_form_and_zeroes_energy_ticks() {
        let mut f = fighter(FighterConfig::default());
        f.set_resources(40.0, 3, 1000.0);
        f.innervate(30.0);
        assert!(!f.cat_form());
        assert!(f.is_innervated());
        f.resource_tick();
        assert_eq!(f.energy(), 0.0);
        assert!(!f.expire_innervate(49.0));
        assert!(f.expire_innervate(50.0));
    }

    #[test]
    fn armor_debuffs_raise_damage_ranges() {
        let config = FighterConfig::default();
        let bare = EncounterParams {
            debuffs: BossDebuffs::none(),
            ..EncounterParams::default()
        };
        let debuffed = EncounterParams::default();
        let low = DamageParams::compute(&config, &StatBonuses::default(), &bare, false);
        let high = DamageParams::compute(&config, &StatBonuses::default(), &debuffed, false);
        assert!(high.white.low > low.white.low);
        assert!(high.shred.high > low.shred.high);
        assert!(high.bite[4].low > low.bite[4].low);
    }

    #[test]
    fn stat_bonus_round_trip_restores_ranges() {
        let mut f = fighter(FighterConfig::default());
        let before = f.damage_params().clone();
        f.apply_stat(StatKind::AttackPower, 278.0);
        assert!(f.damage_params().white.low > before.white.low);
        f.revert_stat(StatKind::AttackPower, 278.0);
        assert!((f.damage_params().white.low - before.white.low).abs() < 1e-9);
    }

    #[test]
    fn haste_bonus_shortens_swing() {
        let mut f = fighter(FighterConfig::default());
        let base = f.swing_timer();
        f.apply_stat(StatKind::HasteRating, 325.0);
        assert!(f.swing_timer() < base);
        f.revert_stat(StatKind::HasteRating, 325.0);
        assert!((f.swing_timer() - base).abs() < 1e-12);
    }

    #[test]
    fn overlapping_haste_procs_restore_the_configured_swing() {
        let mut f = fighter(FighterConfig::default());
        f.apply_stat(StatKind::HasteRating, 52.3);
        f.apply_stat(StatKind::HasteRating, 17.1);
        f.revert_stat(StatKind::HasteRating, 52.3);
        f.revert_stat(StatKind::HasteRating, 17.1);
        assert_eq!(f.swing_timer(), FighterConfig::default().swing_timer);
    }

    #[test]
    fn breakdown_serializes_in_fixed_order() {
        let f = fighter(FighterConfig::default());
        let json = serde_json::to_string(f.breakdown()).unwrap();
        let melee = json.find("Melee").unwrap();
        let bite = json.find("Ferocious Bite").unwrap();
        let shift = json.find("Shift").unwrap();
        assert!(melee < bite && bite < shift);
    }
}
