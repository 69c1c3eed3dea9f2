//! Encounter driver: one trial of the fight as a sequence of time steps.
//!
//! Each step applies, in this order: cooldown decay, the five-second rule, expirations
//! (Innervate, Tiger's Fury, trinket windows, Mangle), damage and potion ticks (a Rip
//! tick lands before its own expiry), the melee swing and its procs, the energy/spirit
//! tick, on-use trinkets, and finally the rotation when no global cooldown is pending.
//! Time then advances to the earliest pending event. Two times closer than
//! [`TIME_EPSILON`] are the same instant.

use std::collections::VecDeque;
use std::ops::Deref;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::combat::fighter::{
    AttackOutcome, Breakdown, Fighter, FighterConfig, MANGLE_BONUS, MANGLE_DURATION, RIP_DURATION,
    RIP_TICKS, TICK_INTERVAL,
};
use crate::combat::rng::Rng;
use crate::combat::rotation::{choose_action, Action, RotationContext};
use crate::combat::trace::{describe_outcome, CombatEvent, Resources, TimelineSample, TraceCollector, TraceMode};
use crate::combat::trinket::{build_trinkets, Trinket, TrinketConfig, TrinketReport};
use crate::data::encounter::EncounterParams;
use crate::data::strategy::StrategyConfig;
use crate::error::ConfigError;

pub const TIME_EPSILON: f64 = 1e-9;

/// Standard deviation of the per-trial fight length, in seconds.
pub const FIGHT_LENGTH_JITTER: f64 = 1.0;

/// The first swing lands within this long after the pull.
const FIRST_SWING_WINDOW: f64 = 0.1;
/// Delay before the swing timer restarts after Innervate.
const INNERVATE_SWING_DELAY: f64 = 1.5;
/// Tiger's Fury is popped this long before an energy tick.
const TIGERS_FURY_LEAD: f64 = 0.1;
const TIGERS_FURY_DURATION: f64 = 6.0;
const TIGERS_FURY_ENERGY_PER_TICK: f64 = 10.0;

/// Outcome of one trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialResult {
    pub fight_length: f64,
    pub total_damage: f64,
    pub dps: f64,
    pub breakdown: Breakdown,
    /// First decision point with less mana than a shift costs.
    pub time_to_oom: Option<f64>,
    pub trinkets: Vec<TrinketReport>,
}

/// A trial run with the combat log enabled.
#[derive(Debug, Clone, Serialize)]
pub struct TracedTrial {
    pub result: TrialResult,
    pub events: Vec<CombatEvent>,
    pub timeline: Vec<TimelineSample>,
}

/// Validated, immutable fight setup. Stat perturbations go through [`Simulation::perturb`].
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    fighter: FighterConfig,
    encounter: EncounterParams,
    strategy: StrategyConfig,
    trinkets: Vec<TrinketConfig>,
}

#[derive(Debug, Clone)]
pub struct SimulationBuilder {
    fighter: FighterConfig,
    encounter: EncounterParams,
    debuffs: Option<Vec<String>>,
    strategy: StrategyConfig,
    strategy_overrides: Option<Map<String, Value>>,
    trinkets: Vec<TrinketConfig>,
}

impl SimulationBuilder {
    pub fn encounter(mut self, encounter: EncounterParams) -> Self {
        self.encounter = encounter;
        self
    }

    pub fn fight_length(mut self, seconds: f64) -> Self {
        self.encounter.fight_length = seconds;
        self
    }

    pub fn boss_armor(mut self, armor: f64) -> Self {
        self.encounter.boss_armor = armor;
        self
    }

    /// Active boss debuffs by name; checked against the allow-list in [`Self::build`].
    pub fn debuffs<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.debuffs = Some(names.iter().map(|n| n.as_ref().to_string()).collect());
        self
    }

    /// Replaces the whole strategy; range-checked in [`Self::build`].
    pub fn strategy(mut self, strategy: StrategyConfig) -> Self {
        self.strategy = strategy;
        self
    }

    /// Strategy keys overriding the defaults; checked in [`Self::build`].
    pub fn strategy_overrides(mut self, overrides: Map<String, Value>) -> Self {
        self.strategy_overrides = Some(overrides);
        self
    }

    pub fn trinket(mut self, trinket: TrinketConfig) -> Self {
        self.trinkets.push(trinket);
        self
    }

    pub fn trinkets(mut self, trinkets: Vec<TrinketConfig>) -> Self {
        self.trinkets = trinkets;
        self
    }

    pub fn build(self) -> Result<Simulation, ConfigError> {
        let mut encounter = self.encounter;
        if let Some(names) = &self.debuffs {
            encounter = encounter.with_debuffs(names)?;
        }
        encounter.validate()?;
        self.fighter.validate()?;
        let strategy = match &self.strategy_overrides {
            Some(overrides) => StrategyConfig::from_map(overrides)?,
            None => {
                self.strategy.validate()?;
                self.strategy
            }
        };
        for trinket in &self.trinkets {
            trinket.validate()?;
        }
        debug!(
            fight_length = encounter.fight_length,
            boss_armor = encounter.boss_armor,
            debuffs = ?encounter.debuffs.active_names(),
            trinkets = self.trinkets.len(),
            "simulation configured"
        );
        Ok(Simulation {
            fighter: self.fighter,
            encounter,
            strategy,
            trinkets: self.trinkets,
        })
    }
}

impl Simulation {
    pub fn builder(fighter: FighterConfig) -> SimulationBuilder {
        SimulationBuilder {
            fighter,
            encounter: EncounterParams::default(),
            debuffs: None,
            strategy: StrategyConfig::default(),
            strategy_overrides: None,
            trinkets: Vec::new(),
        }
    }

    pub fn fighter(&self) -> &FighterConfig {
        &self.fighter
    }

    pub fn encounter(&self) -> &EncounterParams {
        &self.encounter
    }

    pub fn strategy(&self) -> &StrategyConfig {
        &self.strategy
    }

    pub fn trinkets(&self) -> &[TrinketConfig] {
        &self.trinkets
    }

    pub fn fight_length(&self) -> f64 {
        self.encounter.fight_length
    }

    /// A fresh fighter bound to this encounter.
    pub fn new_fighter(&self) -> Fighter {
        Fighter::new(self.fighter.clone(), self.encounter.clone())
    }

    /// Temporarily modifies the fighter configuration. The original is restored when
    /// the guard drops, including during unwinding.
    pub fn perturb<F: FnOnce(&mut FighterConfig)>(&mut self, apply: F) -> PerturbationGuard<'_> {
        let original = self.fighter.clone();
        apply(&mut self.fighter);
        PerturbationGuard { sim: self, original }
    }

    /// Trial `index` of a replicate run: its own random stream and a jittered fight length.
    pub fn run_replicate(&self, base_seed: u64, index: u64) -> TrialResult {
        let mut rng = Rng::for_trial(base_seed, index);
        let fight_length =
            (self.encounter.fight_length + FIGHT_LENGTH_JITTER * rng.next_gaussian()).max(TIME_EPSILON);
        self.run_trial(&mut rng, fight_length)
    }

    pub fn run_trial(&self, rng: &mut Rng, fight_length: f64) -> TrialResult {
        Trial::new(self, rng, fight_length, TraceMode::Off).run().0
    }

    pub fn run_traced(&self, rng: &mut Rng, fight_length: f64) -> TracedTrial {
        let (result, trace) = Trial::new(self, rng, fight_length, TraceMode::Events).run();
        let (events, timeline) = trace.into_parts();
        TracedTrial {
            result,
            events,
            timeline,
        }
    }
}

pub struct PerturbationGuard<'a> {
    sim: &'a mut Simulation,
    original: FighterConfig,
}

impl Deref for PerturbationGuard<'_> {
    type Target = Simulation;

    fn deref(&self) -> &Simulation {
        self.sim
    }
}

impl Drop for PerturbationGuard<'_> {
    fn drop(&mut self) {
        self.sim.fighter = std::mem::take(&mut self.original);
    }
}

#[derive(Debug, Clone)]
struct RipDot {
    ticks: VecDeque<f64>,
    end: f64,
    tick_damage: f64,
}

impl RipDot {
    fn new(time: f64, tick_damage: f64) -> Self {
        let interval = RIP_DURATION / RIP_TICKS as f64;
        Self {
            ticks: (1..=RIP_TICKS).map(|i| time + interval * i as f64).collect(),
            end: time + RIP_DURATION,
            tick_damage,
        }
    }
}

struct Trial<'a> {
    sim: &'a Simulation,
    rng: &'a mut Rng,
    fighter: Fighter,
    trinkets: Vec<Trinket>,
    trace: TraceCollector,
    fight_length: f64,
    time: f64,
    next_swing: f64,
    next_tick: f64,
    rip: Option<RipDot>,
    mangle_end: Option<f64>,
    tigers_fury_end: Option<f64>,
    time_to_oom: Option<f64>,
}

impl<'a> Trial<'a> {
    fn new(sim: &'a Simulation, rng: &'a mut Rng, fight_length: f64, mode: TraceMode) -> Self {
        let mut fighter = sim.new_fighter();
        let trinkets = build_trinkets(&sim.trinkets, sim.strategy.cd_delay);

        // The pull lands at a random phase of the energy tick, and the first swing
        // shortly after the opening special.
        let tick_start = TICK_INTERVAL * rng.next_f64();
        let first_swing = FIRST_SWING_WINDOW * rng.next_f64();

        let mut tigers_fury_end = None;
        if sim.strategy.prepop_tf {
            let ticks = f64::from(sim.strategy.prepop_numticks);
            fighter.set_tigers_fury(true);
            fighter.spend_opening_energy(TIGERS_FURY_ENERGY_PER_TICK * (2.0 - ticks));
            tigers_fury_end = Some(tick_start - TIGERS_FURY_LEAD + TIGERS_FURY_DURATION - TICK_INTERVAL * ticks);
        }

        Self {
            sim,
            rng,
            fighter,
            trinkets,
            trace: TraceCollector::new(mode),
            fight_length,
            time: 0.0,
            next_swing: first_swing,
            next_tick: tick_start,
            rip: None,
            mangle_end: None,
            tigers_fury_end,
            time_to_oom: None,
        }
    }

    fn resources(&self) -> Resources {
        Resources {
            energy: self.fighter.energy(),
            combo_points: self.fighter.combo_points(),
            mana: self.fighter.mana(),
        }
    }

    fn log(&mut self, time: f64, event: &str, outcome: impl Into<String>) {
        if self.trace.enabled() {
            let resources = self.resources();
            self.trace.record(time, event, outcome, resources);
        }
    }

    fn run(mut self) -> (TrialResult, TraceCollector) {
        let mut total_damage = 0.0;
        let mut previous_time = 0.0;

        while self.time <= self.fight_length {
            let now = self.time;
            self.fighter.decay_cooldowns(now - previous_time);
            self.fighter.update_five_second_rule(now);

            self.expire_effects(now);
            let mut step_damage = self.apply_ticks(now);

            if now >= self.next_swing - TIME_EPSILON {
                let outcome = self.fighter.swing(self.rng);
                step_damage += outcome.damage;
                self.log(now, "melee", describe_outcome(&outcome));
                self.roll_trinket_procs(now, &outcome);
                self.next_swing += self.fighter.swing_timer();
            }

            if now >= self.next_tick - TIME_EPSILON {
                self.fighter.resource_tick();
                self.next_tick += TICK_INTERVAL;
                self.log(now, "energy tick", "");
            }

            for i in 0..self.trinkets.len() {
                if self.trinkets[i].try_use(now, &mut self.fighter) {
                    let name = self.trinkets[i].proc_name().to_string();
                    self.log(now, &name, "applied");
                }
            }

            if self.fighter.gcd() < TIME_EPSILON {
                step_damage += self.act(now);
            }

            total_damage += step_damage;
            let resources = self.resources();
            self.trace.sample(now, step_damage, resources);

            previous_time = now;
            self.time = self.next_event_time(now);
        }

        let breakdown = self.fighter.breakdown().clone();
        let end = self.fight_length;
        let trinkets = self.trinkets.iter_mut().map(|t| t.finish(end)).collect();
        let result = TrialResult {
            fight_length: self.fight_length,
            total_damage,
            dps: total_damage / self.fight_length,
            breakdown,
            time_to_oom: self.time_to_oom,
            trinkets,
        };
        (result, self.trace)
    }

    fn expire_effects(&mut self, now: f64) {
        if self.fighter.expire_innervate(now) {
            let end = self.fighter.innervate_end();
            self.log(end, "Innervate", "falls off");
        }
        if let Some(end) = self.tigers_fury_end {
            if now >= end - TIME_EPSILON {
                self.drop_tigers_fury(end);
            }
        }
        for i in 0..self.trinkets.len() {
            let closed = self.trinkets[i].expire(now, &mut self.fighter);
            if !closed.is_empty() {
                let name = self.trinkets[i].proc_name().to_string();
                for end in closed {
                    self.log(end, &name, "falls off");
                }
            }
        }
        if let Some(end) = self.mangle_end {
            if now >= end - TIME_EPSILON {
                self.mangle_end = None;
                self.log(end, "Mangle", "falls off");
            }
        }
    }

    fn apply_ticks(&mut self, now: f64) -> f64 {
        let mut damage = 0.0;
        let mangle_active = self.mangle_end.is_some();
        if let Some(rip) = self.rip.as_mut() {
            if matches!(rip.ticks.front(), Some(t) if (t - now).abs() < TIME_EPSILON) {
                rip.ticks.pop_front();
                let bonus = if mangle_active { MANGLE_BONUS } else { 1.0 };
                damage = rip.tick_damage * bonus;
            }
        }
        if damage > 0.0 {
            self.fighter.record_rip_tick(damage);
            self.log(now, "Rip tick", format!("{}", damage.trunc() as i64));
        }
        if let Some(end) = self.rip.as_ref().map(|r| r.end) {
            if now > end - TIME_EPSILON {
                self.rip = None;
                self.log(end, "Rip", "falls off");
            }
        }

        if self.fighter.potion_tick(now) {
            self.log(now, "Fel Mana tick", "");
        }
        if let Some(end) = self.fighter.potion_end() {
            if self.fighter.expire_potion(now) {
                self.log(end, "Fel Mana", "falls off");
            }
        }
        damage
    }

    fn roll_trinket_procs(&mut self, now: f64, outcome: &AttackOutcome) {
        for i in 0..self.trinkets.len() {
            if self.trinkets[i].on_attack(now, outcome, &mut self.fighter, self.rng) {
                let name = self.trinkets[i].proc_name().to_string();
                self.log(now, &name, "applied");
            }
        }
    }

    fn drop_tigers_fury(&mut self, time: f64) {
        if self.tigers_fury_end.take().is_some() {
            self.fighter.set_tigers_fury(false);
            self.log(time, "Tiger's Fury", "falls off");
        }
    }

    fn context(&self, now: f64) -> RotationContext {
        RotationContext {
            time: now,
            next_tick: self.next_tick,
            fight_length: self.fight_length,
            energy: self.fighter.energy(),
            combo_points: self.fighter.combo_points(),
            mana: self.fighter.mana(),
            shift_cost: self.fighter.shift_cost(),
            omen_proc: self.fighter.omen_proc(),
            cat_form: self.fighter.cat_form(),
            innervate_ready: self.fighter.innervate_ready(),
            rip_active: self.rip.is_some(),
            rip_end: self.rip.as_ref().map_or(f64::NEG_INFINITY, |r| r.end),
            mangle_active: self.mangle_end.is_some(),
            mangle_end: self.mangle_end.unwrap_or(f64::NEG_INFINITY),
        }
    }

    /// Runs one rotation decision. Returns immediate damage dealt.
    fn act(&mut self, now: f64) -> f64 {
        let ctx = self.context(now);
        if ctx.cat_form && ctx.out_of_mana() && self.time_to_oom.is_none() {
            self.time_to_oom = Some(now);
        }

        let outcome = match choose_action(&ctx, &self.sim.strategy) {
            Action::Wait => return 0.0,
            Action::Shift => {
                let used = self.fighter.shift(now, self.rng);
                let note = used.consumable().map_or("", |c| c.as_str());
                self.log(now, "shift", note);
                self.drop_tigers_fury(now);
                return 0.0;
            }
            Action::Innervate => {
                self.fighter.innervate(now);
                self.next_swing = now + INNERVATE_SWING_DELAY + FIRST_SWING_WINDOW * self.rng.next_f64();
                self.log(now, "Innervate", "");
                self.drop_tigers_fury(now);
                return 0.0;
            }
            Action::Rip => {
                let (outcome, tick_damage) = self.fighter.rip(self.rng);
                if outcome.landed() {
                    self.rip = Some(RipDot::new(now, tick_damage));
                }
                let text = if outcome.missed { "miss" } else { "applied" };
                let text = if outcome.clearcast {
                    format!("{text} (clearcast)")
                } else {
                    text.to_string()
                };
                self.log(now, "Rip", text);
                self.roll_trinket_procs(now, &outcome);
                return 0.0;
            }
            Action::Bite => self.fighter.bite(self.rng),
            Action::Mangle => {
                let outcome = self.fighter.mangle(self.rng);
                if outcome.landed() {
                    self.mangle_end = Some(now + MANGLE_DURATION);
                }
                outcome
            }
            Action::Shred => {
                let mangle_active = self.mangle_end.is_some();
                self.fighter.shred(mangle_active, self.rng)
            }
            Action::Claw => self.fighter.claw(self.rng),
        };

        self.log(now, outcome.ability.as_str(), describe_outcome(&outcome));
        self.roll_trinket_procs(now, &outcome);
        outcome.damage
    }

    fn next_event_time(&self, now: f64) -> f64 {
        let mut candidates = vec![self.next_swing, self.next_tick];
        if self.fighter.gcd() > TIME_EPSILON {
            candidates.push(now + self.fighter.gcd());
        }
        if let Some(rip) = &self.rip {
            candidates.extend(rip.ticks.front().copied());
            candidates.push(rip.end);
        }
        candidates.extend(self.fighter.next_potion_tick());
        candidates.extend(self.fighter.potion_end());
        candidates.extend(self.mangle_end);
        candidates.extend(self.tigers_fury_end);
        if self.fighter.is_innervated() {
            candidates.push(self.fighter.innervate_end());
        }
        candidates.extend(self.trinkets.iter().filter_map(|t| t.next_transition(now)));

        candidates
            .into_iter()
            .filter(|t| *t > now + TIME_EPSILON)
            .fold(f64::INFINITY, f64::min)
            .min(now + TICK_INTERVAL)
    }
}
