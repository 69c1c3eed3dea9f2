//! Equippable proc and on-use items.
//!
//! Every trinket runs the same state machine (`Idle -> Active -> CoolingDown -> Idle`);
//! the [`TrinketBehavior`] variant only decides how an activation is triggered and what
//! happens when it triggers again while already active.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::combat::engine::TIME_EPSILON;
use crate::combat::fighter::{Ability, AttackOutcome, Fighter};
use crate::combat::rng::Rng;
use crate::combat::stats::StatKind;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatEffect {
    pub stat: StatKind,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcRate {
    /// Flat chance per landed attack, with a separate chance when the attack crits.
    Chance { on_hit: f64, on_crit: f64 },
    /// Procs per minute. White hits roll `ppm / 60`; specials roll `ppm * weapon_speed / 60`.
    PerMinute { ppm: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    #[default]
    Any,
    Melee,
    Specials,
    Ability(Ability),
}

impl TriggerSource {
    fn accepts(self, ability: Ability) -> bool {
        match self {
            Self::Any => ability != Ability::Shift,
            Self::Melee => ability == Ability::Melee,
            Self::Specials => ability.is_special(),
            Self::Ability(only) => ability == only,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcTrigger {
    pub rate: ProcRate,
    #[serde(default)]
    pub source: TriggerSource,
}

impl ProcTrigger {
    pub fn chance_on_hit(chance: f64) -> Self {
        Self {
            rate: ProcRate::Chance {
                on_hit: chance,
                on_crit: chance,
            },
            source: TriggerSource::Any,
        }
    }

    pub fn chance_on_crit(chance: f64) -> Self {
        Self {
            rate: ProcRate::Chance {
                on_hit: 0.0,
                on_crit: chance,
            },
            source: TriggerSource::Any,
        }
    }

    pub fn per_minute(ppm: f64) -> Self {
        Self {
            rate: ProcRate::PerMinute { ppm },
            source: TriggerSource::Any,
        }
    }

    pub fn from_source(mut self, source: TriggerSource) -> Self {
        self.source = source;
        self
    }

    /// Proc chance for this outcome, or `None` when the attack does not qualify.
    fn chance(&self, outcome: &AttackOutcome, weapon_speed: f64) -> Option<f64> {
        if outcome.missed || !self.source.accepts(outcome.ability) {
            return None;
        }
        Some(match self.rate {
            ProcRate::Chance { on_hit, on_crit } => {
                if outcome.crit {
                    on_crit
                } else {
                    on_hit
                }
            }
            ProcRate::PerMinute { ppm } => {
                if outcome.ability == Ability::Melee {
                    ppm / 60.0
                } else {
                    ppm * weapon_speed / 60.0
                }
            }
        })
    }
}

fn default_stack_chance() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrinketBehavior {
    /// Used on cooldown as soon as `delay` has elapsed.
    Activated {
        #[serde(default)]
        delay: f64,
    },
    /// Re-triggering while active opens another independent window.
    Proc { trigger: ProcTrigger },
    /// Re-triggering while active restarts the single window.
    RefreshingProc { trigger: ProcTrigger },
    /// The first proc opens a window at one stack; each qualifying attack inside the
    /// window adds a stack with `stack_chance`, up to `max_stacks`.
    StackingProc {
        trigger: ProcTrigger,
        max_stacks: u32,
        #[serde(default = "default_stack_chance")]
        stack_chance: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrinketConfig {
    pub name: String,
    /// Buff name shown in the combat log.
    pub proc_name: String,
    pub effects: Vec<StatEffect>,
    pub duration: f64,
    pub cooldown: f64,
    pub behavior: TrinketBehavior,
}

impl TrinketConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let field = |f: &str| format!("trinkets.{}.{f}", self.name);
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(ConfigError::invalid_parameter(
                &field("duration"),
                format!("must be positive, got {}", self.duration),
            ));
        }
        if !self.cooldown.is_finite() || self.cooldown < 0.0 {
            return Err(ConfigError::invalid_parameter(
                &field("cooldown"),
                format!("must be non-negative, got {}", self.cooldown),
            ));
        }
        if self.effects.is_empty() {
            return Err(ConfigError::invalid_parameter(&field("effects"), "at least one stat effect is required"));
        }
        if let TrinketBehavior::StackingProc { max_stacks: 0, .. } = self.behavior {
            return Err(ConfigError::invalid_parameter(&field("max_stacks"), "must be at least 1"));
        }
        Ok(())
    }

    pub fn is_activated(&self) -> bool {
        matches!(self.behavior, TrinketBehavior::Activated { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrinketState {
    Idle,
    Active,
    CoolingDown,
}

/// Per-trial counters for one trinket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrinketReport {
    pub name: String,
    pub activations: u32,
    /// Seconds the buff was up.
    pub uptime: f64,
}

#[derive(Debug, Clone)]
pub struct Trinket {
    config: TrinketConfig,
    /// Time the cooldown gate opens.
    ready_at: f64,
    /// End times of open buff windows, ascending.
    windows: VecDeque<f64>,
    stacks: u32,
    activations: u32,
    uptime: f64,
    active_since: Option<f64>,
}

impl Trinket {
    pub fn new(config: TrinketConfig) -> Self {
        let ready_at = match config.behavior {
            TrinketBehavior::Activated { delay } => delay,
            _ => 0.0,
        };
        Self {
            config,
            ready_at,
            windows: VecDeque::new(),
            stacks: 0,
            activations: 0,
            uptime: 0.0,
            active_since: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn proc_name(&self) -> &str {
        &self.config.proc_name
    }

    pub fn config(&self) -> &TrinketConfig {
        &self.config
    }

    pub fn ready_at(&self) -> f64 {
        self.ready_at
    }

    pub fn stacks(&self) -> u32 {
        self.stacks
    }

    pub fn activations(&self) -> u32 {
        self.activations
    }

    pub fn state(&self, time: f64) -> TrinketState {
        if !self.windows.is_empty() {
            TrinketState::Active
        } else if time < self.ready_at - TIME_EPSILON {
            TrinketState::CoolingDown
        } else {
            TrinketState::Idle
        }
    }

    fn gate_open(&self, time: f64) -> bool {
        time > self.ready_at - TIME_EPSILON
    }

    /// Whether stat changes from this trinket affect the swing timer.
    pub fn modifies_haste(&self) -> bool {
        self.config.effects.iter().any(|e| e.stat == StatKind::HasteRating)
    }

    fn apply_effects(&self, fighter: &mut Fighter, scale: f64) {
        for effect in &self.config.effects {
            fighter.apply_stat(effect.stat, effect.amount * scale);
        }
    }

    fn open_window(&mut self, time: f64) {
        if self.windows.is_empty() {
            self.active_since = Some(time);
        }
        self.windows.push_back(time + self.config.duration);
    }

    fn close_window(&mut self, end: f64) {
        if self.windows.is_empty() {
            if let Some(since) = self.active_since.take() {
                self.uptime += (end - since).max(0.0);
            }
        }
    }

    fn activate(&mut self, time: f64, fighter: &mut Fighter) {
        self.apply_effects(fighter, 1.0);
        self.open_window(time);
        self.ready_at = time + self.config.cooldown;
        self.activations += 1;
        if matches!(self.config.behavior, TrinketBehavior::StackingProc { .. }) {
            self.stacks = 1;
        }
    }

    /// Reverts every window that has ended by `time`. Returns the end times of the
    /// windows that closed.
    pub fn expire(&mut self, time: f64, fighter: &mut Fighter) -> Vec<f64> {
        let mut closed = Vec::new();
        while let Some(&end) = self.windows.front() {
            if end > time + TIME_EPSILON {
                break;
            }
            self.windows.pop_front();
            let scale = match self.config.behavior {
                TrinketBehavior::StackingProc { .. } => f64::from(self.stacks),
                _ => 1.0,
            };
            self.apply_effects(fighter, -scale);
            self.stacks = 0;
            self.close_window(end);
            closed.push(end);
        }
        closed
    }

    /// Uses an Activated trinket if its gate is open. Proc trinkets never activate here.
    pub fn try_use(&mut self, time: f64, fighter: &mut Fighter) -> bool {
        if !self.config.is_activated() || !self.windows.is_empty() || !self.gate_open(time) {
            return false;
        }
        self.activate(time, fighter);
        true
    }

    /// Rolls for a proc after an attack. Returns true when a new activation (or a
    /// refresh) happened; added stacks do not count as activations.
    pub fn on_attack(
        &mut self,
        time: f64,
        outcome: &AttackOutcome,
        fighter: &mut Fighter,
        rng: &mut Rng,
    ) -> bool {
        let weapon_speed = fighter.weapon_speed();
        match self.config.behavior {
            TrinketBehavior::Activated { .. } => false,
            TrinketBehavior::Proc { trigger } => {
                let Some(chance) = trigger.chance(outcome, weapon_speed) else {
                    return false;
                };
                if !self.gate_open(time) || !rng.roll(chance) {
                    return false;
                }
                self.activate(time, fighter);
                true
            }
            TrinketBehavior::RefreshingProc { trigger } => {
                let Some(chance) = trigger.chance(outcome, weapon_speed) else {
                    return false;
                };
                if !self.gate_open(time) || !rng.roll(chance) {
                    return false;
                }
                if let Some(end) = self.windows.pop_back() {
                    self.apply_effects(fighter, -1.0);
                    self.windows.clear();
                    self.close_window(end.min(time));
                }
                self.activate(time, fighter);
                true
            }
            TrinketBehavior::StackingProc {
                trigger,
                max_stacks,
                stack_chance,
            } => {
                if !self.windows.is_empty() {
                    let qualifies = !outcome.missed && trigger.source.accepts(outcome.ability);
                    if qualifies && self.stacks < max_stacks && rng.roll(stack_chance) {
                        self.stacks += 1;
                        self.apply_effects(fighter, 1.0);
                    }
                    return false;
                }
                let Some(chance) = trigger.chance(outcome, weapon_speed) else {
                    return false;
                };
                if !self.gate_open(time) || !rng.roll(chance) {
                    return false;
                }
                self.activate(time, fighter);
                true
            }
        }
    }

    /// Next time this trinket changes state on its own: a window ending, or an
    /// Activated trinket coming off cooldown.
    pub fn next_transition(&self, now: f64) -> Option<f64> {
        let window_end = self.windows.front().copied();
        let ready = if self.config.is_activated() && self.windows.is_empty() && self.ready_at > now + TIME_EPSILON {
            Some(self.ready_at)
        } else {
            None
        };
        match (window_end, ready) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Closes open uptime at the end of the fight.
    pub fn finish(&mut self, end_time: f64) -> TrinketReport {
        if let Some(since) = self.active_since.take() {
            self.uptime += (end_time - since).max(0.0);
        }
        TrinketReport {
            name: self.config.name.clone(),
            activations: self.activations,
            uptime: self.uptime,
        }
    }
}

/// Builds the per-trial trinket set. Consecutive Activated trinkets share a use
/// cooldown: each one waits for the previous ones' buff durations on top of `cd_delay`.
pub fn build_trinkets(configs: &[TrinketConfig], cd_delay: f64) -> Vec<Trinket> {
    let mut queued = 0.0;
    configs
        .iter()
        .map(|config| {
            let mut config = config.clone();
            if let TrinketBehavior::Activated { delay } = &mut config.behavior {
                *delay += cd_delay + queued;
                queued += config.duration;
            }
            Trinket::new(config)
        })
        .collect()
}
