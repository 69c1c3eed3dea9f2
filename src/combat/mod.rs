pub mod damage;
pub mod engine;
pub mod export_csv;
pub mod fighter;
pub mod rng;
pub mod rotation;
pub mod stats;
pub mod trace;
pub mod trinket;

pub use damage::{roll_special, roll_white, AttackRoll, CRIT_MULTIPLIER, GLANCE_CHANCE};
pub use engine::{
    PerturbationGuard, Simulation, SimulationBuilder, TracedTrial, TrialResult,
    FIGHT_LENGTH_JITTER, TIME_EPSILON,
};
pub use fighter::{
    Ability, AbilityTally, AttackOutcome, Breakdown, DamageParams, DamageRange, Fighter,
    FighterConfig, ManaConsumable, RegenRates, ShiftOutcome, StatBonuses,
};
pub use rng::Rng;
pub use rotation::{choose_action, Action, RotationContext};
pub use stats::{haste_rating_for_swing, swing_timer_for_rating, StatKind};
pub use trace::{
    describe_outcome, serialize_events_json, CombatEvent, Resources, TimelineSample,
    TraceCollector, TraceMode,
};
pub use trinket::{
    build_trinkets, ProcRate, ProcTrigger, StatEffect, TriggerSource, Trinket, TrinketBehavior,
    TrinketConfig, TrinketReport, TrinketState,
};
