pub mod encounter;
pub mod presets;
pub mod scenario;
pub mod strategy;

pub use encounter::{BossDebuff, BossDebuffs, EncounterParams, DEFAULT_BOSS_ARMOR, DEFAULT_FIGHT_LENGTH};
pub use presets::{equip, preset, PassiveStats, TrinketPreset, PRESET_NAMES};
pub use scenario::{Scenario, ScenarioEncounter, TrinketSpec, DEFAULT_SCENARIO_PATH};
pub use strategy::{Builder, Finisher, StrategyConfig, STRATEGY_KEYS};
