//! Monte Carlo simulator for a feral cat melee rotation against a raid boss.
//!
//! [`combat`] runs single trials, [`optimizer`] aggregates replicate runs and stat
//! weights, and [`data`] holds encounter, strategy, trinket and scenario configuration.

pub mod cli;
pub mod combat;
pub mod data;
pub mod error;
pub mod optimizer;
pub mod parallel;
pub mod server;

pub use combat::{FighterConfig, Simulation, TrialResult};
pub use error::{ConfigError, ScenarioError};
