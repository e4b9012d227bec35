//! Headless village harness
//!
//! Drives the brain end-to-end: world clock, need decay, action timers and
//! action effects. Used by the binary, the integration tests and the bench.

pub mod executor;
pub mod village;

use serde::{Deserialize, Serialize};

use crate::core::error::{BrainError, Result};
use crate::entity::needs::DecayRates;

pub use executor::VillageExecutor;
pub use village::{Activity, Village, VillageEvent, Villager};

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of villagers spawned
    pub agents: usize,

    /// Seed for world layout, traits and every villager's RNG
    pub seed: u64,

    /// Simulated milliseconds per tick
    pub tick_ms: u64,

    /// Game minute (since midnight) at clock zero
    pub start_minute: f32,

    /// Real simulation milliseconds per game minute
    ///
    /// 250 gives a six-minute day, long enough for a few full cycles in a
    /// short run.
    pub ms_per_game_minute: f32,

    /// Side length of the square world
    pub world_size: f32,

    /// Resource nodes spawned per resource kind
    pub nodes_per_kind: usize,

    /// Units stored in a fresh node, also its regrowth cap
    pub node_capacity: u32,

    /// Chance per second that a depleted node regrows one unit
    pub node_regrowth_per_sec: f64,

    /// Decide rule-only, never attaching a learned policy
    pub rule_only: bool,

    pub decay: DecayRates,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            agents: 8,
            seed: 42,
            tick_ms: 500,
            start_minute: 420.0,
            ms_per_game_minute: 250.0,
            world_size: 400.0,
            nodes_per_kind: 6,
            node_capacity: 10,
            node_regrowth_per_sec: 0.2,
            rule_only: false,
            decay: DecayRates::default(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            return Err(BrainError::InvalidConfig("tick_ms must be positive".into()));
        }
        if self.ms_per_game_minute <= 0.0 || self.world_size <= 0.0 {
            return Err(BrainError::InvalidConfig(
                "ms_per_game_minute and world_size must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.node_regrowth_per_sec) {
            return Err(BrainError::InvalidConfig(format!(
                "node_regrowth_per_sec ({}) outside [0, 1]",
                self.node_regrowth_per_sec
            )));
        }
        Ok(())
    }
}
