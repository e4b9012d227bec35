//! Perception - turns world state into a normalised snapshot
//!
//! The snapshot is a value type: it is built fresh for every decision and
//! never mutated afterwards. Every component is finite and lies in a fixed
//! range, mostly [0, 1].

use serde::{Deserialize, Serialize};

use crate::core::config::BrainConfig;
use crate::core::types::{finite_clamp, ResourceKind};
use crate::entity::agent::{Agent, EmotionalState};
use crate::world::view::WorldView;

/// Length of the numeric feature vector fed to the policy network
pub const FEATURE_COUNT: usize = 16;

/// Counts at which the normalised count features saturate
const NEARBY_AGENT_SATURATION: f32 = 5.0;
const NEARBY_RESOURCE_SATURATION: f32 = 5.0;

/// Normalised perception of one villager at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// 0 = fed, 1 = starving
    pub hunger: f32,
    /// 0 = exhausted, 1 = fully rested
    pub energy: f32,
    /// 0 = quenched, 1 = parched
    pub thirst: f32,
    /// 0 = freezing, 1 = warm
    pub warmth: f32,
    /// Fraction of the day since midnight, [0, 1)
    pub time_of_day: f32,
    /// [0, 1]
    pub day_progress: f32,
    pub nearby_agents: u32,
    /// [0, 1]
    pub social_desire: f32,
    pub nearby_food: u32,
    /// Wood and material nodes in range
    pub nearby_materials: u32,
    /// [0, 1]
    pub danger: f32,
    /// Copy of the affect at perception time
    pub emotions: EmotionalState,
    /// [0, 1]
    pub ambient_light: f32,
    pub is_night: bool,
}

impl Snapshot {
    /// Fixed-order numeric vector, every entry in [0, 1]
    pub fn features(&self) -> [f32; FEATURE_COUNT] {
        [
            self.hunger,
            self.energy,
            self.thirst,
            self.warmth,
            self.time_of_day,
            self.day_progress,
            (self.nearby_agents as f32 / NEARBY_AGENT_SATURATION).min(1.0),
            self.social_desire,
            (self.nearby_food as f32 / NEARBY_RESOURCE_SATURATION).min(1.0),
            (self.nearby_materials as f32 / NEARBY_RESOURCE_SATURATION).min(1.0),
            self.danger,
            self.emotions.happiness,
            self.emotions.stress,
            self.emotions.curiosity,
            self.emotions.social_drive,
            self.ambient_light,
        ]
    }

    /// Snapshot built from the villager's own scalars only, for when the
    /// world cannot place it
    pub fn context_free(agent: &Agent) -> Self {
        let hunger = finite_clamp(agent.survival.hunger_norm(), 0.5, 0.0, 1.0);
        let energy = finite_clamp(agent.survival.energy_norm(), 0.5, 0.0, 1.0);
        Self {
            hunger,
            energy,
            thirst: finite_clamp(agent.survival.thirst_norm(), 0.5, 0.0, 1.0),
            warmth: finite_clamp(agent.survival.warmth_norm(), 0.5, 0.0, 1.0),
            time_of_day: 0.0,
            day_progress: 0.0,
            nearby_agents: 0,
            social_desire: finite_clamp(agent.traits.sociability, 0.5, 0.0, 1.0),
            nearby_food: 0,
            nearby_materials: 0,
            danger: danger_level(energy, hunger),
            emotions: agent.emotions,
            ambient_light: 0.0,
            is_night: false,
        }
    }
}

/// Social desire drops as company gathers around
///
/// Formula: sociability * (1 - min(1, nearby / 3) * 0.3)
pub fn social_desire(sociability: f32, nearby_agents: u32) -> f32 {
    let crowding = (nearby_agents as f32 / 3.0).min(1.0);
    (sociability * (1.0 - crowding * 0.3)).clamp(0.0, 1.0)
}

/// Danger from critically low energy and critically high hunger
///
/// Each term ramps from 0 at its threshold (energy 0.2, hunger 0.8) to 1 at
/// the extreme; the two are weighted equally.
pub fn danger_level(energy: f32, hunger: f32) -> f32 {
    let exhaustion = ((0.2 - energy) / 0.2).max(0.0);
    let starvation = ((hunger - 0.8) / 0.2).max(0.0);
    (exhaustion * 0.5 + starvation * 0.5).clamp(0.0, 1.0)
}

/// Builds snapshots against an injected world view
pub struct PerceptionBuilder<'a, W: WorldView + ?Sized> {
    world: &'a W,
    config: &'a BrainConfig,
}

impl<'a, W: WorldView + ?Sized> PerceptionBuilder<'a, W> {
    pub fn new(world: &'a W, config: &'a BrainConfig) -> Self {
        Self { world, config }
    }

    /// Whether the world clock is in night hours
    pub fn is_night(&self) -> bool {
        let minute = self.game_minute();
        minute >= self.config.night_start_minute || minute < self.config.night_end_minute
    }

    fn game_minute(&self) -> f32 {
        let raw = self
            .world
            .world_snapshot()
            .game_time
            .unwrap_or(self.config.default_game_time);
        let raw = if raw.is_finite() { raw } else { self.config.default_game_time };
        raw.rem_euclid(self.config.minutes_per_day)
    }

    /// Perceive the world from `agent`'s position
    ///
    /// Returns `None` only when the world cannot locate the agent; every
    /// other missing field is replaced by its documented default.
    pub fn build(&self, agent: &Agent) -> Option<Snapshot> {
        let world = self.world.world_snapshot();
        let position = self.world.locate(agent.id)?;

        let hunger = finite_clamp(agent.survival.hunger_norm(), 0.5, 0.0, 1.0);
        let energy = finite_clamp(agent.survival.energy_norm(), 0.5, 0.0, 1.0);

        let time_of_day = self.game_minute() / self.config.minutes_per_day;
        let day_progress =
            finite_clamp(world.day_progress.unwrap_or(time_of_day), time_of_day, 0.0, 1.0);
        let ambient_light = finite_clamp(
            world.ambient_light.unwrap_or(self.config.default_ambient_light),
            self.config.default_ambient_light,
            0.0,
            1.0,
        );

        let resource_radius = self.config.resource_radius;
        let nearby_agents =
            world.agents_within(position, self.config.agent_radius, agent.id) as u32;
        let within = |kind| world.resources_within(position, resource_radius, kind);
        let nearby_food = within(ResourceKind::Food) as u32;
        let nearby_materials =
            (within(ResourceKind::Wood) + within(ResourceKind::Materials)) as u32;

        let sociability = finite_clamp(agent.traits.sociability, 0.5, 0.0, 1.0);

        Some(Snapshot {
            hunger,
            energy,
            thirst: finite_clamp(agent.survival.thirst_norm(), 0.5, 0.0, 1.0),
            warmth: finite_clamp(agent.survival.warmth_norm(), 0.5, 0.0, 1.0),
            time_of_day,
            day_progress,
            nearby_agents,
            social_desire: social_desire(sociability, nearby_agents),
            nearby_food,
            nearby_materials,
            danger: danger_level(energy, hunger),
            emotions: agent.emotions,
            ambient_light,
            is_night: self.is_night(),
        })
    }
}
