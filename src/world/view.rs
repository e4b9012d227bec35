//! Read-only world interface consumed by the brain
//!
//! The brain never reaches into a global world object; callers hand it a
//! `WorldView` and execute the returned action through an `ActionExecutor`.

use serde::{Deserialize, Serialize};

use crate::actions::catalog::ActionKind;
use crate::core::types::{AgentId, Millis, ResourceKind, Vec2};
use crate::entity::agent::Agent;

/// Where another villager currently stands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPresence {
    pub id: AgentId,
    pub position: Vec2,
}

/// A harvestable resource node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNode {
    pub kind: ResourceKind,
    pub position: Vec2,
    pub amount: u32,
}

/// Everything the world reports to perception for one instant
///
/// Optional fields may be missing on partially initialised worlds;
/// perception substitutes documented defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Monotonic simulation clock, used for rate limiting and goal ages
    pub clock_ms: Millis,
    /// Minutes since midnight
    pub game_time: Option<f32>,
    /// Fraction of the current day elapsed, [0, 1]
    pub day_progress: Option<f32>,
    /// Light level, [0, 1]
    pub ambient_light: Option<f32>,
    pub agents: Vec<AgentPresence>,
    pub resources: Vec<ResourceNode>,
}

impl WorldSnapshot {
    pub fn new(clock_ms: Millis) -> Self {
        Self {
            clock_ms,
            ..Self::default()
        }
    }

    /// Villagers other than `exclude` within `radius` of `center`
    pub fn agents_within(&self, center: Vec2, radius: f32, exclude: AgentId) -> usize {
        self.agents
            .iter()
            .filter(|a| a.id != exclude && a.position.distance(&center) <= radius)
            .count()
    }

    /// Non-empty nodes of `kind` within `radius` of `center`
    pub fn resources_within(&self, center: Vec2, radius: f32, kind: ResourceKind) -> usize {
        self.resources
            .iter()
            .filter(|r| r.kind == kind && r.amount > 0 && r.position.distance(&center) <= radius)
            .count()
    }
}

/// Read accessors the brain needs from the world
pub trait WorldView {
    fn world_snapshot(&self) -> &WorldSnapshot;

    /// Position of a villager, `None` when the world has lost track of it
    fn locate(&self, agent: AgentId) -> Option<Vec2> {
        self.world_snapshot()
            .agents
            .iter()
            .find(|a| a.id == agent)
            .map(|a| a.position)
    }
}

impl WorldView for WorldSnapshot {
    fn world_snapshot(&self) -> &WorldSnapshot {
        self
    }
}

/// External executor for chosen actions; the brain does not move villagers
pub trait ActionExecutor {
    fn start_action(&mut self, agent: &mut Agent, action: ActionKind);
    fn complete_action(&mut self, agent: &mut Agent, action: ActionKind);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presence(x: f32) -> AgentPresence {
        AgentPresence {
            id: AgentId::new(),
            position: Vec2::new(x, 0.0),
        }
    }

    #[test]
    fn test_agents_within_excludes_self() {
        let me = presence(0.0);
        let mut world = WorldSnapshot::new(0);
        world.agents = vec![me.clone(), presence(50.0), presence(150.0)];
        assert_eq!(world.agents_within(me.position, 100.0, me.id), 1);
    }

    #[test]
    fn test_resources_within_skips_depleted() {
        let mut world = WorldSnapshot::new(0);
        world.resources = vec![
            ResourceNode { kind: ResourceKind::Food, position: Vec2::new(10.0, 0.0), amount: 5 },
            ResourceNode { kind: ResourceKind::Food, position: Vec2::new(20.0, 0.0), amount: 0 },
            ResourceNode { kind: ResourceKind::Wood, position: Vec2::new(20.0, 0.0), amount: 5 },
        ];
        assert_eq!(world.resources_within(Vec2::default(), 150.0, ResourceKind::Food), 1);
    }

    #[test]
    fn test_locate_missing_agent() {
        let world = WorldSnapshot::new(0);
        assert!(world.locate(AgentId::new()).is_none());
    }
}
