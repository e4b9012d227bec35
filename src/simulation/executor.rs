//! Action effects for the headless village
//!
//! The brain only chooses actions; this executor moves villagers, harvests
//! resource nodes, changes survival scalars and pushes deltas into the
//! settlement.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::actions::catalog::ActionKind;
use crate::core::types::{Millis, ResourceKind, ShelterId, Vec2};
use crate::entity::agent::Agent;
use crate::world::settlement::{BuildProgress, Settlement, SettlementView};
use crate::world::view::{ActionExecutor, WorldSnapshot};

/// Distance a villager covers while exploring
const EXPLORE_STEP: f32 = 40.0;

/// Units gathered per completed gather action
const GATHER_YIELD: u32 = 2;

/// Applies the effects of started and completed actions
pub struct VillageExecutor<'a> {
    pub world: &'a mut WorldSnapshot,
    pub settlement: &'a mut Settlement,
    pub rng: &'a mut ChaCha8Rng,
    pub now: Millis,
    /// Shelter the current `Build` works on
    pub build_site: Option<ShelterId>,
    /// Villagers building at `build_site`, including this one
    pub builders: u32,
    /// Set when a completion finished a shelter
    pub shelter_completed: bool,
    pub world_size: f32,
}

impl VillageExecutor<'_> {
    /// Shelter `agent` would build on from where it stands
    pub fn find_build_site(&self, agent: &Agent) -> Option<ShelterId> {
        self.settlement.build_site(agent.id, self.position(agent))
    }

    fn position(&self, agent: &Agent) -> Vec2 {
        self.world
            .agents
            .iter()
            .find(|a| a.id == agent.id)
            .map(|a| a.position)
            .unwrap_or_default()
    }

    fn move_to(&mut self, agent: &Agent, position: Vec2) {
        let limit = self.world_size;
        if let Some(presence) = self.world.agents.iter_mut().find(|a| a.id == agent.id) {
            presence.position =
                Vec2::new(position.x.clamp(0.0, limit), position.y.clamp(0.0, limit));
        }
    }

    /// Index of the closest non-empty node of `kind`
    fn nearest_node(&self, from: Vec2, kind: ResourceKind) -> Option<usize> {
        self.world
            .resources
            .iter()
            .enumerate()
            .filter(|(_, r)| r.kind == kind && r.amount > 0)
            .min_by(|(_, a), (_, b)| {
                a.position.distance(&from).total_cmp(&b.position.distance(&from))
            })
            .map(|(i, _)| i)
    }

    fn harvest(&mut self, agent: &mut Agent, kind: ResourceKind) {
        let from = self.position(agent);
        let Some(idx) = self.nearest_node(from, kind) else {
            tracing::trace!("{} found no {:?} to gather", agent.id, kind);
            return;
        };
        let node = &mut self.world.resources[idx];
        let taken = node.amount.min(GATHER_YIELD);
        node.amount -= taken;
        agent.inventory.add(kind, taken);
    }
}

impl ActionExecutor for VillageExecutor<'_> {
    fn start_action(&mut self, agent: &mut Agent, action: ActionKind) {
        let from = self.position(agent);
        let target = match action {
            ActionKind::DeliverWood => self.settlement.shelter_of(agent.id).map(|s| s.position),
            ActionKind::Build => self
                .build_site
                .and_then(|site| self.settlement.shelter(site))
                .map(|s| s.position),
            _ => action
                .gathers()
                .and_then(|kind| self.nearest_node(from, kind))
                .map(|idx| self.world.resources[idx].position),
        };
        if let Some(target) = target {
            self.move_to(agent, target);
        }
    }

    fn complete_action(&mut self, agent: &mut Agent, action: ActionKind) {
        match action {
            ActionKind::Eat => {
                if agent.inventory.take(ResourceKind::Food, 1) > 0 {
                    agent.survival.adjust(-35.0, -5.0, 0.0, 0.0);
                }
            }
            ActionKind::Drink => {
                if agent.inventory.take(ResourceKind::Water, 1) > 0 {
                    agent.survival.adjust(0.0, -40.0, 0.0, 0.0);
                }
            }
            ActionKind::Rest => agent.survival.adjust(0.0, 0.0, 20.0, 0.0),
            ActionKind::Sleep => {
                let sheltered = self.settlement.has_completed_shelter(agent.id);
                let bonus = if sheltered { 15.0 } else { 0.0 };
                agent.survival.adjust(0.0, 0.0, 45.0 + bonus, bonus);
            }
            ActionKind::WarmUp => agent.survival.adjust(0.0, 0.0, -2.0, 30.0),
            ActionKind::GatherWater => agent.inventory.add(ResourceKind::Water, GATHER_YIELD),
            ActionKind::GatherFood | ActionKind::GatherWood | ActionKind::GatherMaterials => {
                if let Some(kind) = action.gathers() {
                    self.harvest(agent, kind);
                }
            }
            ActionKind::DeliverWood => {
                let position = self.position(agent);
                let carried = agent.inventory.wood;
                let accepted = self.settlement.deliver_wood(agent.id, carried, position);
                agent.inventory.take(ResourceKind::Wood, accepted);
                let surplus = agent.inventory.take(ResourceKind::Wood, carried - accepted);
                if surplus > 0 {
                    self.settlement.warehouse.apply_delta(ResourceKind::Wood, surplus as i64);
                }
            }
            ActionKind::Build => {
                let Some(site) = self.build_site else {
                    tracing::trace!("{} had nothing to build", agent.id);
                    return;
                };
                let elapsed = action.base_duration_ms();
                let progress = self.settlement.build(site, elapsed, self.builders, self.now);
                self.shelter_completed = progress == BuildProgress::Completed;
            }
            ActionKind::Craft => {
                let used = agent.inventory.take(ResourceKind::Materials, 3);
                self.settlement.warehouse.apply_delta(ResourceKind::Materials, used as i64);
            }
            ActionKind::Explore => {
                let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
                let step = Vec2::new(angle.cos(), angle.sin()) * EXPLORE_STEP;
                let position = self.position(agent) + step;
                self.move_to(agent, position);
            }
            ActionKind::Socialize | ActionKind::Learn | ActionKind::Idle => {}
        }
    }
}
