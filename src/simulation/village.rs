//! Village tick loop
//!
//! Each tick:
//! 1. Advance the clock and refresh the world snapshot
//! 2. Decay survival needs
//! 3. Decide for idle villagers (in parallel above the configured threshold)
//! 4. Progress action timers
//! 5. Complete finished actions and learn from before/after snapshots
//! 6. Regrow depleted resource nodes

use std::time::Duration;

use ahash::AHashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::actions::catalog::{ActionCategory, ActionKind};
use crate::brain::{AgentStats, Decision, DecisionSource, PolicyStatus, Snapshot, VillageBrain};
use crate::core::config::BrainConfig;
use crate::core::error::{BrainError, Result};
use crate::core::types::{AgentId, Millis, ResourceKind, ShelterId, Vec2};
use crate::entity::agent::{Agent, Traits};
use crate::simulation::executor::VillageExecutor;
use crate::simulation::SimConfig;
use crate::world::settlement::Settlement;
use crate::world::view::{ActionExecutor, AgentPresence, ResourceNode, WorldSnapshot};

const NAMES: [&str; 12] = [
    "Ada", "Bram", "Cora", "Dell", "Edda", "Finn", "Gwen", "Hale", "Ines", "Jory", "Kara", "Lior",
];

/// Action in progress
#[derive(Debug, Clone)]
pub struct Activity {
    pub action: ActionKind,
    pub started_at: Millis,
    pub remaining_ms: Millis,
    /// Snapshot the action was chosen from
    pub before: Snapshot,
    /// Shelter a `Build` works on
    pub site: Option<ShelterId>,
}

#[derive(Debug)]
pub struct Villager {
    pub agent: Agent,
    pub activity: Option<Activity>,
}

impl Villager {
    pub fn is_idle(&self) -> bool {
        self.activity.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VillageEvent {
    ActionStarted {
        agent: AgentId,
        action: ActionKind,
        source: DecisionSource,
    },
    ActionCompleted {
        agent: AgentId,
        action: ActionKind,
        reward: f32,
    },
    ShelterCompleted {
        agent: AgentId,
    },
}

pub struct Village {
    brain: VillageBrain,
    sim: SimConfig,
    villagers: Vec<Villager>,
    world: WorldSnapshot,
    settlement: Settlement,
    rng: ChaCha8Rng,
}

impl Village {
    pub fn new(brain_config: BrainConfig, sim: SimConfig) -> Result<Self> {
        brain_config.validate()?;
        sim.validate()?;

        let brain = VillageBrain::new(brain_config);
        let mut rng = ChaCha8Rng::seed_from_u64(sim.seed);
        let mut world = WorldSnapshot::new(0);
        let mut settlement = Settlement::new();
        let size = sim.world_size;

        for kind in ResourceKind::ALL {
            for _ in 0..sim.nodes_per_kind {
                world.resources.push(ResourceNode {
                    kind,
                    position: Vec2::new(rng.gen_range(0.0..size), rng.gen_range(0.0..size)),
                    amount: sim.node_capacity,
                });
            }
        }

        let mut villagers = Vec::with_capacity(sim.agents);
        for i in 0..sim.agents {
            let traits = Traits::new(rng.gen(), rng.gen(), rng.gen(), rng.gen());
            let seed = sim.seed.wrapping_add(i as u64 + 1);
            let name = format!("{}{}", NAMES[i % NAMES.len()], i / NAMES.len() + 1);
            let mut agent = Agent::new(name, traits, brain.config(), seed);
            if !sim.rule_only {
                brain.attach_learned_policy(&mut agent, seed);
            }

            // Villagers start clustered around the village centre
            let centre = size / 2.0;
            let position = Vec2::new(
                centre + rng.gen_range(-30.0f32..30.0),
                centre + rng.gen_range(-30.0f32..30.0),
            );
            world.agents.push(AgentPresence { id: agent.id, position });
            settlement.register_villager(agent.id, 0);
            villagers.push(Villager { agent, activity: None });
        }

        let mut village = Self { brain, sim, villagers, world, settlement, rng };
        village.refresh_clock(0);
        tracing::info!("village founded with {} villagers", village.villagers.len());
        Ok(village)
    }

    pub fn brain(&self) -> &VillageBrain {
        &self.brain
    }

    pub fn clock_ms(&self) -> Millis {
        self.world.clock_ms
    }

    pub fn world(&self) -> &WorldSnapshot {
        &self.world
    }

    pub fn settlement(&self) -> &Settlement {
        &self.settlement
    }

    pub fn villagers(&self) -> &[Villager] {
        &self.villagers
    }

    pub fn villager(&self, id: AgentId) -> Result<&Villager> {
        self.villagers
            .iter()
            .find(|v| v.agent.id == id)
            .ok_or(BrainError::AgentNotFound(id))
    }

    pub fn villager_mut(&mut self, id: AgentId) -> Result<&mut Villager> {
        self.villagers
            .iter_mut()
            .find(|v| v.agent.id == id)
            .ok_or(BrainError::AgentNotFound(id))
    }

    /// Remove a villager's presence from the world (it keeps deciding, context-free)
    pub fn lose_track_of(&mut self, id: AgentId) {
        self.world.agents.retain(|a| a.id != id);
    }

    pub fn stats(&self) -> Vec<AgentStats> {
        self.villagers.iter().map(|v| self.brain.stats(&v.agent)).collect()
    }

    /// Wait at most `limit` per villager for learned policies to come up
    pub async fn wait_for_policies(&mut self, limit: Duration) -> usize {
        let mut ready = 0;
        for villager in &mut self.villagers {
            if self.brain.wait_for_policy(&mut villager.agent, limit).await == PolicyStatus::Ready {
                ready += 1;
            }
        }
        ready
    }

    fn game_minute(&self, clock_ms: Millis) -> f32 {
        self.sim.start_minute + clock_ms as f32 / self.sim.ms_per_game_minute
    }

    fn refresh_clock(&mut self, clock_ms: Millis) {
        let config = self.brain.config();
        let minute = self.game_minute(clock_ms);
        let of_day = minute.rem_euclid(config.minutes_per_day);
        self.world.clock_ms = clock_ms;
        self.world.game_time = Some(minute);
        self.world.day_progress = Some(of_day / config.minutes_per_day);
        self.world.ambient_light = Some(ambient_light(of_day, config));
    }

    fn is_night(&self) -> bool {
        let config = self.brain.config();
        let of_day = self.game_minute(self.world.clock_ms).rem_euclid(config.minutes_per_day);
        of_day >= config.night_start_minute || of_day < config.night_end_minute
    }

    /// Run `ticks` ticks of the configured length
    pub fn run(&mut self, ticks: u64) -> Vec<VillageEvent> {
        let mut events = Vec::new();
        for _ in 0..ticks {
            events.extend(self.tick(self.sim.tick_ms));
        }
        events
    }

    /// Advance the simulation by `dt_ms`
    pub fn tick(&mut self, dt_ms: Millis) -> Vec<VillageEvent> {
        let mut events = Vec::new();
        let now = self.world.clock_ms + dt_ms;
        self.refresh_clock(now);

        self.decay_needs(dt_ms);
        self.decide_idle(now, &mut events);
        self.progress_actions(dt_ms, now, &mut events);
        self.regrow_nodes(dt_ms);

        events
    }

    fn decay_needs(&mut self, dt_ms: Millis) {
        let is_night = self.is_night();
        let rates = &self.sim.decay;
        for villager in &mut self.villagers {
            let is_active = villager
                .activity
                .as_ref()
                .is_some_and(|a| a.action.category() == ActionCategory::Work);
            villager.agent.survival.decay(dt_ms, rates, is_active, is_night);
        }
    }

    fn decide_idle(&mut self, now: Millis, events: &mut Vec<VillageEvent>) {
        let Self { brain, world, settlement, villagers, .. } = self;
        let world: &WorldSnapshot = world;
        let settlement: &Settlement = settlement;
        let brain: &VillageBrain = brain;

        let decide = |villager: &mut Villager| -> Option<(Decision, Snapshot)> {
            if !villager.is_idle() {
                return None;
            }
            let agent = &mut villager.agent;
            let decision = brain.decide(agent, world, settlement);
            let before = agent
                .mind
                .pending_snapshot(decision.action)
                .copied()
                .unwrap_or_else(|| Snapshot::context_free(agent));
            Some((decision, before))
        };

        let idle = villagers.iter().filter(|v| v.is_idle()).count();
        let parallel = idle >= brain.config().parallel_threshold;
        let decided: Vec<(usize, Decision, Snapshot)> = if parallel {
            villagers
                .par_iter_mut()
                .enumerate()
                .filter_map(|(i, v)| decide(v).map(|(d, s)| (i, d, s)))
                .collect()
        } else {
            villagers
                .iter_mut()
                .enumerate()
                .filter_map(|(i, v)| decide(v).map(|(d, s)| (i, d, s)))
                .collect()
        };

        // Starting actions touches shared state, so it runs sequentially
        for (i, decision, before) in decided {
            let villager = &mut self.villagers[i];
            let mut executor = VillageExecutor {
                world: &mut self.world,
                settlement: &mut self.settlement,
                rng: &mut self.rng,
                now,
                build_site: None,
                builders: 0,
                shelter_completed: false,
                world_size: self.sim.world_size,
            };
            if decision.action == ActionKind::Build {
                executor.build_site = executor.find_build_site(&villager.agent);
            }
            executor.start_action(&mut villager.agent, decision.action);
            villager.activity = Some(Activity {
                action: decision.action,
                started_at: now,
                remaining_ms: decision.action.base_duration_ms(),
                before,
                site: executor.build_site,
            });
            events.push(VillageEvent::ActionStarted {
                agent: villager.agent.id,
                action: decision.action,
                source: decision.source,
            });
        }
    }

    fn progress_actions(&mut self, dt_ms: Millis, now: Millis, events: &mut Vec<VillageEvent>) {
        let mut builders: AHashMap<ShelterId, u32> = AHashMap::new();
        for activity in self.villagers.iter().filter_map(|v| v.activity.as_ref()) {
            if let (ActionKind::Build, Some(site)) = (activity.action, activity.site) {
                *builders.entry(site).or_insert(0) += 1;
            }
        }

        for i in 0..self.villagers.len() {
            let finished = match self.villagers[i].activity.as_mut() {
                Some(activity) => {
                    activity.remaining_ms = activity.remaining_ms.saturating_sub(dt_ms);
                    activity.remaining_ms == 0
                }
                None => false,
            };
            if !finished {
                continue;
            }

            let Some(activity) = self.villagers[i].activity.take() else {
                continue;
            };
            let villager = &mut self.villagers[i];
            let mut executor = VillageExecutor {
                world: &mut self.world,
                settlement: &mut self.settlement,
                rng: &mut self.rng,
                now,
                build_site: activity.site,
                builders: activity
                    .site
                    .and_then(|site| builders.get(&site).copied())
                    .unwrap_or(1),
                shelter_completed: false,
                world_size: self.sim.world_size,
            };
            executor.complete_action(&mut villager.agent, activity.action);
            let shelter_completed = executor.shelter_completed;

            let after = self
                .brain
                .perceive(&villager.agent, &self.world)
                .unwrap_or_else(|| Snapshot::context_free(&villager.agent));
            let reward = self
                .brain
                .learn(&mut villager.agent, activity.action, &activity.before, &after, now);

            events.push(VillageEvent::ActionCompleted {
                agent: villager.agent.id,
                action: activity.action,
                reward,
            });
            if shelter_completed {
                events.push(VillageEvent::ShelterCompleted { agent: villager.agent.id });
            }
        }
    }

    fn regrow_nodes(&mut self, dt_ms: Millis) {
        let chance = (self.sim.node_regrowth_per_sec * dt_ms as f64 / 1000.0).min(1.0);
        let capacity = self.sim.node_capacity;
        for node in &mut self.world.resources {
            if node.amount < capacity && self.rng.gen_bool(chance) {
                node.amount += 1;
            }
        }
    }
}

/// Light level over the day: dim at night, peaking at midday
fn ambient_light(minute_of_day: f32, config: &BrainConfig) -> f32 {
    let (start, end) = (config.night_end_minute, config.night_start_minute);
    if minute_of_day < start || minute_of_day >= end {
        return 0.2;
    }
    let daylight = (minute_of_day - start) / (end - start);
    0.3 + 0.7 * (daylight * std::f32::consts::PI).sin()
}
