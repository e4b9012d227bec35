//! Decision pipeline - turns a villager's view of the world into one action
//!
//! Precedence, strictly in order:
//! 1. Hard overrides for critical survival thresholds
//! 2. Goal short-circuit for a sufficiently urgent open goal
//! 3. Learned path, taken with probability 1 - adaptive exploration
//! 4. Rule evaluator, with a configured fallback when nothing fires
//!
//! Exactly one path determines the returned action. Nothing in here returns
//! an error: every failure degrades to a simpler but valid choice.

use rand::Rng;

use crate::actions::catalog::ActionKind;
use crate::brain::emotion::update_emotions;
use crate::brain::goal_select::{goal_action, update_goals};
use crate::brain::learning::adaptive_exploration_rate;
use crate::brain::mind::{Decision, DecisionRecord, DecisionSource};
use crate::brain::perception::{PerceptionBuilder, Snapshot};
use crate::brain::rule_eval::{evaluate_rules, RuleContext};
use crate::core::config::BrainConfig;
use crate::core::types::Millis;
use crate::entity::agent::Agent;
use crate::world::settlement::SettlementView;
use crate::world::view::WorldView;

const FALLBACK_CONFIDENCE: f32 = 0.2;
const CONTEXT_FREE_CONFIDENCE: f32 = 0.3;

/// Critical survival override, if any
///
/// Energy below `rest_override_energy` wins over hunger above
/// `eat_override_hunger`: a collapsing villager cannot go and eat.
pub fn hard_override(snapshot: &Snapshot, config: &BrainConfig) -> Option<ActionKind> {
    if snapshot.energy < config.rest_override_energy {
        return Some(if snapshot.is_night { ActionKind::Sleep } else { ActionKind::Rest });
    }
    if snapshot.hunger > config.eat_override_hunger {
        return Some(ActionKind::Eat);
    }
    None
}

/// Context-filtered actions the learned path may explore
///
/// Always contains exploring and every gather action.
pub fn reasonable_actions(snapshot: &Snapshot, agent: &Agent) -> Vec<ActionKind> {
    let mut actions = vec![
        ActionKind::Explore,
        ActionKind::GatherFood,
        ActionKind::GatherWater,
        ActionKind::GatherWood,
        ActionKind::GatherMaterials,
    ];
    if snapshot.energy < 0.6 {
        actions.push(if snapshot.is_night { ActionKind::Sleep } else { ActionKind::Rest });
    }
    if snapshot.hunger > 0.4 && agent.inventory.food > 0 {
        actions.push(ActionKind::Eat);
    }
    if snapshot.thirst > 0.4 && agent.inventory.water > 0 {
        actions.push(ActionKind::Drink);
    }
    if snapshot.warmth < 0.5 {
        actions.push(ActionKind::WarmUp);
    }
    if snapshot.social_desire > 0.4 && snapshot.nearby_agents > 0 {
        actions.push(ActionKind::Socialize);
    }
    if snapshot.emotions.curiosity > 0.5 {
        actions.push(ActionKind::Learn);
    }
    actions
}

/// Decision from the villager's own scalars when the world cannot place it
pub fn context_free_decision(agent: &Agent, config: &BrainConfig) -> Decision {
    let hunger = agent.survival.hunger_norm();
    let thirst = agent.survival.thirst_norm();
    let energy = agent.survival.energy_norm();

    let action = if energy < config.rest_override_energy {
        ActionKind::Rest
    } else if hunger > config.critical_hunger {
        if agent.inventory.food > 0 { ActionKind::Eat } else { ActionKind::GatherFood }
    } else if thirst > config.critical_thirst {
        if agent.inventory.water > 0 { ActionKind::Drink } else { ActionKind::GatherWater }
    } else {
        config.fallback_action
    };
    Decision::new(action, CONTEXT_FREE_CONFIDENCE, DecisionSource::ContextFree)
}

/// The per-villager decision function, bound to one world and settlement
pub struct PolicyCore<'a, W: WorldView + ?Sized> {
    world: &'a W,
    settlement: &'a dyn SettlementView,
    config: &'a BrainConfig,
}

impl<'a, W: WorldView + ?Sized> PolicyCore<'a, W> {
    pub fn new(world: &'a W, settlement: &'a dyn SettlementView, config: &'a BrainConfig) -> Self {
        Self { world, settlement, config }
    }

    /// Perceive, update affect and goals, then pick an action
    ///
    /// Requests inside the minimum decision interval return the cached
    /// decision without perceiving again.
    pub fn decide(&self, agent: &mut Agent) -> Decision {
        let now = self.world.world_snapshot().clock_ms;

        let interval = self.config.min_decision_interval_ms;
        if let Some(cached) = agent.mind.cached_decision(now, interval) {
            return Decision { source: DecisionSource::Cached, ..cached };
        }

        agent.mind.policy.poll();

        let perception = PerceptionBuilder::new(self.world, self.config);
        let Some(snapshot) = perception.build(agent) else {
            tracing::warn!("{} not found in world, deciding context-free", agent.id);
            let decision = context_free_decision(agent, self.config);
            agent.mind.remember_decision(decision, Snapshot::context_free(agent), now);
            return decision;
        };

        update_emotions(&snapshot, agent, snapshot.is_night);
        update_goals(agent, &snapshot, self.settlement, now, self.config);

        let decision = self.select(agent, &snapshot, now);
        agent.mind.remember_decision(decision, snapshot, now);

        tracing::debug!(
            "{} -> {} ({:?}, {:.2})",
            agent.id,
            decision.label(),
            decision.source,
            decision.confidence
        );
        decision
    }

    /// Precedence pipeline on an already-built snapshot
    pub fn select(&self, agent: &mut Agent, snapshot: &Snapshot, now: Millis) -> Decision {
        if let Some(action) = hard_override(snapshot, self.config) {
            return Decision::new(action, 1.0, DecisionSource::Override);
        }

        if let Some(decision) = self.goal_short_circuit(agent, snapshot) {
            return decision;
        }

        if let Some(decision) = self.learned_path(agent, snapshot) {
            return decision;
        }

        self.rule_path(agent, snapshot, now)
    }

    fn goal_short_circuit(&self, agent: &Agent, snapshot: &Snapshot) -> Option<Decision> {
        let goal = agent.goals.top_open()?;
        if goal.priority < self.config.goal_short_circuit_priority {
            return None;
        }
        let action = goal_action(goal.goal_type, agent, snapshot, self.settlement, self.config)?;
        Some(Decision::new(action, goal.priority, DecisionSource::Goal))
    }

    /// `None` when the learned path is unavailable, not selected or failed
    fn learned_path(&self, agent: &mut Agent, snapshot: &Snapshot) -> Option<Decision> {
        if !self.config.learned_policy_enabled {
            return None;
        }
        let exploration =
            adaptive_exploration_rate(agent.mind.exploration_rate, agent.mind.success_rate());
        let model = agent.mind.policy.model()?;

        if agent.mind.rng.gen::<f32>() >= 1.0 - exploration {
            return None;
        }

        let output = match model.predict(&snapshot.features()) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("{} learned path degraded to rules: {}", agent.id, e);
                agent.mind.stats.inference_failures += 1;
                return None;
            }
        };
        agent.mind.set_value_estimate(output.value);

        if agent.mind.rng.gen::<f32>() < exploration {
            let options = reasonable_actions(snapshot, agent);
            let action = options[agent.mind.rng.gen_range(0..options.len())];
            Some(Decision::new(action, output.probability(action), DecisionSource::Explored))
        } else {
            let action = output.argmax();
            Some(Decision::new(action, output.probability(action), DecisionSource::Learned))
        }
    }

    fn rule_path(&self, agent: &mut Agent, snapshot: &Snapshot, now: Millis) -> Decision {
        let weights = agent.mind.memory.derived_weights();
        let ctx = RuleContext {
            agent_id: agent.id,
            traits: &agent.traits,
            inventory: &agent.inventory,
            snapshot,
            settlement: self.settlement,
            weights: &weights,
            now,
            config: self.config,
        };
        let outcome = evaluate_rules(&ctx, &mut agent.mind.rng);

        let (priority, reason, decision) = match outcome.winner {
            Some(winner) => (
                winner.priority,
                winner.reason,
                Decision::new(outcome.action, winner.priority / 100.0, DecisionSource::Rules),
            ),
            None => (
                0.0,
                "fallback",
                Decision::new(outcome.action, FALLBACK_CONFIDENCE, DecisionSource::Fallback),
            ),
        };

        agent.mind.log_decision(DecisionRecord {
            action: outcome.action,
            priority,
            reason: reason.to_string(),
            candidate_count: outcome.candidate_count,
            at_ms: now,
        });
        decision
    }
}
