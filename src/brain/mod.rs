//! Villager decision-and-learning core
//!
//! `VillageBrain` is the entry point: it holds the injected configuration
//! and exposes `decide`, `learn`, `learn_from_outcome` and `stats`. All
//! per-villager state lives on the `Agent` itself, so different villagers
//! can be decided concurrently.

pub mod action_select;
pub mod emotion;
pub mod goal_select;
pub mod learning;
pub mod memory;
pub mod mind;
pub mod perception;
pub mod policy;
pub mod reward;
pub mod rule_eval;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use action_select::PolicyCore;
pub use learning::Outcome;
pub use memory::MemoryStats;
pub use mind::{Decision, DecisionRecord, DecisionSource, LearningStats, Mind};
pub use perception::{PerceptionBuilder, Snapshot};
pub use policy::{LearnedPolicy, PolicyModel, PolicyNetwork, PolicyStatus};
pub use reward::RewardShaper;

use crate::actions::catalog::ActionKind;
use crate::core::config::BrainConfig;
use crate::core::error::Result;
use crate::core::types::Millis;
use crate::entity::agent::{Agent, EmotionalState};
use crate::world::settlement::SettlementView;
use crate::world::view::WorldView;

/// Per-villager statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStats {
    pub name: String,
    pub learning: LearningStats,
    pub emotional_state: EmotionalState,
    pub memory: MemoryStats,
    pub exploration_rate: f32,
    pub learning_rate: f32,
    pub success_rate: f32,
    pub policy_status: PolicyStatus,
    pub last_value_estimate: Option<f32>,
    pub open_goals: usize,
    pub recent_decisions: Vec<DecisionRecord>,
}

/// Decision-and-learning engine shared by every villager
#[derive(Debug, Clone, Default)]
pub struct VillageBrain {
    config: BrainConfig,
}

impl VillageBrain {
    pub fn new(config: BrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BrainConfig {
        &self.config
    }

    /// Start building a learned policy for `agent`
    ///
    /// Runs in the background when called inside a tokio runtime; the
    /// villager decides rule-only until the policy reports ready. Does
    /// nothing when learned policies are disabled.
    pub fn attach_learned_policy(&self, agent: &mut Agent, seed: u64) {
        if !self.config.learned_policy_enabled {
            return;
        }
        let hidden_dim = self.config.policy_hidden_dim;
        agent.mind.attach_policy(LearnedPolicy::spawn(Box::new(move || {
            Ok(Box::new(PolicyNetwork::new(hidden_dim, seed)) as Box<dyn PolicyModel>)
        })));
    }

    /// Wait at most `limit` for the villager's policy to finish initialising
    pub async fn wait_for_policy(&self, agent: &mut Agent, limit: Duration) -> PolicyStatus {
        agent.mind.policy.wait(limit).await
    }

    /// Build the villager's current snapshot without side effects
    pub fn perceive<W: WorldView + ?Sized>(&self, agent: &Agent, world: &W) -> Option<Snapshot> {
        PerceptionBuilder::new(world, &self.config).build(agent)
    }

    /// Choose the villager's next action; never fails
    pub fn decide<W: WorldView + ?Sized>(
        &self,
        agent: &mut Agent,
        world: &W,
        settlement: &dyn SettlementView,
    ) -> Decision {
        PolicyCore::new(world, settlement, &self.config).decide(agent)
    }

    /// Learn from a completed action; returns the shaped reward
    pub fn learn(
        &self,
        agent: &mut Agent,
        action: ActionKind,
        before: &Snapshot,
        after: &Snapshot,
        now: Millis,
    ) -> f32 {
        learning::learn(agent, action, before, after, now, &self.config)
    }

    /// Learn from a coarse success/failure report; returns the reward used
    pub fn learn_from_outcome(
        &self,
        agent: &mut Agent,
        action: ActionKind,
        outcome: Outcome,
        now: Millis,
    ) -> f32 {
        learning::learn_from_outcome(agent, action, outcome, now, &self.config)
    }

    pub fn stats(&self, agent: &Agent) -> AgentStats {
        let mind = &agent.mind;
        AgentStats {
            name: agent.name.clone(),
            learning: mind.stats.clone(),
            emotional_state: agent.emotions,
            memory: mind.memory.stats(),
            exploration_rate: mind.exploration_rate,
            learning_rate: mind.learning_rate,
            success_rate: mind.success_rate(),
            policy_status: mind.policy_status(),
            last_value_estimate: mind.last_value_estimate(),
            open_goals: agent.goals.iter().filter(|g| g.is_open()).count(),
            recent_decisions: mind.recent_decisions().cloned().collect(),
        }
    }

    /// Export the villager's policy parameters, `None` without a ready policy
    pub fn export_policy(&self, agent: &Agent) -> Option<Result<String>> {
        agent.mind.policy.model().map(|model| model.to_json())
    }

    /// Replace the villager's policy with previously exported parameters
    pub fn import_policy(&self, agent: &mut Agent, json: &str) -> Result<()> {
        let network = PolicyNetwork::from_json(json)?;
        agent.mind.attach_policy(LearnedPolicy::ready(Box::new(network)));
        tracing::info!("{} imported policy parameters", agent.id);
        Ok(())
    }
}
