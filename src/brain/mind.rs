//! Policy-private state owned by each villager
//!
//! Nothing in here is shared between villagers: rates, counters, memory,
//! the optional learned policy and the decision RNG all live per agent.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::actions::catalog::ActionKind;
use crate::brain::memory::MemoryStore;
use crate::brain::perception::Snapshot;
use crate::brain::policy::{LearnedPolicy, PolicyStatus};
use crate::core::config::BrainConfig;
use crate::core::types::Millis;

/// Learning counters; a success is any learning event with reward > 0
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningStats {
    pub decisions: u64,
    pub successes: u64,
    pub failures: u64,
    /// Learned-path decisions that degraded to the rule evaluator
    pub inference_failures: u64,
}

impl LearningStats {
    /// successes / decisions, 0.5 before the first learning event
    pub fn success_rate(&self) -> f32 {
        if self.decisions == 0 {
            0.5
        } else {
            self.successes as f32 / self.decisions as f32
        }
    }

    pub fn record(&mut self, reward: f32) {
        self.decisions += 1;
        if reward > 0.0 {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
    }
}

/// Which stage of the decision pipeline produced an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionSource {
    Override,
    Goal,
    Learned,
    Explored,
    Rules,
    Fallback,
    Cached,
    ContextFree,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: ActionKind,
    /// [0, 1]
    pub confidence: f32,
    pub source: DecisionSource,
}

impl Decision {
    pub fn new(action: ActionKind, confidence: f32, source: DecisionSource) -> Self {
        Self {
            action,
            confidence: confidence.clamp(0.0, 1.0),
            source,
        }
    }

    pub fn label(&self) -> &'static str {
        self.action.label()
    }
}

/// Debug record of one rule-evaluator decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub action: ActionKind,
    pub priority: f32,
    pub reason: String,
    pub candidate_count: usize,
    pub at_ms: Millis,
}

#[derive(Debug)]
pub struct Mind {
    /// [0.02, 0.8]
    pub exploration_rate: f32,
    /// [0.001, 0.08]
    pub learning_rate: f32,
    pub stats: LearningStats,
    pub memory: MemoryStore,
    pub policy: LearnedPolicy,
    pub(crate) rng: ChaCha8Rng,
    last_decision: Option<(Decision, Millis)>,
    decision_log: VecDeque<DecisionRecord>,
    log_capacity: usize,
    /// Action chosen last and the snapshot it was chosen from
    pending: Option<(ActionKind, Snapshot)>,
    last_value: Option<f32>,
}

impl Mind {
    /// Rule-only mind; see `attach_policy` for the learned path
    pub fn new(config: &BrainConfig, seed: u64) -> Self {
        Self {
            exploration_rate: config.initial_exploration_rate,
            learning_rate: config.initial_learning_rate,
            stats: LearningStats::default(),
            memory: MemoryStore::new(config),
            policy: LearnedPolicy::none(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            last_decision: None,
            decision_log: VecDeque::with_capacity(config.decision_log_capacity),
            log_capacity: config.decision_log_capacity,
            pending: None,
            last_value: None,
        }
    }

    pub fn attach_policy(&mut self, policy: LearnedPolicy) {
        self.policy = policy;
    }

    pub fn policy_status(&self) -> PolicyStatus {
        self.policy.status()
    }

    pub fn success_rate(&self) -> f32 {
        self.stats.success_rate()
    }

    /// Cached decision if the last one is younger than `interval_ms`
    pub fn cached_decision(&self, now: Millis, interval_ms: Millis) -> Option<Decision> {
        self.last_decision.and_then(|(decision, at)| {
            (now.saturating_sub(at) < interval_ms).then_some(decision)
        })
    }

    pub(crate) fn remember_decision(
        &mut self,
        decision: Decision,
        snapshot: Snapshot,
        now: Millis,
    ) {
        self.last_decision = Some((decision, now));
        self.pending = Some((decision.action, snapshot));
    }

    /// Snapshot the given action was last chosen from
    pub fn pending_snapshot(&self, action: ActionKind) -> Option<&Snapshot> {
        match &self.pending {
            Some((pending, snapshot)) if *pending == action => Some(snapshot),
            _ => None,
        }
    }

    pub(crate) fn log_decision(&mut self, record: DecisionRecord) {
        if self.log_capacity == 0 {
            return;
        }
        while self.decision_log.len() >= self.log_capacity {
            self.decision_log.pop_front();
        }
        self.decision_log.push_back(record);
    }

    pub fn recent_decisions(&self) -> impl Iterator<Item = &DecisionRecord> {
        self.decision_log.iter()
    }

    pub fn last_value_estimate(&self) -> Option<f32> {
        self.last_value
    }

    pub(crate) fn set_value_estimate(&mut self, value: f32) {
        self.last_value = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate_defaults_to_even() {
        let mut stats = LearningStats::default();
        assert_eq!(stats.success_rate(), 0.5);
        stats.record(0.4);
        stats.record(-0.2);
        stats.record(0.3);
        assert_eq!(stats.decisions, 3);
        assert_eq!(stats.failures, 1);
        assert!((stats.success_rate() - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_decision_log_is_bounded() {
        let config = BrainConfig { decision_log_capacity: 3, ..BrainConfig::default() };
        let mut mind = Mind::new(&config, 1);
        for i in 0..5 {
            mind.log_decision(DecisionRecord {
                action: ActionKind::GatherWood,
                priority: 50.0,
                reason: "test".into(),
                candidate_count: 1,
                at_ms: i,
            });
        }
        let at: Vec<_> = mind.recent_decisions().map(|r| r.at_ms).collect();
        assert_eq!(at, vec![2, 3, 4]);
    }

    #[test]
    fn test_cached_decision_expires() {
        let config = BrainConfig::default();
        let mut mind = Mind::new(&config, 1);
        assert!(mind.cached_decision(0, 150).is_none());

        let decision = Decision::new(ActionKind::Explore, 0.3, DecisionSource::Rules);
        let snapshot = crate::brain::perception::Snapshot::context_free(
            &crate::entity::agent::Agent::new("x", Default::default(), &config, 1),
        );
        mind.remember_decision(decision, snapshot, 1_000);
        assert_eq!(mind.cached_decision(1_100, 150), Some(decision));
        assert!(mind.cached_decision(1_150, 150).is_none());
        assert!(mind.pending_snapshot(ActionKind::Explore).is_some());
        assert!(mind.pending_snapshot(ActionKind::Eat).is_none());
    }

    #[test]
    fn test_decision_confidence_clamped() {
        let decision = Decision::new(ActionKind::Eat, 1.7, DecisionSource::Override);
        assert_eq!(decision.confidence, 1.0);
        assert_eq!(decision.label(), "eat");
    }
}
