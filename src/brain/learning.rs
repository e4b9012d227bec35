//! Online learning loop and adaptive schedules
//!
//! Each completed action becomes one learning event: shape the reward,
//! update counters, store the transition, consolidate when needed, take one
//! fit step on the learned policy (if any), then adjust the exploration and
//! learning rates.

use serde::{Deserialize, Serialize};

use crate::actions::catalog::ActionKind;
use crate::brain::memory::Transition;
use crate::brain::mind::Mind;
use crate::brain::perception::Snapshot;
use crate::brain::reward::RewardShaper;
use crate::core::config::BrainConfig;
use crate::core::types::Millis;
use crate::entity::agent::Agent;

pub const EXPLORATION_MIN: f32 = 0.02;
pub const EXPLORATION_MAX: f32 = 0.8;
pub const LEARNING_RATE_MIN: f32 = 0.001;
pub const LEARNING_RATE_MAX: f32 = 0.08;

/// Ceiling on the exploration rate actually used by a decision
const ADAPTIVE_EXPLORATION_CAP: f32 = 0.6;

/// Reward for a coarse success/failure report
const OUTCOME_REWARD: f32 = 0.3;

/// Coarse result reported by the world when no snapshots are available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn reward(&self) -> f32 {
        match self {
            Outcome::Success => OUTCOME_REWARD,
            Outcome::Failure => -OUTCOME_REWARD,
        }
    }
}

/// Exploration used at decision time
///
/// Formula: min(0.6, base * (1 + (1 - success_rate)))
/// A struggling villager explores more.
pub fn adaptive_exploration_rate(base: f32, success_rate: f32) -> f32 {
    (base * (1.0 + (1.0 - success_rate))).min(ADAPTIVE_EXPLORATION_CAP)
}

/// Scale `value` but never past `limit` in the direction of travel
///
/// A floor never raises a value that is already below it, and a ceiling
/// never lowers one that is already above it.
fn scale_toward(value: f32, factor: f32, limit: f32) -> f32 {
    let scaled = value * factor;
    if factor < 1.0 {
        if value <= limit {
            value
        } else {
            scaled.max(limit)
        }
    } else if value >= limit {
        value
    } else {
        scaled.min(limit)
    }
}

/// Reward-driven exploration step
pub fn next_exploration_rate(rate: f32, reward: f32) -> f32 {
    if reward > 0.4 {
        scale_toward(rate, 0.95, 0.03)
    } else if reward > 0.15 {
        scale_toward(rate, 0.98, 0.05)
    } else if reward < -0.4 {
        scale_toward(rate, 1.05, 0.6)
    } else if reward < -0.15 {
        scale_toward(rate, 1.02, 0.5)
    } else {
        rate
    }
}

/// Success-rate-driven learning-rate step
pub fn next_learning_rate(rate: f32, success_rate: f32) -> f32 {
    if success_rate > 0.85 {
        scale_toward(rate, 0.92, 0.001)
    } else if success_rate > 0.7 {
        scale_toward(rate, 0.96, 0.005)
    } else if success_rate < 0.3 {
        scale_toward(rate, 1.08, 0.08)
    } else if success_rate < 0.5 {
        scale_toward(rate, 1.03, 0.05)
    } else {
        rate
    }
}

/// Apply the full adaptive schedule after one learning event
pub fn adjust_rates(mind: &mut Mind, reward: f32, config: &BrainConfig) {
    let mut exploration = next_exploration_rate(mind.exploration_rate, reward);
    if mind.stats.decisions >= config.annealing_after_decisions {
        exploration = scale_toward(exploration, 0.999, EXPLORATION_MIN);
    }
    mind.exploration_rate = exploration.clamp(EXPLORATION_MIN, EXPLORATION_MAX);

    let learning = next_learning_rate(mind.learning_rate, mind.stats.success_rate());
    mind.learning_rate = learning.clamp(LEARNING_RATE_MIN, LEARNING_RATE_MAX);
}

/// Target distribution for one fit step
///
/// The taken action's slot gets clamp(0.1, 0.9, 0.5 + reward * 0.5); all
/// other slots are 0.
pub fn fit_target(action: ActionKind, reward: f32) -> [f32; ActionKind::COUNT] {
    let mut target = [0.0; ActionKind::COUNT];
    target[action.index()] = (0.5 + reward * 0.5).clamp(0.1, 0.9);
    target
}

/// Learn from one completed action; returns the shaped reward
pub fn learn(
    agent: &mut Agent,
    action: ActionKind,
    before: &Snapshot,
    after: &Snapshot,
    now: Millis,
    config: &BrainConfig,
) -> f32 {
    let reward = RewardShaper::new(config).reward(action, before, after, agent);
    record_event(&mut agent.mind, action, (*before, *after), reward, now, true, config);
    tracing::debug!("{} learned {} -> {:.2}", agent.id, action.label(), reward);
    reward
}

/// Learn from a coarse success/failure report; returns the reward used
///
/// Without a snapshot there is nothing to fit, unless the action was chosen
/// by this mind and its decision snapshot is still pending.
pub fn learn_from_outcome(
    agent: &mut Agent,
    action: ActionKind,
    outcome: Outcome,
    now: Millis,
    config: &BrainConfig,
) -> f32 {
    let reward = outcome.reward();
    let pending = agent.mind.pending_snapshot(action).copied();
    let fit = pending.is_some();
    let snapshot = pending.unwrap_or_else(|| Snapshot::context_free(agent));
    record_event(&mut agent.mind, action, (snapshot, snapshot), reward, now, fit, config);
    tracing::debug!("{} reported {:?} for {}", agent.id, outcome, action.label());
    reward
}

fn record_event(
    mind: &mut Mind,
    action: ActionKind,
    (before, after): (Snapshot, Snapshot),
    reward: f32,
    now: Millis,
    fit: bool,
    config: &BrainConfig,
) {
    mind.stats.record(reward);

    let overflow = mind.memory.push(Transition { before, action, reward, after, at: now });
    if overflow || reward.abs() > config.consolidation_reward_trigger {
        mind.memory.consolidate(&mut mind.rng);
    }

    let learning_rate = mind.learning_rate;
    if let Some(model) = mind.policy.model_mut().filter(|_| fit) {
        let target = fit_target(action, reward);
        if let Err(e) = model.fit(&before.features(), &target, reward, learning_rate) {
            tracing::warn!("policy fit skipped: {}", e);
        }
    }

    adjust_rates(mind, reward, config);
}
