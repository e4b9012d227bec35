//! Reward shaping
//!
//! A reward is the sum of hand-crafted terms: need satisfaction with
//! asymmetric floors, dominant critical-need terms, time-of-day consistency,
//! hoarding penalties, personality consistency and an idleness penalty.
//! Near-zero sums are then remapped away from zero by
//! [`enforce_non_neutrality`] so every learning event carries signal.

use crate::actions::catalog::{ActionCategory, ActionKind};
use crate::brain::perception::Snapshot;
use crate::core::config::BrainConfig;
use crate::entity::agent::Agent;

/// Eating or drinking while this needy always earns at least `NEED_MET_FLOOR`
const NEEDY: f32 = 0.5;
const NEED_MET_FLOOR: f32 = 0.4;
/// Eating or drinking while this sated is penalised
const SATED: f32 = 0.2;
const SATED_PENALTY: f32 = -0.3;

const CRITICAL_PENALTY: f32 = -0.8;
const CRITICAL_RELIEF: f32 = 0.7;

/// Remapped magnitudes
const FLOOR_MILD: f32 = 0.15;
const FLOOR_STRONG: f32 = 0.2;

/// Computes rewards for completed actions
pub struct RewardShaper<'a> {
    config: &'a BrainConfig,
}

impl<'a> RewardShaper<'a> {
    pub fn new(config: &'a BrainConfig) -> Self {
        Self { config }
    }

    /// Final reward in [-1, 1]
    pub fn reward(
        &self,
        action: ActionKind,
        before: &Snapshot,
        after: &Snapshot,
        agent: &Agent,
    ) -> f32 {
        let raw = raw_reward(action, before, after, agent);
        let shaped = if self.config.enforce_non_neutrality {
            enforce_non_neutrality(raw, action, before, agent, self.config.neutrality_threshold)
        } else {
            raw
        };
        let reward = if shaped.is_finite() { shaped.clamp(-1.0, 1.0) } else { 0.0 };
        tracing::trace!(action = action.label(), raw, reward, "reward shaped");
        reward
    }
}

/// Sum of all shaped terms, before the neutrality floor and clamping
pub fn raw_reward(action: ActionKind, before: &Snapshot, after: &Snapshot, agent: &Agent) -> f32 {
    let mut reward = need_terms(action, before, after, agent);
    reward += time_of_day_term(action, before);
    reward += personality_term(action, agent);
    critical_terms(action, before, after, reward)
}

fn need_terms(action: ActionKind, before: &Snapshot, after: &Snapshot, agent: &Agent) -> f32 {
    match action {
        ActionKind::Eat => consumption(before.hunger, after.hunger),
        ActionKind::Drink => consumption(before.thirst, after.thirst),
        ActionKind::Rest | ActionKind::Sleep => {
            let gain = after.energy - before.energy;
            if before.energy > 0.8 {
                -0.4
            } else if before.energy < 0.4 {
                0.3 + gain * 2.0
            } else {
                gain * 2.0
            }
        }
        ActionKind::WarmUp => {
            let gain = after.warmth - before.warmth;
            if before.warmth > 0.8 {
                -0.2
            } else if before.warmth < 0.4 {
                0.3 + gain
            } else {
                gain
            }
        }
        ActionKind::GatherFood
        | ActionKind::GatherWater
        | ActionKind::GatherWood
        | ActionKind::GatherMaterials => {
            let hoarding = action
                .gathers()
                .is_some_and(|kind| agent.inventory.is_saturated(kind));
            if hoarding {
                -0.3
            } else {
                0.2
            }
        }
        ActionKind::DeliverWood | ActionKind::Build => 0.3,
        ActionKind::Craft => 0.2,
        ActionKind::Socialize => {
            if before.nearby_agents > 0 {
                before.social_desire * 0.4
            } else {
                -0.2
            }
        }
        ActionKind::Explore => before.emotions.curiosity * 0.2,
        ActionKind::Learn => before.emotions.curiosity * 0.3,
        ActionKind::Idle => -0.3,
    }
}

/// Hunger or thirst relief
fn consumption(need_before: f32, need_after: f32) -> f32 {
    let relief = (need_before - need_after).max(0.0);
    if need_before > NEEDY {
        NEED_MET_FLOOR + relief * 2.0
    } else if need_before < SATED {
        SATED_PENALTY
    } else {
        relief * 2.0
    }
}

fn time_of_day_term(action: ActionKind, before: &Snapshot) -> f32 {
    match (action, before.is_night) {
        (ActionKind::Sleep, true) => 0.1,
        (ActionKind::Sleep, false) => -0.1,
        (ActionKind::Explore, true) => -0.15,
        (a, true) if a.category() == ActionCategory::Work => -0.05,
        _ => 0.0,
    }
}

fn personality_term(action: ActionKind, agent: &Agent) -> f32 {
    let traits = &agent.traits;
    let aligned = match action.category() {
        ActionCategory::Work => traits.industriousness > 0.6,
        ActionCategory::Social => traits.sociability > 0.6,
        ActionCategory::Exploration => traits.curiosity > 0.6,
        ActionCategory::Survival | ActionCategory::Idle => false,
    };
    if aligned {
        0.05
    } else {
        0.0
    }
}

/// Critical terms dominate everything else
fn critical_terms(action: ActionKind, before: &Snapshot, after: &Snapshot, reward: f32) -> f32 {
    let mut reward = reward;

    if action == ActionKind::Eat && before.hunger > 0.85 {
        reward = reward.max(CRITICAL_RELIEF);
    }
    if action.is_rest() && before.energy < 0.15 {
        reward = reward.max(CRITICAL_RELIEF);
    }

    let starving =
        after.hunger > 0.9 && !matches!(action, ActionKind::Eat | ActionKind::GatherFood);
    let collapsing = after.energy < 0.1 && !action.is_rest();
    if starving || collapsing {
        reward = reward.min(CRITICAL_PENALTY);
    }

    reward
}

/// Remap a near-zero reward to a fixed minimum magnitude
///
/// Values with |value| >= `threshold` pass through unchanged. Below it the
/// sign and magnitude are decided by the action category:
/// - work: +0.15 for industrious villagers, -0.2 when the gathered resource
///   is already saturated, otherwise +/-0.15 following the raw sign
/// - survival: +0.2 when the targeted need was actually pressing, else -0.2
/// - social: +0.15 with company around, else -0.15
/// - exploration: +0.15 for curious villagers, else -0.15
/// - idle: -0.2
pub fn enforce_non_neutrality(
    value: f32,
    action: ActionKind,
    before: &Snapshot,
    agent: &Agent,
    threshold: f32,
) -> f32 {
    let value = if value.is_finite() { value } else { 0.0 };
    if value.abs() >= threshold {
        return value;
    }

    let traits = &agent.traits;
    match action.category() {
        ActionCategory::Work => {
            let saturated = action
                .gathers()
                .is_some_and(|kind| agent.inventory.is_saturated(kind));
            if traits.industriousness >= 0.5 {
                FLOOR_MILD
            } else if saturated {
                -FLOOR_STRONG
            } else if value >= 0.0 {
                FLOOR_MILD
            } else {
                -FLOOR_MILD
            }
        }
        ActionCategory::Survival => {
            let pressing = match action {
                ActionKind::Eat => before.hunger > 0.3,
                ActionKind::Drink => before.thirst > 0.3,
                ActionKind::Rest | ActionKind::Sleep => before.energy < 0.7,
                _ => before.warmth < 0.7,
            };
            if pressing {
                FLOOR_STRONG
            } else {
                -FLOOR_STRONG
            }
        }
        ActionCategory::Social => {
            if before.nearby_agents > 0 {
                FLOOR_MILD
            } else {
                -FLOOR_MILD
            }
        }
        ActionCategory::Exploration => {
            if traits.curiosity >= 0.5 {
                FLOOR_MILD
            } else {
                -FLOOR_MILD
            }
        }
        ActionCategory::Idle => -FLOOR_STRONG,
    }
}
