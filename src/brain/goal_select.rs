//! Goal selection
//!
//! Goals are opened when a need crosses its threshold and closed when the
//! need resolves. Pruning runs first so stale goals never short-circuit a
//! decision.

use crate::actions::catalog::ActionKind;
use crate::brain::perception::Snapshot;
use crate::brain::rule_eval::shelter_action;
use crate::core::config::BrainConfig;
use crate::core::types::Millis;
use crate::entity::agent::Agent;
use crate::entity::goals::{Goal, GoalType};
use crate::world::settlement::SettlementView;

const HUNGER_OPEN: f32 = 0.6;
const HUNGER_RESOLVED: f32 = 0.3;
const THIRST_OPEN: f32 = 0.6;
const THIRST_RESOLVED: f32 = 0.3;
const ENERGY_OPEN: f32 = 0.35;
const ENERGY_RESOLVED: f32 = 0.7;
const WARMTH_OPEN: f32 = 0.3;
const WARMTH_RESOLVED: f32 = 0.6;
const COMPANY_OPEN: f32 = 0.7;
const COMPANY_PRIORITY: f32 = 0.3;

/// Shelter priority ramps from base to base + boost over this long
const SHELTER_BASE_PRIORITY: f32 = 0.4;
const SHELTER_MAX_BOOST: f32 = 0.4;
const SHELTER_RAMP_MS: f32 = 600_000.0;

/// Shelter goal priority after `homeless_ms` without a roof
pub fn shelter_priority(homeless_ms: Millis) -> f32 {
    let boost = (homeless_ms as f32 / SHELTER_RAMP_MS * SHELTER_MAX_BOOST).min(SHELTER_MAX_BOOST);
    SHELTER_BASE_PRIORITY + boost
}

/// Open, close, reprioritise and prune the agent's goals
pub fn update_goals(
    agent: &mut Agent,
    snapshot: &Snapshot,
    settlement: &dyn SettlementView,
    now: Millis,
    config: &BrainConfig,
) {
    let pruned = agent.goals.prune(now, config.goal_ttl_ms);
    if pruned > 0 {
        tracing::trace!("{} pruned {} goals", agent.id, pruned);
    }

    let goals = &mut agent.goals;

    track_need(
        goals,
        GoalType::ReduceHunger,
        snapshot.hunger > HUNGER_OPEN,
        snapshot.hunger < HUNGER_RESOLVED,
        snapshot.hunger,
        now,
    );
    track_need(
        goals,
        GoalType::QuenchThirst,
        snapshot.thirst > THIRST_OPEN,
        snapshot.thirst < THIRST_RESOLVED,
        snapshot.thirst,
        now,
    );
    track_need(
        goals,
        GoalType::RecoverEnergy,
        snapshot.energy < ENERGY_OPEN,
        snapshot.energy > ENERGY_RESOLVED,
        1.0 - snapshot.energy,
        now,
    );
    track_need(
        goals,
        GoalType::StayWarm,
        snapshot.warmth < WARMTH_OPEN,
        snapshot.warmth > WARMTH_RESOLVED,
        1.0 - snapshot.warmth,
        now,
    );

    let lonely = snapshot.social_desire > COMPANY_OPEN && snapshot.nearby_agents == 0;
    let company = snapshot.nearby_agents > 0;
    track_need(goals, GoalType::FindCompany, lonely, company, COMPANY_PRIORITY, now);

    if settlement.has_completed_shelter(agent.id) {
        goals.mark_done(GoalType::SecureShelter);
    } else {
        let priority = shelter_priority(settlement.homeless_for_ms(agent.id, now));
        if goals.has_open(GoalType::SecureShelter) {
            goals.reprioritize(GoalType::SecureShelter, priority);
        } else {
            goals.add(Goal::new(GoalType::SecureShelter, priority, now));
        }
    }
}

fn track_need(
    goals: &mut crate::entity::goals::GoalList,
    goal_type: GoalType,
    open: bool,
    resolved: bool,
    priority: f32,
    now: Millis,
) {
    if resolved {
        goals.mark_done(goal_type);
    } else if open {
        if goals.has_open(goal_type) {
            goals.reprioritize(goal_type, priority);
        } else {
            goals.add(Goal::new(goal_type, priority, now));
        }
    }
}

/// Concrete action serving `goal_type`, `None` if there is nothing to do
pub fn goal_action(
    goal_type: GoalType,
    agent: &Agent,
    snapshot: &Snapshot,
    settlement: &dyn SettlementView,
    config: &BrainConfig,
) -> Option<ActionKind> {
    let inventory = &agent.inventory;
    match goal_type {
        GoalType::ReduceHunger if inventory.food > 0 => Some(ActionKind::Eat),
        GoalType::ReduceHunger => Some(ActionKind::GatherFood),
        GoalType::QuenchThirst if inventory.water > 0 => Some(ActionKind::Drink),
        GoalType::QuenchThirst => Some(ActionKind::GatherWater),
        GoalType::RecoverEnergy if snapshot.is_night => Some(ActionKind::Sleep),
        GoalType::RecoverEnergy => Some(ActionKind::Rest),
        GoalType::StayWarm => Some(ActionKind::WarmUp),
        GoalType::SecureShelter => {
            shelter_action(settlement.shelter_phase(agent.id), inventory, config)
        }
        GoalType::FindCompany => Some(ActionKind::Explore),
    }
}
