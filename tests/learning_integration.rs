//! Integration tests for reward shaping and the learning loop

use hamlet_mind::actions::ActionKind;
use hamlet_mind::brain::learning::{EXPLORATION_MIN, LEARNING_RATE_MAX, LEARNING_RATE_MIN};
use hamlet_mind::brain::reward::{enforce_non_neutrality, raw_reward};
use hamlet_mind::brain::{
    LearnedPolicy, Outcome, PolicyNetwork, RewardShaper, Snapshot, VillageBrain,
};
use hamlet_mind::core::config::BrainConfig;
use hamlet_mind::core::types::Vec2;
use hamlet_mind::entity::{Agent, Inventory, Survival, Traits};
use hamlet_mind::world::{AgentPresence, Settlement, WorldSnapshot};

fn villager(traits: Traits) -> Agent {
    Agent::new("Learner", traits, &BrainConfig::default(), 7)
}

fn hungry_before(agent: &Agent) -> Snapshot {
    let mut snapshot = Snapshot::context_free(agent);
    snapshot.hunger = 0.9;
    snapshot
}

fn fed_after(agent: &Agent) -> Snapshot {
    let mut snapshot = Snapshot::context_free(agent);
    snapshot.hunger = 0.5;
    snapshot
}

/// Industrious wood gathering with a near-zero raw sum is lifted to +0.15
#[test]
fn test_industrious_gatherer_gets_positive_floor() {
    let agent = villager(Traits::new(0.5, 0.5, 0.6, 0.5))
        .with_inventory(Inventory { wood: 10, ..Inventory::default() });
    let before = Snapshot::context_free(&agent);

    let shaped = enforce_non_neutrality(0.03, ActionKind::GatherWood, &before, &agent, 0.1);
    assert!((shaped - 0.15).abs() < 1e-6);
}

#[test]
fn test_lazy_hoarder_gets_negative_floor() {
    let agent = villager(Traits::new(0.5, 0.5, 0.2, 0.5))
        .with_inventory(Inventory { wood: 25, ..Inventory::default() });
    let before = Snapshot::context_free(&agent);

    let shaped = enforce_non_neutrality(0.03, ActionKind::GatherWood, &before, &agent, 0.1);
    assert!((shaped + 0.2).abs() < 1e-6);
}

/// The floor can be switched off to inspect raw sums
#[test]
fn test_floor_can_be_disabled() {
    let config = BrainConfig { enforce_non_neutrality: false, ..BrainConfig::default() };
    let agent = villager(Traits::default());
    let snapshot = Snapshot::context_free(&agent);

    let raw = raw_reward(ActionKind::Craft, &snapshot, &snapshot, &agent);
    let shaped = RewardShaper::new(&config).reward(ActionKind::Craft, &snapshot, &snapshot, &agent);
    assert_eq!(raw.clamp(-1.0, 1.0), shaped);
}

#[test]
fn test_critical_hunger_relief_dominates() {
    let config = BrainConfig::default();
    let agent = villager(Traits::default());
    let shaper = RewardShaper::new(&config);
    let reward = shaper.reward(ActionKind::Eat, &hungry_before(&agent), &fed_after(&agent), &agent);
    assert!(reward >= 0.7);

    // Wandering off while starving is punished whatever else happened
    let mut starving = fed_after(&agent);
    starving.hunger = 0.95;
    let reward = shaper.reward(ActionKind::Explore, &starving, &starving, &agent);
    assert!(reward <= -0.8);
}

/// Alternating success and failure keeps the learning rate in its moderate band
#[test]
fn test_alternating_outcomes_keep_moderate_learning_rate() {
    let brain = VillageBrain::default();
    let mut agent = villager(Traits::default());

    for i in 0..200u64 {
        let outcome = if i % 2 == 0 { Outcome::Success } else { Outcome::Failure };
        brain.learn_from_outcome(&mut agent, ActionKind::GatherFood, outcome, i * 100);

        let rate = agent.mind.learning_rate;
        assert!((0.005..=0.05).contains(&rate), "event {}: learning rate {}", i, rate);
    }

    assert!((agent.mind.success_rate() - 0.5).abs() < 0.01);
}

#[test]
fn test_failure_streak_raises_learning_rate_to_ceiling() {
    let brain = VillageBrain::default();
    let mut agent = villager(Traits::default());

    for i in 0..100u64 {
        brain.learn_from_outcome(&mut agent, ActionKind::Explore, Outcome::Failure, i);
        assert!(agent.mind.learning_rate <= LEARNING_RATE_MAX);
    }
    assert!((agent.mind.learning_rate - LEARNING_RATE_MAX).abs() < 1e-6);
}

#[test]
fn test_success_streak_lowers_learning_rate_to_floor() {
    let brain = VillageBrain::default();
    let mut agent = villager(Traits::default());

    for i in 0..200u64 {
        brain.learn_from_outcome(&mut agent, ActionKind::GatherFood, Outcome::Success, i);
        assert!(agent.mind.learning_rate >= LEARNING_RATE_MIN);
    }
    assert!((agent.mind.learning_rate - LEARNING_RATE_MIN).abs() < 1e-6);
}

/// Ten strongly rewarded events in a row keep lowering exploration
#[test]
fn test_strong_rewards_lower_exploration() {
    let brain = VillageBrain::default();
    let mut agent = villager(Traits::default());
    let before = hungry_before(&agent);
    let after = fed_after(&agent);

    let mut previous = agent.mind.exploration_rate;
    for i in 0..10u64 {
        let reward = brain.learn(&mut agent, ActionKind::Eat, &before, &after, i * 1_000);
        assert!(reward > 0.4);
        let current = agent.mind.exploration_rate;
        assert!(current < previous || current == EXPLORATION_MIN);
        previous = current;
    }
}

/// A small memory overflows and consolidates into long-term memory
#[test]
fn test_overflow_consolidates_short_term_memory() {
    let brain = VillageBrain::default();
    let mut agent = villager(Traits::default());
    let capacity = brain.config().short_term_capacity as u64;

    for i in 0..capacity {
        brain.learn_from_outcome(&mut agent, ActionKind::GatherWater, Outcome::Success, i);
    }
    let stats = agent.mind.memory.stats();
    assert_eq!(stats.short_term as u64, capacity);
    assert_eq!(stats.consolidations, 0);

    brain.learn_from_outcome(&mut agent, ActionKind::GatherWater, Outcome::Success, capacity);
    let stats = agent.mind.memory.stats();
    assert_eq!(stats.short_term, 0);
    assert_eq!(stats.consolidations, 1);
    assert!(stats.long_term <= brain.config().long_term_capacity);
}

/// A strongly rewarded event is consolidated straight away and kept
#[test]
fn test_significant_reward_consolidates_immediately() {
    let brain = VillageBrain::default();
    let mut agent = villager(Traits::default());
    let before = hungry_before(&agent);
    let after = fed_after(&agent);

    brain.learn(&mut agent, ActionKind::Eat, &before, &after, 0);
    let stats = agent.mind.memory.stats();
    assert_eq!(stats.short_term, 0);
    assert_eq!(stats.long_term, 1);
    assert_eq!(agent.mind.memory.long_term()[0].action, ActionKind::Eat);

    let weights = agent.mind.memory.derived_weights();
    assert!(weights.get(&ActionKind::Eat).copied().unwrap_or(1.0) > 1.0);
}

/// Outcome reports reuse the snapshot the action was chosen from
#[test]
fn test_outcome_uses_decision_snapshot() {
    let brain = VillageBrain::default();
    let mut agent = villager(Traits::default());
    let mut world = WorldSnapshot::new(0);
    world.agents.push(AgentPresence { id: agent.id, position: Vec2::new(50.0, 50.0) });
    let friend = Agent::new("Friend", Traits::default(), brain.config(), 8);
    world.agents.push(AgentPresence { id: friend.id, position: Vec2::new(60.0, 50.0) });
    let settlement = Settlement::new();

    let decision = brain.decide(&mut agent, &world, &settlement);
    let reward = brain.learn_from_outcome(&mut agent, decision.action, Outcome::Success, 500);
    assert!((reward - 0.3).abs() < 1e-6);

    let stored = agent.mind.memory.short_term().next().expect("transition stored");
    assert_eq!(stored.action, decision.action);
    assert_eq!(stored.before.nearby_agents, 1);
}

/// Without a pending decision the outcome is recorded from the villager alone
#[test]
fn test_outcome_without_decision_is_context_free() {
    let brain = VillageBrain::default();
    let mut agent =
        villager(Traits::default()).with_survival(Survival::new(40.0, 20.0, 80.0, 70.0));

    let reward = brain.learn_from_outcome(&mut agent, ActionKind::Build, Outcome::Failure, 0);
    assert!((reward + 0.3).abs() < 1e-6);
    assert_eq!(agent.mind.stats.failures, 1);

    let stored = agent.mind.memory.short_term().next().expect("transition stored");
    assert_eq!(stored.before.nearby_agents, 0);
    assert!((stored.before.hunger - 0.4).abs() < 1e-6);
}

/// Every learning event takes one fit step on a ready policy
#[test]
fn test_learning_updates_policy_parameters() {
    let brain = VillageBrain::default();
    let mut agent = villager(Traits::default());
    agent.mind.attach_policy(LearnedPolicy::ready(Box::new(PolicyNetwork::new(8, 3))));
    let initial = brain.export_policy(&agent).expect("policy attached").expect("exportable");

    let before = hungry_before(&agent);
    let after = fed_after(&agent);
    for i in 0..5u64 {
        brain.learn(&mut agent, ActionKind::Eat, &before, &after, i);
    }

    let trained = brain.export_policy(&agent).expect("policy attached").expect("exportable");
    assert_ne!(initial, trained);

    let mut copy = villager(Traits::default());
    brain.import_policy(&mut copy, &trained).expect("round trip");
    assert_eq!(brain.export_policy(&copy).expect("attached").expect("exportable"), trained);
}
