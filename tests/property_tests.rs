//! Property-based tests for the villager brain

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use hamlet_mind::actions::ActionKind;
use hamlet_mind::brain::learning::{adjust_rates, EXPLORATION_MAX, EXPLORATION_MIN};
use hamlet_mind::brain::memory::{MemoryStore, Transition};
use hamlet_mind::brain::reward::raw_reward;
use hamlet_mind::brain::{
    DecisionSource, LearnedPolicy, Mind, PerceptionBuilder, PolicyCore, PolicyNetwork, RewardShaper,
    Snapshot,
};
use hamlet_mind::core::config::BrainConfig;
use hamlet_mind::core::types::{AgentId, ResourceKind, Vec2};
use hamlet_mind::entity::{Agent, EmotionalState, Goal, GoalType, Inventory, Survival, Traits};
use hamlet_mind::simulation::{SimConfig, Village};
use hamlet_mind::world::{AgentPresence, ResourceNode, Settlement, WorldSnapshot};

// ============================================================================
// Strategies
// ============================================================================

prop_compose! {
    fn arb_action()(idx in 0..ActionKind::COUNT) -> ActionKind {
        ActionKind::from_index(idx).unwrap()
    }
}

prop_compose! {
    fn arb_emotions()(
        happiness in 0.0f32..=1.0,
        stress in 0.0f32..=1.0,
        curiosity in 0.1f32..=0.9,
        social_drive in 0.0f32..=1.0,
    ) -> EmotionalState {
        EmotionalState { happiness, stress, curiosity, social_drive }
    }
}

prop_compose! {
    fn arb_snapshot()(
        needs in prop::array::uniform4(0.0f32..=1.0),
        time_of_day in 0.0f32..1.0,
        nearby_agents in 0u32..6,
        social_desire in 0.0f32..=1.0,
        nearby_food in 0u32..6,
        nearby_materials in 0u32..6,
        danger in 0.0f32..=1.0,
        emotions in arb_emotions(),
        ambient_light in 0.0f32..=1.0,
        is_night in any::<bool>(),
    ) -> Snapshot {
        Snapshot {
            hunger: needs[0],
            energy: needs[1],
            thirst: needs[2],
            warmth: needs[3],
            time_of_day,
            day_progress: time_of_day,
            nearby_agents,
            social_desire,
            nearby_food,
            nearby_materials,
            danger,
            emotions,
            ambient_light,
            is_night,
        }
    }
}

prop_compose! {
    fn arb_agent()(
        traits in prop::array::uniform4(0.0f32..=1.0),
        stock in prop::array::uniform4(0u32..30),
        seed in any::<u64>(),
    ) -> Agent {
        Agent::new(
            "Prop",
            Traits::new(traits[0], traits[1], traits[2], traits[3]),
            &BrainConfig::default(),
            seed,
        )
        .with_inventory(Inventory {
            food: stock[0],
            water: stock[1],
            wood: stock[2],
            materials: stock[3],
        })
    }
}

prop_compose! {
    fn arb_goals()(
        goals in prop::collection::vec((0usize..6, 0.0f32..=1.0), 0..6),
    ) -> Vec<Goal> {
        const TYPES: [GoalType; 6] = [
            GoalType::SecureShelter,
            GoalType::ReduceHunger,
            GoalType::QuenchThirst,
            GoalType::RecoverEnergy,
            GoalType::StayWarm,
            GoalType::FindCompany,
        ];
        goals.into_iter().map(|(t, priority)| Goal::new(TYPES[t], priority, 0)).collect()
    }
}

fn resource_kind(idx: usize) -> ResourceKind {
    ResourceKind::ALL[idx % ResourceKind::ALL.len()]
}

// ============================================================================
// Reward
// ============================================================================

proptest! {
    /// Shaped rewards are never near zero and always within [-1, 1]
    #[test]
    fn prop_reward_is_non_neutral(
        action in arb_action(),
        before in arb_snapshot(),
        after in arb_snapshot(),
        agent in arb_agent(),
    ) {
        let config = BrainConfig::default();
        let reward = RewardShaper::new(&config).reward(action, &before, &after, &agent);

        prop_assert!(reward.is_finite());
        prop_assert!((-1.0..=1.0).contains(&reward));
        prop_assert!(
            reward.abs() >= config.neutrality_threshold,
            "reward {} too close to zero",
            reward
        );

        let raw = raw_reward(action, &before, &after, &agent);
        if raw.abs() < config.neutrality_threshold {
            prop_assert!(reward.abs() >= 0.15 - 1e-6, "remapped reward {} below floor", reward);
        }
    }
}

// ============================================================================
// Hard overrides
// ============================================================================

/// Give `agent` goals and a ready learned policy, then select from `snapshot`
fn select_with_everything(
    mut agent: Agent,
    goals: Vec<Goal>,
    policy_seed: u64,
    snapshot: &Snapshot,
) -> (ActionKind, DecisionSource) {
    let config = BrainConfig::default();
    for goal in goals {
        agent.goals.add(goal);
    }
    let network = PolicyNetwork::new(config.policy_hidden_dim, policy_seed);
    agent.mind.attach_policy(LearnedPolicy::ready(Box::new(network)));

    let mut world = WorldSnapshot::new(0);
    world.agents.push(AgentPresence { id: agent.id, position: Vec2::new(100.0, 100.0) });
    let settlement = Settlement::new();
    let decision = PolicyCore::new(&world, &settlement, &config).select(&mut agent, snapshot, 0);
    (decision.action, decision.source)
}

proptest! {
    /// Critically low energy always rests or sleeps, whatever the goals and policy
    #[test]
    fn prop_exhaustion_overrides_everything(
        mut snapshot in arb_snapshot(),
        energy in 0.0f32..0.25,
        agent in arb_agent(),
        goals in arb_goals(),
        policy_seed in any::<u64>(),
    ) {
        snapshot.energy = energy;
        let (action, source) = select_with_everything(agent, goals, policy_seed, &snapshot);

        let expected = if snapshot.is_night { ActionKind::Sleep } else { ActionKind::Rest };
        prop_assert_eq!(action, expected);
        prop_assert_eq!(source, DecisionSource::Override);
    }

    /// Critical hunger always eats once energy is not critical
    #[test]
    fn prop_starvation_overrides_everything(
        mut snapshot in arb_snapshot(),
        hunger in 0.86f32..=1.0,
        energy in 0.25f32..=1.0,
        agent in arb_agent(),
        goals in arb_goals(),
        policy_seed in any::<u64>(),
    ) {
        snapshot.hunger = hunger;
        snapshot.energy = energy;
        let (action, source) = select_with_everything(agent, goals, policy_seed, &snapshot);

        prop_assert_eq!(action, ActionKind::Eat);
        prop_assert_eq!(source, DecisionSource::Override);
    }
}

// ============================================================================
// Memory
// ============================================================================

proptest! {
    /// Long-term memory never exceeds its capacity and consolidation empties short-term memory
    #[test]
    fn prop_memory_capacity(
        rewards in prop::collection::vec(-1.0f32..=1.0, 1..400),
        seed in any::<u64>(),
    ) {
        let config = BrainConfig::default();
        let mut store = MemoryStore::new(&config);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let agent = Agent::new("Mem", Traits::default(), &config, seed);
        let snapshot = Snapshot::context_free(&agent);

        for (i, reward) in rewards.iter().enumerate() {
            let transition = Transition {
                before: snapshot,
                action: ActionKind::from_index(i % ActionKind::COUNT).unwrap(),
                reward: *reward,
                after: snapshot,
                at: i as u64,
            };
            let overflow = store.push(transition);
            if overflow || reward.abs() > config.consolidation_reward_trigger {
                store.consolidate(&mut rng);
                let stats = store.stats();
                prop_assert_eq!(stats.short_term, 0);
                prop_assert!(stats.long_term <= config.long_term_capacity);
            }
            prop_assert!(store.stats().short_term <= config.short_term_capacity + 1);
        }

        for (action, weight) in store.derived_weights() {
            prop_assert!((0.5..=2.0).contains(&weight), "{:?} weight {}", action, weight);
        }
    }
}

// ============================================================================
// Adaptive schedule
// ============================================================================

proptest! {
    /// Ten strong successes never raise exploration; ten strong failures never lower it
    #[test]
    fn prop_exploration_monotone(
        start in EXPLORATION_MIN..=EXPLORATION_MAX,
        positive in prop::collection::vec(0.41f32..=1.0, 10),
        negative in prop::collection::vec(-1.0f32..=-0.41, 10),
    ) {
        let config = BrainConfig::default();

        let mut mind = Mind::new(&config, 1);
        mind.exploration_rate = start;
        for reward in &positive {
            let previous = mind.exploration_rate;
            adjust_rates(&mut mind, *reward, &config);
            let current = mind.exploration_rate;
            prop_assert!(
                current < previous || (current == previous && current <= 0.03 + 1e-6),
                "exploration went {} -> {} on reward {}", previous, current, reward
            );
        }

        let mut mind = Mind::new(&config, 1);
        mind.exploration_rate = start;
        for reward in &negative {
            let previous = mind.exploration_rate;
            adjust_rates(&mut mind, *reward, &config);
            let current = mind.exploration_rate;
            prop_assert!(
                current > previous || (current == previous && current >= 0.6 - 1e-6),
                "exploration went {} -> {} on reward {}", previous, current, reward
            );
        }
    }

    /// Rates stay inside their global bounds for any reward sequence
    #[test]
    fn prop_rates_bounded(rewards in prop::collection::vec(-1.0f32..=1.0, 1..300)) {
        let config = BrainConfig::default();
        let mut mind = Mind::new(&config, 2);
        for reward in rewards {
            mind.stats.record(reward);
            adjust_rates(&mut mind, reward, &config);
            prop_assert!((0.02..=0.8).contains(&mind.exploration_rate));
            prop_assert!((0.001..=0.08).contains(&mind.learning_rate));
        }
    }
}

// ============================================================================
// Perception
// ============================================================================

prop_compose! {
    /// World without the perceiving villager, plus where to place it
    fn arb_world()(
        position in (0.0f32..400.0, 0.0f32..400.0),
        others in prop::collection::vec((0.0f32..400.0, 0.0f32..400.0), 0..8),
        nodes in prop::collection::vec((0usize..4, 0.0f32..400.0, 0.0f32..400.0, 0u32..5), 0..12),
        game_time in prop::option::of(-2000.0f32..4000.0),
        ambient_light in prop::option::of(-1.0f32..2.0),
        clock_ms in 0u64..1_000_000,
    ) -> (WorldSnapshot, Vec2) {
        let mut world = WorldSnapshot::new(clock_ms);
        world.game_time = game_time;
        world.ambient_light = ambient_light;
        for (x, y) in others {
            world.agents.push(AgentPresence { id: AgentId::new(), position: Vec2::new(x, y) });
        }
        for (kind, x, y, amount) in nodes {
            world.resources.push(ResourceNode {
                kind: resource_kind(kind),
                position: Vec2::new(x, y),
                amount,
            });
        }
        (world, Vec2::new(position.0, position.1))
    }
}

fn place(agent: Agent, needs: [f32; 4], world: &mut WorldSnapshot, position: Vec2) -> Agent {
    let agent = agent.with_survival(Survival::new(needs[0], needs[1], needs[2], needs[3]));
    world.agents.push(AgentPresence { id: agent.id, position });
    agent
}

proptest! {
    /// Perceiving twice without mutation gives identical snapshots
    #[test]
    fn prop_snapshot_idempotent(
        agent in arb_agent(),
        needs in prop::array::uniform4(-20.0f32..120.0),
        (mut world, position) in arb_world(),
    ) {
        let config = BrainConfig::default();
        let agent = place(agent, needs, &mut world, position);
        let builder = PerceptionBuilder::new(&world, &config);

        let first = builder.build(&agent).unwrap();
        let second = builder.build(&agent).unwrap();

        let bits = |s: &Snapshot| s.features().map(f32::to_bits);
        prop_assert_eq!(bits(&first), bits(&second));
        prop_assert_eq!(first, second);
    }

    /// Every feature is finite and normalised
    #[test]
    fn prop_features_normalised(
        agent in arb_agent(),
        needs in prop::array::uniform4(-20.0f32..120.0),
        (mut world, position) in arb_world(),
    ) {
        let config = BrainConfig::default();
        let agent = place(agent, needs, &mut world, position);
        let snapshot = PerceptionBuilder::new(&world, &config).build(&agent).unwrap();
        for (i, value) in snapshot.features().iter().enumerate() {
            prop_assert!(
                value.is_finite() && (0.0..=1.0).contains(value),
                "feature {} = {}",
                i,
                value
            );
        }
    }
}

// ============================================================================
// Whole-village invariants
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// Affect, rates and needs stay in range on every tick of a real run
    #[test]
    fn prop_village_ranges(seed in any::<u64>(), rule_only in any::<bool>()) {
        let sim = SimConfig { agents: 6, seed, rule_only, ..SimConfig::default() };
        let mut village = Village::new(BrainConfig::default(), sim).unwrap();

        for _ in 0..150 {
            village.tick(500);
            for villager in village.villagers() {
                let agent = &villager.agent;
                let e = &agent.emotions;
                prop_assert!((0.0..=1.0).contains(&e.happiness));
                prop_assert!((0.0..=1.0).contains(&e.stress));
                prop_assert!((0.1..=0.9).contains(&e.curiosity));
                prop_assert!((0.0..=1.0).contains(&e.social_drive));

                prop_assert!((0.02..=0.8).contains(&agent.mind.exploration_rate));
                prop_assert!((0.001..=0.08).contains(&agent.mind.learning_rate));

                let s = &agent.survival;
                for need in [s.hunger, s.thirst, s.energy, s.warmth] {
                    prop_assert!((0.0..=100.0).contains(&need));
                }
                prop_assert!(agent.mind.memory.long_term().len() <= 100);
            }
        }
    }
}
