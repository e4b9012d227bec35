//! Brain configuration with documented constants
//!
//! All magic numbers of the decision-and-learning core are collected here with
//! explanations of their purpose and how they interact with each other.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::actions::catalog::ActionKind;
use crate::core::error::{BrainError, Result};

/// Configuration for the villager brain
///
/// These values have been tuned so villagers survive on the rule path alone
/// while still leaving room for the learned policy to matter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    // === PERCEPTION ===
    /// Radius (world units) for counting nearby villagers
    pub agent_radius: f32,

    /// Radius (world units) for counting nearby food and material nodes
    ///
    /// Larger than `agent_radius` because villagers walk further for
    /// resources than they do for company.
    pub resource_radius: f32,

    /// Ambient light assumed when the world does not report one
    pub default_ambient_light: f32,

    /// Game time (minutes since midnight) assumed when the world does not report one
    ///
    /// 480 = 08:00, a daytime value so a missing clock never forces night behaviour.
    pub default_game_time: f32,

    /// Length of one in-game day in minutes
    pub minutes_per_day: f32,

    /// Minute of day when night begins
    pub night_start_minute: f32,

    /// Minute of day when night ends
    pub night_end_minute: f32,

    // === HARD OVERRIDES ===
    /// Normalised energy below which rest/sleep overrides everything
    pub rest_override_energy: f32,

    /// Normalised hunger above which eating overrides everything
    pub eat_override_hunger: f32,

    // === RULE EVALUATOR ===
    /// Normalised hunger above which the rule evaluator adds a critical eat candidate
    pub critical_hunger: f32,

    /// Normalised energy below which the rule evaluator adds a critical rest candidate
    pub critical_energy: f32,

    /// Normalised thirst above which the rule evaluator adds a critical drink candidate
    pub critical_thirst: f32,

    /// Normalised warmth below which the rule evaluator adds a critical warm-up candidate
    pub critical_warmth: f32,

    /// Settlement-wide shelter completion ratio unlocking post-housing development
    pub advanced_development_ratio: f32,

    /// Action returned when no rule candidate fires
    pub fallback_action: ActionKind,

    /// Wood a villager carries before walking it to its shelter
    pub wood_carry_threshold: u32,

    // === RATE LIMITING ===
    /// Minimum interval between two decisions of the same villager
    ///
    /// Requests inside the interval return the cached decision.
    pub min_decision_interval_ms: u64,

    /// Number of rule-evaluator decisions kept for debugging
    pub decision_log_capacity: usize,

    // === LEARNING ===
    /// Whether villagers get a learned policy at all
    pub learned_policy_enabled: bool,

    /// Hidden layer width of the policy network
    pub policy_hidden_dim: usize,

    /// Exploration rate a fresh villager starts with
    pub initial_exploration_rate: f32,

    /// Learning rate a fresh villager starts with
    pub initial_learning_rate: f32,

    /// Decisions after which exploration anneals on every learning event
    pub annealing_after_decisions: u64,

    /// Reward magnitude that triggers an immediate consolidation
    pub consolidation_reward_trigger: f32,

    // === MEMORY ===
    /// Short-term transition buffer capacity
    pub short_term_capacity: usize,

    /// Long-term memory capacity (lowest |reward| evicted first)
    pub long_term_capacity: usize,

    /// |reward| above which a transition is always promoted to long-term memory
    pub significance_threshold: f32,

    /// Fraction of insignificant transitions promoted anyway
    pub random_promotion_rate: f64,

    // === REWARD ===
    /// |reward| below which the non-neutrality floor remaps the value
    pub neutrality_threshold: f32,

    /// Apply the non-neutrality floor (disable for reward analysis)
    pub enforce_non_neutrality: bool,

    // === GOALS ===
    /// Open goals older than this are garbage-collected
    pub goal_ttl_ms: u64,

    /// Minimum priority for the top goal to short-circuit the policy
    ///
    /// Lower-priority goals still exist (and show in stats) but leave the
    /// choice to the learned path and rule evaluator.
    pub goal_short_circuit_priority: f32,

    // === PARALLELIZATION ===
    /// Minimum villager count before the harness decides in parallel
    ///
    /// Below this threshold, thread overhead exceeds benefits.
    pub parallel_threshold: usize,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            agent_radius: 100.0,
            resource_radius: 150.0,
            default_ambient_light: 0.8,
            default_game_time: 480.0,
            minutes_per_day: 1440.0,
            night_start_minute: 1200.0,
            night_end_minute: 360.0,

            rest_override_energy: 0.25,
            eat_override_hunger: 0.85,

            critical_hunger: 0.7,
            critical_energy: 0.3,
            critical_thirst: 0.7,
            critical_warmth: 0.3,
            advanced_development_ratio: 0.75,
            fallback_action: ActionKind::GatherFood,
            wood_carry_threshold: 5,

            min_decision_interval_ms: 150,
            decision_log_capacity: 20,

            learned_policy_enabled: true,
            policy_hidden_dim: 24,
            initial_exploration_rate: 0.3,
            initial_learning_rate: 0.02,
            annealing_after_decisions: 100,
            consolidation_reward_trigger: 0.5,

            short_term_capacity: 50,
            long_term_capacity: 100,
            significance_threshold: 0.3,
            random_promotion_rate: 0.1,

            neutrality_threshold: 0.1,
            enforce_non_neutrality: true,

            goal_ttl_ms: 120_000,
            goal_short_circuit_priority: 0.6,

            parallel_threshold: 64,
        }
    }
}

impl BrainConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: BrainConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.agent_radius <= 0.0 || self.resource_radius <= 0.0 {
            return Err(BrainError::InvalidConfig("perception radii must be positive".into()));
        }

        if self.critical_hunger >= self.eat_override_hunger {
            return Err(BrainError::InvalidConfig(format!(
                "critical_hunger ({}) should be < eat_override_hunger ({})",
                self.critical_hunger, self.eat_override_hunger
            )));
        }

        if self.rest_override_energy >= self.critical_energy {
            return Err(BrainError::InvalidConfig(format!(
                "rest_override_energy ({}) should be < critical_energy ({})",
                self.rest_override_energy, self.critical_energy
            )));
        }

        if !(0.02..=0.8).contains(&self.initial_exploration_rate) {
            return Err(BrainError::InvalidConfig(format!(
                "initial_exploration_rate ({}) outside [0.02, 0.8]",
                self.initial_exploration_rate
            )));
        }

        if !(0.001..=0.08).contains(&self.initial_learning_rate) {
            return Err(BrainError::InvalidConfig(format!(
                "initial_learning_rate ({}) outside [0.001, 0.08]",
                self.initial_learning_rate
            )));
        }

        if self.short_term_capacity == 0 || self.long_term_capacity == 0 {
            return Err(BrainError::InvalidConfig("memory capacities must be non-zero".into()));
        }

        if self.minutes_per_day <= 0.0 || self.policy_hidden_dim == 0 {
            return Err(BrainError::InvalidConfig(
                "minutes_per_day and policy_hidden_dim must be positive".into(),
            ));
        }

        Ok(())
    }
}
