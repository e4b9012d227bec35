//! Villager state shared between the world and the brain

use serde::{Deserialize, Serialize};

use crate::brain::mind::Mind;
use crate::core::config::BrainConfig;
use crate::core::types::{AgentId, ResourceKind};
use crate::entity::goals::GoalList;
use crate::entity::needs::Survival;

/// Stable personality, each trait in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traits {
    pub courage: f32,
    pub curiosity: f32,
    pub industriousness: f32,
    pub sociability: f32,
}

impl Default for Traits {
    fn default() -> Self {
        Self {
            courage: 0.5,
            curiosity: 0.5,
            industriousness: 0.5,
            sociability: 0.5,
        }
    }
}

impl Traits {
    pub fn new(courage: f32, curiosity: f32, industriousness: f32, sociability: f32) -> Self {
        Self {
            courage: courage.clamp(0.0, 1.0),
            curiosity: curiosity.clamp(0.0, 1.0),
            industriousness: industriousness.clamp(0.0, 1.0),
            sociability: sociability.clamp(0.0, 1.0),
        }
    }
}

/// Carried resource counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub food: u32,
    pub water: u32,
    pub wood: u32,
    pub materials: u32,
}

impl Inventory {
    pub fn get(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Water => self.water,
            ResourceKind::Wood => self.wood,
            ResourceKind::Materials => self.materials,
        }
    }

    fn slot_mut(&mut self, kind: ResourceKind) -> &mut u32 {
        match kind {
            ResourceKind::Food => &mut self.food,
            ResourceKind::Water => &mut self.water,
            ResourceKind::Wood => &mut self.wood,
            ResourceKind::Materials => &mut self.materials,
        }
    }

    pub fn add(&mut self, kind: ResourceKind, amount: u32) {
        let slot = self.slot_mut(kind);
        *slot = slot.saturating_add(amount);
    }

    /// Remove up to `amount`, returning how much was actually taken
    pub fn take(&mut self, kind: ResourceKind, amount: u32) -> u32 {
        let slot = self.slot_mut(kind);
        let taken = amount.min(*slot);
        *slot -= taken;
        taken
    }

    pub fn is_saturated(&self, kind: ResourceKind) -> bool {
        self.get(kind) >= kind.saturation()
    }
}

/// Affect scalars, mutated only by the emotional state model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionalState {
    /// [0, 1]
    pub happiness: f32,
    /// [0, 1]
    pub stress: f32,
    /// [0.1, 0.9]
    pub curiosity: f32,
    /// [0, 1]
    pub social_drive: f32,
}

impl Default for EmotionalState {
    fn default() -> Self {
        Self {
            happiness: 0.5,
            stress: 0.2,
            curiosity: 0.5,
            social_drive: 0.5,
        }
    }
}

/// A villager: identity, body, belongings, feelings, goals and private mind
#[derive(Debug)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub traits: Traits,
    pub survival: Survival,
    pub inventory: Inventory,
    pub emotions: EmotionalState,
    pub goals: GoalList,
    pub mind: Mind,
}

impl Agent {
    /// Create a rule-only villager; attach a learned policy through `mind`
    pub fn new(name: impl Into<String>, traits: Traits, config: &BrainConfig, seed: u64) -> Self {
        Self {
            id: AgentId::new(),
            name: name.into(),
            traits,
            survival: Survival::default(),
            inventory: Inventory::default(),
            emotions: EmotionalState::default(),
            goals: GoalList::new(),
            mind: Mind::new(config, seed),
        }
    }

    pub fn with_survival(mut self, survival: Survival) -> Self {
        self.survival = survival;
        self
    }

    pub fn with_inventory(mut self, inventory: Inventory) -> Self {
        self.inventory = inventory;
        self
    }
}
