//! Action definitions and catalog

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::types::{Millis, ResourceKind};

/// Closed set of actions a villager can take
///
/// The declaration order is the slot order of the policy network output and
/// must not change without retraining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Eat,
    Drink,
    Rest,
    Sleep,
    WarmUp,
    GatherFood,
    GatherWater,
    GatherWood,
    GatherMaterials,
    DeliverWood,
    Build,
    Craft,
    Socialize,
    Explore,
    Learn,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionCategory {
    Survival,
    Work,
    Social,
    Exploration,
    Idle,
}

impl ActionKind {
    pub const COUNT: usize = 16;

    pub const ALL: [ActionKind; ActionKind::COUNT] = [
        ActionKind::Eat,
        ActionKind::Drink,
        ActionKind::Rest,
        ActionKind::Sleep,
        ActionKind::WarmUp,
        ActionKind::GatherFood,
        ActionKind::GatherWater,
        ActionKind::GatherWood,
        ActionKind::GatherMaterials,
        ActionKind::DeliverWood,
        ActionKind::Build,
        ActionKind::Craft,
        ActionKind::Socialize,
        ActionKind::Explore,
        ActionKind::Learn,
        ActionKind::Idle,
    ];

    /// Output slot of this action in the policy network
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<ActionKind> {
        Self::ALL.get(index).copied()
    }

    /// Wire label handed to the world executor and UI
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Eat => "eat",
            ActionKind::Drink => "drink",
            ActionKind::Rest => "rest",
            ActionKind::Sleep => "sleep",
            ActionKind::WarmUp => "warm_up",
            ActionKind::GatherFood => "gather_food",
            ActionKind::GatherWater => "gather_water",
            ActionKind::GatherWood => "gather_wood",
            ActionKind::GatherMaterials => "gather_materials",
            ActionKind::DeliverWood => "deliver_wood",
            ActionKind::Build => "build",
            ActionKind::Craft => "craft",
            ActionKind::Socialize => "socialize",
            ActionKind::Explore => "explore",
            ActionKind::Learn => "learn",
            ActionKind::Idle => "idle",
        }
    }

    pub fn category(&self) -> ActionCategory {
        match self {
            ActionKind::Eat
            | ActionKind::Drink
            | ActionKind::Rest
            | ActionKind::Sleep
            | ActionKind::WarmUp => ActionCategory::Survival,
            ActionKind::GatherFood
            | ActionKind::GatherWater
            | ActionKind::GatherWood
            | ActionKind::GatherMaterials
            | ActionKind::DeliverWood
            | ActionKind::Build
            | ActionKind::Craft => ActionCategory::Work,
            ActionKind::Socialize => ActionCategory::Social,
            ActionKind::Explore | ActionKind::Learn => ActionCategory::Exploration,
            ActionKind::Idle => ActionCategory::Idle,
        }
    }

    /// Resource this action adds to the villager's inventory
    pub fn gathers(&self) -> Option<ResourceKind> {
        match self {
            ActionKind::GatherFood => Some(ResourceKind::Food),
            ActionKind::GatherWater => Some(ResourceKind::Water),
            ActionKind::GatherWood => Some(ResourceKind::Wood),
            ActionKind::GatherMaterials => Some(ResourceKind::Materials),
            _ => None,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, ActionKind::Rest | ActionKind::Sleep)
    }

    /// Time the world executor needs to carry the action out
    pub fn base_duration_ms(&self) -> Millis {
        match self {
            ActionKind::Eat | ActionKind::Drink => 2_000,
            ActionKind::Rest => 6_000,
            ActionKind::Sleep => 20_000,
            ActionKind::WarmUp => 5_000,
            ActionKind::GatherFood
            | ActionKind::GatherWater
            | ActionKind::GatherWood
            | ActionKind::GatherMaterials => 4_000,
            ActionKind::DeliverWood => 3_000,
            ActionKind::Build => 8_000,
            ActionKind::Craft => 7_000,
            ActionKind::Socialize => 5_000,
            ActionKind::Explore => 6_000,
            ActionKind::Learn => 6_000,
            ActionKind::Idle => 1_000,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .iter()
            .find(|action| action.label() == s)
            .copied()
            .ok_or_else(|| format!("unknown action label: {}", s))
    }
}
