//! Survival scalars that drive villager behavior

use serde::{Deserialize, Serialize};

/// Upper bound of every survival scalar
pub const NEED_MAX: f32 = 100.0;

/// Survival scalars, each in [0, 100]
///
/// Hunger and thirst grow toward 100 (starving / parched); energy and warmth
/// shrink toward 0 (exhausted / freezing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survival {
    pub hunger: f32,
    pub thirst: f32,
    pub energy: f32,
    pub warmth: f32,
}

impl Default for Survival {
    fn default() -> Self {
        Self {
            hunger: 20.0,
            thirst: 20.0,
            energy: 80.0,
            warmth: 70.0,
        }
    }
}

/// Per-second drift of the survival scalars
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayRates {
    pub hunger_per_sec: f32,
    pub thirst_per_sec: f32,
    pub energy_per_sec: f32,
    /// Warmth lost per second at night (regained slowly during the day)
    pub warmth_per_sec: f32,
    /// Multiplier while the villager is doing physical work
    pub activity_multiplier: f32,
}

impl Default for DecayRates {
    fn default() -> Self {
        Self {
            hunger_per_sec: 0.25,
            thirst_per_sec: 0.35,
            energy_per_sec: 0.2,
            warmth_per_sec: 0.3,
            activity_multiplier: 1.5,
        }
    }
}

impl Survival {
    pub fn new(hunger: f32, thirst: f32, energy: f32, warmth: f32) -> Self {
        let mut survival = Self { hunger, thirst, energy, warmth };
        survival.clamp();
        survival
    }

    pub fn hunger_norm(&self) -> f32 {
        self.hunger / NEED_MAX
    }

    pub fn thirst_norm(&self) -> f32 {
        self.thirst / NEED_MAX
    }

    pub fn energy_norm(&self) -> f32 {
        self.energy / NEED_MAX
    }

    pub fn warmth_norm(&self) -> f32 {
        self.warmth / NEED_MAX
    }

    /// Drift needs over `dt_ms` of simulation time
    pub fn decay(&mut self, dt_ms: u64, rates: &DecayRates, is_active: bool, is_night: bool) {
        let dt = dt_ms as f32 / 1000.0;
        let activity_mult = if is_active { rates.activity_multiplier } else { 1.0 };

        self.hunger += rates.hunger_per_sec * dt;
        self.thirst += rates.thirst_per_sec * dt;
        self.energy -= rates.energy_per_sec * dt * activity_mult;

        if is_night {
            self.warmth -= rates.warmth_per_sec * dt;
        } else {
            self.warmth += rates.warmth_per_sec * 0.5 * dt;
        }

        self.clamp();
    }

    /// Apply signed deltas and keep every scalar in range
    pub fn adjust(&mut self, hunger: f32, thirst: f32, energy: f32, warmth: f32) {
        self.hunger += hunger;
        self.thirst += thirst;
        self.energy += energy;
        self.warmth += warmth;
        self.clamp();
    }

    fn clamp(&mut self) {
        self.hunger = clamp_need(self.hunger);
        self.thirst = clamp_need(self.thirst);
        self.energy = clamp_need(self.energy);
        self.warmth = clamp_need(self.warmth);
    }
}

fn clamp_need(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, NEED_MAX)
    } else {
        NEED_MAX / 2.0
    }
}
