//! Core type definitions used throughout the codebase

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for villagers
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display(fmt = "agent-{}", _0)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for goals
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display(fmt = "goal-{}", _0)]
pub struct GoalId(pub Uuid);

impl GoalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GoalId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for shelters and other shared structures
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display(fmt = "shelter-{}", _0)]
pub struct ShelterId(pub u32);

/// Simulation clock in milliseconds
pub type Millis = u64;

/// Kinds of resources villagers gather, carry and stockpile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Food,
    Water,
    Wood,
    Materials,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Food,
        ResourceKind::Water,
        ResourceKind::Wood,
        ResourceKind::Materials,
    ];

    /// Carried amount above which more gathering counts as hoarding
    pub fn saturation(&self) -> u32 {
        match self {
            ResourceKind::Food => 10,
            ResourceKind::Water => 10,
            ResourceKind::Wood => 20,
            ResourceKind::Materials => 15,
        }
    }
}

/// 2D position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self { x: self.x * rhs, y: self.y * rhs }
    }
}

/// Replace non-finite values with a default, then clamp into range
pub fn finite_clamp(value: f32, default: f32, min: f32, max: f32) -> f32 {
    let value = if value.is_finite() { value } else { default };
    value.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_equality() {
        let a = AgentId::new();
        let b = a;
        assert_eq!(a, b);
        assert_ne!(a, AgentId::new());
    }

    #[test]
    fn test_agent_id_display() {
        let id = AgentId(Uuid::nil());
        assert!(id.to_string().starts_with("agent-"));
    }

    #[test]
    fn test_vec2_distance() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_finite_clamp_replaces_nan() {
        assert_eq!(finite_clamp(f32::NAN, 0.8, 0.0, 1.0), 0.8);
        assert_eq!(finite_clamp(f32::INFINITY, 0.5, 0.0, 1.0), 0.5);
        assert_eq!(finite_clamp(2.0, 0.5, 0.0, 1.0), 1.0);
        assert_eq!(finite_clamp(-1.0, 0.5, 0.0, 1.0), 0.0);
    }
}
