//! Per-villager goal list
//!
//! Goals are created by the goal selector when a need crosses its threshold,
//! marked done when the need resolves, and pruned once done or stale.

use serde::{Deserialize, Serialize};

use crate::core::types::{GoalId, Millis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalType {
    SecureShelter,
    ReduceHunger,
    QuenchThirst,
    RecoverEnergy,
    StayWarm,
    FindCompany,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalStatus {
    Open,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub goal_type: GoalType,
    /// Priority 0.0-1.0 (higher = more important)
    pub priority: f32,
    pub created_at: Millis,
    pub status: GoalStatus,
}

impl Goal {
    pub fn new(goal_type: GoalType, priority: f32, now: Millis) -> Self {
        Self {
            id: GoalId::new(),
            goal_type,
            priority: priority.clamp(0.0, 1.0),
            created_at: now,
            status: GoalStatus::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == GoalStatus::Open
    }
}

/// Priority-ordered goals, at most one per type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalList {
    goals: Vec<Goal>,
}

impl GoalList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Goal> {
        self.goals.iter()
    }

    pub fn get(&self, goal_type: GoalType) -> Option<&Goal> {
        self.goals.iter().find(|g| g.goal_type == goal_type)
    }

    pub fn has_open(&self, goal_type: GoalType) -> bool {
        self.get(goal_type).is_some_and(Goal::is_open)
    }

    /// Add a goal unless one of that type already exists; returns whether it was added
    pub fn add(&mut self, goal: Goal) -> bool {
        if self.get(goal.goal_type).is_some() {
            return false;
        }
        let pos = self
            .goals
            .iter()
            .position(|g| goal.priority > g.priority)
            .unwrap_or(self.goals.len());
        self.goals.insert(pos, goal);
        true
    }

    /// Raise or lower the priority of an open goal, keeping the list ordered
    pub fn reprioritize(&mut self, goal_type: GoalType, priority: f32) {
        if let Some(goal) = self.goals.iter_mut().find(|g| g.goal_type == goal_type) {
            goal.priority = priority.clamp(0.0, 1.0);
        }
        self.goals
            .sort_by(|a, b| b.priority.total_cmp(&a.priority));
    }

    pub fn mark_done(&mut self, goal_type: GoalType) {
        if let Some(goal) = self.goals.iter_mut().find(|g| g.goal_type == goal_type) {
            goal.status = GoalStatus::Done;
        }
    }

    /// Drop goals that are done or older than `ttl_ms`
    pub fn prune(&mut self, now: Millis, ttl_ms: Millis) -> usize {
        let before = self.goals.len();
        self.goals
            .retain(|g| g.is_open() && now.saturating_sub(g.created_at) <= ttl_ms);
        before - self.goals.len()
    }

    /// Highest-priority open goal
    pub fn top_open(&self) -> Option<&Goal> {
        self.goals.iter().find(|g| g.is_open())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_goal_per_type() {
        let mut goals = GoalList::new();
        assert!(goals.add(Goal::new(GoalType::ReduceHunger, 0.5, 0)));
        assert!(!goals.add(Goal::new(GoalType::ReduceHunger, 0.9, 10)));
        assert_eq!(goals.len(), 1);
    }

    #[test]
    fn test_ordered_by_priority() {
        let mut goals = GoalList::new();
        goals.add(Goal::new(GoalType::FindCompany, 0.2, 0));
        goals.add(Goal::new(GoalType::SecureShelter, 0.8, 0));
        goals.add(Goal::new(GoalType::QuenchThirst, 0.5, 0));
        let order: Vec<_> = goals.iter().map(|g| g.goal_type).collect();
        assert_eq!(
            order,
            vec![GoalType::SecureShelter, GoalType::QuenchThirst, GoalType::FindCompany]
        );
    }

    #[test]
    fn test_reprioritize_reorders() {
        let mut goals = GoalList::new();
        goals.add(Goal::new(GoalType::FindCompany, 0.2, 0));
        goals.add(Goal::new(GoalType::SecureShelter, 0.8, 0));
        goals.reprioritize(GoalType::FindCompany, 0.95);
        assert_eq!(goals.top_open().unwrap().goal_type, GoalType::FindCompany);
    }

    #[test]
    fn test_done_goals_skipped_and_pruned() {
        let mut goals = GoalList::new();
        goals.add(Goal::new(GoalType::SecureShelter, 0.8, 0));
        goals.add(Goal::new(GoalType::QuenchThirst, 0.5, 0));
        goals.mark_done(GoalType::SecureShelter);

        assert_eq!(goals.top_open().unwrap().goal_type, GoalType::QuenchThirst);
        assert_eq!(goals.prune(1, 1_000), 1);
        assert_eq!(goals.len(), 1);
    }

    #[test]
    fn test_stale_goals_pruned() {
        let mut goals = GoalList::new();
        goals.add(Goal::new(GoalType::StayWarm, 0.6, 0));
        assert_eq!(goals.prune(500, 1_000), 0);
        assert_eq!(goals.prune(1_001, 1_000), 1);
        assert!(goals.is_empty());
    }
}
