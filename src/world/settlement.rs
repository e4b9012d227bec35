//! Shared settlement structures: shelters and the village warehouse
//!
//! Each shelter runs its own lifecycle:
//! `Unclaimed -> GatheringMaterials -> Building { stage } -> Completed`.
//! Villagers reference shelters by ownership. Updates are small deltas
//! applied once per completed action, last writer wins.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, Millis, ResourceKind, ShelterId, Vec2};

/// Wood required before building can start
const REQUIRED_WOOD: u32 = 12;

/// Number of build stages
const BUILD_STAGES: u8 = 3;

/// Work (ms of a single builder) needed per stage
const STAGE_DURATION_MS: f32 = 16_000.0;

/// Builders beyond this add nothing
const MAX_BUILDERS: u32 = 4;

/// Villagers without a shelter under construction help one within this distance
const ASSIST_RADIUS: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShelterPhase {
    Unclaimed,
    GatheringMaterials { stacked: u32, required: u32 },
    Building { stage: u8, stages: u8 },
    Completed,
}

/// Result of applying build work to a shelter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildProgress {
    InProgress { stage: u8 },
    StageComplete { stage: u8 },
    Completed,
    /// Still gathering materials or already complete
    NotBuilding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shelter {
    pub id: ShelterId,
    pub position: Vec2,
    pub owner: Option<AgentId>,
    pub stacked_wood: u32,
    pub required_wood: u32,
    pub stage: u8,
    pub stages: u8,
    pub stage_progress_ms: f32,
    pub stage_duration_ms: f32,
    pub completed_at: Option<Millis>,
}

impl Shelter {
    pub fn new(id: ShelterId, position: Vec2) -> Self {
        Self {
            id,
            position,
            owner: None,
            stacked_wood: 0,
            required_wood: REQUIRED_WOOD,
            stage: 0,
            stages: BUILD_STAGES,
            stage_progress_ms: 0.0,
            stage_duration_ms: STAGE_DURATION_MS,
            completed_at: None,
        }
    }

    pub fn phase(&self) -> ShelterPhase {
        if self.completed_at.is_some() {
            ShelterPhase::Completed
        } else if self.owner.is_none() {
            ShelterPhase::Unclaimed
        } else if self.stacked_wood < self.required_wood {
            ShelterPhase::GatheringMaterials {
                stacked: self.stacked_wood,
                required: self.required_wood,
            }
        } else {
            ShelterPhase::Building {
                stage: self.stage,
                stages: self.stages,
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Claim an unowned plot; returns false when already owned
    pub fn claim(&mut self, agent: AgentId) -> bool {
        if self.owner.is_some() {
            return false;
        }
        self.owner = Some(agent);
        true
    }

    /// Stack delivered wood, returning how much was accepted
    pub fn deliver(&mut self, amount: u32) -> u32 {
        let missing = self.required_wood.saturating_sub(self.stacked_wood);
        let accepted = amount.min(missing);
        self.stacked_wood += accepted;
        accepted
    }

    /// Apply `elapsed_ms` of work by `builders` concurrent builders
    pub fn work(&mut self, elapsed_ms: Millis, builders: u32, now: Millis) -> BuildProgress {
        if !matches!(self.phase(), ShelterPhase::Building { .. }) {
            return BuildProgress::NotBuilding;
        }

        self.stage_progress_ms +=
            elapsed_ms as f32 * calculate_team_contribution(builders.max(1), MAX_BUILDERS);

        if self.stage_progress_ms < self.stage_duration_ms {
            return BuildProgress::InProgress { stage: self.stage };
        }

        self.stage_progress_ms -= self.stage_duration_ms;
        let finished = self.stage;
        self.stage += 1;
        if self.stage >= self.stages {
            self.stage_progress_ms = 0.0;
            self.completed_at = Some(now);
            tracing::info!("{} completed", self.id);
            BuildProgress::Completed
        } else {
            BuildProgress::StageComplete { stage: finished }
        }
    }
}

/// Team contribution with diminishing returns
///
/// Formula: sqrt(workers), capped at `max_workers`
/// - 1 builder = 1.0
/// - 2 builders = 1.41
/// - 4 builders = 2.0
pub fn calculate_team_contribution(worker_count: u32, max_workers: u32) -> f32 {
    let effective = worker_count.min(max_workers) as f32;
    effective.sqrt()
}

/// Shared stockpile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Warehouse {
    stock: AHashMap<ResourceKind, u32>,
}

impl Warehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ResourceKind) -> u32 {
        self.stock.get(&kind).copied().unwrap_or(0)
    }

    /// Apply a signed delta, saturating at zero; returns the new amount
    pub fn apply_delta(&mut self, kind: ResourceKind, delta: i64) -> u32 {
        let current = self.get(kind) as i64;
        let updated = (current + delta).clamp(0, u32::MAX as i64) as u32;
        self.stock.insert(kind, updated);
        updated
    }
}

/// Read-only settlement interface for the decision core
pub trait SettlementView {
    /// Phase of the shelter owned by `agent`, `None` if it owns none
    fn shelter_phase(&self, agent: AgentId) -> Option<ShelterPhase>;

    /// How long `agent` has been without a completed shelter
    fn homeless_for_ms(&self, agent: AgentId, now: Millis) -> Millis;

    /// Fraction of villagers owning a completed shelter
    fn completion_ratio(&self) -> f32;

    fn has_completed_shelter(&self, agent: AgentId) -> bool {
        matches!(self.shelter_phase(agent), Some(ShelterPhase::Completed))
    }
}

/// Concrete settlement used by the harness
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settlement {
    pub shelters: Vec<Shelter>,
    pub warehouse: Warehouse,
    homeless_since: AHashMap<AgentId, Millis>,
    next_id: u32,
}

impl Settlement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a villager for homelessness and the completion ratio
    pub fn register_villager(&mut self, agent: AgentId, now: Millis) {
        self.homeless_since.entry(agent).or_insert(now);
    }

    pub fn population(&self) -> usize {
        self.homeless_since.len()
    }

    pub fn add_plot(&mut self, position: Vec2) -> ShelterId {
        let id = ShelterId(self.next_id);
        self.next_id += 1;
        self.shelters.push(Shelter::new(id, position));
        id
    }

    pub fn shelter(&self, id: ShelterId) -> Option<&Shelter> {
        self.shelters.iter().find(|s| s.id == id)
    }

    pub fn shelter_of(&self, agent: AgentId) -> Option<&Shelter> {
        self.shelters.iter().find(|s| s.owner == Some(agent))
    }

    pub fn shelter_of_mut(&mut self, agent: AgentId) -> Option<&mut Shelter> {
        self.shelters.iter_mut().find(|s| s.owner == Some(agent))
    }

    /// Claim a free plot for `agent`, founding a new one at `position` if none is free
    pub fn claim_plot(&mut self, agent: AgentId, position: Vec2) -> ShelterId {
        if let Some(shelter) = self.shelter_of(agent) {
            return shelter.id;
        }
        let free = self.shelters.iter().position(|s| s.owner.is_none());
        let idx = match free {
            Some(idx) => idx,
            None => {
                self.add_plot(position);
                self.shelters.len() - 1
            }
        };
        self.shelters[idx].claim(agent);
        tracing::debug!("{} claimed {}", agent, self.shelters[idx].id);
        self.shelters[idx].id
    }

    /// Deliver wood to the agent's shelter (claiming one first); returns accepted wood
    pub fn deliver_wood(&mut self, agent: AgentId, amount: u32, position: Vec2) -> u32 {
        self.claim_plot(agent, position);
        self.shelter_of_mut(agent)
            .map(|s| s.deliver(amount))
            .unwrap_or(0)
    }

    /// Shelter `agent` would work on when building from `position`
    ///
    /// Its own shelter while under construction, otherwise the closest
    /// shelter under construction within reach.
    pub fn build_site(&self, agent: AgentId, position: Vec2) -> Option<ShelterId> {
        let building = |s: &&Shelter| matches!(s.phase(), ShelterPhase::Building { .. });
        if let Some(own) = self.shelter_of(agent).filter(building) {
            return Some(own.id);
        }
        self.shelters
            .iter()
            .filter(building)
            .map(|s| (s.position.distance(&position), s.id))
            .filter(|(distance, _)| *distance <= ASSIST_RADIUS)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, id)| id)
    }

    /// Apply build work to one shelter; `builders` counts everyone working on it
    pub fn build(
        &mut self,
        shelter: ShelterId,
        elapsed_ms: Millis,
        builders: u32,
        now: Millis,
    ) -> BuildProgress {
        match self.shelters.iter_mut().find(|s| s.id == shelter) {
            Some(shelter) => shelter.work(elapsed_ms, builders, now),
            None => BuildProgress::NotBuilding,
        }
    }
}

impl SettlementView for Settlement {
    fn shelter_phase(&self, agent: AgentId) -> Option<ShelterPhase> {
        self.shelter_of(agent).map(Shelter::phase)
    }

    fn homeless_for_ms(&self, agent: AgentId, now: Millis) -> Millis {
        if self.has_completed_shelter(agent) {
            return 0;
        }
        self.homeless_since
            .get(&agent)
            .map(|since| now.saturating_sub(*since))
            .unwrap_or(0)
    }

    fn completion_ratio(&self) -> f32 {
        if self.homeless_since.is_empty() {
            return 0.0;
        }
        let housed = self
            .homeless_since
            .keys()
            .filter(|agent| self.has_completed_shelter(**agent))
            .count();
        housed as f32 / self.homeless_since.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_contribution_diminishing_returns() {
        assert!((calculate_team_contribution(1, 4) - 1.0).abs() < 0.01);
        assert!((calculate_team_contribution(2, 4) - 1.414).abs() < 0.01);
        assert!((calculate_team_contribution(4, 4) - 2.0).abs() < 0.01);
        assert!(
            (calculate_team_contribution(10, 4) - calculate_team_contribution(4, 4)).abs() < 0.01
        );
    }

    #[test]
    fn test_shelter_lifecycle() {
        let agent = AgentId::new();
        let mut shelter = Shelter::new(ShelterId(0), Vec2::default());
        assert_eq!(shelter.phase(), ShelterPhase::Unclaimed);

        assert!(shelter.claim(agent));
        assert!(!shelter.claim(AgentId::new()));
        assert_eq!(
            shelter.phase(),
            ShelterPhase::GatheringMaterials { stacked: 0, required: REQUIRED_WOOD }
        );

        assert_eq!(shelter.work(1_000, 1, 0), BuildProgress::NotBuilding);
        assert_eq!(shelter.deliver(REQUIRED_WOOD + 5), REQUIRED_WOOD);
        assert_eq!(shelter.phase(), ShelterPhase::Building { stage: 0, stages: BUILD_STAGES });

        let mut now = 0;
        let mut result = BuildProgress::NotBuilding;
        for _ in 0..100 {
            now += 4_000;
            result = shelter.work(4_000, 1, now);
            if result == BuildProgress::Completed {
                break;
            }
        }
        assert_eq!(result, BuildProgress::Completed);
        assert_eq!(shelter.phase(), ShelterPhase::Completed);
        assert_eq!(shelter.work(1_000, 1, now), BuildProgress::NotBuilding);
    }

    #[test]
    fn test_more_builders_finish_sooner() {
        let build_time = |builders: u32| {
            let mut shelter = Shelter::new(ShelterId(0), Vec2::default());
            shelter.claim(AgentId::new());
            shelter.deliver(REQUIRED_WOOD);
            let mut steps = 0;
            while shelter.work(1_000, builders, steps) != BuildProgress::Completed {
                steps += 1;
            }
            steps
        };
        assert!(build_time(4) < build_time(1));
        assert_eq!(build_time(8), build_time(4));
    }

    #[test]
    fn test_warehouse_saturates_at_zero() {
        let mut warehouse = Warehouse::new();
        assert_eq!(warehouse.apply_delta(ResourceKind::Wood, 5), 5);
        assert_eq!(warehouse.apply_delta(ResourceKind::Wood, -8), 0);
    }

    #[test]
    fn test_settlement_homelessness_and_ratio() {
        let mut settlement = Settlement::new();
        let a = AgentId::new();
        let b = AgentId::new();
        settlement.register_villager(a, 0);
        settlement.register_villager(b, 0);

        assert_eq!(settlement.shelter_phase(a), None);
        assert_eq!(settlement.homeless_for_ms(a, 5_000), 5_000);
        assert_eq!(settlement.completion_ratio(), 0.0);

        settlement.deliver_wood(a, REQUIRED_WOOD, Vec2::default());
        let site = settlement.build_site(a, Vec2::default()).unwrap();
        let mut now = 0;
        while settlement.build(site, 10_000, 1, now) != BuildProgress::Completed {
            now += 10_000;
        }

        assert!(settlement.has_completed_shelter(a));
        assert_eq!(settlement.homeless_for_ms(a, now + 1), 0);
        assert!((settlement.completion_ratio() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_claim_reuses_free_plot() {
        let mut settlement = Settlement::new();
        let plot = settlement.add_plot(Vec2::new(5.0, 5.0));
        let agent = AgentId::new();
        assert_eq!(settlement.claim_plot(agent, Vec2::default()), plot);
        assert_eq!(settlement.claim_plot(agent, Vec2::default()), plot);
        assert_eq!(settlement.shelters.len(), 1);
    }

    #[test]
    fn test_stage_overshoot_carries_over() {
        let mut shelter = Shelter::new(ShelterId(0), Vec2::default());
        shelter.claim(AgentId::new());
        shelter.deliver(REQUIRED_WOOD);

        assert_eq!(shelter.work(10_000, 1, 0), BuildProgress::InProgress { stage: 0 });
        assert_eq!(shelter.work(10_000, 1, 0), BuildProgress::StageComplete { stage: 0 });
        assert_eq!(shelter.stage_progress_ms, 4_000.0);

        // 48 s of single-builder work in total completes all three stages
        assert_eq!(shelter.work(16_000, 1, 0), BuildProgress::StageComplete { stage: 1 });
        assert_eq!(shelter.work(12_000, 1, 5), BuildProgress::Completed);
        assert_eq!(shelter.completed_at, Some(5));
    }

    #[test]
    fn test_build_site_prefers_own_then_nearby() {
        let mut settlement = Settlement::new();
        let owner = AgentId::new();
        let helper = AgentId::new();
        settlement.deliver_wood(owner, REQUIRED_WOOD, Vec2::new(10.0, 10.0));
        let site = settlement.shelter_of(owner).unwrap().id;

        assert_eq!(settlement.build_site(owner, Vec2::new(300.0, 300.0)), Some(site));
        assert_eq!(settlement.build_site(helper, Vec2::new(40.0, 10.0)), Some(site));
        assert_eq!(settlement.build_site(helper, Vec2::new(300.0, 300.0)), None);

        // A helper still gathering for its own plot helps the neighbour
        settlement.deliver_wood(helper, 2, Vec2::new(20.0, 10.0));
        assert_eq!(settlement.build_site(helper, Vec2::new(20.0, 10.0)), Some(site));
    }

    #[test]
    fn test_build_unknown_shelter_is_not_building() {
        let mut settlement = Settlement::new();
        assert_eq!(settlement.build(ShelterId(9), 1_000, 1, 0), BuildProgress::NotBuilding);
    }
}
