//! Priority-weighted rule evaluation
//!
//! Builds a list of weighted candidates from needs, personality, company,
//! shelter progress and settlement development, then picks the single
//! highest-priority candidate. Ties go to the earlier candidate.

use ahash::AHashMap;
use rand::Rng;
use serde::Serialize;

use crate::actions::catalog::ActionKind;
use crate::brain::perception::Snapshot;
use crate::core::config::BrainConfig;
use crate::core::types::{AgentId, Millis, ResourceKind};
use crate::entity::agent::{Inventory, Traits};
use crate::world::settlement::{SettlementView, ShelterPhase};

// Candidate priorities; critical needs always outrank everything else
const PRIORITY_CRITICAL_HUNGER: f32 = 100.0;
const PRIORITY_CRITICAL_THIRST: f32 = 95.0;
const PRIORITY_CRITICAL_ENERGY: f32 = 90.0;
const PRIORITY_CRITICAL_COLD: f32 = 85.0;
const PRIORITY_SHELTER: f32 = 50.0;
const PRIORITY_SHELTER_MAX_BOOST: f32 = 30.0;
const PRIORITY_SOCIAL: f32 = 40.0;
const PRIORITY_INDUSTRIOUS: f32 = 35.0;
const PRIORITY_CURIOUS: f32 = 30.0;
const PRIORITY_SEEK_COMPANY: f32 = 25.0;
const PRIORITY_ADVANCED: f32 = 22.0;
const PRIORITY_PURPOSEFUL: f32 = 20.0;
const PRIORITY_GROUP: f32 = 18.0;
const PRIORITY_STUDY: f32 = 15.0;

/// Homelessness (ms) that earns one extra point of shelter priority
const HOMELESS_MS_PER_POINT: f32 = 20_000.0;

/// Everything the rule evaluator reads
pub struct RuleContext<'a> {
    pub agent_id: AgentId,
    pub traits: &'a Traits,
    pub inventory: &'a Inventory,
    pub snapshot: &'a Snapshot,
    pub settlement: &'a dyn SettlementView,
    /// Per-action multipliers derived from long-term memory
    pub weights: &'a AHashMap<ActionKind, f32>,
    pub now: Millis,
    pub config: &'a BrainConfig,
}

impl RuleContext<'_> {
    fn weight(&self, action: ActionKind) -> f32 {
        self.weights.get(&action).copied().unwrap_or(1.0)
    }
}

/// One weighted suggestion
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate {
    pub action: ActionKind,
    pub priority: f32,
    pub reason: &'static str,
}

impl Candidate {
    fn new(action: ActionKind, priority: f32, reason: &'static str) -> Self {
        Self { action, priority, reason }
    }
}

/// Result of one evaluation
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub action: ActionKind,
    /// Winning candidate, `None` when the fallback was used
    pub winner: Option<Candidate>,
    pub candidate_count: usize,
}

/// Evaluate every rule family and pick the winner
pub fn evaluate_rules<R: Rng + ?Sized>(ctx: &RuleContext, rng: &mut R) -> RuleOutcome {
    let candidates = collect_candidates(ctx, rng);
    let winner = select_highest(&candidates);
    let action = winner.map(|c| c.action).unwrap_or(ctx.config.fallback_action);

    RuleOutcome {
        action,
        winner,
        candidate_count: candidates.len(),
    }
}

/// Highest priority wins; the first of equal priorities is kept
pub fn select_highest(candidates: &[Candidate]) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for candidate in candidates {
        match best {
            Some(b) if candidate.priority <= b.priority => {}
            _ => best = Some(*candidate),
        }
    }
    best
}

/// Build the candidate list in evaluation order
pub fn collect_candidates<R: Rng + ?Sized>(ctx: &RuleContext, rng: &mut R) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    critical_needs(ctx, &mut candidates);
    personality_triggers(ctx, rng, &mut candidates);
    social_triggers(ctx, rng, &mut candidates);
    shelter_candidates(ctx, &mut candidates);
    purposeful_activities(ctx, rng, &mut candidates);
    advanced_development(ctx, rng, &mut candidates);
    candidates
}

fn critical_needs(ctx: &RuleContext, out: &mut Vec<Candidate>) {
    let s = ctx.snapshot;
    let config = ctx.config;

    if s.hunger > config.critical_hunger {
        let action = if ctx.inventory.food > 0 { ActionKind::Eat } else { ActionKind::GatherFood };
        let priority = PRIORITY_CRITICAL_HUNGER * ctx.weight(action);
        out.push(Candidate::new(action, priority, "critical hunger"));
    }

    if s.thirst > config.critical_thirst {
        let action = if ctx.inventory.water > 0 {
            ActionKind::Drink
        } else {
            ActionKind::GatherWater
        };
        let priority = PRIORITY_CRITICAL_THIRST * ctx.weight(action);
        out.push(Candidate::new(action, priority, "critical thirst"));
    }

    if s.energy < config.critical_energy {
        let action = if s.is_night { ActionKind::Sleep } else { ActionKind::Rest };
        let priority = PRIORITY_CRITICAL_ENERGY * ctx.weight(action);
        out.push(Candidate::new(action, priority, "critical fatigue"));
    }

    if s.warmth < config.critical_warmth {
        out.push(Candidate::new(
            ActionKind::WarmUp,
            PRIORITY_CRITICAL_COLD * ctx.weight(ActionKind::WarmUp),
            "critical cold",
        ));
    }
}

fn personality_triggers<R: Rng + ?Sized>(ctx: &RuleContext, rng: &mut R, out: &mut Vec<Candidate>) {
    let traits = ctx.traits;

    if rng.gen::<f32>() < traits.industriousness * 0.15 {
        let action = if ctx.inventory.is_saturated(ResourceKind::Wood) {
            ActionKind::GatherMaterials
        } else {
            ActionKind::GatherWood
        };
        out.push(Candidate::new(action, PRIORITY_INDUSTRIOUS * ctx.weight(action), "industrious"));
    }

    if rng.gen::<f32>() < traits.curiosity * 0.1 {
        out.push(Candidate::new(
            ActionKind::Explore,
            PRIORITY_CURIOUS * ctx.weight(ActionKind::Explore),
            "curious",
        ));
    }

    // Brave villagers wander further, even at night
    if ctx.snapshot.is_night && rng.gen::<f32>() < traits.courage * 0.05 {
        out.push(Candidate::new(
            ActionKind::Explore,
            PRIORITY_CURIOUS * ctx.weight(ActionKind::Explore),
            "night venture",
        ));
    }
}

fn social_triggers<R: Rng + ?Sized>(ctx: &RuleContext, rng: &mut R, out: &mut Vec<Candidate>) {
    let s = ctx.snapshot;

    if s.nearby_agents > 0 {
        if rng.gen::<f32>() < s.social_desire * 0.2 {
            out.push(Candidate::new(
                ActionKind::Socialize,
                PRIORITY_SOCIAL * ctx.weight(ActionKind::Socialize),
                "social desire",
            ));
        }
    } else if s.social_desire > 0.6 {
        out.push(Candidate::new(
            ActionKind::Explore,
            PRIORITY_SEEK_COMPANY * ctx.weight(ActionKind::Explore),
            "seeking company",
        ));
    }
}

/// Next step toward a finished shelter, `None` once it is complete
pub fn shelter_action(
    phase: Option<ShelterPhase>,
    inventory: &Inventory,
    config: &BrainConfig,
) -> Option<ActionKind> {
    match phase {
        Some(ShelterPhase::Completed) => None,
        Some(ShelterPhase::Building { .. }) => Some(ActionKind::Build),
        Some(ShelterPhase::GatheringMaterials { stacked, required }) => {
            let missing = required.saturating_sub(stacked);
            let enough = inventory.wood >= missing || inventory.wood >= config.wood_carry_threshold;
            if inventory.wood > 0 && enough {
                Some(ActionKind::DeliverWood)
            } else {
                Some(ActionKind::GatherWood)
            }
        }
        Some(ShelterPhase::Unclaimed) | None => {
            if inventory.wood >= config.wood_carry_threshold {
                Some(ActionKind::DeliverWood)
            } else {
                Some(ActionKind::GatherWood)
            }
        }
    }
}

/// Shelter priority grows with how long the villager has been homeless
pub fn homelessness_boost(homeless_ms: Millis) -> f32 {
    (homeless_ms as f32 / HOMELESS_MS_PER_POINT).min(PRIORITY_SHELTER_MAX_BOOST)
}

fn shelter_candidates(ctx: &RuleContext, out: &mut Vec<Candidate>) {
    let phase = ctx.settlement.shelter_phase(ctx.agent_id);
    let Some(action) = shelter_action(phase, ctx.inventory, ctx.config) else {
        return;
    };

    let boost = homelessness_boost(ctx.settlement.homeless_for_ms(ctx.agent_id, ctx.now));
    let reason = match action {
        ActionKind::Build => "shelter: build",
        ActionKind::DeliverWood => "shelter: deliver wood",
        _ => "shelter: gather wood",
    };
    out.push(Candidate::new(action, (PRIORITY_SHELTER + boost) * ctx.weight(action), reason));
}

fn purposeful_activities<R: Rng + ?Sized>(
    ctx: &RuleContext,
    rng: &mut R,
    out: &mut Vec<Candidate>,
) {
    let s = ctx.snapshot;

    if ctx.inventory.food < 5 && rng.gen::<f32>() < 0.3 {
        out.push(Candidate::new(ActionKind::GatherFood, PRIORITY_PURPOSEFUL, "stock food"));
    }

    if ctx.inventory.water < 5 && rng.gen::<f32>() < 0.2 {
        out.push(Candidate::new(ActionKind::GatherWater, PRIORITY_PURPOSEFUL, "stock water"));
    }

    if s.nearby_agents >= 2 && rng.gen::<f32>() < 0.1 {
        out.push(Candidate::new(ActionKind::Socialize, PRIORITY_GROUP, "group gathering"));
    }

    if !s.is_night && rng.gen::<f32>() < s.emotions.curiosity * 0.1 {
        out.push(Candidate::new(ActionKind::Learn, PRIORITY_STUDY, "study"));
    }
}

fn advanced_development<R: Rng + ?Sized>(ctx: &RuleContext, rng: &mut R, out: &mut Vec<Candidate>) {
    if ctx.settlement.completion_ratio() < ctx.config.advanced_development_ratio {
        return;
    }

    if !ctx.inventory.is_saturated(ResourceKind::Materials) && rng.gen::<f32>() < 0.2 {
        out.push(Candidate::new(
            ActionKind::GatherMaterials,
            PRIORITY_ADVANCED * ctx.weight(ActionKind::GatherMaterials),
            "settlement development",
        ));
    }

    if ctx.inventory.materials >= 3 && rng.gen::<f32>() < 0.15 {
        out.push(Candidate::new(
            ActionKind::Craft,
            PRIORITY_ADVANCED * ctx.weight(ActionKind::Craft),
            "crafting",
        ));
    }
}
