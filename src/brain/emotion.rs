//! Emotional state dynamics
//!
//! Applied once per decision, in a fixed order so runs replay exactly:
//! happiness, night/day branch, stress, loneliness, curiosity.

use crate::brain::perception::Snapshot;
use crate::entity::agent::{Agent, EmotionalState};

/// Weight of the previous value in the exponential smoothing
const SMOOTHING: f32 = 0.9;

const CURIOSITY_MIN: f32 = 0.1;
const CURIOSITY_MAX: f32 = 0.9;

/// Sociability above which being alone raises stress
const LONELINESS_SOCIABILITY: f32 = 0.6;
const LONELINESS_STRESS: f32 = 0.02;

/// Update `agent.emotions` from a fresh snapshot
pub fn update_emotions(snapshot: &Snapshot, agent: &mut Agent, is_night: bool) {
    let success_rate = agent.mind.stats.success_rate();
    let sociability = agent.traits.sociability;
    apply(&mut agent.emotions, snapshot, sociability, success_rate, is_night);
}

fn apply(
    emotions: &mut EmotionalState,
    snapshot: &Snapshot,
    sociability: f32,
    success_rate: f32,
    is_night: bool,
) {
    // Smooth toward instantaneous satisfaction
    let satisfaction = (1.0 - snapshot.hunger) * snapshot.energy;
    emotions.happiness =
        clamp_unit(SMOOTHING * emotions.happiness + (1.0 - SMOOTHING) * satisfaction);

    if is_night {
        emotions.stress = clamp_unit(emotions.stress * 1.1);
        emotions.curiosity = clamp_curiosity(emotions.curiosity * 0.95);
    } else {
        emotions.curiosity = clamp_curiosity(emotions.curiosity * 1.02);
    }

    let pressure = (snapshot.hunger + (1.0 - snapshot.energy) + snapshot.danger) / 3.0;
    emotions.stress = clamp_unit(SMOOTHING * emotions.stress + (1.0 - SMOOTHING) * pressure);

    if snapshot.nearby_agents == 0 && sociability > LONELINESS_SOCIABILITY {
        emotions.stress = (emotions.stress + LONELINESS_STRESS).min(1.0);
    }

    emotions.curiosity = clamp_curiosity(emotions.curiosity + (success_rate - 0.5) * 0.01);

    emotions.social_drive =
        clamp_unit(SMOOTHING * emotions.social_drive + (1.0 - SMOOTHING) * snapshot.social_desire);
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

fn clamp_curiosity(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(CURIOSITY_MIN, CURIOSITY_MAX)
    } else {
        0.5
    }
}
