//! Two-tier transition memory
//!
//! Short-term memory is a bounded FIFO of recent transitions. Consolidation
//! promotes the significant ones (plus a random sample of the rest) into
//! long-term memory, which keeps only the largest |reward| entries.

use std::collections::VecDeque;

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::actions::catalog::ActionKind;
use crate::brain::perception::Snapshot;
use crate::core::config::BrainConfig;
use crate::core::types::Millis;

/// Rule weights never leave this band
const WEIGHT_MIN: f32 = 0.5;
const WEIGHT_MAX: f32 = 2.0;
const WEIGHT_STEP: f32 = 0.1;

/// One learning event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub before: Snapshot,
    pub action: ActionKind,
    pub reward: f32,
    pub after: Snapshot,
    pub at: Millis,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub short_term: usize,
    pub long_term: usize,
    pub consolidations: u64,
    /// Mean reward of long-term entries, 0 when empty
    pub mean_long_term_reward: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStore {
    short_term: VecDeque<Transition>,
    long_term: Vec<Transition>,
    short_term_capacity: usize,
    long_term_capacity: usize,
    significance_threshold: f32,
    random_promotion_rate: f64,
    consolidations: u64,
}

impl MemoryStore {
    pub fn new(config: &BrainConfig) -> Self {
        Self {
            short_term: VecDeque::with_capacity(config.short_term_capacity),
            long_term: Vec::with_capacity(config.long_term_capacity),
            short_term_capacity: config.short_term_capacity,
            long_term_capacity: config.long_term_capacity,
            significance_threshold: config.significance_threshold,
            random_promotion_rate: config.random_promotion_rate,
            consolidations: 0,
        }
    }

    pub fn short_term(&self) -> impl Iterator<Item = &Transition> {
        self.short_term.iter()
    }

    pub fn long_term(&self) -> &[Transition] {
        &self.long_term
    }

    /// Append a transition; returns true when short-term memory is over capacity
    pub fn push(&mut self, transition: Transition) -> bool {
        self.short_term.push_back(transition);
        self.short_term.len() > self.short_term_capacity
    }

    /// Move short-term memories into long-term memory
    ///
    /// Returns the number of promoted transitions. Short-term memory is
    /// always empty afterwards.
    pub fn consolidate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let mut promoted = 0;
        for transition in self.short_term.drain(..) {
            let significant = transition.reward.abs() > self.significance_threshold;
            if significant || rng.gen_bool(self.random_promotion_rate.clamp(0.0, 1.0)) {
                self.long_term.push(transition);
                promoted += 1;
            }
        }

        // Largest |reward| first; stable sort keeps insertion order among equals
        self.long_term
            .sort_by_key(|t| std::cmp::Reverse(OrderedFloat(t.reward.abs())));
        self.long_term.truncate(self.long_term_capacity);
        self.consolidations += 1;

        tracing::trace!(promoted, long_term = self.long_term.len(), "memory consolidated");
        promoted
    }

    /// Per-action rule multipliers learned from long-term memory
    ///
    /// Each action starts at 1.0; every strongly rewarded memory adds 0.1
    /// (up to 2.0) and every strongly punished one removes 0.1 (down to 0.5).
    pub fn derived_weights(&self) -> AHashMap<ActionKind, f32> {
        let mut weights: AHashMap<ActionKind, f32> = AHashMap::new();
        for transition in &self.long_term {
            let weight = weights.entry(transition.action).or_insert(1.0);
            if transition.reward > self.significance_threshold {
                *weight = (*weight + WEIGHT_STEP).min(WEIGHT_MAX);
            } else if transition.reward < -self.significance_threshold {
                *weight = (*weight - WEIGHT_STEP).max(WEIGHT_MIN);
            }
        }
        weights
    }

    pub fn stats(&self) -> MemoryStats {
        let mean_long_term_reward = if self.long_term.is_empty() {
            0.0
        } else {
            self.long_term.iter().map(|t| t.reward).sum::<f32>() / self.long_term.len() as f32
        };
        MemoryStats {
            short_term: self.short_term.len(),
            long_term: self.long_term.len(),
            consolidations: self.consolidations,
            mean_long_term_reward,
        }
    }
}
