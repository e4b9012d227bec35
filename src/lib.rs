//! Hamlet Mind - decision-and-learning engine for simulated villagers

pub mod actions;
pub mod brain;
pub mod core;
pub mod entity;
pub mod simulation;
pub mod world;
