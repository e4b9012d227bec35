pub mod agent;
pub mod goals;
pub mod needs;

pub use agent::{Agent, EmotionalState, Inventory, Traits};
pub use goals::{Goal, GoalList, GoalStatus, GoalType};
pub use needs::{DecayRates, Survival};
