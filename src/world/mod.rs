//! World-facing interfaces: what the brain reads and the shared structures it reasons about

pub mod settlement;
pub mod view;

pub use settlement::{BuildProgress, Settlement, SettlementView, Shelter, ShelterPhase, Warehouse};
pub use view::{ActionExecutor, AgentPresence, ResourceNode, WorldSnapshot, WorldView};
