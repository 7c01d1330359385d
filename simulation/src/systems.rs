//! ECS Systems - the tick pipeline stages
//!
//! Run order (see `Simulation::tick`): cleanup, regeneration, extraction,
//! RPS games, mortality, travel completion, room switching, balance.

pub mod balance;
pub mod cleanup;
pub mod combat;
pub mod mortality;
pub mod resources;
pub mod travel;

pub use balance::{population_balance_system, BalanceEvent};
pub use cleanup::death_cleanup_system;
pub use combat::{rps_game_system, CombatOutcome};
pub use mortality::{mortality_system, MortalityOutcome};
pub use resources::{resource_extraction_system, resource_regeneration_system, ExtractionOutcome};
pub use travel::{room_switch_system, travel_completion_system};
