//! RPS Lineage Simulation Engine
//!
//! Rock/Paper/Scissors agents compete, reproduce, starve and migrate across a
//! tree of rooms. Whenever one type dominates, part of it is converted to the
//! other two and every conversion is recorded in a lineage forest.

pub mod components;
pub mod config;
pub mod driver;
pub mod error;
pub mod lineage;
pub mod persistence;
pub mod report;
pub mod snapshot;
pub mod stats;
pub mod systems;
pub mod topology;
pub mod world;

#[cfg(test)]
mod testing;

pub use components::*;
pub use config::{ExtractionRule, PopulationConfig, Rules, SimulationConfig, Topology, WorldConfig};
pub use driver::{run_batch, RunSummary, Simulation, SnapshotRecorder, SnapshotSink, StatsLogger, StopHandle, TickResult};
pub use error::{Result, SimError};
pub use lineage::{LineageId, LineageNode, LineageRegistry};
pub use persistence::{ExportData, ImportResult, SaveStats};
pub use snapshot::Snapshot;
pub use stats::Statistics;
pub use world::SimulationWorld;
