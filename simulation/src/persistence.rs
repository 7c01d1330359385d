//! Persistence module for export/import of simulation state
//!
//! `Simulation::export_state` serializes the whole run (world, registry, RNG
//! state and rules) to JSON; `import_state` restores it so the run continues
//! exactly where it left off. Recorded snapshot streams are archived as JSON
//! or bincode.

use chrono::{DateTime, Utc};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::components::*;
use crate::config::SimulationConfig;
use crate::driver::Simulation;
use crate::error::{Result, SimError};
use crate::lineage::{LineageId, LineageNode, LineageRegistry};
use crate::snapshot::Snapshot;
use crate::topology::validate_rooms;
use crate::world::SimulationWorld;

pub const EXPORT_VERSION: u8 = 1;

// ============================================================================
// Export Data Structures
// ============================================================================

/// Complete run state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    pub version: u8,
    pub saved_at: DateTime<Utc>,
    pub tick: u64,
    pub config: SimulationConfig,
    pub rng: ChaCha8Rng,
    pub next_person_id: u64,
    pub rooms: Vec<Room>,
    pub lineages: Vec<LineageNode>,
    pub people: Vec<ExportedPerson>,
}

/// Single agent with its optional components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedPerson {
    pub id: PersonId,
    pub kind: RpsType,
    pub room: RoomId,
    pub lineage: Option<LineageId>,
    pub travel: Option<Travel>,
    pub death: Option<DeathMarker>,
}

/// Result of import operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResult {
    pub tick: u64,
    pub population: usize,
    pub travelers: usize,
    pub lineages: usize,
}

// ============================================================================
// Export / Import
// ============================================================================

impl Simulation {
    fn export_data(&self) -> ExportData {
        let mut people: Vec<ExportedPerson> = self
            .world
            .world
            .query::<(&Person, Option<&Lineage>, Option<&Travel>, Option<&DeathMarker>)>()
            .iter()
            .map(|(_, (person, lineage, travel, death))| ExportedPerson {
                id: person.id,
                kind: person.kind,
                room: person.room,
                lineage: lineage.map(|l| l.0),
                travel: travel.copied(),
                death: death.copied(),
            })
            .collect();
        people.sort_unstable_by_key(|p| p.id);

        ExportData {
            version: EXPORT_VERSION,
            saved_at: Utc::now(),
            tick: self.tick,
            config: self.config.clone(),
            rng: self.rng.clone(),
            next_person_id: self.world.next_person_id,
            rooms: self.world.rooms.clone(),
            lineages: self.lineages.nodes().to_vec(),
            people,
        }
    }

    /// Serialize the full run state to JSON. Only valid between ticks.
    pub fn export_state(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.export_data())?)
    }

    /// Rebuild a run from `export_state` output.
    pub fn import_state(json: &str) -> Result<(Self, ImportResult)> {
        let data: ExportData = serde_json::from_str(json)?;

        if data.version != EXPORT_VERSION {
            return Err(SimError::Persistence(format!(
                "unsupported export version: {}",
                data.version
            )));
        }
        data.config.rules.validate()?;
        validate_rooms(&data.rooms)?;

        let lineages = LineageRegistry::from_nodes(data.lineages)?;
        let mut world = SimulationWorld::new(data.rooms);
        world.next_person_id = data.next_person_id;

        let mut travelers = 0;
        let mut seen = HashSet::new();
        for person in &data.people {
            world.room(person.room)?;
            if person.id.0 >= data.next_person_id {
                return Err(SimError::Persistence(format!(
                    "person id {} not below next id {}",
                    person.id.0, data.next_person_id
                )));
            }
            if !seen.insert(person.id) {
                return Err(SimError::Persistence(format!(
                    "person id {} appears twice",
                    person.id.0
                )));
            }

            let entity = world.world.spawn((Person {
                id: person.id,
                kind: person.kind,
                room: person.room,
            },));

            if let Some(lineage) = person.lineage {
                if !lineages.contains(lineage) {
                    return Err(SimError::InvalidLineage(lineage));
                }
                let _ = world.world.insert_one(entity, Lineage(lineage));
            }
            if let Some(travel) = person.travel {
                world.room(travel.to)?;
                let _ = world.world.insert_one(entity, travel);
                travelers += 1;
            }
            if let Some(death) = person.death {
                let _ = world.world.insert_one(entity, death);
            }
        }

        let result = ImportResult {
            tick: data.tick,
            population: world.living_count(),
            travelers,
            lineages: lineages.len(),
        };
        info!(
            "Imported state saved {}: tick {}, {} living agents, {} lineage nodes",
            data.saved_at, result.tick, result.population, result.lineages
        );

        let sim = Simulation::assemble(world, lineages, data.rng, data.config, data.tick);
        Ok((sim, result))
    }
}

// ============================================================================
// Snapshot archives
// ============================================================================

/// Outcome of writing a snapshot archive
#[derive(Debug, Clone)]
pub struct SaveStats {
    pub path: PathBuf,
    pub snapshots: usize,
    pub bytes: u64,
    pub saved_at: DateTime<Utc>,
}

fn finish_save(path: &Path, snapshots: usize) -> Result<SaveStats> {
    let stats = SaveStats {
        path: path.to_path_buf(),
        snapshots,
        bytes: fs::metadata(path)?.len(),
        saved_at: Utc::now(),
    };
    info!(
        "Saved {} snapshots to {} ({} bytes)",
        stats.snapshots,
        stats.path.display(),
        stats.bytes
    );
    Ok(stats)
}

pub fn save_states_json(path: impl AsRef<Path>, states: &[Snapshot]) -> Result<SaveStats> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, states)?;
    writer.flush()?;
    finish_save(path, states.len())
}

pub fn load_states_json(path: impl AsRef<Path>) -> Result<Vec<Snapshot>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn save_states_bincode(path: impl AsRef<Path>, states: &[Snapshot]) -> Result<SaveStats> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, states)?;
    writer.flush()?;
    finish_save(path, states.len())
}

pub fn load_states_bincode(path: impl AsRef<Path>) -> Result<Vec<Snapshot>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}
