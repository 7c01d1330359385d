//! Immutable view of the simulation taken between ticks
//!
//! Everything reporting needs: rooms with their agents, agents on the road,
//! and the full lineage forest. Owned data only, so a snapshot can outlive
//! the world it came from and be serialized as-is.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::components::*;
use crate::lineage::{LineageId, LineageNode, LineageRegistry};
use crate::world::SimulationWorld;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: PersonId,
    pub kind: RpsType,
    pub room: RoomId,
    pub lineage: Option<LineageId>,
    pub travel: Option<Travel>,
    pub death: Option<DeathCause>,
}

impl AgentSnapshot {
    pub fn is_alive(&self) -> bool {
        self.death.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub parent: Option<RoomId>,
    pub depth: u32,
    pub capacity: u32,
    pub resources: u32,
    pub starvation_streak: u32,
    /// Residents, death-marked ones included, ordered by id.
    pub agents: Vec<AgentSnapshot>,
}

impl RoomSnapshot {
    /// Residents not marked for death.
    pub fn living(&self) -> impl Iterator<Item = &AgentSnapshot> + '_ {
        self.agents.iter().filter(|a| a.is_alive())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineagePopulation {
    /// `None` groups agents that never split.
    pub lineage: Option<LineageId>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub rooms: Vec<RoomSnapshot>,
    pub travelers: Vec<AgentSnapshot>,
    pub lineages: Vec<LineageNode>,
    /// Living agents per resolved type, Rock/Paper/Scissors order.
    pub type_totals: [usize; 3],
    /// Living agents per lineage, ordered by lineage id (`None` first).
    pub lineage_populations: Vec<LineagePopulation>,
}

impl Snapshot {
    pub fn capture(world: &SimulationWorld, registry: &LineageRegistry, tick: u64) -> Self {
        let mut rooms: Vec<RoomSnapshot> = world
            .rooms
            .iter()
            .map(|room| RoomSnapshot {
                id: room.id,
                parent: room.parent,
                depth: room.depth,
                capacity: room.capacity,
                resources: room.resources,
                starvation_streak: room.starvation_streak,
                agents: Vec::new(),
            })
            .collect();
        let mut travelers = Vec::new();
        let mut type_totals = [0; 3];
        let mut by_lineage: BTreeMap<Option<LineageId>, usize> = BTreeMap::new();

        let mut query = world
            .world
            .query::<(&Person, Option<&Lineage>, Option<&Travel>, Option<&DeathMarker>)>();
        for (_, (person, lineage, travel, death)) in query.iter() {
            let agent = AgentSnapshot {
                id: person.id,
                kind: person.kind,
                room: person.room,
                lineage: lineage.map(|l| l.0),
                travel: travel.copied(),
                death: death.map(|d| d.cause),
            };
            if agent.is_alive() {
                type_totals[agent.kind.index()] += 1;
                *by_lineage.entry(agent.lineage).or_default() += 1;
            }
            if agent.travel.is_some() {
                travelers.push(agent);
            } else if let Some(room) = rooms.get_mut(agent.room.index()) {
                room.agents.push(agent);
            }
        }

        for room in &mut rooms {
            room.agents.sort_unstable_by_key(|a| a.id);
        }
        travelers.sort_unstable_by_key(|a| a.id);

        Self {
            tick,
            rooms,
            travelers,
            lineages: registry.nodes().to_vec(),
            type_totals,
            lineage_populations: by_lineage
                .into_iter()
                .map(|(lineage, count)| LineagePopulation { lineage, count })
                .collect(),
        }
    }

    pub fn living_total(&self) -> usize {
        self.type_totals.iter().sum()
    }

    /// Every agent in the snapshot, residents first.
    pub fn agents(&self) -> impl Iterator<Item = &AgentSnapshot> + '_ {
        self.rooms.iter().flat_map(|r| r.agents.iter()).chain(self.travelers.iter())
    }

    pub fn lineage(&self, id: LineageId) -> Option<&LineageNode> {
        self.lineages.get(id.0 as usize)
    }

    /// Ancestry of `id` rebuilt from the snapshot's forest alone.
    pub fn lineage_path(&self, id: LineageId) -> Option<Vec<RpsType>> {
        let mut node = self.lineage(id)?;
        let mut path = vec![node.resolved()];
        while let Some(parent) = node.parent {
            node = self.lineage(parent)?;
            path.push(node.resolved());
        }
        path.reverse();
        Some(path)
    }
}
