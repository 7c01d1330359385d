//! Population statistics derived from a snapshot

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::components::{RoomId, RpsType};
use crate::lineage::LineageId;
use crate::snapshot::{LineagePopulation, Snapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomStats {
    pub id: RoomId,
    pub depth: u32,
    pub capacity: u32,
    pub resources: u32,
    pub total: usize,
    pub by_type: [usize; 3],
}

impl RoomStats {
    pub fn is_full(&self) -> bool {
        self.total >= self.capacity as usize
    }

    pub fn is_nearly_full(&self) -> bool {
        !self.is_full() && self.total as f64 > self.capacity as f64 * 0.8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub tick: u64,
    pub total: usize,
    pub by_type: [usize; 3],
    pub by_lineage: Vec<LineagePopulation>,
    pub rooms: Vec<RoomStats>,
    /// Split nodes ever created.
    pub all_lineages: usize,
    /// Sum of split depth over every split node.
    pub all_changes: u64,
    /// Split nodes with at least one living member.
    pub surviving_lineages: usize,
    pub surviving_changes: u64,
}

impl Statistics {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let rooms = snapshot
            .rooms
            .iter()
            .map(|room| {
                let mut by_type = [0; 3];
                for agent in room.living() {
                    by_type[agent.kind.index()] += 1;
                }
                RoomStats {
                    id: room.id,
                    depth: room.depth,
                    capacity: room.capacity,
                    resources: room.resources,
                    total: by_type.iter().sum(),
                    by_type,
                }
            })
            .collect();

        let by_lineage = snapshot.lineage_populations.clone();

        let splits = snapshot.lineages.iter().filter(|n| !n.is_root());
        let all_lineages = splits.clone().count();
        let all_changes = splits.map(|n| n.generation as u64).sum();

        let surviving: Vec<_> = by_lineage
            .iter()
            .filter(|p| p.count > 0)
            .filter_map(|p| p.lineage.and_then(|id| snapshot.lineage(id)))
            .filter(|node| !node.is_root())
            .collect();

        Self {
            tick: snapshot.tick,
            total: snapshot.living_total(),
            by_type: snapshot.type_totals,
            by_lineage,
            rooms,
            all_lineages,
            all_changes,
            surviving_lineages: surviving.len(),
            surviving_changes: surviving.iter().map(|n| n.generation as u64).sum(),
        }
    }

    /// Living agents attached to `lineage` (`None` for agents that never split).
    pub fn lineage_count(&self, lineage: Option<LineageId>) -> usize {
        self.by_lineage
            .iter()
            .find(|p| p.lineage == lineage)
            .map_or(0, |p| p.count)
    }

    pub fn share(&self, kind: RpsType) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.by_type[kind.index()] as f64 / self.total as f64
        }
    }

    /// Emit the periodic statistics block through tracing.
    pub fn log(&self) {
        info!("Tick {:3} | Total: {} agents", self.tick, self.total);
        for kind in RpsType::ALL {
            let pct = self.share(kind) * 100.0;
            let bar = "#".repeat((pct / 5.0) as usize);
            info!(
                "  {:9}: {:3} ({:5.1}%) {}",
                kind.as_str(),
                self.by_type[kind.index()],
                pct,
                bar
            );
        }
        info!(
            "  Lineages: {} created ({} changes), {} surviving ({} changes)",
            self.all_lineages, self.all_changes, self.surviving_lineages, self.surviving_changes
        );
        for room in &self.rooms {
            let flag = if room.is_full() {
                " [FULL]"
            } else if room.is_nearly_full() {
                " [~FULL]"
            } else {
                ""
            };
            info!(
                "  Room {:2} (d{}): {:2}/{:2} (R:{:2} P:{:2} S:{:2}) resources {:2}{}",
                room.id.0,
                room.depth,
                room.total,
                room.capacity,
                room.by_type[0],
                room.by_type[1],
                room.by_type[2],
                room.resources,
                flag
            );
        }
    }
}
