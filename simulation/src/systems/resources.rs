//! Resource Systems
//!
//! Regeneration refills each room's pool; extraction turns resources into new
//! agents when eligible pairs share a room. Extraction also maintains the
//! starvation streak, since its end is the low point of the pool each tick.

use hecs::Entity;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::{RoomId, RpsType};
use crate::config::{ExtractionRule, Rules};
use crate::lineage::LineageId;
use crate::world::SimulationWorld;

/// Add `base (regen_min..=regen_max) + min(population / k, cap)` to every
/// room, clamped at the room's resource cap. Returns the total added.
pub fn resource_regeneration_system(
    world: &mut SimulationWorld,
    rules: &Rules,
    rng: &mut impl Rng,
) -> u32 {
    let populations = world.room_populations();
    let mut total = 0;

    for (room, population) in world.rooms.iter_mut().zip(populations) {
        let base = rng.gen_range(rules.regen_min..=rules.regen_max);
        let bonus = (population as u32 / rules.population_bonus_divisor).min(rules.population_bonus_cap);
        let cap = rules.resource_cap(room.capacity);

        // Pools seeded above the cap are left alone rather than cut down.
        if room.resources < cap {
            let refilled = room.resources.saturating_add(base).saturating_add(bonus).min(cap);
            total += refilled - room.resources;
            room.resources = refilled;
        }
    }
    total
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub spawned: u32,
    pub consumed: u32,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    kind: RpsType,
    lineage: Option<LineageId>,
}

/// Spawn new agents from eligible resident pairs, room by room.
pub fn resource_extraction_system(
    world: &mut SimulationWorld,
    rules: &Rules,
    rng: &mut impl Rng,
) -> ExtractionOutcome {
    let residents = world.residents_by_room();
    let mut outcome = ExtractionOutcome::default();

    for (index, group) in residents.into_iter().enumerate() {
        let room_id = RoomId(index as u32);
        let capacity = world.rooms[index].capacity as usize;
        let mut resources = world.rooms[index].resources;
        let mut population = group.len();

        let mut candidates: Vec<Candidate> = group
            .iter()
            .filter_map(|&(_, entity)| candidate(world, entity))
            .collect();
        candidates.shuffle(rng);

        let mut spawned_here = 0;
        for (a, b) in eligible_pairs(&candidates, rules.extraction_rule) {
            if spawned_here >= rules.extractions_per_room
                || population >= capacity
                || resources == 0
                || resources < rules.extraction_cost
            {
                break;
            }
            resources -= rules.extraction_cost;
            let (kind, lineage) = offspring(candidates[a], candidates[b], rules.extraction_rule, rng);
            world.spawn_resident(kind, room_id, lineage);

            population += 1;
            spawned_here += 1;
            outcome.spawned += 1;
            outcome.consumed += rules.extraction_cost;
        }

        let room = &mut world.rooms[index];
        room.resources = resources;
        room.starvation_streak = if resources == 0 { room.starvation_streak + 1 } else { 0 };
    }
    outcome
}

fn candidate(world: &SimulationWorld, entity: Entity) -> Option<Candidate> {
    let person = world.person(entity)?;
    Some(Candidate {
        kind: person.kind,
        lineage: world.lineage_of(entity),
    })
}

fn is_match(rule: ExtractionRule, a: RpsType, b: RpsType) -> bool {
    match rule {
        ExtractionRule::SameType => a == b,
        ExtractionRule::WinningPair => RpsType::winner(a, b).is_some(),
    }
}

/// Disjoint pairs, greedily matched in candidate order.
fn eligible_pairs(candidates: &[Candidate], rule: ExtractionRule) -> Vec<(usize, usize)> {
    let mut used = vec![false; candidates.len()];
    let mut pairs = Vec::new();
    for i in 0..candidates.len() {
        if used[i] {
            continue;
        }
        let partner = (i + 1..candidates.len())
            .find(|&j| !used[j] && is_match(rule, candidates[i].kind, candidates[j].kind));
        if let Some(j) = partner {
            used[i] = true;
            used[j] = true;
            pairs.push((i, j));
        }
    }
    pairs
}

fn offspring(
    a: Candidate,
    b: Candidate,
    rule: ExtractionRule,
    rng: &mut impl Rng,
) -> (RpsType, Option<LineageId>) {
    match rule {
        ExtractionRule::SameType => {
            let lineage = if rng.gen::<bool>() { a.lineage } else { b.lineage };
            (a.kind, lineage)
        }
        ExtractionRule::WinningPair => {
            if RpsType::winner(a.kind, b.kind) == Some(a.kind) {
                (a.kind, a.lineage)
            } else {
                (b.kind, b.lineage)
            }
        }
    }
}
