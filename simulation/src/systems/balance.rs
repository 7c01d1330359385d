//! Population Balance System
//!
//! When one type holds more than `dominance_threshold` of the living
//! population, `conversion_fraction` of its agents are moved to the other two
//! types. Every conversion is recorded as a split in the lineage registry.

use hecs::Entity;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::components::{Lineage, Person, RpsType};
use crate::config::Rules;
use crate::error::Result;
use crate::lineage::{LineageId, LineageRegistry};
use crate::world::SimulationWorld;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceEvent {
    pub dominant: RpsType,
    pub dominant_count: usize,
    pub total: usize,
    /// Agents moved to each of `dominant.others()`, in that order.
    pub converted: [usize; 2],
    /// Lineage nodes created by this event, in conversion order.
    pub created: Vec<LineageId>,
}

impl BalanceEvent {
    pub fn share(&self) -> f64 {
        self.dominant_count as f64 / self.total as f64
    }

    pub fn converted_total(&self) -> usize {
        self.converted[0] + self.converted[1]
    }
}

/// Living agents grouped by resolved type, each list ordered by `PersonId`.
fn agents_by_type(world: &SimulationWorld) -> [Vec<Entity>; 3] {
    let mut groups: [Vec<Entity>; 3] = Default::default();
    for (_, entity) in world.living_agents() {
        if let Some(person) = world.person(entity) {
            groups[person.kind.index()].push(entity);
        }
    }
    groups
}

pub fn population_balance_system(
    world: &mut SimulationWorld,
    registry: &mut LineageRegistry,
    rules: &Rules,
    rng: &mut impl Rng,
) -> Result<Option<BalanceEvent>> {
    let groups = agents_by_type(world);
    let total: usize = groups.iter().map(Vec::len).sum();
    if total == 0 {
        return Ok(None);
    }

    let dominant = RpsType::ALL
        .into_iter()
        .find(|kind| groups[kind.index()].len() as f64 / total as f64 > rules.dominance_threshold);
    let Some(dominant) = dominant else {
        return Ok(None);
    };

    let members = &groups[dominant.index()];
    let to_convert = (members.len() as f64 * rules.conversion_fraction).round() as usize;
    if to_convert == 0 {
        return Ok(None);
    }

    let targets = dominant.others();
    let mut event = BalanceEvent {
        dominant,
        dominant_count: members.len(),
        total,
        converted: [0, 0],
        created: Vec::with_capacity(to_convert),
    };

    let chosen: Vec<Entity> = members
        .choose_multiple(rng, to_convert.min(members.len()))
        .copied()
        .collect();

    for entity in chosen {
        let slot = rng.gen_range(0..2);
        let new_type = targets[slot];
        let parent = match world.lineage_of(entity) {
            Some(lineage) => lineage,
            None => registry.ensure_root(dominant),
        };
        let lineage = registry.split(parent, new_type)?;

        if let Ok(mut person) = world.world.get::<&mut Person>(entity) {
            person.kind = new_type;
        }
        let _ = world.world.insert_one(entity, Lineage(lineage));

        event.converted[slot] += 1;
        event.created.push(lineage);
    }

    info!(
        "[BALANCE] {} was {:.1}% ({}/{}). Converted {} agents: {} to {}, {} to {}",
        dominant,
        event.share() * 100.0,
        event.dominant_count,
        event.total,
        event.converted_total(),
        event.converted[0],
        first_lineage_label(registry, &event, targets[0]),
        event.converted[1],
        first_lineage_label(registry, &event, targets[1]),
    );

    Ok(Some(event))
}

/// Path of the first node created toward `target`, or the bare type name.
fn first_lineage_label(registry: &LineageRegistry, event: &BalanceEvent, target: RpsType) -> String {
    event
        .created
        .iter()
        .find(|&&id| registry.resolve_base_type(id).ok() == Some(target))
        .and_then(|&id| registry.path_string(id).ok())
        .unwrap_or_else(|| target.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::RoomId;
    use crate::testing::{rng, single_room};
    use RpsType::*;

    fn populate(world: &mut SimulationWorld, counts: [usize; 3]) {
        for kind in RpsType::ALL {
            for _ in 0..counts[kind.index()] {
                world.spawn_person(kind, RoomId(0), None).unwrap();
            }
        }
    }

    fn counts(world: &SimulationWorld) -> [usize; 3] {
        let mut counts = [0; 3];
        for (_, person) in world.world.query::<&Person>().iter() {
            counts[person.kind.index()] += 1;
        }
        counts
    }

    #[test]
    fn test_no_dominance_no_change() {
        let mut world = single_room(200, 0);
        populate(&mut world, [40, 30, 30]);
        let mut registry = LineageRegistry::with_roots();

        let event =
            population_balance_system(&mut world, &mut registry, &Rules::default(), &mut rng(1)).unwrap();
        assert!(event.is_none());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_exactly_threshold_is_not_dominant() {
        let mut world = single_room(200, 0);
        populate(&mut world, [60, 20, 20]);
        let mut registry = LineageRegistry::with_roots();
        let event =
            population_balance_system(&mut world, &mut registry, &Rules::default(), &mut rng(2)).unwrap();
        assert!(event.is_none());
    }

    #[test]
    fn test_dominant_type_is_split() {
        let mut world = single_room(200, 0);
        populate(&mut world, [70, 15, 15]);
        let mut registry = LineageRegistry::with_roots();

        let event = population_balance_system(&mut world, &mut registry, &Rules::default(), &mut rng(3))
            .unwrap()
            .unwrap();
        assert_eq!(event.dominant, Rock);
        assert_eq!(event.converted_total(), 21);
        assert_eq!(event.created.len(), 21);
        assert_eq!(counts(&world)[Rock.index()], 49);
        assert_eq!(counts(&world).iter().sum::<usize>(), 100);

        let rock_root = registry.root_for(Rock).unwrap();
        for &id in &event.created {
            assert_ne!(registry.resolve_base_type(id).unwrap(), Rock);
            assert_eq!(registry.get(id).unwrap().parent, Some(rock_root));
        }
    }

    #[test]
    fn test_existing_lineage_is_parent() {
        let mut world = single_room(50, 0);
        let mut registry = LineageRegistry::with_roots();
        let paper = registry.root_for(Paper).unwrap();
        let branch = registry.split(paper, Rock).unwrap();
        for _ in 0..10 {
            world.spawn_person(Rock, RoomId(0), Some(branch)).unwrap();
        }

        let event = population_balance_system(&mut world, &mut registry, &Rules::default(), &mut rng(4))
            .unwrap()
            .unwrap();
        assert_eq!(event.converted_total(), 3);
        for &id in &event.created {
            let path = registry.path(id).unwrap();
            assert_eq!(path.len(), 3);
            assert_eq!(&path[..2], &[Paper, Rock]);
        }
    }

    #[test]
    fn test_marked_agents_are_not_counted() {
        let mut world = single_room(50, 0);
        populate(&mut world, [3, 1, 1]);
        let rocks: Vec<_> = world
            .world
            .query::<&Person>()
            .iter()
            .filter(|(_, p)| p.kind == Rock)
            .map(|(e, _)| e)
            .collect();
        for e in rocks.into_iter().take(2) {
            world
                .world
                .insert_one(
                    e,
                    crate::components::DeathMarker { cause: crate::components::DeathCause::Natural, tick: 1 },
                )
                .unwrap();
        }
        let mut registry = LineageRegistry::with_roots();
        let event =
            population_balance_system(&mut world, &mut registry, &Rules::default(), &mut rng(5)).unwrap();
        assert!(event.is_none());
    }

    #[test]
    fn test_empty_world_is_noop() {
        let mut world = single_room(5, 0);
        let mut registry = LineageRegistry::with_roots();
        let event =
            population_balance_system(&mut world, &mut registry, &Rules::default(), &mut rng(6)).unwrap();
        assert!(event.is_none());
    }
}
