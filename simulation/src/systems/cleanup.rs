//! Death Cleanup System
//!
//! Despawns agents marked for death during the previous tick. Room
//! populations are derived from residents, so removal is all it takes.

use hecs::Entity;

use crate::components::{DeathMarker, Person};
use crate::world::SimulationWorld;

/// Remove every death-marked agent. Returns the number removed.
pub fn death_cleanup_system(world: &mut SimulationWorld) -> u32 {
    let doomed: Vec<Entity> = world
        .world
        .query::<&Person>()
        .with::<&DeathMarker>()
        .iter()
        .map(|(entity, _)| entity)
        .collect();

    let count = doomed.len() as u32;
    for entity in doomed {
        let _ = world.world.despawn(entity);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{DeathCause, RoomId, RpsType};
    use crate::testing::single_room;

    #[test]
    fn test_removes_only_marked() {
        let mut world = single_room(10, 0);
        let keep = world.spawn_person(RpsType::Rock, RoomId(0), None).unwrap();
        let gone = world.spawn_person(RpsType::Paper, RoomId(0), None).unwrap();
        world
            .world
            .insert_one(gone, DeathMarker { cause: DeathCause::Combat, tick: 1 })
            .unwrap();

        assert_eq!(death_cleanup_system(&mut world), 1);
        assert!(world.world.contains(keep));
        assert!(!world.world.contains(gone));
        assert_eq!(world.room_populations(), vec![1]);
    }

    #[test]
    fn test_idempotent_without_marks() {
        let mut world = single_room(10, 0);
        world.spawn_person(RpsType::Rock, RoomId(0), None).unwrap();
        assert_eq!(death_cleanup_system(&mut world), 0);
        assert_eq!(death_cleanup_system(&mut world), 0);
        assert_eq!(world.entity_count(), 1);
    }
}
