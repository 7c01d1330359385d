//! Travel Systems
//!
//! `travel_completion_system` lands agents whose journey ends this tick;
//! `room_switch_system` then starts new journeys. Agents that just landed are
//! tagged `JustArrived` and may not leave again until the next tick.

use hecs::Entity;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::components::{DeathMarker, JustArrived, Person, RoomId, Travel};
use crate::config::Rules;
use crate::world::SimulationWorld;

/// Count down every journey and move arrivals into their destination.
/// Returns the number of arrivals.
pub fn travel_completion_system(world: &mut SimulationWorld) -> u32 {
    let mut arrivals: Vec<(Entity, RoomId)> = Vec::new();

    for (entity, travel) in world.world.query_mut::<&mut Travel>() {
        travel.remaining = travel.remaining.saturating_sub(1);
        if travel.remaining == 0 {
            arrivals.push((entity, travel.to));
        }
    }

    let count = arrivals.len() as u32;
    for (entity, destination) in arrivals {
        if let Ok(mut person) = world.world.get::<&mut Person>(entity) {
            person.room = destination;
        }
        let _ = world.world.remove_one::<Travel>(entity);
        let _ = world.world.insert_one(entity, JustArrived);
    }
    count
}

/// Each settled resident leaves for a random neighbouring room with
/// `travel_chance`. Returns the number of departures.
pub fn room_switch_system(world: &mut SimulationWorld, rules: &Rules, rng: &mut impl Rng) -> u32 {
    let mut occupancy: Vec<usize> = world
        .room_populations()
        .into_iter()
        .zip(world.inbound_travelers())
        .map(|(residents, inbound)| residents + inbound)
        .collect();

    let mut candidates: Vec<(u64, Entity, RoomId)> = world
        .world
        .query::<&Person>()
        .without::<&Travel>()
        .without::<&DeathMarker>()
        .without::<&JustArrived>()
        .iter()
        .map(|(entity, person)| (person.id.0, entity, person.room))
        .collect();
    candidates.sort_unstable_by_key(|(id, _, _)| *id);

    let mut departures = Vec::new();
    for (_, entity, room) in candidates {
        if rng.gen::<f64>() >= rules.travel_chance {
            continue;
        }
        let Some(&destination) = world.rooms[room.index()].adjacent.choose(rng) else {
            continue;
        };
        if rules.travel_respects_capacity {
            let full = occupancy[destination.index()] >= world.rooms[destination.index()].capacity as usize;
            if full {
                continue;
            }
            occupancy[destination.index()] += 1;
            occupancy[room.index()] = occupancy[room.index()].saturating_sub(1);
        }
        departures.push((
            entity,
            Travel {
                from: room,
                to: destination,
                remaining: rules.travel_ticks,
            },
        ));
    }

    let count = departures.len() as u32;
    for (entity, travel) in departures {
        let _ = world.world.insert_one(entity, travel);
    }

    let landed: Vec<Entity> = world
        .world
        .query::<&JustArrived>()
        .iter()
        .map(|(entity, _)| entity)
        .collect();
    for entity in landed {
        let _ = world.world.remove_one::<JustArrived>(entity);
    }
    count
}
