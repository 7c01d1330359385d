//! Fixtures shared by unit tests.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::components::{Room, RoomId};
use crate::world::SimulationWorld;

pub(crate) fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Chain of rooms 0 - 1 - ... - n-1, all with the same capacity and pool.
pub(crate) fn chain(n: u32, capacity: u32, resources: u32) -> SimulationWorld {
    let rooms = (0..n)
        .map(|i| {
            let mut adjacent = Vec::new();
            if i > 0 {
                adjacent.push(RoomId(i - 1));
            }
            if i + 1 < n {
                adjacent.push(RoomId(i + 1));
            }
            Room {
                id: RoomId(i),
                parent: i.checked_sub(1).map(RoomId),
                adjacent,
                depth: i,
                capacity,
                resources,
                starvation_streak: 0,
            }
        })
        .collect();
    SimulationWorld::new(rooms)
}

pub(crate) fn single_room(capacity: u32, resources: u32) -> SimulationWorld {
    chain(1, capacity, resources)
}
