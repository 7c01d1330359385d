//! Room tree construction
//!
//! Produces the `Room` table from a `WorldConfig`. Room 0 is the root; every
//! other room hangs off exactly one parent. Explicit edge lists are checked
//! to form a tree before any room is created.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;

use crate::components::{Room, RoomId};
use crate::config::{Topology, WorldConfig};
use crate::error::{Result, SimError};

/// Parent of every room (`None` for room 0), indexed by room id.
type Parents = Vec<Option<u32>>;

/// Build the room table, drawing branching factors from `rng`.
pub fn build_rooms(config: &WorldConfig, rng: &mut impl Rng) -> Result<Vec<Room>> {
    let n = config.rooms;
    if n == 0 {
        return Err(SimError::config("world needs at least one room"));
    }

    let parents = match &config.topology {
        Topology::Branching { min_children, max_children } => {
            branching_parents(n, *min_children, *max_children, rng)
        }
        Topology::Chain => (0..n).map(|i| i.checked_sub(1)).collect(),
        Topology::Edges { edges } => edge_parents(n, edges)?,
    };

    rooms_from_parents(config, &parents)
}

/// Breadth-first: each parent gets between `min` and `max` children until the
/// room count runs out.
fn branching_parents(n: u32, min: u32, max: u32, rng: &mut impl Rng) -> Parents {
    let mut parents = vec![None; n as usize];
    let mut level = vec![0u32];
    let mut next = 1u32;

    while next < n && !level.is_empty() {
        let mut next_level = Vec::new();
        for &parent in &level {
            if next >= n {
                break;
            }
            let remaining = n - next;
            let children = if remaining <= min.max(1) {
                remaining
            } else {
                rng.gen_range(min..=max).min(remaining)
            };
            for _ in 0..children {
                parents[next as usize] = Some(parent);
                next_level.push(next);
                next += 1;
            }
        }
        level = next_level;
    }
    parents
}

/// Orient an undirected edge list away from room 0, rejecting anything that
/// is not a spanning tree.
fn edge_parents(n: u32, edges: &[(u32, u32)]) -> Result<Parents> {
    if edges.len() != (n - 1) as usize {
        return Err(SimError::config(format!(
            "a tree over {n} rooms needs {} edges, got {}",
            n - 1,
            edges.len()
        )));
    }

    let mut adjacency = vec![Vec::new(); n as usize];
    for &(a, b) in edges {
        if a >= n || b >= n {
            return Err(SimError::config(format!("edge ({a}, {b}) names a room outside 0..{n}")));
        }
        if a == b {
            return Err(SimError::config(format!("room {a} is linked to itself")));
        }
        adjacency[a as usize].push(b);
        adjacency[b as usize].push(a);
    }

    let mut parents: Parents = vec![None; n as usize];
    let mut seen = vec![false; n as usize];
    let mut queue = VecDeque::from([0u32]);
    seen[0] = true;

    while let Some(room) = queue.pop_front() {
        for &next in &adjacency[room as usize] {
            if Some(next) == parents[room as usize] {
                continue;
            }
            if seen[next as usize] {
                return Err(SimError::config(format!(
                    "room graph has a cycle through rooms {room} and {next}"
                )));
            }
            seen[next as usize] = true;
            parents[next as usize] = Some(room);
            queue.push_back(next);
        }
    }

    if let Some(orphan) = seen.iter().position(|s| !s) {
        return Err(SimError::config(format!("room {orphan} is not connected to room 0")));
    }
    Ok(parents)
}

fn rooms_from_parents(config: &WorldConfig, parents: &Parents) -> Result<Vec<Room>> {
    let n = parents.len();
    let mut depth = vec![0u32; n];
    let mut adjacent: Vec<Vec<RoomId>> = vec![Vec::new(); n];

    // Parents always carry a smaller BFS index in generated trees, but explicit
    // edges can number rooms arbitrarily, so resolve depth by walking up.
    for room in 0..n {
        let mut d = 0;
        let mut cursor = parents[room];
        while let Some(p) = cursor {
            d += 1;
            if d > n as u32 {
                return Err(SimError::config("room graph has a cycle"));
            }
            cursor = parents[p as usize];
        }
        depth[room] = d;
        if let Some(p) = parents[room] {
            adjacent[p as usize].push(RoomId(room as u32));
            adjacent[room].push(RoomId(p));
        }
    }

    let mut rooms = Vec::with_capacity(n);
    for (room, neighbours) in adjacent.into_iter().enumerate() {
        let mut neighbours = neighbours;
        neighbours.sort();
        let capacity = match &config.capacities {
            Some(caps) => caps[room],
            None => config
                .base_capacity
                .saturating_sub(depth[room].saturating_mul(config.capacity_step))
                .max(config.min_capacity),
        };
        if capacity == 0 {
            return Err(SimError::config(format!("room {room} has zero capacity")));
        }
        rooms.push(Room {
            id: RoomId(room as u32),
            parent: parents[room].map(RoomId),
            adjacent: neighbours,
            depth: depth[room],
            capacity,
            resources: config.initial_resources.unwrap_or(capacity / 2),
            starvation_streak: 0,
        });
    }
    Ok(rooms)
}

/// Check a hand-built or restored room table: ids match their index,
/// capacities are positive, adjacency is symmetric and in range, and the
/// parent links form a single tree whose edges are exactly the adjacency.
pub fn validate_rooms(rooms: &[Room]) -> Result<()> {
    let n = rooms.len();
    if n == 0 {
        return Err(SimError::config("world needs at least one room"));
    }

    let mut roots = 0;
    let mut adjacency_entries = 0;
    for (index, room) in rooms.iter().enumerate() {
        if room.id.index() != index {
            return Err(SimError::config(format!("{} stored at index {index}", room.id)));
        }
        if room.capacity == 0 {
            return Err(SimError::config(format!("{} has zero capacity", room.id)));
        }

        let mut seen = room.adjacent.clone();
        seen.sort();
        seen.dedup();
        if seen.len() != room.adjacent.len() {
            return Err(SimError::config(format!("{} lists a neighbour twice", room.id)));
        }
        for &other in &room.adjacent {
            let neighbour = rooms
                .get(other.index())
                .ok_or_else(|| SimError::config(format!("{} is adjacent to unknown {other}", room.id)))?;
            if other == room.id {
                return Err(SimError::config(format!("{} is adjacent to itself", room.id)));
            }
            if !neighbour.adjacent.contains(&room.id) {
                return Err(SimError::config(format!(
                    "{} lists {other} but not the reverse",
                    room.id
                )));
            }
        }
        adjacency_entries += room.adjacent.len();

        match room.parent {
            None => roots += 1,
            Some(parent) => {
                if parent.index() >= n || parent == room.id {
                    return Err(SimError::config(format!("{} has invalid parent {parent}", room.id)));
                }
                if !room.adjacent.contains(&parent) {
                    return Err(SimError::config(format!(
                        "{} is not adjacent to its parent {parent}",
                        room.id
                    )));
                }
            }
        }
    }

    if roots != 1 {
        return Err(SimError::config(format!("room tree has {roots} roots")));
    }
    if adjacency_entries != 2 * (n - 1) {
        return Err(SimError::config("adjacency does not match the parent tree"));
    }

    // Every parent chain must reach the root within n steps.
    for room in rooms {
        let mut cursor = room.parent;
        let mut steps = 0;
        while let Some(parent) = cursor {
            steps += 1;
            if steps > n {
                return Err(SimError::config(format!("parent links from {} form a cycle", room.id)));
            }
            cursor = rooms[parent.index()].parent;
        }
    }
    Ok(())
}

/// Random room, uniform over the table.
pub fn random_room(rooms: &[Room], rng: &mut impl Rng) -> Option<RoomId> {
    rooms.choose(rng).map(|room| room.id)
}
