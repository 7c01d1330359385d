//! Simulation World - agents and rooms
//!
//! Agents are hecs entities; rooms live in a dense table indexed by `RoomId`.
//! All relations are ids resolved through these two stores.

use hecs::{Entity, World};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::collections::HashSet;

use crate::components::*;
use crate::config::PopulationConfig;
use crate::error::{Result, SimError};
use crate::lineage::LineageId;
use crate::topology::{random_room, validate_rooms};

pub struct SimulationWorld {
    pub world: World,
    pub rooms: Vec<Room>,
    pub next_person_id: u64,
}

impl SimulationWorld {
    pub fn new(rooms: Vec<Room>) -> Self {
        Self {
            world: World::new(),
            rooms,
            next_person_id: 0,
        }
    }

    pub fn room(&self, id: RoomId) -> Result<&Room> {
        self.rooms.get(id.index()).ok_or(SimError::UnknownRoom(id))
    }

    fn allocate_person_id(&mut self) -> PersonId {
        let id = PersonId(self.next_person_id);
        self.next_person_id += 1;
        id
    }

    /// Spawn a resident agent, optionally attached to a lineage.
    pub fn spawn_person(
        &mut self,
        kind: RpsType,
        room: RoomId,
        lineage: Option<LineageId>,
    ) -> Result<Entity> {
        self.room(room)?;
        Ok(self.spawn_resident(kind, room, lineage))
    }

    /// Spawn into a room already known to exist.
    pub(crate) fn spawn_resident(
        &mut self,
        kind: RpsType,
        room: RoomId,
        lineage: Option<LineageId>,
    ) -> Entity {
        let id = self.allocate_person_id();
        let person = Person { id, kind, room };
        match lineage {
            Some(lineage) => self.world.spawn((person, Lineage(lineage))),
            None => self.world.spawn((person,)),
        }
    }

    /// Seed `config.agents` agents with weighted types in uniform random rooms.
    pub fn seed_population(&mut self, config: &PopulationConfig, rng: &mut impl Rng) -> Result<()> {
        if self.rooms.is_empty() && config.agents > 0 {
            return Err(SimError::config("cannot seed agents into a world without rooms"));
        }
        let weights = WeightedIndex::new(config.type_weights)
            .map_err(|e| SimError::config(format!("type_weights: {e}")))?;
        for _ in 0..config.agents {
            let kind = RpsType::ALL[weights.sample(rng)];
            let Some(room) = random_room(&self.rooms, rng) else {
                break;
            };
            self.spawn_resident(kind, room, None);
        }
        Ok(())
    }

    /// Check a world assembled outside `build_rooms`: the room table must be
    /// a valid tree and every agent must point at existing rooms with a
    /// unique id below `next_person_id`.
    pub fn validate(&self) -> Result<()> {
        validate_rooms(&self.rooms)?;
        let mut ids = HashSet::new();
        for (_, (person, travel)) in self.world.query::<(&Person, Option<&Travel>)>().iter() {
            self.room(person.room)?;
            if let Some(travel) = travel {
                self.room(travel.to)?;
            }
            if person.id.0 >= self.next_person_id {
                return Err(SimError::config(format!(
                    "person id {} not below next id {}",
                    person.id.0, self.next_person_id
                )));
            }
            if !ids.insert(person.id) {
                return Err(SimError::config(format!("person id {} appears twice", person.id.0)));
            }
        }
        Ok(())
    }

    /// Number of agents, living or death-marked.
    pub fn entity_count(&self) -> usize {
        self.world.query::<&Person>().iter().count()
    }

    /// Agents not carrying a death marker.
    pub fn living_count(&self) -> usize {
        self.world
            .query::<&Person>()
            .without::<&DeathMarker>()
            .iter()
            .count()
    }

    pub fn marked_count(&self) -> usize {
        self.world
            .query::<&Person>()
            .with::<&DeathMarker>()
            .iter()
            .count()
    }

    /// Living, non-traveling agents grouped by room, each group ordered by
    /// `PersonId` so downstream shuffles only depend on the RNG.
    pub fn residents_by_room(&self) -> Vec<Vec<(PersonId, Entity)>> {
        let mut by_room = vec![Vec::new(); self.rooms.len()];
        for (entity, person) in self
            .world
            .query::<&Person>()
            .without::<&Travel>()
            .without::<&DeathMarker>()
            .iter()
        {
            if let Some(group) = by_room.get_mut(person.room.index()) {
                group.push((person.id, entity));
            }
        }
        for group in &mut by_room {
            group.sort_unstable_by_key(|(id, _)| *id);
        }
        by_room
    }

    /// Living resident count per room.
    pub fn room_populations(&self) -> Vec<usize> {
        self.residents_by_room().iter().map(Vec::len).collect()
    }

    /// Agents currently on the road toward each room.
    pub fn inbound_travelers(&self) -> Vec<usize> {
        let mut inbound = vec![0; self.rooms.len()];
        for (_, travel) in self.world.query::<&Travel>().iter() {
            if let Some(count) = inbound.get_mut(travel.to.index()) {
                *count += 1;
            }
        }
        inbound
    }

    /// Living agents (including travelers) ordered by `PersonId`.
    pub fn living_agents(&self) -> Vec<(PersonId, Entity)> {
        let mut agents: Vec<_> = self
            .world
            .query::<&Person>()
            .without::<&DeathMarker>()
            .iter()
            .map(|(entity, person)| (person.id, entity))
            .collect();
        agents.sort_unstable_by_key(|(id, _)| *id);
        agents
    }

    pub fn person(&self, entity: Entity) -> Option<Person> {
        self.world.get::<&Person>(entity).ok().map(|p| *p)
    }

    pub fn lineage_of(&self, entity: Entity) -> Option<LineageId> {
        self.world.get::<&Lineage>(entity).ok().map(|l| l.0)
    }

    /// Find an agent's entity by its public id.
    pub fn find_person(&self, id: PersonId) -> Option<Entity> {
        self.world
            .query::<&Person>()
            .iter()
            .find(|(_, person)| person.id == id)
            .map(|(entity, _)| entity)
    }
}
