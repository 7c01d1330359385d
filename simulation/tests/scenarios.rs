//! End-to-end scenarios and run-wide invariants

use proptest::prelude::*;

use simulation::{
    DeathCause, DeathMarker, LineageId, LineageRegistry, Person, Room, RoomId, RpsType, Simulation,
    SimulationConfig, SimulationWorld, Travel,
};

fn chain_world(n: u32, capacity: u32, resources: u32) -> SimulationWorld {
    let rooms = (0..n)
        .map(|i| Room {
            id: RoomId(i),
            parent: i.checked_sub(1).map(RoomId),
            adjacent: [i.checked_sub(1), (i + 1 < n).then_some(i + 1)]
                .into_iter()
                .flatten()
                .map(RoomId)
                .collect(),
            depth: i,
            capacity,
            resources,
            starvation_streak: 0,
        })
        .collect();
    SimulationWorld::new(rooms)
}

fn default_sim(seed: u64, ticks: u64) -> Simulation {
    let mut config = SimulationConfig::new(ticks);
    config.seed = seed;
    Simulation::new(config).unwrap()
}

/// Two Rock and two Scissors in one empty room: every decisive game kills
/// the Scissors loser one time in five.
#[test]
fn test_scenario_a_combat_outcome_rates() {
    let mut decisive = 0u32;
    let mut kills = 0u32;

    for seed in 0..1500 {
        let mut world = chain_world(1, 10, 0);
        let mut scissors = Vec::new();
        for _ in 0..2 {
            world.spawn_person(RpsType::Rock, RoomId(0), None).unwrap();
            scissors.push(world.spawn_person(RpsType::Scissors, RoomId(0), None).unwrap());
        }
        let mut config = SimulationConfig::new(1);
        config.seed = seed;
        config.rules.natural_death_chance = 0.0;
        let mut sim = Simulation::from_world(world, LineageRegistry::with_roots(), config).unwrap();

        let result = sim.tick().unwrap();
        assert_eq!(result.combat.games, 2);
        assert_eq!(result.combat.kills + result.combat.conversions + result.combat.draws, 2);

        for entity in scissors {
            let person = *sim.world.world.get::<&Person>(entity).unwrap();
            if let Ok(marker) = sim.world.world.get::<&DeathMarker>(entity) {
                assert_eq!(marker.cause, DeathCause::Combat);
                assert_eq!(marker.tick, 1);
                assert_eq!(person.kind, RpsType::Scissors);
            }
        }

        decisive += result.combat.kills + result.combat.conversions;
        kills += result.combat.kills;
    }

    let ratio = kills as f64 / decisive as f64;
    assert!(decisive > 500);
    assert!((0.16..0.24).contains(&ratio), "combat death ratio {ratio}");
}

/// One Rock against one Scissors: the loser ends the tick either marked
/// for combat death or converted to Rock, never anything else.
#[test]
fn test_scenario_a_loser_is_killed_or_converted() {
    let mut outcomes = [0u32; 2];

    for seed in 0..400 {
        let mut world = chain_world(1, 10, 0);
        let rock = world.spawn_person(RpsType::Rock, RoomId(0), None).unwrap();
        let loser = world.spawn_person(RpsType::Scissors, RoomId(0), None).unwrap();
        let mut config = SimulationConfig::new(1);
        config.seed = seed;
        config.rules.natural_death_chance = 0.0;
        config.rules.dominance_threshold = 1.0;
        let mut sim = Simulation::from_world(world, LineageRegistry::with_roots(), config).unwrap();

        let result = sim.tick().unwrap();
        assert_eq!(result.combat.games, 1);
        assert_eq!(result.combat.draws, 0);
        assert!(sim.world.world.get::<&DeathMarker>(rock).is_err());

        let person = *sim.world.world.get::<&Person>(loser).unwrap();
        match sim.world.world.get::<&DeathMarker>(loser).ok().map(|m| *m) {
            Some(marker) => {
                assert_eq!(marker.cause, DeathCause::Combat);
                assert_eq!(person.kind, RpsType::Scissors);
                outcomes[0] += 1;
            }
            None => {
                assert_eq!(person.kind, RpsType::Rock);
                outcomes[1] += 1;
            }
        }
    }

    assert_eq!(outcomes[0] + outcomes[1], 400);
    assert!(outcomes[0] > 0 && outcomes[1] > outcomes[0]);
}

#[test]
fn test_scenario_b_arrival_blocks_departure() {
    for seed in 0..50 {
        let mut world = chain_world(3, 10, 5);
        let walker = world.spawn_person(RpsType::Paper, RoomId(0), None).unwrap();
        world
            .world
            .insert_one(walker, Travel { from: RoomId(0), to: RoomId(1), remaining: 1 })
            .unwrap();

        let mut config = SimulationConfig::new(1);
        config.seed = seed;
        config.rules.travel_chance = 1.0;
        config.rules.natural_death_chance = 0.0;
        let mut sim = Simulation::from_world(world, LineageRegistry::with_roots(), config).unwrap();

        let result = sim.tick().unwrap();
        assert_eq!(result.arrivals, 1);
        assert_eq!(result.departures, 0);
        assert!(sim.world.world.get::<&Travel>(walker).is_err());

        let snapshot = sim.snapshot();
        assert!(snapshot.travelers.is_empty());
        assert_eq!(snapshot.rooms[1].agents.len(), 1);
        assert_eq!(snapshot.rooms[1].agents[0].room, RoomId(1));
    }
}

#[test]
fn test_scenario_c_balance_splits_dominant_type() {
    let mut world = chain_world(1, 200, 0);
    for (kind, count) in [(RpsType::Rock, 70), (RpsType::Paper, 15), (RpsType::Scissors, 15)] {
        for _ in 0..count {
            world.spawn_person(kind, RoomId(0), None).unwrap();
        }
    }
    let mut registry = LineageRegistry::with_roots();
    let mut rng = <rand_chacha::ChaCha8Rng as rand::SeedableRng>::seed_from_u64(9);

    let event = simulation::systems::population_balance_system(
        &mut world,
        &mut registry,
        &simulation::Rules::default(),
        &mut rng,
    )
    .unwrap()
    .unwrap();

    assert_eq!(event.dominant, RpsType::Rock);
    assert_eq!(event.converted_total(), 21);
    // 21 fair coin flips: P(outside 3..=18) is about 0.0002
    assert!((3..=18).contains(&event.converted[0]));
    assert_eq!(registry.split_count(), 21);
    for &id in &event.created {
        assert_ne!(registry.resolve_base_type(id).unwrap(), RpsType::Rock);
    }
    let rocks = world
        .world
        .query::<&Person>()
        .iter()
        .filter(|(_, p)| p.kind == RpsType::Rock)
        .count();
    assert_eq!(rocks, 49);
}

#[test]
fn test_run_invariants_hold_every_tick() {
    for seed in [3, 17, 256] {
        let mut sim = default_sim(seed, 150);
        let mut streaks: Vec<u32> = sim.world.rooms.iter().map(|r| r.starvation_streak).collect();

        for _ in 0..150 {
            let marked_before = sim.world.marked_count();
            let result = sim.tick().unwrap();

            assert_eq!(result.removed as usize, marked_before);
            assert_eq!(
                sim.world.entity_count(),
                sim.world.living_count() + sim.world.marked_count()
            );
            assert_eq!(result.population, sim.world.living_count());

            for (room, prev) in sim.world.rooms.iter().zip(streaks.iter_mut()) {
                assert!(room.resources <= sim.rules().resource_cap(room.capacity));
                if room.resources > 0 {
                    assert_eq!(room.starvation_streak, 0);
                } else {
                    assert_eq!(room.starvation_streak, *prev + 1);
                }
                *prev = room.starvation_streak;
            }

            if let Some(event) = &result.balance {
                let after = sim.snapshot().type_totals[event.dominant.index()];
                assert!(after < event.dominant_count);
                assert!(event.share() > sim.rules().dominance_threshold);
            }
        }
    }
}

#[test]
fn test_lineages_stay_consistent_over_runs() {
    let mut sim = default_sim(5, 300);
    sim.run(&mut []).unwrap();

    let registry = &sim.lineages;
    for node in registry.nodes() {
        let path = registry.path(node.id).unwrap();
        assert_eq!(path.len() as u32, node.generation + 1);
        assert_eq!(path.last().copied(), Some(node.resolved()));
        if let Some(parent) = node.parent {
            assert_eq!(&path[..path.len() - 1], registry.path(parent).unwrap().as_slice());
        }
    }
    for agent in sim.snapshot().agents() {
        if let Some(lineage) = agent.lineage {
            assert!(registry.contains(lineage));
        }
    }
}

fn kind(index: u8) -> RpsType {
    RpsType::ALL[index as usize % 3]
}

proptest! {
    #[test]
    fn prop_split_extends_parent_path(steps in prop::collection::vec((any::<usize>(), any::<u8>()), 1..60)) {
        let mut registry = LineageRegistry::with_roots();
        for (pick, t) in steps {
            let parent = LineageId((pick % registry.len()) as u32);
            let before = registry.path(parent).unwrap();
            let child = registry.split(parent, kind(t)).unwrap();

            let path = registry.path(child).unwrap();
            prop_assert_eq!(path.len(), before.len() + 1);
            prop_assert_eq!(&path[..before.len()], before.as_slice());
            prop_assert_eq!(path[before.len()], kind(t));
            prop_assert_eq!(registry.path(child).unwrap(), path.clone());
            prop_assert_eq!(registry.path(parent).unwrap(), before);
            prop_assert_eq!(registry.resolve_base_type(child).unwrap(), kind(t));
        }
    }

    #[test]
    fn prop_unknown_ids_are_rejected(extra in 0u32..1000) {
        let mut registry = LineageRegistry::with_roots();
        let missing = LineageId(registry.len() as u32 + extra);
        prop_assert!(registry.path(missing).is_err());
        prop_assert!(registry.split(missing, RpsType::Rock).is_err());
        prop_assert_eq!(registry.len(), 3);
    }
}
