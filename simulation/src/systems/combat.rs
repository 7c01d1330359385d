//! RPS Game System
//!
//! Residents of each room are paired at random and play one round. The loser
//! is either marked for combat death or converted to the winner's type; its
//! lineage component is left untouched.

use hecs::Entity;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::{DeathCause, DeathMarker, Person, RpsType};
use crate::config::Rules;
use crate::world::SimulationWorld;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatOutcome {
    pub games: u32,
    pub draws: u32,
    pub conversions: u32,
    pub kills: u32,
}

pub fn rps_game_system(
    world: &mut SimulationWorld,
    rules: &Rules,
    current_tick: u64,
    rng: &mut impl Rng,
) -> CombatOutcome {
    let mut outcome = CombatOutcome::default();

    for mut group in world.residents_by_room() {
        if group.len() < 2 {
            continue;
        }
        group.shuffle(rng);

        // An odd resident out sits this tick out.
        for pair in group.chunks_exact(2) {
            let (first, second) = (pair[0].1, pair[1].1);
            let (Some(a), Some(b)) = (world.person(first), world.person(second)) else {
                continue;
            };
            outcome.games += 1;

            let Some(winner) = RpsType::winner(a.kind, b.kind) else {
                outcome.draws += 1;
                continue;
            };
            let loser: Entity = if winner == a.kind { second } else { first };

            if rng.gen::<f64>() < rules.combat_death_chance {
                let _ = world.world.insert_one(
                    loser,
                    DeathMarker {
                        cause: DeathCause::Combat,
                        tick: current_tick,
                    },
                );
                outcome.kills += 1;
            } else if let Ok(mut person) = world.world.get::<&mut Person>(loser) {
                person.kind = winner;
                outcome.conversions += 1;
            }
        }
    }
    outcome
}
