//! Mortality System
//!
//! Marks residents for death. Each resident rolls independently for three
//! causes; when several fire on the same tick the cause is attributed in the
//! fixed order starvation, overcrowding, natural.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::{DeathCause, DeathMarker};
use crate::config::Rules;
use crate::world::SimulationWorld;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MortalityOutcome {
    pub natural: u32,
    pub starvation: u32,
    pub overcrowding: u32,
}

impl MortalityOutcome {
    pub fn total(&self) -> u32 {
        self.natural + self.starvation + self.overcrowding
    }
}

/// Pick the cause for one resident. Always draws three rolls so the RNG
/// stream does not depend on room state.
fn roll_cause(rng: &mut impl Rng, rules: &Rules, starving: bool, overcrowded: bool) -> Option<DeathCause> {
    let starvation = rng.gen::<f64>() < rules.starvation_death_chance;
    let overcrowding = rng.gen::<f64>() < rules.overcrowding_death_chance;
    let natural = rng.gen::<f64>() < rules.natural_death_chance;

    if starving && starvation {
        Some(DeathCause::Starvation)
    } else if overcrowded && overcrowding {
        Some(DeathCause::Overcrowding)
    } else if natural {
        Some(DeathCause::Natural)
    } else {
        None
    }
}

pub fn mortality_system(
    world: &mut SimulationWorld,
    rules: &Rules,
    current_tick: u64,
    rng: &mut impl Rng,
) -> MortalityOutcome {
    let mut outcome = MortalityOutcome::default();
    let mut deaths = Vec::new();

    for (index, group) in world.residents_by_room().into_iter().enumerate() {
        let room = &world.rooms[index];
        let starving = room.is_starving(rules.starvation_threshold);
        let overcrowded = group.len() > room.capacity as usize;

        for (_, entity) in group {
            if let Some(cause) = roll_cause(rng, rules, starving, overcrowded) {
                deaths.push((entity, cause));
            }
        }
    }

    for (entity, cause) in deaths {
        match cause {
            DeathCause::Starvation => outcome.starvation += 1,
            DeathCause::Overcrowding => outcome.overcrowding += 1,
            _ => outcome.natural += 1,
        }
        let _ = world.world.insert_one(entity, DeathMarker { cause, tick: current_tick });
    }
    outcome
}
