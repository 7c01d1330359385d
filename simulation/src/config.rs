//! Configuration System
//!
//! Run parameters and rule tuning, loadable from a TOML file. Every field but
//! `ticks` has a default; the tick count must always be supplied.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, SimError};

/// Top-level configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    pub ticks: u64,
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: u64,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub rules: Rules,
}

fn default_seed() -> u64 {
    42
}

fn default_snapshot_interval() -> u64 {
    10
}

/// Room layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub rooms: u32,
    pub topology: Topology,
    pub base_capacity: u32,
    pub capacity_step: u32,
    pub min_capacity: u32,
    /// Explicit per-room capacities; overrides the depth formula.
    pub capacities: Option<Vec<u32>>,
    /// Starting pool for every room; defaults to half the capacity.
    pub initial_resources: Option<u32>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            rooms: 10,
            topology: Topology::default(),
            base_capacity: 50,
            capacity_step: 8,
            min_capacity: 5,
            capacities: None,
            initial_resources: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Topology {
    /// Breadth-first tree, each parent taking between `min_children` and
    /// `max_children` children.
    Branching { min_children: u32, max_children: u32 },
    /// 0 - 1 - 2 - ... - n-1
    Chain,
    /// Explicit undirected edges; must form a tree over all rooms.
    Edges { edges: Vec<(u32, u32)> },
}

impl Default for Topology {
    fn default() -> Self {
        Topology::Branching {
            min_children: 2,
            max_children: 3,
        }
    }
}

/// Initial agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub agents: usize,
    /// Relative weights for Rock, Paper, Scissors.
    pub type_weights: [u32; 3],
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            agents: 100,
            type_weights: [1, 1, 1],
        }
    }
}

/// Which resident pairs may turn resources into offspring. `SameType` is the
/// default: like-typed pairs keep births type-neutral, so only combat and
/// balance shift the type mix. `WinningPair` lets the winning side of a
/// mixed pair reproduce instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionRule {
    /// Two residents of the same resolved type.
    SameType,
    /// A resident and one it beats; the child takes the winner's side.
    WinningPair,
}

/// Tuning for the tick pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    // combat
    pub combat_death_chance: f64,

    // mortality
    pub natural_death_chance: f64,
    pub starvation_death_chance: f64,
    pub overcrowding_death_chance: f64,
    pub starvation_threshold: u32,

    // travel
    pub travel_chance: f64,
    pub travel_ticks: u32,
    pub travel_respects_capacity: bool,

    // resources
    pub regen_min: u32,
    pub regen_max: u32,
    pub population_bonus_divisor: u32,
    pub population_bonus_cap: u32,
    pub resource_cap_ratio: f64,
    pub extraction_cost: u32,
    pub extraction_rule: ExtractionRule,
    pub extractions_per_room: u32,

    // balance
    pub dominance_threshold: f64,
    pub conversion_fraction: f64,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            combat_death_chance: 0.20,
            natural_death_chance: 0.005,
            starvation_death_chance: 0.05,
            overcrowding_death_chance: 0.02,
            starvation_threshold: 3,
            travel_chance: 0.10,
            travel_ticks: 1,
            travel_respects_capacity: false,
            regen_min: 1,
            regen_max: 2,
            population_bonus_divisor: 10,
            population_bonus_cap: 5,
            resource_cap_ratio: 0.5,
            extraction_cost: 1,
            extraction_rule: ExtractionRule::SameType,
            extractions_per_room: 1,
            dominance_threshold: 0.60,
            conversion_fraction: 0.30,
        }
    }
}

impl Rules {
    pub fn validate(&self) -> Result<()> {
        let probabilities = [
            ("combat_death_chance", self.combat_death_chance),
            ("natural_death_chance", self.natural_death_chance),
            ("starvation_death_chance", self.starvation_death_chance),
            ("overcrowding_death_chance", self.overcrowding_death_chance),
            ("travel_chance", self.travel_chance),
            ("dominance_threshold", self.dominance_threshold),
            ("conversion_fraction", self.conversion_fraction),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimError::config(format!("{name} = {value} is outside [0, 1]")));
            }
        }
        if self.regen_min > self.regen_max {
            return Err(SimError::config(format!(
                "regen_min ({}) exceeds regen_max ({})",
                self.regen_min, self.regen_max
            )));
        }
        if self.population_bonus_divisor == 0 {
            return Err(SimError::config("population_bonus_divisor must be positive"));
        }
        if self.travel_ticks == 0 {
            return Err(SimError::config("travel_ticks must be positive"));
        }
        if !(self.resource_cap_ratio.is_finite() && self.resource_cap_ratio >= 0.0) {
            return Err(SimError::config("resource_cap_ratio must be a non-negative number"));
        }
        Ok(())
    }

    /// Upper bound of a room's resource pool.
    pub fn resource_cap(&self, capacity: u32) -> u32 {
        (capacity as f64 * self.resource_cap_ratio).floor() as u32
    }
}

impl SimulationConfig {
    pub fn new(ticks: u64) -> Self {
        Self {
            seed: default_seed(),
            ticks,
            snapshot_interval: default_snapshot_interval(),
            world: WorldConfig::default(),
            population: PopulationConfig::default(),
            rules: Rules::default(),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks that do not need the room tree; topology is checked while
    /// building it.
    pub fn validate(&self) -> Result<()> {
        self.rules.validate()?;
        if self.snapshot_interval == 0 {
            return Err(SimError::config("snapshot_interval must be positive"));
        }
        let world = &self.world;
        if world.rooms == 0 {
            return Err(SimError::config("world needs at least one room"));
        }
        if let Some(capacities) = &world.capacities {
            if capacities.len() != world.rooms as usize {
                return Err(SimError::config(format!(
                    "{} capacities given for {} rooms",
                    capacities.len(),
                    world.rooms
                )));
            }
            if let Some(room) = capacities.iter().position(|&c| c == 0) {
                return Err(SimError::config(format!("room {room} has zero capacity")));
            }
        } else if world.min_capacity == 0 {
            return Err(SimError::config("min_capacity must be positive"));
        }
        if let Topology::Branching { min_children, max_children } = world.topology {
            if min_children == 0 || min_children > max_children {
                return Err(SimError::config(format!(
                    "branching bounds {min_children}..={max_children} are invalid"
                )));
            }
        }
        if self.population.type_weights.iter().all(|&w| w == 0) {
            return Err(SimError::config("type_weights are all zero"));
        }
        Ok(())
    }
}
