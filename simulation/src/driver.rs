//! Simulation Driver - owns the world, the lineage registry and the RNG
//!
//! One call to `tick` runs the whole pipeline in its fixed order. `run` loops
//! ticks up to the configured count, handing snapshots to sinks between ticks
//! and honouring a stop request before each new tick.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::components::{Lineage, RpsType};
use crate::config::{Rules, SimulationConfig};
use crate::error::{Result, SimError};
use crate::lineage::LineageRegistry;
use crate::snapshot::Snapshot;
use crate::stats::Statistics;
use crate::systems::{self, BalanceEvent, CombatOutcome, ExtractionOutcome, MortalityOutcome};
use crate::topology::build_rooms;
use crate::world::SimulationWorld;

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickResult {
    pub tick: u64,
    pub removed: u32,
    pub regenerated: u32,
    pub extraction: ExtractionOutcome,
    pub combat: CombatOutcome,
    pub mortality: MortalityOutcome,
    pub arrivals: u32,
    pub departures: u32,
    pub balance: Option<BalanceEvent>,
    /// Living agents at the end of the tick.
    pub population: usize,
}

/// Consumer of between-tick snapshots. Errors are logged by the driver and
/// never touch simulation state.
pub trait SnapshotSink {
    fn on_snapshot(&mut self, snapshot: &Snapshot) -> anyhow::Result<()>;
}

impl<F> SnapshotSink for F
where
    F: FnMut(&Snapshot) -> anyhow::Result<()>,
{
    fn on_snapshot(&mut self, snapshot: &Snapshot) -> anyhow::Result<()> {
        self(snapshot)
    }
}

/// Keeps every snapshot it is handed.
#[derive(Debug, Default)]
pub struct SnapshotRecorder {
    pub snapshots: Vec<Snapshot>,
}

impl SnapshotSink for SnapshotRecorder {
    fn on_snapshot(&mut self, snapshot: &Snapshot) -> anyhow::Result<()> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }
}

/// Logs the statistics block for each snapshot.
#[derive(Debug, Default)]
pub struct StatsLogger;

impl SnapshotSink for StatsLogger {
    fn on_snapshot(&mut self, snapshot: &Snapshot) -> anyhow::Result<()> {
        Statistics::from_snapshot(snapshot).log();
        Ok(())
    }
}

/// Cloneable early-exit flag, checked between ticks.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: u64,
    pub ticks_run: u64,
    pub stopped_early: bool,
    pub final_population: usize,
    pub type_totals: [usize; 3],
    pub lineage_nodes: usize,
    pub balance_events: u32,
    pub spawned: u64,
    pub conversions: u64,
    pub combat_deaths: u64,
    pub other_deaths: u64,
}

impl RunSummary {
    fn record(&mut self, result: &TickResult) {
        self.ticks_run += 1;
        self.spawned += result.extraction.spawned as u64;
        self.conversions += result.combat.conversions as u64;
        self.combat_deaths += result.combat.kills as u64;
        self.other_deaths += result.mortality.total() as u64;
        if result.balance.is_some() {
            self.balance_events += 1;
        }
    }
}

pub struct Simulation {
    pub world: SimulationWorld,
    pub lineages: LineageRegistry,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) config: SimulationConfig,
    pub(crate) tick: u64,
    stop: StopHandle,
}

impl Simulation {
    /// Validate `config`, build rooms, seed agents and register one lineage
    /// root per base type.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let rooms = build_rooms(&config.world, &mut rng)?;
        let mut world = SimulationWorld::new(rooms);
        world.seed_population(&config.population, &mut rng)?;

        info!(
            "Built world: {} rooms, {} agents, seed {}",
            world.rooms.len(),
            world.entity_count(),
            config.seed
        );

        Ok(Self::assemble(world, LineageRegistry::with_roots(), rng, config, 0))
    }

    /// Drive a hand-built world. The rules, the room tree and every agent's
    /// rooms and lineage are checked before any tick can run.
    pub fn from_world(world: SimulationWorld, lineages: LineageRegistry, config: SimulationConfig) -> Result<Self> {
        config.rules.validate()?;
        world.validate()?;
        for (_, lineage) in world.world.query::<&Lineage>().iter() {
            if !lineages.contains(lineage.0) {
                return Err(SimError::InvalidLineage(lineage.0));
            }
        }
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self::assemble(world, lineages, rng, config, 0))
    }

    pub(crate) fn assemble(
        world: SimulationWorld,
        lineages: LineageRegistry,
        rng: ChaCha8Rng,
        config: SimulationConfig,
        tick: u64,
    ) -> Self {
        Self {
            world,
            lineages,
            rng,
            config,
            tick,
            stop: StopHandle::default(),
        }
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn rules(&self) -> &Rules {
        &self.config.rules
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.world, &self.lineages, self.tick)
    }

    pub fn statistics(&self) -> Statistics {
        Statistics::from_snapshot(&self.snapshot())
    }

    /// Run the pipeline once.
    pub fn tick(&mut self) -> Result<TickResult> {
        self.tick += 1;
        let tick = self.tick;
        let rules = &self.config.rules;
        let world = &mut self.world;
        let rng = &mut self.rng;

        let removed = systems::death_cleanup_system(world);
        let regenerated = systems::resource_regeneration_system(world, rules, rng);
        let extraction = systems::resource_extraction_system(world, rules, rng);
        let combat = systems::rps_game_system(world, rules, tick, rng);
        let mortality = systems::mortality_system(world, rules, tick, rng);
        let arrivals = systems::travel_completion_system(world);
        let departures = systems::room_switch_system(world, rules, rng);
        let balance = systems::population_balance_system(world, &mut self.lineages, rules, rng)?;

        let result = TickResult {
            tick,
            removed,
            regenerated,
            extraction,
            combat,
            mortality,
            arrivals,
            departures,
            balance,
            population: world.living_count(),
        };
        debug!(?result, "tick complete");
        Ok(result)
    }

    fn emit(&self, sinks: &mut [&mut dyn SnapshotSink]) {
        if sinks.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for sink in sinks.iter_mut() {
            if let Err(e) = sink.on_snapshot(&snapshot) {
                warn!("Snapshot sink failed at tick {}: {:#}", snapshot.tick, e);
            }
        }
    }

    /// Tick until the configured count is reached or a stop is requested.
    /// Sinks see the state before the first tick, every `snapshot_interval`
    /// ticks, and after the last tick.
    pub fn run(&mut self, sinks: &mut [&mut dyn SnapshotSink]) -> Result<RunSummary> {
        let target = self.config.ticks;
        let interval = self.config.snapshot_interval.max(1);
        let mut summary = RunSummary {
            seed: self.config.seed,
            ..RunSummary::default()
        };

        info!("Running simulation for {} ticks", target.saturating_sub(self.tick));
        self.emit(sinks);

        while self.tick < target {
            if self.stop.is_stopped() {
                info!("Stop requested, halting before tick {}", self.tick + 1);
                summary.stopped_early = true;
                break;
            }
            let result = self.tick()?;
            summary.record(&result);
            if self.tick % interval == 0 || self.tick == target {
                self.emit(sinks);
            }
        }

        let snapshot = self.snapshot();
        summary.final_population = snapshot.living_total();
        summary.type_totals = snapshot.type_totals;
        summary.lineage_nodes = self.lineages.len();

        info!(
            "Simulation finished at tick {}: {} agents (rock {}, paper {}, scissors {}), {} lineage nodes",
            self.tick,
            summary.final_population,
            summary.type_totals[RpsType::Rock.index()],
            summary.type_totals[RpsType::Paper.index()],
            summary.type_totals[RpsType::Scissors.index()],
            summary.lineage_nodes
        );
        Ok(summary)
    }
}

/// Run one independent simulation per seed, in parallel.
pub fn run_batch(config: &SimulationConfig, seeds: &[u64]) -> Result<Vec<RunSummary>> {
    seeds
        .par_iter()
        .map(|&seed| {
            let mut config = config.clone();
            config.seed = seed;
            Simulation::new(config)?.run(&mut [])
        })
        .collect()
}
