//! RPS Lineage Simulation runner
//!
//! Builds a world from a TOML config and/or flags, runs it, and writes the
//! final lineage report plus an optional snapshot archive.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use std::fs;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use simulation::persistence::{save_states_bincode, save_states_json};
use simulation::report::{lineage_report, lineage_tree};
use simulation::{Simulation, SimulationConfig, SnapshotRecorder, SnapshotSink, StatsLogger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Archive {
    Json,
    Bincode,
    None,
}

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "rps-sim")]
#[command(about = "Rock/Paper/Scissors agents with lineage tracking")]
struct Args {
    /// TOML config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks to simulate (required unless set in the config file)
    #[arg(long)]
    ticks: Option<u64>,

    #[arg(long)]
    rooms: Option<u32>,

    /// Initial agent count
    #[arg(long)]
    agents: Option<usize>,

    /// Interval between snapshots (in ticks)
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for the report and archive
    #[arg(long, default_value = "output")]
    out: PathBuf,

    /// Format for the recorded snapshot archive
    #[arg(long, value_enum, default_value_t = Archive::None)]
    archive: Archive,

    /// Log every tick
    #[arg(long)]
    verbose: bool,
}

fn load_config(args: &Args) -> anyhow::Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let mut table: toml::Table = text.parse()?;
            if let Some(ticks) = args.ticks {
                table.insert("ticks".into(), toml::Value::Integer(ticks as i64));
            }
            if !table.contains_key("ticks") {
                bail!("invalid configuration: ticks must be set in the config file or with --ticks");
            }
            toml::Value::Table(table).try_into::<SimulationConfig>()?
        }
        None => match args.ticks {
            Some(ticks) => SimulationConfig::new(ticks),
            None => bail!("invalid configuration: --ticks is required without a config file"),
        },
    };

    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(rooms) = args.rooms {
        config.world.rooms = rooms;
    }
    if let Some(agents) = args.agents {
        config.population.agents = agents;
    }
    if let Some(interval) = args.snapshot_interval {
        config.snapshot_interval = interval;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args)?;
    info!(
        "RPS simulation starting: seed {}, {} ticks, {} rooms, {} agents",
        config.seed, config.ticks, config.world.rooms, config.population.agents
    );

    let mut sim = Simulation::new(config)?;
    let mut recorder = SnapshotRecorder::default();
    let mut logger = StatsLogger;

    let start = std::time::Instant::now();
    let summary = {
        let mut sinks: [&mut dyn SnapshotSink; 2] = [&mut logger, &mut recorder];
        sim.run(&mut sinks)?
    };
    info!(
        "Run complete in {:?}: {} ticks, {} balance events, {} offspring, {} conversions",
        start.elapsed(),
        summary.ticks_run,
        summary.balance_events,
        summary.spawned,
        summary.conversions
    );

    fs::create_dir_all(&args.out)
        .with_context(|| format!("creating output directory {}", args.out.display()))?;

    let final_snapshot = sim.snapshot();
    let tree = lineage_tree(&final_snapshot);
    for line in tree.lines() {
        info!("{}", line);
    }
    let report_path = args
        .out
        .join(format!("lineage_report_tick_{}.txt", final_snapshot.tick));
    fs::write(&report_path, lineage_report(&final_snapshot))
        .with_context(|| format!("writing {}", report_path.display()))?;
    info!("Lineage report saved to: {}", report_path.display());

    match args.archive {
        Archive::Json => {
            save_states_json(args.out.join("snapshots.json"), &recorder.snapshots)?;
        }
        Archive::Bincode => {
            save_states_bincode(args.out.join("snapshots.bin"), &recorder.snapshots)?;
        }
        Archive::None => {}
    }

    if let Some(usage) = memory_stats::memory_stats() {
        info!("Physical memory: {:.1} MiB", usage.physical_mem as f64 / (1024.0 * 1024.0));
    }

    Ok(())
}
