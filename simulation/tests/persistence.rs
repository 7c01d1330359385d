//! Export/import and snapshot archive tests

use std::env;
use std::fs;
use std::path::PathBuf;

use simulation::persistence::{load_states_bincode, load_states_json, save_states_bincode, save_states_json};
use simulation::{Simulation, SimulationConfig, SnapshotRecorder, SnapshotSink};

fn config() -> SimulationConfig {
    let mut config = SimulationConfig::new(80);
    config.seed = 11;
    config.snapshot_interval = 20;
    config
}

fn scratch(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("rps-sim-{}-{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_resumed_run_matches_uninterrupted() {
    let mut uninterrupted = Simulation::new(config()).unwrap();
    uninterrupted.run(&mut []).unwrap();

    let mut first_half = Simulation::new(config()).unwrap();
    for _ in 0..40 {
        first_half.tick().unwrap();
    }
    let saved = first_half.export_state().unwrap();
    drop(first_half);

    let (mut resumed, result) = Simulation::import_state(&saved).unwrap();
    assert_eq!(result.tick, 40);
    let summary = resumed.run(&mut []).unwrap();
    assert_eq!(summary.ticks_run, 40);

    assert_eq!(resumed.current_tick(), uninterrupted.current_tick());
    assert_eq!(resumed.snapshot(), uninterrupted.snapshot());
    assert_eq!(resumed.lineages, uninterrupted.lineages);
}

#[test]
fn test_archives_round_trip() {
    let mut sim = Simulation::new(config()).unwrap();
    let mut recorder = SnapshotRecorder::default();
    let mut sinks: [&mut dyn SnapshotSink; 1] = [&mut recorder];
    sim.run(&mut sinks).unwrap();
    assert_eq!(recorder.snapshots.len(), 5);

    let dir = scratch("archives");
    let json_path = dir.join("snapshots.json");
    let bin_path = dir.join("snapshots.bin");

    let json_stats = save_states_json(&json_path, &recorder.snapshots).unwrap();
    let bin_stats = save_states_bincode(&bin_path, &recorder.snapshots).unwrap();
    assert_eq!(json_stats.snapshots, 5);
    assert!(bin_stats.bytes > 0);
    assert!(bin_stats.bytes < json_stats.bytes);

    assert_eq!(load_states_json(&json_path).unwrap(), recorder.snapshots);
    assert_eq!(load_states_bincode(&bin_path).unwrap(), recorder.snapshots);

    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn test_loading_missing_archive_fails() {
    let dir = scratch("missing");
    assert!(load_states_json(dir.join("absent.json")).is_err());
    assert!(load_states_bincode(dir.join("absent.bin")).is_err());
    fs::remove_dir_all(dir).unwrap();
}
