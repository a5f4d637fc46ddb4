//! Checks that the scenario files shipped with the runner load and play.

use std::path::PathBuf;

use battle_headless::{run_batch, run_battle, BatchConfig, RunConfig, Scenario};

fn scenario_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios")
}

fn scenario_files() -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(scenario_dir())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    files.sort();
    files
}

#[test]
fn test_every_scenario_file_deploys() {
    let files = scenario_files();
    assert!(!files.is_empty());
    for path in files {
        let scenario = Scenario::load(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()));
        let sim = scenario.build(1).unwrap();
        let deployed: usize = sim.status().deployed.iter().sum();
        let expected: usize = scenario.squads.iter().map(|s| s.count).sum();
        assert_eq!(deployed, expected, "{}", path.display());
    }
}

#[test]
fn test_skirmish_file_matches_builtin() {
    let loaded = Scenario::load(scenario_dir().join("skirmish.ron")).unwrap();
    assert_eq!(loaded, Scenario::skirmish());
}

#[test]
fn test_file_scenario_plays_briefly() {
    let path = scenario_dir().join("river_ford.ron");
    let scenario = Scenario::resolve(path.to_str().unwrap()).unwrap();
    let metrics = run_battle(&RunConfig::new(scenario, 3).with_max_ticks(100)).unwrap();
    assert_eq!(metrics.duration_ticks, 100);
    assert_eq!(metrics.scenario, "river_ford");
}

#[test]
fn test_batch_results_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = BatchConfig::new("siege", 2).with_max_ticks(50);
    config.output_dir = dir.path().to_path_buf();
    let results = run_batch(config).unwrap();

    let path = dir.path().join("batch_results.json");
    results.save(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["summary"]["games"], 2);
    assert_eq!(value["games"].as_array().map(Vec::len), Some(2));
}
