use std::fs;
use std::path::Path;

use cdt_mcmc::{build_universe, resume, run, CheckpointPayload, RunConfig, RunManifest};
use tempfile::tempdir;

fn checkpoint_config(root: &Path) -> RunConfig {
    let mut config = RunConfig::default();
    config.universe.simplices = 60;
    config.universe.timeslices = 3;
    config.passes = 3;
    config.seed_policy.master_seed = 888;
    config.output.run_directory = Some(root.join("run"));
    config.checkpoint.interval = 1;
    config
}

#[test]
fn resume_from_checkpoint_preserves_hashes() {
    let dir = tempdir().unwrap();
    let config = checkpoint_config(dir.path());

    let outcome = run(&config, build_universe(&config).unwrap()).unwrap();
    let summary = outcome.summary;
    assert_eq!(summary.checkpoints.len(), 3);

    let first = &summary.checkpoints[0];
    let payload = CheckpointPayload::load(first).unwrap();
    assert_eq!(payload.pass, 1);
    assert!(payload.off_snapshot.as_ref().unwrap().exists());

    let resumed = resume(first).unwrap();
    assert_eq!(summary.final_hash, resumed.summary.final_hash);
    assert_eq!(summary.final_geometry, resumed.summary.final_geometry);
    assert_eq!(resumed.summary.samples.len(), 2);
    assert_eq!(summary.samples[1..], resumed.summary.samples[..]);

    let last = summary.checkpoints.last().unwrap();
    let finished = resume(last).unwrap();
    assert_eq!(summary.final_hash, finished.summary.final_hash);
    assert!(finished.summary.samples.is_empty());
}

#[test]
fn run_directory_holds_every_artefact() {
    let dir = tempdir().unwrap();
    let config = checkpoint_config(dir.path());
    let summary = run(&config, build_universe(&config).unwrap())
        .unwrap()
        .summary;

    let metrics = fs::read_to_string(summary.metrics_path.as_ref().unwrap()).unwrap();
    assert_eq!(metrics.lines().count(), config.passes + 1);
    assert!(metrics.starts_with("pass,n3,"));

    let end_state = summary.end_state_path.as_ref().unwrap();
    assert!(end_state.exists());
    assert_eq!(end_state.extension().unwrap(), "off");

    let manifest = RunManifest::load(summary.manifest_path.as_ref().unwrap()).unwrap();
    assert_eq!(manifest.final_hash, summary.final_hash);
    assert_eq!(manifest.master_seed, 888);
    assert_eq!(manifest.checkpoints.len(), 3);
    assert_eq!(manifest.statistics, summary.statistics);
    assert!(manifest.end_state_file.is_some());
}

#[test]
fn retention_deletes_old_checkpoints() {
    let dir = tempdir().unwrap();
    let mut config = checkpoint_config(dir.path());
    config.checkpoint.max_to_keep = 1;
    let summary = run(&config, build_universe(&config).unwrap())
        .unwrap()
        .summary;

    assert_eq!(summary.checkpoints.len(), 1);
    let checkpoint_dir = dir.path().join("run").join("checkpoints");
    let files: Vec<_> = fs::read_dir(&checkpoint_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(files.len(), 2, "{files:?}");
    assert!(summary.checkpoints[0].ends_with("ckpt_00003.json"));
}
