use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cdt_core::errors::CdtError;
use cdt_core::{Couplings, RunProvenance, SchemaVersion};
use cdt_foliation::{make_filename, write_off, Geometry3, Manifold3};
use cdt_tds::canonical_hash;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::action::{action, action_difference, ActionCounts};
use crate::checkpoint::{checkpoint_path, CheckpointPayload};
use crate::config::{Algorithm, OutputConfig, RunConfig};
use crate::determinism;
use crate::ergodic::MoveOutcome;
use crate::errors::io_error;
use crate::manifest::RunManifest;
use crate::metrics::{CoverageMetrics, MetricSample, MetricsRecorder};
use crate::moves::Move;
use crate::tracker::MoveStatistics;
use crate::transaction::apply_move;

/// Schema of manifests written by the driver.
pub const MANIFEST_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Summary returned to callers after a run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Acceptance rule the chain ran with.
    pub algorithm: Algorithm,
    /// Move counters over the whole run.
    pub statistics: MoveStatistics,
    /// Accepted over attempted proposals, keyed by move label.
    pub acceptance_rates: BTreeMap<String, f64>,
    /// Simplex counts at the end of the run.
    pub final_geometry: Geometry3,
    /// Bulk action at the end of the run.
    pub final_action: f64,
    /// Canonical hash of the final triangulation.
    pub final_hash: String,
    /// Coverage metrics over the recorded passes.
    pub coverage: CoverageMetrics,
    /// Metrics CSV written during the run.
    pub metrics_path: Option<PathBuf>,
    /// Manifest path, if emitted.
    pub manifest_path: Option<PathBuf>,
    /// Final OFF export, if emitted.
    pub end_state_path: Option<PathBuf>,
    /// Checkpoint files still on disk, oldest first.
    pub checkpoints: Vec<PathBuf>,
    /// One sample per pass executed by this call.
    pub samples: Vec<MetricSample>,
}

/// Final manifold together with the run summary.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Manifold after the last pass.
    pub manifold: Manifold3,
    /// Statistics and artefact locations.
    pub summary: RunSummary,
}

/// Builds the initial universe described by `config.universe`.
pub fn build_universe(config: &RunConfig) -> Result<Manifold3, CdtError> {
    config.validate()?;
    let universe = &config.universe;
    let mut rng = determinism::universe_rng(config.seed_policy.master_seed);
    let manifold = Manifold3::with_parameters(
        universe.simplices,
        universe.timeslices,
        universe.initial_radius,
        universe.foliation_spacing,
        &mut rng,
    )?;
    info!(
        simplices = manifold.n3(),
        vertices = manifold.n0(),
        timeslices = universe.timeslices,
        "universe built"
    );
    Ok(manifold)
}

/// Runs the chain from `manifold` for `config.passes` passes.
pub fn run(config: &RunConfig, manifold: Manifold3) -> Result<RunOutcome, CdtError> {
    config.validate()?;
    let seed = config.seed_policy.master_seed;
    let initial_hash = canonical_hash(manifold.tds())?;
    let mut chain = Chain {
        manifold,
        statistics: MoveStatistics::default(),
    };
    info!(
        algorithm = config.algorithm.as_str(),
        passes = config.passes,
        "starting chain"
    );
    if config.algorithm == Algorithm::Metropolis && config.moves.warm_up {
        chain.warm_up(config, seed)?;
    }
    run_with_chain(config, seed, chain, 0, initial_hash)
}

/// Continues a chain from a checkpoint file up to the configured pass count.
pub fn resume(path: &Path) -> Result<RunOutcome, CdtError> {
    let payload = CheckpointPayload::load(path)?;
    payload.config.validate()?;
    let manifold = payload.restore_manifold()?;
    let initial_hash = canonical_hash(manifold.tds())?;
    info!(path = %path.display(), pass = payload.pass, "resuming from checkpoint");
    let chain = Chain {
        manifold,
        statistics: payload.statistics,
    };
    let start_pass = payload.pass.min(payload.config.passes);
    run_with_chain(
        &payload.config,
        payload.master_seed,
        chain,
        start_pass,
        initial_hash,
    )
}

struct Chain {
    manifold: Manifold3,
    statistics: MoveStatistics,
}

/// Metropolis factor a1: the share of `mv` among all attempted proposals, or 1 before any.
pub fn selection_weight(statistics: &MoveStatistics, mv: Move) -> f64 {
    match statistics.attempted.total() {
        0 => 1.0,
        total => statistics.attempted[mv] as f64 / total as f64,
    }
}

/// Metropolis factor a2 for applying `mv` to a triangulation with counts `geometry`.
///
/// With `ΔS = S(current) - S(proposed)` the factor is 1 when `ΔS >= 0` and
/// `exp(ΔS)` otherwise. (4,4) leaves every count alone and always scores 1.
pub fn action_weight(
    geometry: &Geometry3,
    mv: Move,
    couplings: &Couplings,
) -> Result<f64, CdtError> {
    if mv == Move::FourFour {
        return Ok(1.0);
    }
    let current = ActionCounts::from_geometry(geometry);
    let proposed = current.after(&mv.expected_delta());
    let delta = action_difference(&current, &proposed, couplings)?;
    Ok(if delta >= 0.0 { 1.0 } else { delta.exp() })
}

impl Chain {
    /// One forced transaction per enabled move so every `attempted` counter starts non-zero.
    fn warm_up(&mut self, config: &RunConfig, seed: u64) -> Result<(), CdtError> {
        for mv in config.enabled_moves() {
            let mut rng = determinism::warm_up_rng(seed, mv);
            self.statistics.attempted[mv] += 1;
            self.statistics.accepted[mv] += 1;
            let result = apply_move(&mut self.manifold, mv, &mut rng);
            self.record_transaction(mv, result)?;
        }
        info!(
            succeeded = self.statistics.succeeded.total(),
            failed = self.statistics.failed.total(),
            "warm-up complete"
        );
        Ok(())
    }

    /// Runs one pass and returns `(accepted, attempted)` proposals.
    fn pass(&mut self, config: &RunConfig, seed: u64, pass: usize) -> Result<(u64, u64), CdtError> {
        let moves = config.enabled_moves();
        let budget = self.manifold.n3();
        let mut accepted = 0;
        for attempt in 0..budget {
            let mut rng = determinism::proposal_rng(seed, pass, attempt);
            let mv = moves[rng.index(moves.len())];
            let accept = match config.algorithm {
                Algorithm::MoveAlways => true,
                Algorithm::Metropolis => {
                    let a1 = selection_weight(&self.statistics, mv);
                    let a2 = action_weight(self.manifold.geometry(), mv, &config.couplings)?;
                    rng.trial() <= a1 * a2
                }
            };
            self.statistics.attempted[mv] += 1;
            if accept {
                self.statistics.accepted[mv] += 1;
                accepted += 1;
                let result = apply_move(&mut self.manifold, mv, &mut rng);
                self.record_transaction(mv, result)?;
            } else {
                self.statistics.rejected[mv] += 1;
            }
        }
        Ok((accepted, budget as u64))
    }

    fn record_transaction(
        &mut self,
        mv: Move,
        result: Result<MoveOutcome, CdtError>,
    ) -> Result<(), CdtError> {
        match result {
            Ok(MoveOutcome::Applied) => self.statistics.succeeded[mv] += 1,
            Ok(MoveOutcome::Inapplicable { reason }) => {
                self.statistics.failed[mv] += 1;
                self.statistics.inapplicable[mv] += 1;
                warn!(mv = mv.as_str(), %reason, "move inapplicable");
            }
            Err(err) if err.is_recoverable() => {
                self.statistics.failed[mv] += 1;
                warn!(mv = mv.as_str(), %err, "transaction rolled back");
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }

    fn action(&self, config: &RunConfig) -> Result<f64, CdtError> {
        action(
            &ActionCounts::from_geometry(self.manifold.geometry()),
            &config.couplings,
        )
    }
}

fn run_with_chain(
    config: &RunConfig,
    seed: u64,
    mut chain: Chain,
    start_pass: usize,
    initial_hash: String,
) -> Result<RunOutcome, CdtError> {
    let mut recorder = MetricsRecorder::new();
    let mut checkpoints: Vec<(PathBuf, PathBuf)> = Vec::new();
    let layout = resolve_output_paths(&config.output);

    for pass in start_pass..config.passes {
        let (accepted, attempted) = chain.pass(config, seed, pass)?;
        let current_action = chain.action(config)?;
        recorder.push_sample(MetricSample {
            pass: pass + 1,
            geometry: *chain.manifold.geometry(),
            action: current_action,
            accepted,
            attempted,
            volume_per_timeslice: chain.manifold.triangulation().spacelike_facets().clone(),
        });
        info!(
            pass = pass + 1,
            n3 = chain.manifold.n3(),
            n0 = chain.manifold.n0(),
            action = current_action,
            accepted,
            attempted,
            "pass complete"
        );

        if config.checkpoint.interval > 0 && (pass + 1) % config.checkpoint.interval == 0 {
            if let Some(written) = write_checkpoint(config, seed, pass + 1, &chain, &layout)? {
                checkpoints.push(written);
                enforce_checkpoint_retention(&mut checkpoints, config.checkpoint.max_to_keep)?;
            }
        }
    }

    let final_hash = canonical_hash(chain.manifold.tds())?;
    let final_action = chain.action(config)?;
    let final_geometry = *chain.manifold.geometry();

    let metrics_path = if let (Some(run_dir), Some(metrics_rel)) =
        (layout.run_directory.as_ref(), layout.metrics_file.as_ref())
    {
        let path = run_dir.join(metrics_rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| io_error("metrics-mkdir", err, parent))?;
        }
        recorder
            .write_csv(&path)
            .map_err(|err| io_error("metrics-write", err, &path))?;
        Some(path)
    } else {
        None
    };

    let end_state_path = if let (Some(run_dir), Some(end_state_dir)) =
        (layout.run_directory.as_ref(), layout.end_state_dir.as_ref())
    {
        let path = run_dir.join(end_state_dir).join(off_filename(&chain.manifold));
        write_off(&chain.manifold, &path)?;
        Some(path)
    } else {
        None
    };

    let checkpoint_files: Vec<PathBuf> = checkpoints.into_iter().map(|(json, _)| json).collect();

    let manifest_path = if let Some(run_dir) = layout.run_directory.as_ref() {
        let path = run_dir.join(layout.manifest_file.clone().unwrap_or_default());
        let relative = |target: &PathBuf| target.strip_prefix(run_dir).ok().map(Path::to_path_buf);
        let manifest = RunManifest {
            config: config.clone(),
            algorithm: config.algorithm,
            master_seed: seed,
            seed_label: config.seed_policy.label.clone(),
            provenance: provenance(seed, initial_hash),
            final_hash: final_hash.clone(),
            final_geometry,
            final_action,
            statistics: chain.statistics,
            metrics_file: metrics_path.as_ref().and_then(relative),
            checkpoints: checkpoint_files.iter().filter_map(relative).collect(),
            end_state_file: end_state_path.as_ref().and_then(relative),
        };
        manifest.write(&path)?;
        Some(path)
    } else {
        None
    };

    info!(
        hash = %final_hash,
        n3 = final_geometry.n3,
        action = final_action,
        "run complete"
    );

    let summary = RunSummary {
        algorithm: config.algorithm,
        statistics: chain.statistics,
        acceptance_rates: aggregate_acceptance(&chain.statistics),
        final_geometry,
        final_action,
        final_hash,
        coverage: recorder.coverage(),
        metrics_path,
        manifest_path,
        end_state_path,
        checkpoints: checkpoint_files,
        samples: recorder.samples().to_vec(),
    };
    Ok(RunOutcome {
        manifold: chain.manifold,
        summary,
    })
}

fn provenance(seed: u64, initial_hash: String) -> RunProvenance {
    let mut tool_versions = BTreeMap::new();
    tool_versions.insert(
        env!("CARGO_PKG_NAME").to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    RunProvenance {
        schema_version: MANIFEST_SCHEMA,
        initial_hash,
        seed,
        created_at: Utc::now().to_rfc3339(),
        tool_versions,
    }
}

fn off_filename(manifold: &Manifold3) -> String {
    let triangulation = manifold.triangulation();
    let timeslices = (manifold.max_time() - manifold.min_time() + 1).max(0) as usize;
    make_filename(
        timeslices,
        manifold.n3(),
        triangulation.initial_radius(),
        triangulation.foliation_spacing(),
    )
}

/// Writes the checkpoint payload and its OFF snapshot; returns both paths.
fn write_checkpoint(
    config: &RunConfig,
    seed: u64,
    pass: usize,
    chain: &Chain,
    layout: &ResolvedOutput,
) -> Result<Option<(PathBuf, PathBuf)>, CdtError> {
    let run_dir = match &layout.run_directory {
        Some(dir) => dir,
        None => return Ok(None),
    };
    let checkpoint_dir = run_dir.join(layout.checkpoint_dir.clone().unwrap_or_default());
    let path = checkpoint_path(&checkpoint_dir, pass);
    let snapshot = checkpoint_dir.join(format!(
        "ckpt_{pass:05}-{}",
        off_filename(&chain.manifold)
    ));
    write_off(&chain.manifold, &snapshot)?;
    let mut payload =
        CheckpointPayload::capture(pass, config, seed, &chain.statistics, &chain.manifold)?;
    payload.off_snapshot = Some(snapshot.clone());
    payload.store(&path)?;
    info!(pass, path = %path.display(), "checkpoint written");
    Ok(Some((path, snapshot)))
}

fn enforce_checkpoint_retention(
    paths: &mut Vec<(PathBuf, PathBuf)>,
    max_to_keep: usize,
) -> Result<(), CdtError> {
    while paths.len() > max_to_keep {
        let (json, snapshot) = paths.remove(0);
        for path in [json, snapshot] {
            fs::remove_file(&path).map_err(|err| io_error("checkpoint-remove", err, &path))?;
        }
    }
    Ok(())
}

fn aggregate_acceptance(statistics: &MoveStatistics) -> BTreeMap<String, f64> {
    statistics
        .attempted
        .iter()
        .filter(|(_, attempted)| *attempted > 0)
        .map(|(mv, attempted)| {
            let rate = statistics.accepted[mv] as f64 / attempted as f64;
            (mv.as_str().to_string(), rate)
        })
        .collect()
}

#[derive(Default)]
struct ResolvedOutput {
    run_directory: Option<PathBuf>,
    metrics_file: Option<PathBuf>,
    manifest_file: Option<PathBuf>,
    checkpoint_dir: Option<PathBuf>,
    end_state_dir: Option<PathBuf>,
}

fn resolve_output_paths(config: &OutputConfig) -> ResolvedOutput {
    if config.run_directory.is_none() {
        ResolvedOutput::default()
    } else {
        ResolvedOutput {
            run_directory: config.run_directory.clone(),
            metrics_file: Some(config.metrics_file.clone()),
            manifest_file: Some(config.manifest_file.clone()),
            checkpoint_dir: Some(config.checkpoint_dir.clone()),
            end_state_dir: Some(config.end_state_dir.clone()),
        }
    }
}
