use std::fs;
use std::path::{Path, PathBuf};

use cdt_core::errors::CdtError;
use cdt_core::Couplings;
use serde::{Deserialize, Serialize};

use crate::errors::{config_error, io_error, ContextExt};
use crate::moves::Move;

/// YAML-configurable parameters governing a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Size and embedding of the initial universe.
    #[serde(default)]
    pub universe: UniverseConfig,
    /// Couplings entering the bulk action.
    #[serde(default)]
    pub couplings: Couplings,
    /// Number of passes to execute.
    #[serde(default = "default_passes")]
    pub passes: usize,
    /// How proposals are accepted.
    #[serde(default)]
    pub algorithm: Algorithm,
    /// Move selection settings.
    #[serde(default)]
    pub moves: MoveConfig,
    /// Checkpointing behaviour.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    /// Master seed and label.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Output directory configuration.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_passes() -> usize {
    100
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            universe: UniverseConfig::default(),
            couplings: Couplings::default(),
            passes: default_passes(),
            algorithm: Algorithm::default(),
            moves: MoveConfig::default(),
            checkpoint: CheckpointConfig::default(),
            seed_policy: SeedPolicy::default(),
            output: OutputConfig::default(),
        }
    }
}

impl RunConfig {
    /// Parses a configuration from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, CdtError> {
        serde_yaml::from_str(text)
            .map_err(|err| config_error("config-parse", &err.to_string()))
    }

    /// Reads and parses a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, CdtError> {
        let text = fs::read_to_string(path).map_err(|err| io_error("config-read", err, path))?;
        Self::from_yaml(&text).map_err(|err| err.with_context("path", path.display()))
    }

    /// Rejects configurations that cannot describe a run.
    pub fn validate(&self) -> Result<(), CdtError> {
        let universe = &self.universe;
        if universe.timeslices < 2 {
            return Err(config_error("timeslices", "at least two timeslices are required")
                .with_context("timeslices", universe.timeslices));
        }
        if universe.simplices == 0 {
            return Err(config_error("simplices", "simplex count must be positive"));
        }
        if !(universe.initial_radius > 0.0 && universe.initial_radius.is_finite()) {
            return Err(config_error("initial-radius", "initial radius must be positive")
                .with_context("initial_radius", universe.initial_radius));
        }
        if !(universe.foliation_spacing > 0.0 && universe.foliation_spacing.is_finite()) {
            return Err(config_error("foliation-spacing", "foliation spacing must be positive")
                .with_context("foliation_spacing", universe.foliation_spacing));
        }
        let couplings = &self.couplings;
        if ![couplings.alpha, couplings.k, couplings.lambda]
            .iter()
            .all(|value| value.is_finite())
        {
            return Err(config_error("couplings", "couplings must be finite"));
        }
        if couplings.alpha != -1.0 && couplings.alpha <= 0.0 {
            return Err(config_error("alpha", "alpha must be -1 or positive")
                .with_context("alpha", couplings.alpha));
        }
        Ok(())
    }

    /// Moves the driver draws proposals from, in table order.
    ///
    /// Move Always draws from all five; Metropolis offers (4,4) only when
    /// `moves.include_four_four` is set.
    pub fn enabled_moves(&self) -> Vec<Move> {
        let include_four_four = match self.algorithm {
            Algorithm::MoveAlways => true,
            Algorithm::Metropolis => self.moves.include_four_four,
        };
        Move::ALL
            .iter()
            .copied()
            .filter(|&mv| mv != Move::FourFour || include_four_four)
            .collect()
    }
}

/// Acceptance rule applied to each proposal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Accept with probability a1·a2 from the move frequencies and the action change.
    #[default]
    Metropolis,
    /// Apply every proposal; no warm-up and no action evaluation.
    MoveAlways,
}

impl Algorithm {
    /// Configuration spelling of the algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Metropolis => "metropolis",
            Algorithm::MoveAlways => "move_always",
        }
    }
}

/// Parameters of the initial foliated sphere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseConfig {
    /// Desired number of cells.
    #[serde(default = "default_simplices")]
    pub simplices: usize,
    /// Number of timeslices.
    #[serde(default = "default_timeslices")]
    pub timeslices: usize,
    /// Radius of the first timeslice.
    #[serde(default = "default_unit")]
    pub initial_radius: f64,
    /// Radial distance between timeslices.
    #[serde(default = "default_unit")]
    pub foliation_spacing: f64,
}

fn default_simplices() -> usize {
    640
}

fn default_timeslices() -> usize {
    4
}

fn default_unit() -> f64 {
    1.0
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            simplices: default_simplices(),
            timeslices: default_timeslices(),
            initial_radius: default_unit(),
            foliation_spacing: default_unit(),
        }
    }
}

/// Move selection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveConfig {
    /// Offer the (4,4) move to the Metropolis loop.
    #[serde(default)]
    pub include_four_four: bool,
    /// Force one attempt of every enabled move before the first pass.
    #[serde(default = "default_warm_up")]
    pub warm_up: bool,
}

fn default_warm_up() -> bool {
    true
}

impl Default for MoveConfig {
    fn default() -> Self {
        Self {
            include_four_four: false,
            warm_up: default_warm_up(),
        }
    }
}

/// Checkpointing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Passes between checkpoint writes (0 disables checkpoints).
    #[serde(default = "default_checkpoint_interval")]
    pub interval: usize,
    /// Maximum number of checkpoints to retain.
    #[serde(default = "default_checkpoint_retention")]
    pub max_to_keep: usize,
}

fn default_checkpoint_interval() -> usize {
    10
}

fn default_checkpoint_retention() -> usize {
    4
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            interval: default_checkpoint_interval(),
            max_to_keep: default_checkpoint_retention(),
        }
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in manifests.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x0C0D_7EED_5EED_0001
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Output directory layout configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for run artefacts. Nothing is written when absent.
    #[serde(default)]
    pub run_directory: Option<PathBuf>,
    /// Metrics filename relative to `run_directory`.
    #[serde(default = "default_metrics_filename")]
    pub metrics_file: PathBuf,
    /// Manifest filename relative to `run_directory`.
    #[serde(default = "default_manifest_filename")]
    pub manifest_file: PathBuf,
    /// Subdirectory used for checkpoint files.
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,
    /// Subdirectory for the final OFF export.
    #[serde(default = "default_end_state_dir")]
    pub end_state_dir: PathBuf,
}

fn default_metrics_filename() -> PathBuf {
    PathBuf::from("metrics.csv")
}

fn default_manifest_filename() -> PathBuf {
    PathBuf::from("manifest.json")
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("checkpoints")
}

fn default_end_state_dir() -> PathBuf {
    PathBuf::from("end_state")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_directory: None,
            metrics_file: default_metrics_filename(),
            manifest_file: default_manifest_filename(),
            checkpoint_dir: default_checkpoint_dir(),
            end_state_dir: default_end_state_dir(),
        }
    }
}
