#![deny(missing_docs)]
#![doc = include_str!("../docs/driver-api.md")]

/// Bulk action evaluation in extended precision.
pub mod action;
/// Checkpoint payloads and file naming.
pub mod checkpoint;
/// YAML configuration schema and defaults.
pub mod config;
/// Random sources derived from the master seed.
pub mod determinism;
/// The five ergodic moves.
pub mod ergodic;
mod errors;
/// Run manifest serialization helpers.
pub mod manifest;
/// Per-pass samples and coverage summaries.
pub mod metrics;
/// Metropolis-Hastings driver and public `run`/`resume` entry points.
pub mod metropolis;
/// Move tags and the expected count deltas.
pub mod moves;
/// Per-move counters.
pub mod tracker;
/// Copy-then-commit move application.
pub mod transaction;

pub use action::{
    action, action_difference, bulk_action, bulk_action_alpha_minus_one, bulk_action_alpha_one,
    ActionCounts,
};
pub use checkpoint::{checkpoint_path, CheckpointPayload};
pub use config::{
    Algorithm, CheckpointConfig, MoveConfig, OutputConfig, RunConfig, SeedPolicy, UniverseConfig,
};
pub use ergodic::{make_move, MoveOutcome};
pub use manifest::RunManifest;
pub use metrics::{CoverageMetrics, MetricSample};
pub use metropolis::{
    action_weight, build_universe, resume, run, selection_weight, RunOutcome, RunSummary,
};
pub use moves::{check_move, Move, MoveDelta};
pub use tracker::{MoveStatistics, MoveTracker};
pub use transaction::apply_move;
