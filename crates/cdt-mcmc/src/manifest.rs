use std::fs;
use std::path::{Path, PathBuf};

use cdt_core::errors::CdtError;
use cdt_core::RunProvenance;
use cdt_foliation::Geometry3;
use serde::{Deserialize, Serialize};

use crate::config::{Algorithm, RunConfig};
use crate::errors::io_error;
use crate::tracker::MoveStatistics;

/// Structured manifest describing a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Configuration used for the run.
    pub config: RunConfig,
    /// Acceptance rule the chain ran with.
    #[serde(default)]
    pub algorithm: Algorithm,
    /// Master seed proposals were derived from.
    pub master_seed: u64,
    /// Optional seed label captured from the configuration.
    pub seed_label: Option<String>,
    /// Schema, starting hash, timestamp and tool versions.
    pub provenance: RunProvenance,
    /// Canonical hash of the final triangulation.
    pub final_hash: String,
    /// Simplex counts of the final triangulation.
    pub final_geometry: Geometry3,
    /// Bulk action of the final triangulation.
    pub final_action: f64,
    /// Move counters over the whole run.
    pub statistics: MoveStatistics,
    /// Metrics file produced during the run (relative to the run directory).
    pub metrics_file: Option<PathBuf>,
    /// Checkpoint files still on disk, oldest first (relative to the run directory).
    pub checkpoints: Vec<PathBuf>,
    /// Final OFF export (relative to the run directory).
    pub end_state_file: Option<PathBuf>,
}

impl RunManifest {
    /// Writes the manifest to a JSON file.
    pub fn write(&self, path: &Path) -> Result<(), CdtError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| io_error("manifest-mkdir", err, parent))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| io_error("manifest-serialize", err, path))?;
        fs::write(path, json).map_err(|err| io_error("manifest-write", err, path))
    }

    /// Loads a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, CdtError> {
        let contents =
            fs::read_to_string(path).map_err(|err| io_error("manifest-read", err, path))?;
        serde_json::from_str(&contents).map_err(|err| io_error("manifest-parse", err, path))
    }
}
