use std::fs;
use std::path::{Path, PathBuf};

use cdt_core::errors::CdtError;
use cdt_foliation::{FoliatedTriangulation, Manifold3};
use cdt_tds::{tds_from_json, tds_to_json};
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::errors::io_error;
use crate::tracker::MoveStatistics;

/// Everything needed to continue a chain after `pass` completed passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointPayload {
    /// Number of passes completed when the checkpoint was written.
    pub pass: usize,
    /// Configuration snapshot associated with the run.
    pub config: RunConfig,
    /// Master seed proposals are derived from.
    pub master_seed: u64,
    /// Move counters accumulated so far.
    pub statistics: MoveStatistics,
    /// Radius of the first timeslice.
    pub initial_radius: f64,
    /// Radial distance between timeslices.
    pub foliation_spacing: f64,
    /// Engine state in arena-preserving JSON form.
    pub tds_json: String,
    /// OFF snapshot written next to the checkpoint, if any.
    #[serde(default)]
    pub off_snapshot: Option<PathBuf>,
}

impl CheckpointPayload {
    /// Captures the state of a run.
    pub fn capture(
        pass: usize,
        config: &RunConfig,
        master_seed: u64,
        statistics: &MoveStatistics,
        manifold: &Manifold3,
    ) -> Result<Self, CdtError> {
        let triangulation = manifold.triangulation();
        Ok(Self {
            pass,
            config: config.clone(),
            master_seed,
            statistics: *statistics,
            initial_radius: triangulation.initial_radius(),
            foliation_spacing: triangulation.foliation_spacing(),
            tds_json: tds_to_json(manifold.tds())?,
            off_snapshot: None,
        })
    }

    /// Rebuilds the manifold stored in the payload.
    pub fn restore_manifold(&self) -> Result<Manifold3, CdtError> {
        let tds = tds_from_json(&self.tds_json)?;
        let triangulation =
            FoliatedTriangulation::from_parts(tds, self.initial_radius, self.foliation_spacing)?;
        Ok(Manifold3::from_triangulation(triangulation))
    }

    /// Restores the payload from disk.
    pub fn load(path: &Path) -> Result<Self, CdtError> {
        let contents =
            fs::read_to_string(path).map_err(|err| io_error("checkpoint-read", err, path))?;
        serde_json::from_str(&contents).map_err(|err| io_error("checkpoint-parse", err, path))
    }

    /// Writes the payload to disk.
    pub fn store(&self, path: &Path) -> Result<(), CdtError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| io_error("checkpoint-mkdir", err, parent))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| io_error("checkpoint-serialize", err, path))?;
        fs::write(path, json).map_err(|err| io_error("checkpoint-write", err, path))
    }
}

/// Checkpoint file for the state after `pass` passes.
pub fn checkpoint_path(root: &Path, pass: usize) -> PathBuf {
    root.join(format!("ckpt_{pass:05}.json"))
}
