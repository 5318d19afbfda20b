//! Schema tags and run provenance stamped onto persisted artefacts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `major.minor.patch` tag of a persisted format; readers reject a different major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Bumped when old readers can no longer load the format.
    pub major: u32,
    /// Bumped when fields are added.
    pub minor: u32,
    /// Bumped for fixes that leave the layout alone.
    pub patch: u32,
}

impl SchemaVersion {
    /// Builds a tag from its three components.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

/// Where a run came from: its starting triangulation, seed and toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunProvenance {
    /// Format of the manifest carrying this record.
    pub schema_version: SchemaVersion,
    /// Canonical hash of the triangulation before the first pass.
    pub initial_hash: String,
    /// Master seed of the chain.
    pub seed: u64,
    /// RFC 3339 wall-clock time of the write.
    pub created_at: String,
    /// Crate name to crate version.
    pub tool_versions: BTreeMap<String, String>,
}
