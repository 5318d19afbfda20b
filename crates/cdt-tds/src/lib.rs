#![deny(missing_docs)]

//! Index-arena tetrahedral triangulation implementing the `cdt-core` contract.
//!
//! Cells and vertices live in flat arenas addressed by [`cdt_core::CellId`] and
//! [`cdt_core::VertexId`]. Local rewrites are planned as dry runs and applied
//! through a single boundary-checked replacement routine.

mod delaunay;
mod flips;
mod hash;
mod ids;
mod serialization;
mod tds;

pub use delaunay::delaunay_triangulation;
pub use flips::FlipDryRun;
pub use hash::canonical_hash;
pub use tds::Tds3;

/// Re-export serialization helpers for downstream crates.
pub use serialization::{tds_from_bytes, tds_from_json, tds_to_bytes, tds_to_json};
