#![deny(missing_docs)]

//! Foliated triangulations of a spherical shell: classification, repair,
//! simplex counts and OFF persistence.

/// Cell and edge classification by time value.
pub mod classify;
mod errors;
/// The foliated triangulation and its repair loop.
pub mod foliated;
/// Initial foliated sphere construction.
pub mod generators;
/// Simplex count snapshots.
pub mod geometry;
/// Triangulation plus geometry bundle used by the move engine.
pub mod manifold;
/// OFF file persistence.
pub mod off;

pub use classify::{classify_edge, expected_cell_type, time_span, CellType, EdgeClass};
pub use foliated::{fix_foliation, FoliatedTriangulation};
pub use generators::make_foliated_sphere;
pub use geometry::Geometry3;
pub use manifold::Manifold3;
pub use off::{make_filename, parse_off, read_off, to_off_string, write_off};

/// Radius of the first timeslice.
pub const INITIAL_RADIUS: f64 = 1.0;

/// Radial distance between consecutive timeslices.
pub const FOLIATION_SPACING: f64 = 1.0;

/// Radial tolerance used when checking vertex placement.
pub const TOLERANCE: f64 = 0.01;

/// Upper bound on foliation repair passes before giving up.
pub const MAX_FOLIATION_FIX_PASSES: usize = 500;
