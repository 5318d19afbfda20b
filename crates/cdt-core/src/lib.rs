#![deny(missing_docs)]
#![doc = "Core handles, error taxonomy and the triangulation capability contract for the CDT engine."]

use std::iter::ExactSizeIterator;

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod provenance;
pub mod rng;
mod types;

pub use errors::{CdtError, ErrorInfo};
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{derive_substream_seed, RngHandle};
pub use types::{norm, CausalVertex, Couplings, Point3, TimeValue};

/// Identifier for a vertex owned by a [`Triangulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(u64);

impl VertexId {
    /// Creates a new identifier from its raw integer representation.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the identifier.
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

/// Identifier for a 3-cell owned by a [`Triangulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellId(u64);

impl CellId {
    /// Creates a new identifier from its raw integer representation.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the identifier.
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

/// Unordered vertex pair stored with the smaller handle first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    first: VertexId,
    second: VertexId,
}

impl Edge {
    /// Creates the canonical edge between two vertices.
    pub fn new(a: VertexId, b: VertexId) -> Self {
        if a <= b {
            Self {
                first: a,
                second: b,
            }
        } else {
            Self {
                first: b,
                second: a,
            }
        }
    }

    /// Endpoint with the smaller handle.
    pub fn first(&self) -> VertexId {
        self.first
    }

    /// Endpoint with the larger handle.
    pub fn second(&self) -> VertexId {
        self.second
    }

    /// Returns true when `vertex` is an endpoint.
    pub fn contains(&self, vertex: VertexId) -> bool {
        self.first == vertex || self.second == vertex
    }
}

/// Capability set the foliation layer and the move engine need from a triangulation engine.
///
/// Handles are opaque indices into storage owned by the implementor; no
/// caller ever holds references into the structure itself.
pub trait Triangulation: Send + Sync {
    /// Builds or extends the triangulation from causal vertices. Existing handles are invalidated.
    fn insert(&mut self, vertices: &[CausalVertex]) -> Result<(), CdtError>;

    /// Flips the facet of `cell` opposite its vertex `facet` into the dual edge (2 cells to 3).
    fn flip_facet(&mut self, cell: CellId, facet: usize) -> bool;

    /// Flips an edge of degree three into its dual triangle (3 cells to 2).
    fn flip_edge(&mut self, edge: Edge) -> bool;

    /// Inserts a new vertex at the centroid of the facet of `cell` opposite vertex `facet`.
    fn insert_in_facet(&mut self, cell: CellId, facet: usize) -> Result<VertexId, CdtError>;

    /// Removes a single vertex, re-triangulating its star locally.
    fn remove_vertex(&mut self, vertex: VertexId) -> Result<(), CdtError>;

    /// Removes a set of vertices and re-triangulates the remaining point set.
    fn remove_vertices(&mut self, vertices: &[VertexId]) -> Result<(), CdtError>;

    /// Returns the cells incident to `vertex`, ordered by handle.
    fn incident_cells(&self, vertex: VertexId) -> Result<Vec<CellId>, CdtError>;

    /// Reports combinatorial validity of the whole structure.
    fn is_valid(&self) -> bool;

    /// Iterates over all live cells.
    fn cells(&self) -> Box<dyn ExactSizeIterator<Item = CellId> + '_>;

    /// Iterates over all live vertices.
    fn vertices(&self) -> Box<dyn ExactSizeIterator<Item = VertexId> + '_>;

    /// Returns all edges, sorted and without duplicates.
    fn edges(&self) -> Vec<Edge>;

    /// Returns the number of distinct facets.
    fn facet_count(&self) -> usize;

    /// Returns the four vertices of a cell.
    fn cell_vertices(&self, cell: CellId) -> Result<[VertexId; 4], CdtError>;

    /// Returns the neighbor across the facet opposite vertex `index`, if any.
    fn neighbor(&self, cell: CellId, index: usize) -> Result<Option<CellId>, CdtError>;

    /// Returns the time value carried by a vertex.
    fn time_value(&self, vertex: VertexId) -> Result<TimeValue, CdtError>;

    /// Overwrites the time value carried by a vertex.
    fn set_time_value(&mut self, vertex: VertexId, time: TimeValue) -> Result<(), CdtError>;

    /// Returns the embedding point of a vertex.
    fn point(&self, vertex: VertexId) -> Result<Point3, CdtError>;
}
