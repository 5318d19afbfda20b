use std::collections::BTreeMap;

use cdt_core::errors::CdtError;
use cdt_core::{CausalVertex, CellId, Edge, RngHandle, TimeValue, Triangulation, VertexId};
use cdt_tds::Tds3;

use crate::foliated::FoliatedTriangulation;
use crate::geometry::Geometry3;

/// A foliated triangulation together with its simplex counts.
///
/// Cloning performs a deep copy of the engine, which is what move
/// transactions rely on for rollback.
#[derive(Debug, Clone)]
pub struct Manifold3 {
    triangulation: FoliatedTriangulation,
    geometry: Geometry3,
}

impl Manifold3 {
    /// Generates a foliated sphere with the default embedding constants.
    pub fn new(simplices: usize, timeslices: usize, rng: &mut RngHandle) -> Result<Self, CdtError> {
        Ok(Self::from_triangulation(FoliatedTriangulation::new(
            simplices, timeslices, rng,
        )?))
    }

    /// Generates a foliated sphere with an explicit embedding.
    pub fn with_parameters(
        simplices: usize,
        timeslices: usize,
        initial_radius: f64,
        foliation_spacing: f64,
        rng: &mut RngHandle,
    ) -> Result<Self, CdtError> {
        Ok(Self::from_triangulation(
            FoliatedTriangulation::with_parameters(
                simplices,
                timeslices,
                initial_radius,
                foliation_spacing,
                rng,
            )?,
        ))
    }

    /// Triangulates causal vertices, repairing the foliation first.
    pub fn from_causal_vertices(vertices: &[CausalVertex]) -> Result<Self, CdtError> {
        Ok(Self::from_triangulation(
            FoliatedTriangulation::from_causal_vertices(vertices)?,
        ))
    }

    /// Wraps an already classified triangulation.
    pub fn from_triangulation(triangulation: FoliatedTriangulation) -> Self {
        let geometry = Geometry3::new(&triangulation);
        Self {
            triangulation,
            geometry,
        }
    }

    /// Recomputes classification and counts after the engine was mutated.
    pub fn update(&mut self) -> Result<(), CdtError> {
        self.triangulation.rebuild()?;
        self.geometry = Geometry3::new(&self.triangulation);
        Ok(())
    }

    /// The foliated triangulation.
    pub fn triangulation(&self) -> &FoliatedTriangulation {
        &self.triangulation
    }

    /// Current simplex counts.
    pub fn geometry(&self) -> &Geometry3 {
        &self.geometry
    }

    /// Read access to the engine.
    pub fn tds(&self) -> &Tds3 {
        self.triangulation.tds()
    }

    /// Mutable access to the engine. Call [`update`](Self::update) afterwards.
    pub fn tds_mut(&mut self) -> &mut Tds3 {
        self.triangulation.tds_mut()
    }

    /// Number of cells.
    pub fn n3(&self) -> usize {
        self.geometry.n3
    }

    /// Number of (3,1) cells.
    pub fn n3_31(&self) -> usize {
        self.geometry.n3_31
    }

    /// Number of (1,3) cells.
    pub fn n3_13(&self) -> usize {
        self.geometry.n3_13
    }

    /// Number of (3,1) and (1,3) cells.
    pub fn n3_31_13(&self) -> usize {
        self.geometry.n3_31_13
    }

    /// Number of (2,2) cells.
    pub fn n3_22(&self) -> usize {
        self.geometry.n3_22
    }

    /// Number of facets.
    pub fn n2(&self) -> usize {
        self.geometry.n2
    }

    /// Number of edges.
    pub fn n1(&self) -> usize {
        self.geometry.n1
    }

    /// Number of timelike edges.
    pub fn n1_tl(&self) -> usize {
        self.geometry.n1_tl
    }

    /// Number of spacelike edges.
    pub fn n1_sl(&self) -> usize {
        self.geometry.n1_sl
    }

    /// Number of vertices.
    pub fn n0(&self) -> usize {
        self.geometry.n0
    }

    /// Smallest timeslice present.
    pub fn min_time(&self) -> TimeValue {
        self.triangulation.min_time()
    }

    /// Largest timeslice present.
    pub fn max_time(&self) -> TimeValue {
        self.triangulation.max_time()
    }

    /// Number of spacelike facets on each timeslice.
    pub fn spacelike_facets(&self) -> &BTreeMap<TimeValue, usize> {
        self.triangulation.spacelike_facets()
    }

    /// Foliated, engine-valid, consistently classified, and counted correctly.
    pub fn is_correct(&self) -> bool {
        self.triangulation.is_correct() && self.geometry == Geometry3::new(&self.triangulation)
    }

    /// Combinatorial validity of the engine.
    pub fn is_valid(&self) -> bool {
        self.triangulation.is_tds_valid()
    }

    /// Cells incident to `vertex`, ordered by handle.
    pub fn incident_cells(&self, vertex: VertexId) -> Result<Vec<CellId>, CdtError> {
        self.tds().incident_cells(vertex)
    }

    /// Number of edges at `vertex`.
    pub fn degree(&self, vertex: VertexId) -> Result<usize, CdtError> {
        self.tds().degree(vertex)
    }

    /// Cells containing `edge`, ordered by handle.
    pub fn edge_cells(&self, edge: Edge) -> Result<Vec<CellId>, CdtError> {
        self.tds().edge_cells(edge)
    }
}
