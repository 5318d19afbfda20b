use std::collections::{BTreeMap, BTreeSet};

use cdt_core::errors::CdtError;
use cdt_core::{norm, CausalVertex, CellId, Edge, Point3, RngHandle, TimeValue, Triangulation, VertexId};
use cdt_tds::{delaunay_triangulation, Tds3};
use tracing::{debug, warn};

use crate::classify::{classify_edge, expected_cell_type, time_span, CellType, EdgeClass};
use crate::errors::{foliation_error, simplex_error, ContextExt};
use crate::generators::make_foliated_sphere;
use crate::{FOLIATION_SPACING, INITIAL_RADIUS, MAX_FOLIATION_FIX_PASSES, TOLERANCE};

/// Triangulation whose vertices carry timeslice labels, with every cell and
/// edge classified by causal type.
///
/// The classified collections are rebuilt from scratch by [`rebuild`]
/// after any mutation of the underlying engine.
///
/// [`rebuild`]: FoliatedTriangulation::rebuild
#[derive(Debug, Clone)]
pub struct FoliatedTriangulation {
    tds: Tds3,
    initial_radius: f64,
    foliation_spacing: f64,
    classification: Classification,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Classification {
    vertices: Vec<VertexId>,
    three_one: Vec<CellId>,
    two_two: Vec<CellId>,
    one_three: Vec<CellId>,
    timelike_edges: Vec<Edge>,
    spacelike_edges: Vec<Edge>,
    facets: usize,
    spacelike_facets: BTreeMap<TimeValue, usize>,
    min_time: TimeValue,
    max_time: TimeValue,
}

impl FoliatedTriangulation {
    /// Generates a foliated sphere with the default embedding constants.
    pub fn new(simplices: usize, timeslices: usize, rng: &mut RngHandle) -> Result<Self, CdtError> {
        Self::with_parameters(simplices, timeslices, INITIAL_RADIUS, FOLIATION_SPACING, rng)
    }

    /// Generates a foliated sphere with an explicit embedding.
    pub fn with_parameters(
        simplices: usize,
        timeslices: usize,
        initial_radius: f64,
        foliation_spacing: f64,
        rng: &mut RngHandle,
    ) -> Result<Self, CdtError> {
        let tds = make_foliated_sphere(simplices, timeslices, initial_radius, foliation_spacing, rng)?;
        Self::from_parts(tds, initial_radius, foliation_spacing)
    }

    /// Triangulates arbitrary causal vertices and repairs the foliation.
    ///
    /// Vertices at the top of a cell spanning more (or less) than one
    /// timeslice are removed and the remainder re-triangulated, until every
    /// cell is valid or [`MAX_FOLIATION_FIX_PASSES`] is exhausted.
    pub fn from_causal_vertices(vertices: &[CausalVertex]) -> Result<Self, CdtError> {
        let mut tds = delaunay_triangulation(vertices)?;
        let passes = fix_foliation(&mut tds)?;
        debug!(passes, "foliation repaired");
        Self::from_tds(tds)
    }

    /// Wraps an existing engine with the default embedding constants.
    pub fn from_tds(tds: Tds3) -> Result<Self, CdtError> {
        Self::from_parts(tds, INITIAL_RADIUS, FOLIATION_SPACING)
    }

    /// Wraps an existing engine; fails if any cell is not a valid simplex type.
    pub fn from_parts(tds: Tds3, initial_radius: f64, foliation_spacing: f64) -> Result<Self, CdtError> {
        let classification = classify(&tds)?;
        Ok(Self {
            tds,
            initial_radius,
            foliation_spacing,
            classification,
        })
    }

    /// Recomputes every classified collection from the engine.
    pub fn rebuild(&mut self) -> Result<(), CdtError> {
        self.classification = classify(&self.tds)?;
        Ok(())
    }

    /// Read access to the triangulation engine.
    pub fn tds(&self) -> &Tds3 {
        &self.tds
    }

    /// Mutable access to the triangulation engine. Call [`rebuild`](Self::rebuild) afterwards.
    pub fn tds_mut(&mut self) -> &mut Tds3 {
        &mut self.tds
    }

    /// Radius of the first timeslice.
    pub fn initial_radius(&self) -> f64 {
        self.initial_radius
    }

    /// Radial distance between consecutive timeslices.
    pub fn foliation_spacing(&self) -> f64 {
        self.foliation_spacing
    }

    /// Live vertices in handle order.
    pub fn vertices(&self) -> &[VertexId] {
        &self.classification.vertices
    }

    /// Cells of type (3,1).
    pub fn three_one(&self) -> &[CellId] {
        &self.classification.three_one
    }

    /// Cells of type (2,2).
    pub fn two_two(&self) -> &[CellId] {
        &self.classification.two_two
    }

    /// Cells of type (1,3).
    pub fn one_three(&self) -> &[CellId] {
        &self.classification.one_three
    }

    /// Edges joining different timeslices.
    pub fn timelike_edges(&self) -> &[Edge] {
        &self.classification.timelike_edges
    }

    /// Edges within a single timeslice.
    pub fn spacelike_edges(&self) -> &[Edge] {
        &self.classification.spacelike_edges
    }

    /// Number of distinct facets.
    pub fn number_of_facets(&self) -> usize {
        self.classification.facets
    }

    /// Number of spacelike facets on each timeslice.
    pub fn spacelike_facets(&self) -> &BTreeMap<TimeValue, usize> {
        &self.classification.spacelike_facets
    }

    /// Smallest time value carried by a vertex.
    pub fn min_time(&self) -> TimeValue {
        self.classification.min_time
    }

    /// Largest time value carried by a vertex.
    pub fn max_time(&self) -> TimeValue {
        self.classification.max_time
    }

    /// Time value of a vertex.
    pub fn time_value(&self, vertex: VertexId) -> Result<TimeValue, CdtError> {
        self.tds.time_value(vertex)
    }

    /// Time values of the four vertices of a cell.
    pub fn cell_times(&self, cell: CellId) -> Result<[TimeValue; 4], CdtError> {
        cell_times(&self.tds, cell)
    }

    /// Simplex type of a cell.
    pub fn cell_type(&self, cell: CellId) -> Result<CellType, CdtError> {
        let times = self.cell_times(cell)?;
        expected_cell_type(times).ok_or_else(|| {
            simplex_error("invalid-cell", "cell does not span exactly one timeslice")
                .with_context("cell", cell.as_raw())
                .with_context("span", time_span(times))
        })
    }

    /// Causal class of an edge.
    pub fn edge_class(&self, edge: Edge) -> Result<EdgeClass, CdtError> {
        Ok(classify_edge(
            self.tds.time_value(edge.first())?,
            self.tds.time_value(edge.second())?,
        ))
    }

    /// Time value a point at radius `r` should carry: `round((r - I + S) / S)`.
    pub fn expected_timevalue(&self, point: &Point3) -> TimeValue {
        let radius = norm(point);
        ((radius - self.initial_radius + self.foliation_spacing) / self.foliation_spacing).round()
            as TimeValue
    }

    /// Radius of the sphere carrying timeslice `time`.
    pub fn expected_radius(&self, time: TimeValue) -> f64 {
        self.initial_radius + self.foliation_spacing * f64::from(time - 1)
    }

    /// Returns true when every cell spans exactly one timeslice.
    pub fn is_foliated(&self) -> bool {
        invalid_cells(&self.tds).map(|cells| cells.is_empty()).unwrap_or(false)
    }

    /// Combinatorial validity of the engine.
    pub fn is_tds_valid(&self) -> bool {
        self.tds.is_valid()
    }

    /// Foliated, engine-valid, and classified consistently with the engine.
    pub fn is_correct(&self) -> bool {
        self.is_foliated()
            && self.is_tds_valid()
            && classify(&self.tds)
                .map(|fresh| fresh == self.classification)
                .unwrap_or(false)
    }

    /// Returns true when every vertex lies within [`TOLERANCE`] of the sphere of its timeslice.
    pub fn check_vertices(&self) -> bool {
        self.classification.vertices.iter().all(|&vertex| {
            match (self.tds.point(vertex), self.tds.time_value(vertex)) {
                (Ok(point), Ok(time)) => {
                    (norm(&point) - self.expected_radius(time)).abs() <= TOLERANCE
                }
                _ => false,
            }
        })
    }
}

/// Repeatedly removes the top vertex of every cell not spanning exactly one
/// timeslice. Returns the number of removal passes performed.
pub fn fix_foliation(tds: &mut Tds3) -> Result<usize, CdtError> {
    for pass in 0..MAX_FOLIATION_FIX_PASSES {
        let cells = invalid_cells(tds)?;
        if cells.is_empty() {
            return Ok(pass);
        }
        let mut doomed = BTreeSet::new();
        for cell in &cells {
            doomed.insert(top_vertex(tds, *cell)?);
        }
        warn!(
            pass,
            cells = cells.len(),
            vertices = doomed.len(),
            "removing vertices that break the foliation"
        );
        let doomed: Vec<VertexId> = doomed.into_iter().collect();
        tds.remove_vertices(&doomed)?;
    }
    Err(
        foliation_error("fix-exhausted", "foliation could not be repaired")
            .with_context("passes", MAX_FOLIATION_FIX_PASSES),
    )
}

fn invalid_cells<T: Triangulation>(tds: &T) -> Result<Vec<CellId>, CdtError> {
    let mut invalid = Vec::new();
    for cell in tds.cells() {
        if time_span(cell_times(tds, cell)?) != 1 {
            invalid.push(cell);
        }
    }
    Ok(invalid)
}

/// Vertex with the largest time value in a cell; ties go to the larger handle.
fn top_vertex<T: Triangulation>(tds: &T, cell: CellId) -> Result<VertexId, CdtError> {
    let mut best: Option<(TimeValue, VertexId)> = None;
    for vertex in tds.cell_vertices(cell)? {
        let candidate = (tds.time_value(vertex)?, vertex);
        if best.map_or(true, |current| candidate > current) {
            best = Some(candidate);
        }
    }
    best.map(|(_, vertex)| vertex)
        .ok_or_else(|| simplex_error("empty-cell", "cell has no vertices"))
}

fn cell_times<T: Triangulation>(tds: &T, cell: CellId) -> Result<[TimeValue; 4], CdtError> {
    let vertices = tds.cell_vertices(cell)?;
    Ok([
        tds.time_value(vertices[0])?,
        tds.time_value(vertices[1])?,
        tds.time_value(vertices[2])?,
        tds.time_value(vertices[3])?,
    ])
}

fn classify<T: Triangulation>(tds: &T) -> Result<Classification, CdtError> {
    let mut result = Classification::default();

    let mut times = BTreeSet::new();
    for vertex in tds.vertices() {
        times.insert(tds.time_value(vertex)?);
        result.vertices.push(vertex);
    }
    result.min_time = times.first().copied().unwrap_or_default();
    result.max_time = times.last().copied().unwrap_or_default();

    for cell in tds.cells() {
        let cell_time = cell_times(tds, cell)?;
        match expected_cell_type(cell_time) {
            Some(CellType::ThreeOne) => result.three_one.push(cell),
            Some(CellType::TwoTwo) => result.two_two.push(cell),
            Some(CellType::OneThree) => result.one_three.push(cell),
            None => {
                return Err(simplex_error("invalid-cell", "cell does not span exactly one timeslice")
                    .with_context("cell", cell.as_raw())
                    .with_context("span", time_span(cell_time)))
            }
        }
        for index in 0..4 {
            let counted = match tds.neighbor(cell, index)? {
                Some(other) => other > cell,
                None => true,
            };
            if !counted {
                continue;
            }
            result.facets += 1;
            let facet_times: Vec<TimeValue> = (0..4)
                .filter(|&slot| slot != index)
                .map(|slot| cell_time[slot])
                .collect();
            if facet_times.windows(2).all(|pair| pair[0] == pair[1]) {
                *result.spacelike_facets.entry(facet_times[0]).or_default() += 1;
            }
        }
    }

    for edge in tds.edges() {
        match classify_edge(tds.time_value(edge.first())?, tds.time_value(edge.second())?) {
            EdgeClass::Timelike => result.timelike_edges.push(edge),
            EdgeClass::Spacelike => result.spacelike_edges.push(edge),
        }
    }
    Ok(result)
}
