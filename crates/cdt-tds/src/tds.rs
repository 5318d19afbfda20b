use std::collections::{BTreeMap, BTreeSet, VecDeque};

use cdt_core::errors::{CdtError, ErrorInfo};
use cdt_core::{CausalVertex, CellId, Edge, Point3, TimeValue, Triangulation, VertexId};

use crate::delaunay::delaunay_triangulation;
use crate::flips::FlipDryRun;
use crate::ids::{
    all_distinct, cell_index, facet_key, make_cell, make_vertex, sorted_cell, vertex_index,
    FacetKey,
};

#[derive(Debug, Clone)]
pub(crate) struct VertexRecord {
    pub(crate) alive: bool,
    pub(crate) point: Point3,
    pub(crate) time: TimeValue,
    pub(crate) cell: Option<CellId>,
}

#[derive(Debug, Clone)]
pub(crate) struct CellRecord {
    pub(crate) alive: bool,
    pub(crate) vertices: [VertexId; 4],
    pub(crate) neighbors: [Option<CellId>; 4],
}

/// Index-arena triangulation of a 3-manifold with boundary.
///
/// Neighbor slot `i` of a cell refers to the cell across the facet opposite
/// vertex `i`; `None` marks a boundary facet. Dead vertex and cell slots are
/// recycled through free lists so long chains do not grow the arena without bound.
#[derive(Debug, Clone, Default)]
pub struct Tds3 {
    pub(crate) vertices: Vec<VertexRecord>,
    pub(crate) cells: Vec<CellRecord>,
    pub(crate) free_vertices: Vec<usize>,
    pub(crate) free_cells: Vec<usize>,
}

impl Tds3 {
    /// Creates an empty triangulation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a triangulation from explicit cells given as indices into `vertices`.
    pub fn from_cells(vertices: &[CausalVertex], cells: &[[usize; 4]]) -> Result<Self, CdtError> {
        let mut tds = Tds3 {
            vertices: vertices
                .iter()
                .map(|vertex| VertexRecord {
                    alive: true,
                    point: vertex.point,
                    time: vertex.time,
                    cell: None,
                })
                .collect(),
            cells: Vec::with_capacity(cells.len()),
            free_vertices: Vec::new(),
            free_cells: Vec::new(),
        };
        for (position, cell) in cells.iter().enumerate() {
            if let Some(&bad) = cell.iter().find(|&&index| index >= vertices.len()) {
                return Err(tds_error("unknown-vertex", "cell references a missing vertex")
                    .with_context("cell", position)
                    .with_context("vertex", bad));
            }
            let handles = cell.map(make_vertex);
            if !all_distinct(&handles) {
                return Err(tds_error("degenerate-cell", "cell repeats a vertex")
                    .with_context("cell", position));
            }
            tds.cells.push(CellRecord {
                alive: true,
                vertices: handles,
                neighbors: [None; 4],
            });
        }
        tds.link_all()?;
        Ok(tds)
    }

    /// Number of live vertices.
    pub fn number_of_vertices(&self) -> usize {
        self.vertices.iter().filter(|vertex| vertex.alive).count()
    }

    /// Number of vertex slots, live or dead, held by the arena.
    pub fn vertex_capacity(&self) -> usize {
        self.vertices.len()
    }

    /// Number of live cells.
    pub fn number_of_cells(&self) -> usize {
        self.cells.len() - self.free_cells.len()
    }

    /// Returns the live vertices as causal vertices in handle order.
    pub fn causal_vertices(&self) -> Vec<CausalVertex> {
        self.vertices
            .iter()
            .filter(|vertex| vertex.alive)
            .map(|vertex| CausalVertex::new(vertex.point, vertex.time))
            .collect()
    }

    /// Moves a vertex to a new embedding point.
    pub fn set_point(&mut self, vertex: VertexId, point: Point3) -> Result<(), CdtError> {
        self.vertex_mut(vertex)?.point = point;
        Ok(())
    }

    /// Index, inside the neighbor across facet `index`, of the vertex opposite the shared facet.
    pub fn mirror_index(&self, cell: CellId, index: usize) -> Result<Option<usize>, CdtError> {
        let record = self.cell(cell)?;
        let Some(neighbor) = record.neighbors.get(index).copied().flatten() else {
            return Ok(None);
        };
        let other = self.cell(neighbor)?;
        Ok(other
            .vertices
            .iter()
            .position(|vertex| !record.vertices.contains(vertex)))
    }

    /// Returns the cells containing both endpoints of `edge`, ordered by handle.
    pub fn edge_cells(&self, edge: Edge) -> Result<Vec<CellId>, CdtError> {
        let incident = self.incident_cells(edge.first())?;
        let mut result = Vec::new();
        for cell in incident {
            if self.cell(cell)?.vertices.contains(&edge.second()) {
                result.push(cell);
            }
        }
        Ok(result)
    }

    /// Returns true when some cell contains both vertices.
    pub fn has_edge(&self, a: VertexId, b: VertexId) -> Result<bool, CdtError> {
        if a == b {
            return Ok(true);
        }
        Ok(!self.edge_cells(Edge::new(a, b))?.is_empty())
    }

    /// Returns true when some cell contains all three vertices.
    pub fn has_facet(&self, triangle: &[VertexId; 3]) -> Result<bool, CdtError> {
        for cell in self.incident_cells(triangle[0])? {
            let record = self.cell(cell)?;
            if triangle.iter().all(|vertex| record.vertices.contains(vertex)) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Vertices sharing an edge with `vertex`.
    pub fn adjacent_vertices(&self, vertex: VertexId) -> Result<BTreeSet<VertexId>, CdtError> {
        let mut adjacent = BTreeSet::new();
        for cell in self.incident_cells(vertex)? {
            for &other in &self.cell(cell)?.vertices {
                if other != vertex {
                    adjacent.insert(other);
                }
            }
        }
        Ok(adjacent)
    }

    /// Number of edges incident to `vertex`.
    pub fn degree(&self, vertex: VertexId) -> Result<usize, CdtError> {
        Ok(self.adjacent_vertices(vertex)?.len())
    }

    /// Returns true when the facet opposite `index` lies on the boundary.
    pub fn is_boundary_facet(&self, cell: CellId, index: usize) -> Result<bool, CdtError> {
        let record = self.cell(cell)?;
        match record.neighbors.get(index) {
            Some(neighbor) => Ok(neighbor.is_none()),
            None => Err(tds_error("facet-index", "facet index must be in 0..4")
                .with_context("index", index)),
        }
    }

    /// Replaces a ball of cells by another triangulation of the same boundary.
    ///
    /// The added cells must pair up among themselves on interior facets and
    /// re-cover every boundary facet of the removed set exactly once. The
    /// check runs before any mutation, so an error leaves `self` untouched.
    /// Vertices that only occurred inside the removed ball lose their cell
    /// hint and must be killed by the caller.
    pub fn replace_cells(
        &mut self,
        removed: &[CellId],
        added: &[[VertexId; 4]],
    ) -> Result<Vec<CellId>, CdtError> {
        let removed_set: BTreeSet<CellId> = removed.iter().copied().collect();
        if removed_set.len() != removed.len() {
            return Err(tds_error("duplicate-removal", "a cell was listed twice"));
        }

        let mut boundary: BTreeMap<FacetKey, Option<(CellId, usize)>> = BTreeMap::new();
        for &cell in removed {
            let record = self.cell(cell)?;
            for index in 0..4 {
                let key = facet_key(&record.vertices, index);
                let external = match record.neighbors[index] {
                    Some(neighbor) if removed_set.contains(&neighbor) => continue,
                    Some(neighbor) => {
                        let mirror = self.mirror_index(cell, index)?.ok_or_else(|| {
                            tds_error("broken-adjacency", "neighbor does not share the facet")
                                .with_context("cell", cell.as_raw())
                        })?;
                        Some((neighbor, mirror))
                    }
                    None => None,
                };
                if boundary.insert(key, external).is_some() {
                    return Err(tds_error(
                        "non-manifold-ball",
                        "removed cells expose the same facet twice",
                    ));
                }
            }
        }

        let mut pairing: BTreeMap<FacetKey, Vec<(usize, usize)>> = BTreeMap::new();
        for (position, cell) in added.iter().enumerate() {
            if !all_distinct(cell) {
                return Err(tds_error("degenerate-cell", "replacement cell repeats a vertex")
                    .with_context("cell", position));
            }
            for vertex in cell {
                self.vertex(*vertex)?;
            }
            for index in 0..4 {
                pairing
                    .entry(facet_key(cell, index))
                    .or_default()
                    .push((position, index));
            }
        }
        let mut covered = 0usize;
        for (key, slots) in &pairing {
            match (slots.len(), boundary.contains_key(key)) {
                (1, true) => covered += 1,
                (2, false) => {}
                _ => {
                    return Err(tds_error(
                        "boundary-mismatch",
                        "replacement does not match the boundary of the removed cells",
                    )
                    .with_context("uses", slots.len()))
                }
            }
        }
        if covered != boundary.len() {
            return Err(tds_error(
                "boundary-mismatch",
                "replacement leaves part of the boundary uncovered",
            )
            .with_context("covered", covered)
            .with_context("boundary", boundary.len()));
        }

        let mut orphaned: BTreeSet<VertexId> = BTreeSet::new();
        for &cell in removed {
            let slot = cell_index(cell);
            orphaned.extend(self.cells[slot].vertices);
            self.cells[slot].alive = false;
            self.cells[slot].neighbors = [None; 4];
            self.free_cells.push(slot);
        }

        let mut created = Vec::with_capacity(added.len());
        for cell in added {
            let id = self.allocate_cell(*cell);
            for vertex in cell {
                orphaned.remove(vertex);
                self.vertices[vertex_index(*vertex)].cell = Some(id);
            }
            created.push(id);
        }
        for vertex in orphaned {
            self.vertices[vertex_index(vertex)].cell = None;
        }

        for (key, slots) in &pairing {
            if let [(a, ia), (b, ib)] = slots.as_slice() {
                self.cells[cell_index(created[*a])].neighbors[*ia] = Some(created[*b]);
                self.cells[cell_index(created[*b])].neighbors[*ib] = Some(created[*a]);
            } else if let [(a, ia)] = slots.as_slice() {
                if let Some(Some((outer, mirror))) = boundary.get(key) {
                    self.cells[cell_index(created[*a])].neighbors[*ia] = Some(*outer);
                    self.cells[cell_index(*outer)].neighbors[*mirror] = Some(created[*a]);
                }
            }
        }
        Ok(created)
    }

    /// Adds a vertex with no incident cell yet, reusing a dead slot when one exists.
    pub(crate) fn push_vertex(&mut self, point: Point3, time: TimeValue) -> VertexId {
        let record = VertexRecord {
            alive: true,
            point,
            time,
            cell: None,
        };
        match self.free_vertices.pop() {
            Some(slot) => {
                self.vertices[slot] = record;
                make_vertex(slot)
            }
            None => {
                self.vertices.push(record);
                make_vertex(self.vertices.len() - 1)
            }
        }
    }

    /// Undoes the latest [`push_vertex`](Self::push_vertex); `arena_len` is
    /// the slot count observed before that call.
    pub(crate) fn discard_vertex(&mut self, vertex: VertexId, arena_len: usize) {
        if self.vertices.len() > arena_len {
            self.vertices.truncate(arena_len);
            return;
        }
        let slot = vertex_index(vertex);
        self.vertices[slot].alive = false;
        self.vertices[slot].cell = None;
        self.free_vertices.push(slot);
    }

    pub(crate) fn kill_vertex(&mut self, vertex: VertexId) -> Result<(), CdtError> {
        let record = self.vertex_mut(vertex)?;
        record.alive = false;
        record.cell = None;
        self.free_vertices.push(vertex_index(vertex));
        Ok(())
    }

    fn allocate_cell(&mut self, vertices: [VertexId; 4]) -> CellId {
        let record = CellRecord {
            alive: true,
            vertices,
            neighbors: [None; 4],
        };
        match self.free_cells.pop() {
            Some(slot) => {
                self.cells[slot] = record;
                make_cell(slot)
            }
            None => {
                self.cells.push(record);
                make_cell(self.cells.len() - 1)
            }
        }
    }

    /// Recomputes every neighbor link and vertex hint from the live cells.
    pub(crate) fn link_all(&mut self) -> Result<(), CdtError> {
        let mut facets: BTreeMap<FacetKey, Vec<(usize, usize)>> = BTreeMap::new();
        for (slot, cell) in self.cells.iter().enumerate() {
            if !cell.alive {
                continue;
            }
            for index in 0..4 {
                facets
                    .entry(facet_key(&cell.vertices, index))
                    .or_default()
                    .push((slot, index));
            }
        }
        for cell in self.cells.iter_mut() {
            cell.neighbors = [None; 4];
        }
        for (key, slots) in facets {
            match slots.as_slice() {
                [_] => {}
                [(a, ia), (b, ib)] => {
                    self.cells[*a].neighbors[*ia] = Some(make_cell(*b));
                    self.cells[*b].neighbors[*ib] = Some(make_cell(*a));
                }
                _ => {
                    return Err(tds_error("non-manifold-facet", "facet shared by more than two cells")
                        .with_context("facet", format!("{:?}", key.map(|v| v.as_raw())))
                        .with_context("cells", slots.len()))
                }
            }
        }
        for vertex in self.vertices.iter_mut() {
            vertex.cell = None;
        }
        for (slot, cell) in self.cells.iter().enumerate() {
            if !cell.alive {
                continue;
            }
            for vertex in cell.vertices {
                let record = self.vertices.get_mut(vertex_index(vertex)).ok_or_else(|| {
                    tds_error("unknown-vertex", "cell references a missing vertex")
                        .with_context("vertex", vertex.as_raw())
                })?;
                if record.cell.is_none() {
                    record.cell = Some(make_cell(slot));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn cell(&self, id: CellId) -> Result<&CellRecord, CdtError> {
        self.cells
            .get(cell_index(id))
            .filter(|record| record.alive)
            .ok_or_else(|| {
                tds_error("unknown-cell", "cell does not exist").with_context("cell", id.as_raw())
            })
    }

    pub(crate) fn vertex(&self, id: VertexId) -> Result<&VertexRecord, CdtError> {
        self.vertices
            .get(vertex_index(id))
            .filter(|record| record.alive)
            .ok_or_else(|| {
                tds_error("unknown-vertex", "vertex does not exist")
                    .with_context("vertex", id.as_raw())
            })
    }

    fn vertex_mut(&mut self, id: VertexId) -> Result<&mut VertexRecord, CdtError> {
        self.vertices
            .get_mut(vertex_index(id))
            .filter(|record| record.alive)
            .ok_or_else(|| {
                tds_error("unknown-vertex", "vertex does not exist")
                    .with_context("vertex", id.as_raw())
            })
    }

    fn cell_ids(&self) -> Vec<CellId> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.alive)
            .map(|(slot, _)| make_cell(slot))
            .collect()
    }

    fn vertex_ids(&self) -> Vec<VertexId> {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, vertex)| vertex.alive)
            .map(|(slot, _)| make_vertex(slot))
            .collect()
    }

    fn validate(&self) -> Result<(), CdtError> {
        let mut seen = BTreeSet::new();
        let mut facet_uses: BTreeMap<FacetKey, usize> = BTreeMap::new();
        let mut containing: BTreeMap<VertexId, usize> = BTreeMap::new();
        for id in self.cell_ids() {
            let record = self.cell(id)?;
            if !all_distinct(&record.vertices) {
                return Err(tds_error("degenerate-cell", "cell repeats a vertex")
                    .with_context("cell", id.as_raw()));
            }
            for vertex in record.vertices {
                self.vertex(vertex)?;
                *containing.entry(vertex).or_default() += 1;
            }
            if !seen.insert(sorted_cell(&record.vertices)) {
                return Err(tds_error("duplicate-cell", "two cells share all vertices")
                    .with_context("cell", id.as_raw()));
            }
            for index in 0..4 {
                *facet_uses
                    .entry(facet_key(&record.vertices, index))
                    .or_default() += 1;
                let Some(neighbor) = record.neighbors[index] else {
                    continue;
                };
                let other = self.cell(neighbor)?;
                let facet = facet_key(&record.vertices, index);
                if !facet.iter().all(|vertex| other.vertices.contains(vertex)) {
                    return Err(tds_error("broken-adjacency", "neighbors do not share the facet")
                        .with_context("cell", id.as_raw())
                        .with_context("neighbor", neighbor.as_raw()));
                }
                let back = other
                    .vertices
                    .iter()
                    .position(|vertex| !record.vertices.contains(vertex));
                if back.and_then(|mirror| other.neighbors[mirror]) != Some(id) {
                    return Err(tds_error("asymmetric-adjacency", "neighbor link is one sided")
                        .with_context("cell", id.as_raw())
                        .with_context("neighbor", neighbor.as_raw()));
                }
            }
        }
        if let Some((_, uses)) = facet_uses.iter().find(|(_, uses)| **uses > 2) {
            return Err(tds_error("non-manifold-facet", "facet shared by more than two cells")
                .with_context("cells", *uses));
        }
        for vertex in self.vertex_ids() {
            let expected = containing.get(&vertex).copied().unwrap_or(0);
            if expected == 0 {
                return Err(tds_error("isolated-vertex", "vertex has no incident cell")
                    .with_context("vertex", vertex.as_raw()));
            }
            let star = self.incident_cells(vertex)?;
            if star.len() != expected {
                return Err(tds_error("disconnected-star", "vertex star is not connected")
                    .with_context("vertex", vertex.as_raw())
                    .with_context("reached", star.len())
                    .with_context("expected", expected));
            }
        }
        Ok(())
    }

    /// Validity check returning the first violation found.
    pub fn check_validity(&self) -> Result<(), CdtError> {
        self.validate()
    }
}

impl Triangulation for Tds3 {
    fn insert(&mut self, vertices: &[CausalVertex]) -> Result<(), CdtError> {
        let mut points = self.causal_vertices();
        points.extend_from_slice(vertices);
        *self = delaunay_triangulation(&points)?;
        Ok(())
    }

    fn flip_facet(&mut self, cell: CellId, facet: usize) -> bool {
        match self.flip_facet_dry_run(cell, facet) {
            FlipDryRun::Valid { removed, created } => {
                self.replace_cells(&removed, &created).is_ok()
            }
            FlipDryRun::Invalid(_) => false,
        }
    }

    fn flip_edge(&mut self, edge: Edge) -> bool {
        match self.flip_edge_dry_run(edge) {
            FlipDryRun::Valid { removed, created } => {
                self.replace_cells(&removed, &created).is_ok()
            }
            FlipDryRun::Invalid(_) => false,
        }
    }

    fn insert_in_facet(&mut self, cell: CellId, facet: usize) -> Result<VertexId, CdtError> {
        self.split_facet(cell, facet)
    }

    fn remove_vertex(&mut self, vertex: VertexId) -> Result<(), CdtError> {
        match self.remove_vertex_dry_run(vertex) {
            FlipDryRun::Valid { removed, created } => {
                self.replace_cells(&removed, &created)?;
                self.kill_vertex(vertex)
            }
            FlipDryRun::Invalid(err) => Err(err),
        }
    }

    fn remove_vertices(&mut self, vertices: &[VertexId]) -> Result<(), CdtError> {
        let doomed: BTreeSet<VertexId> = vertices.iter().copied().collect();
        for vertex in &doomed {
            self.vertex(*vertex)?;
        }
        let remaining: Vec<CausalVertex> = self
            .vertex_ids()
            .into_iter()
            .filter(|vertex| !doomed.contains(vertex))
            .map(|vertex| {
                let record = &self.vertices[vertex_index(vertex)];
                CausalVertex::new(record.point, record.time)
            })
            .collect();
        *self = delaunay_triangulation(&remaining)?;
        Ok(())
    }

    fn incident_cells(&self, vertex: VertexId) -> Result<Vec<CellId>, CdtError> {
        let record = self.vertex(vertex)?;
        let Some(start) = record.cell else {
            return Ok(Vec::new());
        };
        let mut visited = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            let cell = self.cell(current)?;
            for index in 0..4 {
                if cell.vertices[index] == vertex {
                    continue;
                }
                if let Some(neighbor) = cell.neighbors[index] {
                    if visited.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }
        Ok(visited.into_iter().collect())
    }

    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    fn cells(&self) -> Box<dyn ExactSizeIterator<Item = CellId> + '_> {
        Box::new(self.cell_ids().into_iter())
    }

    fn vertices(&self) -> Box<dyn ExactSizeIterator<Item = VertexId> + '_> {
        Box::new(self.vertex_ids().into_iter())
    }

    fn edges(&self) -> Vec<Edge> {
        let mut edges = BTreeSet::new();
        for cell in self.cells.iter().filter(|cell| cell.alive) {
            for a in 0..4 {
                for b in (a + 1)..4 {
                    edges.insert(Edge::new(cell.vertices[a], cell.vertices[b]));
                }
            }
        }
        edges.into_iter().collect()
    }

    fn facet_count(&self) -> usize {
        let mut count = 0;
        for (slot, cell) in self.cells.iter().enumerate() {
            if !cell.alive {
                continue;
            }
            for neighbor in cell.neighbors {
                match neighbor {
                    None => count += 1,
                    Some(other) if cell_index(other) > slot => count += 1,
                    Some(_) => {}
                }
            }
        }
        count
    }

    fn cell_vertices(&self, cell: CellId) -> Result<[VertexId; 4], CdtError> {
        Ok(self.cell(cell)?.vertices)
    }

    fn neighbor(&self, cell: CellId, index: usize) -> Result<Option<CellId>, CdtError> {
        let record = self.cell(cell)?;
        record.neighbors.get(index).copied().ok_or_else(|| {
            tds_error("facet-index", "facet index must be in 0..4").with_context("index", index)
        })
    }

    fn time_value(&self, vertex: VertexId) -> Result<TimeValue, CdtError> {
        Ok(self.vertex(vertex)?.time)
    }

    fn set_time_value(&mut self, vertex: VertexId, time: TimeValue) -> Result<(), CdtError> {
        self.vertex_mut(vertex)?.time = time;
        Ok(())
    }

    fn point(&self, vertex: VertexId) -> Result<Point3, CdtError> {
        Ok(self.vertex(vertex)?.point)
    }
}

pub(crate) fn tds_error(code: impl Into<String>, message: impl Into<String>) -> CdtError {
    CdtError::Triangulation(ErrorInfo::new(code, message))
}

pub(crate) trait ContextExt {
    fn with_context(self, key: impl Into<String>, value: impl ToString) -> CdtError;
}

impl ContextExt for CdtError {
    fn with_context(self, key: impl Into<String>, value: impl ToString) -> CdtError {
        match self {
            CdtError::Triangulation(info) => CdtError::Triangulation(info.with_context(key, value)),
            other => other,
        }
    }
}
