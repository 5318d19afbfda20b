use std::collections::{BTreeMap, BTreeSet};

use cdt_core::errors::CdtError;
use cdt_core::{CellId, Edge, Triangulation, VertexId};

use crate::ids::facet_key;
use crate::tds::{tds_error, ContextExt, Tds3};

/// Outcome of validating a local rewrite without mutating the triangulation.
#[derive(Debug, Clone)]
pub enum FlipDryRun {
    /// The rewrite is admissible.
    Valid {
        /// Cells that the rewrite deletes.
        removed: Vec<CellId>,
        /// Vertex sets of the cells that replace them.
        created: Vec<[VertexId; 4]>,
    },
    /// The rewrite would fail with the provided error.
    Invalid(CdtError),
}

impl FlipDryRun {
    fn from_plan(plan: Result<(Vec<CellId>, Vec<[VertexId; 4]>), CdtError>) -> Self {
        match plan {
            Ok((removed, created)) => FlipDryRun::Valid { removed, created },
            Err(err) => FlipDryRun::Invalid(err),
        }
    }

    /// Returns true when the rewrite is admissible.
    pub fn is_valid(&self) -> bool {
        matches!(self, FlipDryRun::Valid { .. })
    }
}

impl Tds3 {
    /// Validates a 2→3 flip of the facet of `cell` opposite vertex `facet`.
    pub fn flip_facet_dry_run(&self, cell: CellId, facet: usize) -> FlipDryRun {
        FlipDryRun::from_plan(self.plan_facet_flip(cell, facet))
    }

    /// Validates a 3→2 flip of `edge`.
    pub fn flip_edge_dry_run(&self, edge: Edge) -> FlipDryRun {
        FlipDryRun::from_plan(self.plan_edge_flip(edge))
    }

    /// Validates a 4→4 flip replacing `edge` by the link diagonal selected by `diagonal` (0 or 1).
    pub fn flip_44_dry_run(&self, edge: Edge, diagonal: usize) -> FlipDryRun {
        FlipDryRun::from_plan(self.plan_44_flip(edge, diagonal))
    }

    /// Validates the local removal of `vertex` (6→2 on a bipyramid star, 4→1 on a tetrahedral one).
    pub fn remove_vertex_dry_run(&self, vertex: VertexId) -> FlipDryRun {
        FlipDryRun::from_plan(self.plan_vertex_removal(vertex))
    }

    /// Performs a 4→4 flip; returns false if it is inadmissible.
    pub fn flip_44(&mut self, edge: Edge, diagonal: usize) -> bool {
        match self.flip_44_dry_run(edge, diagonal) {
            FlipDryRun::Valid { removed, created } => {
                self.replace_cells(&removed, &created).is_ok()
            }
            FlipDryRun::Invalid(_) => false,
        }
    }

    /// Applies a previously validated dry run.
    pub fn apply_dry_run(&mut self, dry_run: &FlipDryRun) -> Result<Vec<CellId>, CdtError> {
        match dry_run {
            FlipDryRun::Valid { removed, created } => self.replace_cells(removed, created),
            FlipDryRun::Invalid(err) => Err(err.clone()),
        }
    }

    /// Inserts a vertex at the centroid of a facet and splits the cells on both sides.
    pub(crate) fn split_facet(&mut self, cell: CellId, facet: usize) -> Result<VertexId, CdtError> {
        if facet > 3 {
            return Err(
                tds_error("facet-index", "facet index must be in 0..4").with_context("index", facet)
            );
        }
        let record = self.cell(cell)?;
        let apex = record.vertices[facet];
        let neighbor = record.neighbors[facet];
        let triangle = facet_key(&record.vertices, facet);
        let mut removed = vec![cell];
        let mut apexes = vec![apex];
        if let Some(other) = neighbor {
            let mirror = self.mirror_index(cell, facet)?.ok_or_else(|| {
                tds_error("broken-adjacency", "neighbor does not share the facet")
                    .with_context("cell", cell.as_raw())
            })?;
            apexes.push(self.cell(other)?.vertices[mirror]);
            removed.push(other);
        }

        let mut centroid = [0.0; 3];
        for vertex in triangle {
            let point = self.point(vertex)?;
            for axis in 0..3 {
                centroid[axis] += point[axis] / 3.0;
            }
        }
        let time = self.time_value(triangle[0])?;
        let arena_len = self.vertices.len();
        let inserted = self.push_vertex(centroid, time);

        let mut created = Vec::with_capacity(6);
        for apex in apexes {
            for skip in 0..3 {
                let (a, b) = (triangle[(skip + 1) % 3], triangle[(skip + 2) % 3]);
                created.push([a, b, inserted, apex]);
            }
        }
        if let Err(err) = self.replace_cells(&removed, &created) {
            self.discard_vertex(inserted, arena_len);
            return Err(err);
        }
        Ok(inserted)
    }

    fn plan_facet_flip(
        &self,
        cell: CellId,
        facet: usize,
    ) -> Result<(Vec<CellId>, Vec<[VertexId; 4]>), CdtError> {
        if facet > 3 {
            return Err(
                tds_error("facet-index", "facet index must be in 0..4").with_context("index", facet)
            );
        }
        let record = self.cell(cell)?;
        let top = record.vertices[facet];
        let other = record.neighbors[facet].ok_or_else(|| {
            tds_error("boundary-facet", "facet lies on the boundary")
                .with_context("cell", cell.as_raw())
        })?;
        let mirror = self.mirror_index(cell, facet)?.ok_or_else(|| {
            tds_error("broken-adjacency", "neighbor does not share the facet")
                .with_context("cell", cell.as_raw())
        })?;
        let bottom = self.cell(other)?.vertices[mirror];
        if self.has_edge(top, bottom)? {
            return Err(tds_error("dual-edge-exists", "the dual edge is already present")
                .with_context("top", top.as_raw())
                .with_context("bottom", bottom.as_raw()));
        }
        let triangle = facet_key(&record.vertices, facet);
        let created = (0..3)
            .map(|skip| {
                [
                    triangle[(skip + 1) % 3],
                    triangle[(skip + 2) % 3],
                    top,
                    bottom,
                ]
            })
            .collect();
        Ok((vec![cell, other], created))
    }

    fn plan_edge_flip(&self, edge: Edge) -> Result<(Vec<CellId>, Vec<[VertexId; 4]>), CdtError> {
        let cells = self.edge_cells(edge)?;
        if cells.len() != 3 {
            return Err(tds_error("edge-degree", "edge must have exactly three incident cells")
                .with_context("cells", cells.len()));
        }
        self.ensure_closed_ring(edge, &cells)?;
        let link = self.edge_link(edge, &cells)?;
        let triangle: Vec<VertexId> = link.keys().copied().collect();
        let [a, b, c] = triangle[..] else {
            return Err(tds_error("edge-link", "edge link is not a triangle")
                .with_context("link", triangle.len()));
        };
        if self.has_facet(&[a, b, c])? {
            return Err(tds_error("dual-facet-exists", "the dual triangle is already present"));
        }
        Ok((
            cells,
            vec![[a, b, c, edge.first()], [a, b, c, edge.second()]],
        ))
    }

    fn plan_44_flip(
        &self,
        edge: Edge,
        diagonal: usize,
    ) -> Result<(Vec<CellId>, Vec<[VertexId; 4]>), CdtError> {
        if diagonal > 1 {
            return Err(tds_error("diagonal-index", "diagonal must be 0 or 1")
                .with_context("diagonal", diagonal));
        }
        let cells = self.edge_cells(edge)?;
        if cells.len() != 4 {
            return Err(tds_error("edge-degree", "edge must have exactly four incident cells")
                .with_context("cells", cells.len()));
        }
        self.ensure_closed_ring(edge, &cells)?;
        let link = self.edge_link(edge, &cells)?;
        let cycle = link_cycle(&link)?;
        let (p, q, r, s) = if diagonal == 0 {
            (cycle[0], cycle[2], cycle[1], cycle[3])
        } else {
            (cycle[1], cycle[3], cycle[2], cycle[0])
        };
        if self.has_edge(p, q)? {
            return Err(tds_error("diagonal-exists", "the replacement edge is already present")
                .with_context("first", p.as_raw())
                .with_context("second", q.as_raw()));
        }
        let (a, b) = (edge.first(), edge.second());
        Ok((
            cells,
            vec![[p, q, a, r], [p, q, r, b], [p, q, b, s], [p, q, s, a]],
        ))
    }

    fn plan_vertex_removal(
        &self,
        vertex: VertexId,
    ) -> Result<(Vec<CellId>, Vec<[VertexId; 4]>), CdtError> {
        let cells = self.incident_cells(vertex)?;
        let mut triangles = Vec::with_capacity(cells.len());
        for &cell in &cells {
            let record = self.cell(cell)?;
            let Some(position) = record.vertices.iter().position(|&v| v == vertex) else {
                return Err(tds_error("broken-star", "incident cell misses the vertex")
                    .with_context("cell", cell.as_raw()));
            };
            for index in 0..4 {
                if index != position && record.neighbors[index].is_none() {
                    return Err(tds_error("boundary-vertex", "vertex lies on the boundary")
                        .with_context("vertex", vertex.as_raw()));
                }
            }
            triangles.push(facet_key(&record.vertices, position));
        }

        let mut uses: BTreeMap<VertexId, usize> = BTreeMap::new();
        for triangle in &triangles {
            for &corner in triangle {
                *uses.entry(corner).or_default() += 1;
            }
        }

        match cells.len() {
            4 => {
                let link: Vec<VertexId> = uses.keys().copied().collect();
                let [a, b, c, d] = link[..] else {
                    return Err(tds_error("star-shape", "star is not a tetrahedron")
                        .with_context("link", link.len()));
                };
                if self.has_cell(&[a, b, c, d])? {
                    return Err(tds_error("dual-cell-exists", "the merged cell is already present"));
                }
                Ok((cells, vec![[a, b, c, d]]))
            }
            6 => {
                let poles: Vec<VertexId> = uses
                    .iter()
                    .filter(|(_, count)| **count == 3)
                    .map(|(corner, _)| *corner)
                    .collect();
                let equator: Vec<VertexId> = uses
                    .iter()
                    .filter(|(_, count)| **count == 4)
                    .map(|(corner, _)| *corner)
                    .collect();
                let (&[north, south], &[x, y, z]) = (poles.as_slice(), equator.as_slice()) else {
                    return Err(tds_error("star-shape", "star is not a triangular bipyramid")
                        .with_context("link", uses.len()));
                };
                let one_pole_each = triangles.iter().all(|triangle| {
                    triangle
                        .iter()
                        .filter(|corner| **corner == north || **corner == south)
                        .count()
                        == 1
                });
                if !one_pole_each {
                    return Err(tds_error("star-shape", "star is not a triangular bipyramid"));
                }
                if self.has_facet(&[x, y, z])? {
                    return Err(tds_error(
                        "dual-facet-exists",
                        "the equatorial triangle is already present",
                    ));
                }
                Ok((cells, vec![[x, y, z, north], [x, y, z, south]]))
            }
            count => Err(tds_error("star-shape", "star cannot be re-triangulated locally")
                .with_context("vertex", vertex.as_raw())
                .with_context("cells", count)),
        }
    }

    fn has_cell(&self, vertices: &[VertexId; 4]) -> Result<bool, CdtError> {
        let mut wanted = *vertices;
        wanted.sort();
        for cell in self.incident_cells(vertices[0])? {
            let mut present = self.cell(cell)?.vertices;
            present.sort();
            if present == wanted {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn ensure_closed_ring(&self, edge: Edge, cells: &[CellId]) -> Result<(), CdtError> {
        let members: BTreeSet<CellId> = cells.iter().copied().collect();
        for &cell in cells {
            let record = self.cell(cell)?;
            for index in 0..4 {
                if edge.contains(record.vertices[index]) {
                    continue;
                }
                match record.neighbors[index] {
                    Some(neighbor) if members.contains(&neighbor) => {}
                    _ => {
                        return Err(tds_error("boundary-edge", "edge star is not a closed ring")
                            .with_context("cell", cell.as_raw()))
                    }
                }
            }
        }
        Ok(())
    }

    /// Link of an interior edge: each link vertex mapped to its link neighbours.
    fn edge_link(
        &self,
        edge: Edge,
        cells: &[CellId],
    ) -> Result<BTreeMap<VertexId, BTreeSet<VertexId>>, CdtError> {
        let mut link: BTreeMap<VertexId, BTreeSet<VertexId>> = BTreeMap::new();
        for &cell in cells {
            let others: Vec<VertexId> = self
                .cell(cell)?
                .vertices
                .iter()
                .copied()
                .filter(|vertex| !edge.contains(*vertex))
                .collect();
            if let [x, y] = others[..] {
                link.entry(x).or_default().insert(y);
                link.entry(y).or_default().insert(x);
            }
        }
        Ok(link)
    }
}

/// Orders a four-vertex link into a cycle starting at its smallest handle.
fn link_cycle(link: &BTreeMap<VertexId, BTreeSet<VertexId>>) -> Result<[VertexId; 4], CdtError> {
    let malformed = || tds_error("edge-link", "edge link is not a 4-cycle");
    if link.len() != 4 || link.values().any(|adjacent| adjacent.len() != 2) {
        return Err(malformed().with_context("link", link.len()));
    }
    let (&start, adjacent) = link.iter().next().ok_or_else(malformed)?;
    let &second = adjacent.iter().next().ok_or_else(malformed)?;
    let &third = link
        .get(&second)
        .and_then(|next| next.iter().find(|&&v| v != start))
        .ok_or_else(malformed)?;
    let &fourth = link
        .get(&third)
        .and_then(|next| next.iter().find(|&&v| v != second))
        .ok_or_else(malformed)?;
    if fourth == start || !adjacent.contains(&fourth) {
        return Err(malformed());
    }
    Ok([start, second, third, fourth])
}
