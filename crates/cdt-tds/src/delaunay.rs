use std::collections::{BTreeMap, BTreeSet};

use cdt_core::errors::CdtError;
use cdt_core::{CausalVertex, CellId, Point3, Triangulation, VertexId};
use tracing::debug;

use crate::ids::{facet_key, vertex_index};
use crate::tds::{tds_error, ContextExt, Tds3};

const SUPER_VERTICES: usize = 4;

/// Builds the Delaunay triangulation of `vertices` by Bowyer-Watson insertion.
///
/// Points are inserted in the given order inside an enclosing tetrahedron
/// that is stripped at the end. Exact duplicates are skipped. Time values are
/// carried along untouched; the result is not necessarily foliated.
pub fn delaunay_triangulation(vertices: &[CausalVertex]) -> Result<Tds3, CdtError> {
    let mut unique = Vec::with_capacity(vertices.len());
    let mut seen = BTreeSet::new();
    for vertex in vertices {
        if vertex.point.iter().any(|coordinate| !coordinate.is_finite()) {
            return Err(tds_error("non-finite-point", "point has a non-finite coordinate"));
        }
        if seen.insert(vertex.point.map(f64::to_bits)) {
            unique.push(*vertex);
        }
    }
    if unique.len() < 4 {
        return Err(tds_error("too-few-points", "at least four distinct points are required")
            .with_context("points", unique.len()));
    }

    let mut scratch = enclosing_tetrahedron(&unique)?;
    for vertex in &unique {
        insert_point(&mut scratch, *vertex)?;
    }
    strip_enclosure(&scratch)
}

fn enclosing_tetrahedron(points: &[CausalVertex]) -> Result<Tds3, CdtError> {
    let mut low = [f64::INFINITY; 3];
    let mut high = [f64::NEG_INFINITY; 3];
    for vertex in points {
        for axis in 0..3 {
            low[axis] = low[axis].min(vertex.point[axis]);
            high[axis] = high[axis].max(vertex.point[axis]);
        }
    }
    let center = [
        (low[0] + high[0]) / 2.0,
        (low[1] + high[1]) / 2.0,
        (low[2] + high[2]) / 2.0,
    ];
    let half = (0..3)
        .map(|axis| (high[axis] - low[axis]) / 2.0)
        .fold(1e-9, f64::max);
    let (near, far) = (20.0 * half, 200.0 * half);
    let corners = [
        [center[0] - near, center[1] - near, center[2] - near],
        [center[0] + far, center[1] - near, center[2] - near],
        [center[0] - near, center[1] + far, center[2] - near],
        [center[0] - near, center[1] - near, center[2] + far],
    ];
    let seeds: Vec<CausalVertex> = corners
        .iter()
        .map(|&corner| CausalVertex::new(corner, 0))
        .collect();
    Tds3::from_cells(&seeds, &[[0, 1, 2, 3]])
}

fn insert_point(tds: &mut Tds3, vertex: CausalVertex) -> Result<(), CdtError> {
    let mut conflict = Vec::new();
    for cell in tds.cells() {
        let corners = corner_points(tds, cell)?;
        if let Some((center, radius_sq)) = circumsphere(&corners) {
            if squared_distance(&center, &vertex.point) < radius_sq * (1.0 - 1e-12) {
                conflict.push(cell);
            }
        }
    }
    if conflict.is_empty() {
        return Err(tds_error("no-conflict", "point lies outside every circumsphere")
            .with_context("point", format!("{:?}", vertex.point)));
    }

    let members: BTreeSet<CellId> = conflict.iter().copied().collect();
    let arena_len = tds.vertices.len();
    let inserted = tds.push_vertex(vertex.point, vertex.time);
    let mut created = Vec::new();
    for &cell in &conflict {
        let record = tds.cell(cell)?;
        for index in 0..4 {
            let outside = match record.neighbors[index] {
                Some(neighbor) => !members.contains(&neighbor),
                None => true,
            };
            if outside {
                let [a, b, c] = facet_key(&record.vertices, index);
                created.push([a, b, c, inserted]);
            }
        }
    }
    if let Err(err) = tds.replace_cells(&conflict, &created) {
        tds.discard_vertex(inserted, arena_len);
        return Err(err);
    }
    Ok(())
}

fn strip_enclosure(scratch: &Tds3) -> Result<Tds3, CdtError> {
    let is_enclosure = |vertex: VertexId| vertex_index(vertex) < SUPER_VERTICES;
    let mut remap: BTreeMap<VertexId, usize> = BTreeMap::new();
    let mut kept_cells = Vec::new();
    for cell in scratch.cells() {
        let corners = scratch.cell_vertices(cell)?;
        if corners.iter().any(|&vertex| is_enclosure(vertex)) {
            continue;
        }
        kept_cells.push(corners);
        for vertex in corners {
            remap.entry(vertex).or_insert(0);
        }
    }
    if kept_cells.is_empty() {
        return Err(tds_error("degenerate-points", "points do not span a volume"));
    }

    let mut kept_vertices = Vec::with_capacity(remap.len());
    for (slot, (vertex, index)) in remap.iter_mut().enumerate() {
        *index = slot;
        kept_vertices.push(CausalVertex::new(
            scratch.point(*vertex)?,
            scratch.time_value(*vertex)?,
        ));
    }
    let dropped = scratch.number_of_vertices() - SUPER_VERTICES - kept_vertices.len();
    if dropped > 0 {
        debug!(dropped, "points left without an incident cell after stripping the enclosure");
    }
    let mut cells = Vec::with_capacity(kept_cells.len());
    for corners in &kept_cells {
        let mut mapped = [0usize; 4];
        for (slot, vertex) in corners.iter().enumerate() {
            mapped[slot] = *remap.get(vertex).ok_or_else(|| {
                tds_error("unknown-vertex", "kept cell references an unmapped vertex")
                    .with_context("vertex", vertex.as_raw())
            })?;
        }
        cells.push(mapped);
    }
    Tds3::from_cells(&kept_vertices, &cells)
}

fn corner_points(tds: &Tds3, cell: CellId) -> Result<[Point3; 4], CdtError> {
    let vertices = tds.cell_vertices(cell)?;
    Ok([
        tds.point(vertices[0])?,
        tds.point(vertices[1])?,
        tds.point(vertices[2])?,
        tds.point(vertices[3])?,
    ])
}

/// Circumcenter and squared circumradius, or `None` for a flat tetrahedron.
fn circumsphere(corners: &[Point3; 4]) -> Option<(Point3, f64)> {
    let origin = corners[0];
    let u = sub(&corners[1], &origin);
    let v = sub(&corners[2], &origin);
    let w = sub(&corners[3], &origin);
    let denominator = 2.0 * dot(&u, &cross(&v, &w));
    let scale = dot(&u, &u).max(dot(&v, &v)).max(dot(&w, &w));
    if denominator.abs() <= 1e-14 * scale.powf(1.5) {
        return None;
    }
    let vw = cross(&v, &w);
    let wu = cross(&w, &u);
    let uv = cross(&u, &v);
    let (lu, lv, lw) = (dot(&u, &u), dot(&v, &v), dot(&w, &w));
    let offset = [
        (lu * vw[0] + lv * wu[0] + lw * uv[0]) / denominator,
        (lu * vw[1] + lv * wu[1] + lw * uv[1]) / denominator,
        (lu * vw[2] + lv * wu[2] + lw * uv[2]) / denominator,
    ];
    let center = [
        origin[0] + offset[0],
        origin[1] + offset[1],
        origin[2] + offset[2],
    ];
    Some((center, dot(&offset, &offset)))
}

fn sub(a: &Point3, b: &Point3) -> Point3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: &Point3, b: &Point3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: &Point3, b: &Point3) -> Point3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn squared_distance(a: &Point3, b: &Point3) -> f64 {
    let delta = sub(a, b);
    dot(&delta, &delta)
}
