use std::collections::{BTreeMap, BTreeSet};

use cdt_core::errors::CdtError;
use cdt_core::{norm, CausalVertex, Point3, RngHandle, TimeValue};
use cdt_tds::Tds3;
use tracing::{debug, info};

use crate::errors::{triangulation_error, ContextExt};

/// Builds a foliated triangulation of a spherical shell.
///
/// A triangulated 2-sphere is grown from the boundary of a tetrahedron by
/// random 1→3 subdivisions, balanced with 2→2 flips, and copied onto
/// `timeslices` concentric spheres. Each prism between consecutive copies is
/// cut into one (3,1), one (2,2) and one (1,3) cell along a staircase
/// ordered by vertex index, so neighbouring prisms agree on their shared
/// quadrilaterals. Slice `t` (starting at 1) has radius
/// `initial_radius + spacing * (t - 1)`.
pub fn make_foliated_sphere(
    simplices: usize,
    timeslices: usize,
    initial_radius: f64,
    spacing: f64,
    rng: &mut RngHandle,
) -> Result<Tds3, CdtError> {
    if timeslices < 2 {
        return Err(triangulation_error("too-few-timeslices", "at least two timeslices are required")
            .with_context("timeslices", timeslices));
    }
    if simplices == 0 {
        return Err(triangulation_error("no-simplices", "the simplex target must be positive"));
    }
    if !(initial_radius > 0.0 && spacing > 0.0) {
        return Err(triangulation_error("bad-embedding", "radius and spacing must be positive")
            .with_context("initial_radius", initial_radius)
            .with_context("spacing", spacing));
    }

    let layers = timeslices - 1;
    let target = simplices.div_ceil(3 * layers).max(4);
    let mut sphere = BaseSphere::tetrahedron();
    while sphere.triangles.len() < target {
        sphere.subdivide(rng)?;
    }
    let flips = sphere.balance();
    debug!(
        triangles = sphere.triangles.len(),
        flips, "base sphere ready"
    );

    let per_slice = sphere.points.len();
    let mut vertices = Vec::with_capacity(per_slice * timeslices);
    for slice in 0..timeslices {
        let radius = initial_radius + spacing * slice as f64;
        let time = TimeValue::try_from(slice + 1).map_err(|_| {
            triangulation_error("too-many-timeslices", "timeslice count overflows the time value")
        })?;
        for unit in &sphere.points {
            vertices.push(CausalVertex::new(
                [unit[0] * radius, unit[1] * radius, unit[2] * radius],
                time,
            ));
        }
    }

    let at = |slice: usize, base: usize| slice * per_slice + base;
    let mut cells = Vec::with_capacity(3 * sphere.triangles.len() * layers);
    for slice in 0..layers {
        for &[a, b, c] in &sphere.triangles {
            let next = slice + 1;
            cells.push([at(slice, a), at(slice, b), at(slice, c), at(next, c)]);
            cells.push([at(slice, a), at(slice, b), at(next, b), at(next, c)]);
            cells.push([at(slice, a), at(next, a), at(next, b), at(next, c)]);
        }
    }
    let tds = Tds3::from_cells(&vertices, &cells)?;
    info!(
        vertices = tds.number_of_vertices(),
        cells = tds.number_of_cells(),
        timeslices,
        "built foliated sphere"
    );
    Ok(tds)
}

/// Triangulated unit 2-sphere with triangles stored as sorted index triples.
struct BaseSphere {
    points: Vec<Point3>,
    triangles: BTreeSet<[usize; 3]>,
}

impl BaseSphere {
    fn tetrahedron() -> Self {
        let corners: [Point3; 4] = [
            [1.0, 1.0, 1.0],
            [1.0, -1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [-1.0, -1.0, 1.0],
        ];
        let points = corners.iter().map(normalized).collect();
        let triangles = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]]
            .into_iter()
            .collect();
        Self { points, triangles }
    }

    /// Splits a random triangle at its (projected) centroid.
    fn subdivide(&mut self, rng: &mut RngHandle) -> Result<(), CdtError> {
        let chosen = rng.index(self.triangles.len());
        let [a, b, c] = self
            .triangles
            .iter()
            .nth(chosen)
            .copied()
            .ok_or_else(|| triangulation_error("empty-sphere", "base sphere has no triangles"))?;
        self.triangles.remove(&[a, b, c]);
        let mut centroid = [0.0; 3];
        for corner in [a, b, c] {
            for axis in 0..3 {
                centroid[axis] += self.points[corner][axis] / 3.0;
            }
        }
        let added = self.points.len();
        self.points.push(normalized(&centroid));
        for [x, y] in [[a, b], [b, c], [a, c]] {
            self.triangles.insert([x, y, added]);
        }
        Ok(())
    }

    /// Flips edges that join two high-degree vertices until none remain.
    ///
    /// Each flip strictly lowers the sum of squared degrees, so the loop
    /// terminates.
    fn balance(&mut self) -> usize {
        let mut flips = 0;
        while let Some((edge, apexes)) = self.unbalanced_edge() {
            let [x, y] = edge;
            let [p, q] = apexes;
            self.triangles.remove(&sorted([x, y, p]));
            self.triangles.remove(&sorted([x, y, q]));
            self.triangles.insert(sorted([p, q, x]));
            self.triangles.insert(sorted([p, q, y]));
            flips += 1;
        }
        flips
    }

    fn unbalanced_edge(&self) -> Option<([usize; 2], [usize; 2])> {
        let degrees = self.degrees();
        for (edge, apexes) in self.edge_apexes() {
            let &[p, q] = apexes.as_slice() else {
                continue;
            };
            let [x, y] = edge;
            if degrees[x] <= 3 || degrees[y] <= 3 {
                continue;
            }
            if degrees[x] + degrees[y] > degrees[p] + degrees[q] + 2 && !self.has_edge(p, q) {
                return Some((edge, [p, q]));
            }
        }
        None
    }

    fn edge_apexes(&self) -> BTreeMap<[usize; 2], Vec<usize>> {
        let mut apexes: BTreeMap<[usize; 2], Vec<usize>> = BTreeMap::new();
        for &[a, b, c] in &self.triangles {
            apexes.entry([a, b]).or_default().push(c);
            apexes.entry([a, c]).or_default().push(b);
            apexes.entry([b, c]).or_default().push(a);
        }
        apexes
    }

    fn degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.points.len()];
        for triangle in &self.triangles {
            for &corner in triangle {
                degrees[corner] += 1;
            }
        }
        degrees
    }

    fn has_edge(&self, p: usize, q: usize) -> bool {
        self.triangles
            .iter()
            .any(|triangle| triangle.contains(&p) && triangle.contains(&q))
    }
}

fn sorted(mut triangle: [usize; 3]) -> [usize; 3] {
    triangle.sort();
    triangle
}

fn normalized(point: &Point3) -> Point3 {
    let length = norm(point);
    [point[0] / length, point[1] / length, point[2] / length]
}
