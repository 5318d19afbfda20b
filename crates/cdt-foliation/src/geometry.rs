use serde::{Deserialize, Serialize};

use crate::foliated::FoliatedTriangulation;

/// Simplex counts of a foliated triangulation.
///
/// A snapshot is never patched in place; [`Geometry3::new`] recomputes all
/// counts from the classified collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geometry3 {
    /// Number of cells.
    pub n3: usize,
    /// Number of (3,1) cells.
    pub n3_31: usize,
    /// Number of (1,3) cells.
    pub n3_13: usize,
    /// Number of (3,1) and (1,3) cells together.
    pub n3_31_13: usize,
    /// Number of (2,2) cells.
    pub n3_22: usize,
    /// Number of facets.
    pub n2: usize,
    /// Number of edges.
    pub n1: usize,
    /// Number of timelike edges.
    pub n1_tl: usize,
    /// Number of spacelike edges.
    pub n1_sl: usize,
    /// Number of vertices.
    pub n0: usize,
}

impl Geometry3 {
    /// Counts the classified collections of `triangulation`.
    pub fn new(triangulation: &FoliatedTriangulation) -> Self {
        let n3_31 = triangulation.three_one().len();
        let n3_13 = triangulation.one_three().len();
        let n3_22 = triangulation.two_two().len();
        let n1_tl = triangulation.timelike_edges().len();
        let n1_sl = triangulation.spacelike_edges().len();
        Self {
            n3: n3_31 + n3_22 + n3_13,
            n3_31,
            n3_13,
            n3_31_13: n3_31 + n3_13,
            n3_22,
            n2: triangulation.number_of_facets(),
            n1: n1_tl + n1_sl,
            n1_tl,
            n1_sl,
            n0: triangulation.vertices().len(),
        }
    }
}
