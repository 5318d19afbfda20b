use serde::{Deserialize, Serialize};

/// Integer foliation leaf index. Valid time values start at 1.
pub type TimeValue = i32;

/// Embedding point of a vertex.
pub type Point3 = [f64; 3];

/// A point together with the timeslice it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CausalVertex {
    /// Embedding coordinates.
    pub point: Point3,
    /// Foliation leaf index.
    pub time: TimeValue,
}

impl CausalVertex {
    /// Creates a causal vertex.
    pub fn new(point: Point3, time: TimeValue) -> Self {
        Self { point, time }
    }

    /// Euclidean distance of the point from the origin.
    pub fn radius(&self) -> f64 {
        norm(&self.point)
    }
}

/// Gravitational couplings entering the bulk action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Couplings {
    /// Timelike/spacelike edge length ratio parameter.
    pub alpha: f64,
    /// Inverse gravitational coupling.
    pub k: f64,
    /// Cosmological constant.
    pub lambda: f64,
}

impl Default for Couplings {
    fn default() -> Self {
        Self {
            alpha: 0.6,
            k: 1.1,
            lambda: 0.1,
        }
    }
}

/// Euclidean norm of a point.
pub fn norm(point: &Point3) -> f64 {
    (point[0] * point[0] + point[1] * point[1] + point[2] * point[2]).sqrt()
}
