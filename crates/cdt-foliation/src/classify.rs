use std::cmp::Ordering;
use std::fmt;

use cdt_core::TimeValue;
use serde::{Deserialize, Serialize};

/// Simplex type of a 3-cell spanning two adjacent timeslices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CellType {
    /// Three vertices on the lower slice, one on the upper.
    ThreeOne,
    /// Two vertices on each slice.
    TwoTwo,
    /// One vertex on the lower slice, three on the upper.
    OneThree,
}

impl CellType {
    /// Short label in the `(n,m)` notation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CellType::ThreeOne => "(3,1)",
            CellType::TwoTwo => "(2,2)",
            CellType::OneThree => "(1,3)",
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Causal character of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeClass {
    /// Endpoints on different timeslices.
    Timelike,
    /// Endpoints on the same timeslice.
    Spacelike,
}

/// Classifies a cell from the time values of its four vertices.
///
/// Returns `None` unless the values span exactly one timeslice step.
pub fn expected_cell_type(times: [TimeValue; 4]) -> Option<CellType> {
    let min = times.iter().copied().min()?;
    let max = times.iter().copied().max()?;
    if max - min != 1 {
        return None;
    }
    match times.iter().filter(|&&time| time == min).count() {
        3 => Some(CellType::ThreeOne),
        2 => Some(CellType::TwoTwo),
        1 => Some(CellType::OneThree),
        _ => None,
    }
}

/// Classifies an edge from the time values of its endpoints.
pub fn classify_edge(first: TimeValue, second: TimeValue) -> EdgeClass {
    match first.cmp(&second) {
        Ordering::Equal => EdgeClass::Spacelike,
        _ => EdgeClass::Timelike,
    }
}

/// Difference between the largest and smallest time value of a cell.
pub fn time_span(times: [TimeValue; 4]) -> TimeValue {
    let min = times.iter().copied().min().unwrap_or_default();
    let max = times.iter().copied().max().unwrap_or_default();
    max - min
}
