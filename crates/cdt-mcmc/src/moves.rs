use std::fmt;

use cdt_foliation::Geometry3;
use serde::{Deserialize, Serialize};

/// The five ergodic moves on a foliated 3-triangulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Move {
    /// Facet flip turning a (2,2)/(3,1) pair into three cells around a new timelike edge.
    TwoThree,
    /// Inverse of [`Move::TwoThree`]: removes a timelike edge of degree three.
    ThreeTwo,
    /// Inserts a vertex into a spacelike facet between a (1,3) and a (3,1) cell.
    TwoSix,
    /// Inverse of [`Move::TwoSix`]: removes a vertex surrounded by six cells.
    SixTwo,
    /// Swaps a spacelike edge of degree four for the other link diagonal.
    FourFour,
}

impl Move {
    /// All moves in table order.
    pub const ALL: [Move; 5] = [
        Move::TwoThree,
        Move::ThreeTwo,
        Move::TwoSix,
        Move::SixTwo,
        Move::FourFour,
    ];

    /// Position of the move in [`Move::ALL`].
    pub fn index(self) -> usize {
        match self {
            Move::TwoThree => 0,
            Move::ThreeTwo => 1,
            Move::TwoSix => 2,
            Move::SixTwo => 3,
            Move::FourFour => 4,
        }
    }

    /// Label in the `(n,m)` notation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Move::TwoThree => "(2,3)",
            Move::ThreeTwo => "(3,2)",
            Move::TwoSix => "(2,6)",
            Move::SixTwo => "(6,2)",
            Move::FourFour => "(4,4)",
        }
    }

    /// Exact change in the simplex counts when the move succeeds.
    pub fn expected_delta(self) -> MoveDelta {
        match self {
            Move::TwoThree => MoveDelta {
                n3: 1,
                n3_31_13: 0,
                n3_22: 1,
                n2: 2,
                n1: 1,
                n1_tl: 1,
                n1_sl: 0,
                n0: 0,
            },
            Move::ThreeTwo => Move::TwoThree.expected_delta().inverse(),
            Move::TwoSix => MoveDelta {
                n3: 4,
                n3_31_13: 4,
                n3_22: 0,
                n2: 8,
                n1: 5,
                n1_tl: 2,
                n1_sl: 3,
                n0: 1,
            },
            Move::SixTwo => Move::TwoSix.expected_delta().inverse(),
            Move::FourFour => MoveDelta::default(),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed difference between two [`Geometry3`] snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDelta {
    /// Change in cells.
    pub n3: i64,
    /// Change in (3,1) plus (1,3) cells.
    pub n3_31_13: i64,
    /// Change in (2,2) cells.
    pub n3_22: i64,
    /// Change in facets.
    pub n2: i64,
    /// Change in edges.
    pub n1: i64,
    /// Change in timelike edges.
    pub n1_tl: i64,
    /// Change in spacelike edges.
    pub n1_sl: i64,
    /// Change in vertices.
    pub n0: i64,
}

impl MoveDelta {
    /// Difference `after - before`.
    pub fn between(before: &Geometry3, after: &Geometry3) -> Self {
        let diff = |a: usize, b: usize| b as i64 - a as i64;
        Self {
            n3: diff(before.n3, after.n3),
            n3_31_13: diff(before.n3_31_13, after.n3_31_13),
            n3_22: diff(before.n3_22, after.n3_22),
            n2: diff(before.n2, after.n2),
            n1: diff(before.n1, after.n1),
            n1_tl: diff(before.n1_tl, after.n1_tl),
            n1_sl: diff(before.n1_sl, after.n1_sl),
            n0: diff(before.n0, after.n0),
        }
    }

    /// Delta of the reverse move.
    pub fn inverse(self) -> Self {
        Self {
            n3: -self.n3,
            n3_31_13: -self.n3_31_13,
            n3_22: -self.n3_22,
            n2: -self.n2,
            n1: -self.n1,
            n1_tl: -self.n1_tl,
            n1_sl: -self.n1_sl,
            n0: -self.n0,
        }
    }
}

/// Returns true when `after` differs from `before` exactly as `mv` prescribes.
pub fn check_move(before: &Geometry3, after: &Geometry3, mv: Move) -> bool {
    MoveDelta::between(before, after) == mv.expected_delta()
}
