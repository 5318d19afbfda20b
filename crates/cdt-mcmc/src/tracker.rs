use std::ops::{AddAssign, Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::moves::Move;

/// One counter per move type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveTracker([u64; 5]);

impl MoveTracker {
    /// Creates a tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum over all move types.
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    /// Counters paired with their move, in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Move, u64)> + '_ {
        Move::ALL.iter().map(|&mv| (mv, self.0[mv.index()]))
    }
}

impl Index<Move> for MoveTracker {
    type Output = u64;

    fn index(&self, mv: Move) -> &u64 {
        &self.0[mv.index()]
    }
}

impl IndexMut<Move> for MoveTracker {
    fn index_mut(&mut self, mv: Move) -> &mut u64 {
        &mut self.0[mv.index()]
    }
}

impl AddAssign for MoveTracker {
    fn add_assign(&mut self, other: Self) {
        for (mine, theirs) in self.0.iter_mut().zip(other.0) {
            *mine += theirs;
        }
    }
}

/// Counters accumulated over a run.
///
/// `attempted` counts proposals, which end up either `rejected` by the
/// Metropolis test or `accepted`. Accepted proposals are then `succeeded`
/// or `failed`; `inapplicable` is the subset of failures where no candidate
/// could be rewritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveStatistics {
    /// Proposals per move type.
    pub attempted: MoveTracker,
    /// Proposals that passed the Metropolis test.
    pub accepted: MoveTracker,
    /// Proposals that failed the Metropolis test.
    pub rejected: MoveTracker,
    /// Transactions that committed.
    pub succeeded: MoveTracker,
    /// Transactions that were rolled back or found no candidate.
    pub failed: MoveTracker,
    /// Transactions that found no applicable candidate.
    pub inapplicable: MoveTracker,
}

impl MoveStatistics {
    /// Fraction of proposals of `mv` that committed.
    pub fn success_rate(&self, mv: Move) -> f64 {
        match self.attempted[mv] {
            0 => 0.0,
            attempted => self.succeeded[mv] as f64 / attempted as f64,
        }
    }
}

impl AddAssign for MoveStatistics {
    fn add_assign(&mut self, other: Self) {
        self.attempted += other.attempted;
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.inapplicable += other.inapplicable;
    }
}
