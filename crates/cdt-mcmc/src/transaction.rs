use cdt_core::errors::CdtError;
use cdt_core::RngHandle;
use cdt_foliation::Manifold3;
use tracing::warn;

use crate::ergodic::{make_move, MoveOutcome};
use crate::errors::{move_error, ContextExt};
use crate::moves::{check_move, Move, MoveDelta};

/// Attempts `mv` on a copy of `manifold` and commits the copy only if every
/// postcondition holds.
///
/// On `Ok(Applied)` the manifold has been replaced by the rewritten copy.
/// On `Ok(Inapplicable)` and on `Err` it is exactly as it was before the call.
pub fn apply_move(
    manifold: &mut Manifold3,
    mv: Move,
    rng: &mut RngHandle,
) -> Result<MoveOutcome, CdtError> {
    let mut candidate = manifold.clone();
    let outcome = match make_move(&mut candidate, mv, rng) {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(mv = mv.as_str(), %err, "move failed; rolled back");
            return Err(err);
        }
    };
    if !outcome.is_applied() {
        return Ok(outcome);
    }
    if let Err(err) = commit_checks(manifold, &mut candidate, mv) {
        warn!(mv = mv.as_str(), %err, "postcondition failed; rolled back");
        return Err(err);
    }
    std::mem::swap(manifold, &mut candidate);
    Ok(MoveOutcome::Applied)
}

fn commit_checks(before: &Manifold3, candidate: &mut Manifold3, mv: Move) -> Result<(), CdtError> {
    candidate.update()?;
    if let Err(err) = candidate.tds().check_validity() {
        return Err(move_error("invalid-triangulation", "engine is invalid after the move")
            .with_context("move", mv)
            .with_context("cause", &err.info().code));
    }
    if !candidate.triangulation().is_foliated() {
        return Err(move_error("broken-foliation", "a cell spans more than one timeslice")
            .with_context("move", mv));
    }
    if !check_move(before.geometry(), candidate.geometry(), mv) {
        let actual = MoveDelta::between(before.geometry(), candidate.geometry());
        return Err(move_error("delta-mismatch", "simplex counts changed unexpectedly")
            .with_context("move", mv)
            .with_context("expected", format!("{:?}", mv.expected_delta()))
            .with_context("actual", format!("{actual:?}")));
    }
    Ok(())
}
