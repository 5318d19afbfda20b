use cdt_core::{derive_substream_seed, RngHandle};

use crate::moves::Move;

const UNIVERSE_STREAM: u64 = 0x5A5A_5A5A_5A5A_5A5A;
const WARM_UP_STREAM: u64 = 0xA5A5_A5A5_A5A5_A5A5;

/// Random source for building the initial universe of a run.
pub fn universe_rng(master_seed: u64) -> RngHandle {
    RngHandle::for_substream(master_seed ^ UNIVERSE_STREAM, 0)
}

/// Random source for the forced warm-up attempt of `mv`.
pub fn warm_up_rng(master_seed: u64, mv: Move) -> RngHandle {
    RngHandle::for_substream(master_seed ^ WARM_UP_STREAM, mv.index() as u64)
}

/// Random source for the proposal made at `attempt` within `pass`.
///
/// Depends only on its arguments, so a resumed chain replays the same draws.
pub fn proposal_rng(master_seed: u64, pass: usize, attempt: usize) -> RngHandle {
    RngHandle::for_substream(derive_substream_seed(master_seed, pass as u64), attempt as u64)
}
