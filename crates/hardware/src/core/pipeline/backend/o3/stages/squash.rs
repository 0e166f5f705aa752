//! Squash: recovery from a branch/jump misprediction detected at writeback.
//!
//! The renamer itself is rolled back by [`super::writeback::writeback_stage`]
//! calling `Renamer::resolve`; this module discards every other structure's
//! speculative state younger than the mispredicted branch.

use crate::core::pipeline::backend::o3::engine::O3Engine;
use crate::core::pipeline::backend::o3::renamer::{ActiveListIndex, BranchId};

pub fn squash_from_branch(engine: &mut O3Engine, keep_al: ActiveListIndex, branch_id: BranchId, _target: u64) {
    let b = branch_id.0;

    engine.iq.squash(b);
    engine.lanes.squash(b);

    let keep_store_seq = engine.pay.get(keep_al).checkpoint_store_seq.unwrap_or_else(|| engine.lsu.current_store_seq());
    engine.lsu.restore(keep_store_seq, b);

    let bit = 1u64 << b;
    engine.replay_parked.retain(|_, op| op.branch_mask & bit == 0);
    engine.replay_wb.retain(|op| op.branch_mask & bit == 0);

    // The entire frontend (everything younger than the branch, not yet
    // dispatched) is wiped: it was all fetched on the mispredicted path.
    engine.decode_rename.clear();
    engine.rename_bundle.insts.clear();
    engine.dispatch_bundle.insts.clear();
    engine.reset_frontend();
}
