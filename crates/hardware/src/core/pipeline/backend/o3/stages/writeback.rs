//! Writeback: drains each lane's `wb` slot (plus replayed loads that
//! bypassed their lane), writes results to the PRF, broadcasts wakeups,
//! and resolves branches/jumps.

use crate::core::Cpu;
use crate::core::pipeline::backend::o3::engine::O3Engine;
use crate::core::pipeline::backend::o3::lanes::LaneOp;
use crate::core::pipeline::backend::o3::renamer::{ActiveListIndex, BranchId};

/// A misprediction redirect for the caller (`O3Engine::tick`) to act on:
/// squash everything younger than `keep_al` and set `cpu.pc` to `target`.
pub struct Redirect {
    pub keep_al: ActiveListIndex,
    pub branch_id: BranchId,
    pub target: u64,
}

fn complete(engine: &mut O3Engine, op: LaneOp) -> Option<Redirect> {
    if let Some(trap) = op.trap.clone() {
        engine.renamer.set_exception(op.al_index);
        engine.renamer.set_complete(op.al_index);
        let stage = op.exception_stage.unwrap_or(crate::common::error::ExceptionStage::Execute);
        engine.pay.get_mut(op.al_index).trap = Some((trap, stage));
        return None;
    }

    if op.dest_valid {
        engine.renamer.write(op.phys_rd, op.result.unwrap_or(0));
        engine.renamer.set_ready(op.phys_rd);
        engine.iq.wakeup(op.phys_rd);
    }
    engine.renamer.set_complete(op.al_index);

    let Some(branch_id) = op.branch_id else {
        return None;
    };

    let fallthrough = op.pc.wrapping_add(op.inst_size);
    let actual_next_pc = op.paddr.unwrap_or(fallthrough);
    let predicted_target = if op.pred_taken { op.pred_target } else { fallthrough };
    let correct = predicted_target == actual_next_pc;
    let taken = op.ctrl.jump || actual_next_pc != fallthrough;

    engine.renamer.resolve(op.al_index, branch_id, correct);

    if correct {
        let b = branch_id.0;
        engine.iq.clear_branch_bit(b);
        engine.lanes.clear_branch_bit(b);
        engine.lsu.clear_branch_bit(b);
        None
    } else {
        Some(Redirect { keep_al: op.al_index, branch_id, target: actual_next_pc })
    }
}

pub fn writeback_stage(engine: &mut O3Engine, cpu: &mut Cpu) -> Option<Redirect> {
    let mut redirect = None;

    for lane_idx in 0..engine.lanes.lanes.len() {
        let Some(op) = engine.lanes.lanes[lane_idx].wb.take() else { continue };
        let is_branch_or_jump = op.branch_id.is_some();
        let pc = op.pc;
        let ghr_snapshot = op.ghr_snapshot;
        let pred_taken_recompute = op.ctrl.jump || (op.ctrl.branch && op.paddr.map(|t| t != pc.wrapping_add(op.inst_size)).unwrap_or(false));
        let target_for_predictor = op.paddr;
        let r = complete(engine, op);
        if is_branch_or_jump {
            cpu.branch_predictor.repair_history(ghr_snapshot);
            cpu.branch_predictor.update_branch(pc, pred_taken_recompute, if pred_taken_recompute { target_for_predictor } else { None });
            if r.is_some() {
                cpu.stats.branch_mispredictions += 1;
            } else {
                cpu.stats.branch_predictions += 1;
            }
        }
        if redirect.is_none() {
            redirect = r;
        }
    }

    for op in std::mem::take(&mut engine.replay_wb) {
        complete(engine, op);
    }

    redirect
}
