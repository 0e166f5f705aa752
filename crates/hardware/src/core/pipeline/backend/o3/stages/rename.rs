//! Rename1 (bundle transfer) and Rename2 (RMT renaming + checkpointing).

use crate::core::pipeline::backend::o3::engine::O3Engine;
use crate::core::pipeline::backend::o3::latches::RenamedInst;
use crate::core::pipeline::backend::o3::renamer::ActiveListIndex;

/// Rename1: moves a full decode bundle into the Rename1 -> Rename2 latch.
/// Transfers only when that latch is currently empty — a partial transfer
/// would split one bundle's rename across unrelated program-order groups.
pub fn rename1_stage(engine: &mut O3Engine) {
    if !engine.rename_bundle.insts.is_empty() || engine.decode_rename.is_empty() {
        return;
    }
    engine.rename_bundle.insts = std::mem::take(&mut engine.decode_rename);
}

/// Rename2: renames every source/dest register in program order, captures
/// each instruction's branch mask, and checkpoints control-flow
/// instructions (conditional branches and jumps alike — see DESIGN.md).
pub fn rename2_stage(engine: &mut O3Engine) {
    if engine.rename_bundle.insts.is_empty() || !engine.dispatch_bundle.insts.is_empty() {
        return;
    }

    let bundle = &engine.rename_bundle.insts;
    let n_dest = bundle
        .iter()
        .filter(|i| i.trap.is_none() && (i.ctrl.reg_write || i.ctrl.fp_reg_write))
        .count();
    let n_branch = bundle
        .iter()
        .filter(|i| i.trap.is_none() && (i.ctrl.branch || i.ctrl.jump))
        .count();

    if engine.renamer.stall_reg(n_dest) || engine.renamer.stall_branch(n_branch) {
        return;
    }

    let insts = std::mem::take(&mut engine.rename_bundle.insts);
    let mut out = Vec::with_capacity(insts.len());
    for inst in insts {
        if inst.trap.is_some() {
            out.push(RenamedInst {
                pc: inst.pc,
                inst: inst.inst,
                inst_size: inst.inst_size,
                imm: inst.imm,
                ctrl: inst.ctrl,
                trap: inst.trap,
                exception_stage: inst.exception_stage,
                pred_taken: inst.pred_taken,
                pred_target: inst.pred_target,
                ghr_snapshot: inst.ghr_snapshot,
                logical_rs1: inst.rs1 as u8,
                logical_rs2: inst.rs2 as u8,
                logical_rs3: inst.rs3 as u8,
                logical_rd: inst.rd as u8,
                phys_rs1: 0,
                phys_rs2: 0,
                phys_rs3: 0,
                phys_rd: 0,
                dest_valid: false,
                branch_mask: engine.renamer.get_branch_mask(),
                branch_id: None,
                al_index: ActiveListIndex(0),
            });
            continue;
        }

        let uses_rs3 = inst.ctrl.rs3_fp;
        let phys_rs1 = engine.renamer.rename_rsrc(inst.rs1);
        let phys_rs2 = engine.renamer.rename_rsrc(inst.rs2);
        let phys_rs3 = if uses_rs3 { engine.renamer.rename_rsrc(inst.rs3) } else { 0 };

        let dest_valid = inst.ctrl.reg_write || inst.ctrl.fp_reg_write;
        let phys_rd = if dest_valid { engine.renamer.rename_rdst(inst.rd) } else { 0 };

        // Capture the branch mask this instruction depends on *before*
        // taking its own checkpoint (if any): a branch is never
        // control-dependent on itself.
        let branch_mask = engine.renamer.get_branch_mask();
        let branch_id = if inst.ctrl.branch || inst.ctrl.jump {
            Some(engine.renamer.checkpoint())
        } else {
            None
        };

        out.push(RenamedInst {
            pc: inst.pc,
            inst: inst.inst,
            inst_size: inst.inst_size,
            imm: inst.imm,
            ctrl: inst.ctrl,
            trap: None,
            exception_stage: None,
            pred_taken: inst.pred_taken,
            pred_target: inst.pred_target,
            ghr_snapshot: inst.ghr_snapshot,
            logical_rs1: inst.rs1 as u8,
            logical_rs2: inst.rs2 as u8,
            logical_rs3: inst.rs3 as u8,
            logical_rd: inst.rd as u8,
            phys_rs1,
            phys_rs2,
            phys_rs3,
            phys_rd,
            dest_valid,
            branch_mask,
            branch_id,
            al_index: ActiveListIndex(0),
        });
    }
    engine.dispatch_bundle.insts = out;
}
