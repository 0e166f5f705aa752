//! Dispatch: lane steering, Active List allocation, and issue-queue / LSU
//! slot allocation.
//!
//! Trapped instructions (decode-time faults, plus dispatch-detected ECALL)
//! skip the issue queue and lanes entirely: they still take an Active List
//! slot (retire needs somewhere to re-raise the trap from, in program
//! order) but are marked complete+exception immediately.

use crate::common::error::{ExceptionStage, Trap};
use crate::core::Cpu;
use crate::core::arch::mode::PrivilegeMode;
use crate::core::pipeline::backend::o3::engine::O3Engine;
use crate::core::pipeline::backend::o3::lanes::LaneOp;
use crate::core::pipeline::signals::{AtomicOp, CsrOp};
use crate::isa::privileged::opcodes as sys_ops;

fn is_amo(ctrl: &crate::core::pipeline::signals::ControlSignals) -> bool {
    ctrl.atomic_op != AtomicOp::None
}

fn is_csr(ctrl: &crate::core::pipeline::signals::ControlSignals) -> bool {
    ctrl.is_system && ctrl.csr_op != CsrOp::None
}

fn ecall_trap(cpu: &Cpu) -> Trap {
    match cpu.privilege {
        PrivilegeMode::User => Trap::EnvironmentCallFromUMode,
        PrivilegeMode::Supervisor => Trap::EnvironmentCallFromSMode,
        PrivilegeMode::Machine => Trap::EnvironmentCallFromMMode,
    }
}

pub fn dispatch_stage(engine: &mut O3Engine, cpu: &mut Cpu) {
    if engine.dispatch_bundle.insts.is_empty() {
        return;
    }

    let bundle = &engine.dispatch_bundle.insts;
    let n = bundle.len();
    let n_loads = bundle
        .iter()
        .filter(|i| i.trap.is_none() && i.ctrl.mem_read && !is_amo(&i.ctrl))
        .count();
    let n_stores = bundle
        .iter()
        .filter(|i| i.trap.is_none() && i.ctrl.mem_write && !is_amo(&i.ctrl))
        .count();
    let n_iq = bundle
        .iter()
        .filter(|i| i.trap.is_none() && i.inst != sys_ops::ECALL)
        .count();

    if engine.renamer.stall_dispatch(n) || engine.iq.stall(n_iq) || engine.lsu.stall(n_loads, n_stores) {
        return;
    }

    let insts = std::mem::take(&mut engine.dispatch_bundle.insts);
    for inst in insts {
        let is_ecall = inst.trap.is_none() && inst.inst == sys_ops::ECALL;
        let amo = is_amo(&inst.ctrl);
        let csr = is_csr(&inst.ctrl);
        let load = inst.trap.is_none() && inst.ctrl.mem_read && !amo;
        let store = inst.trap.is_none() && inst.ctrl.mem_write && !amo;
        let branch = inst.trap.is_none() && (inst.ctrl.branch || inst.ctrl.jump);

        let al = engine.renamer.dispatch_inst(
            inst.dest_valid,
            inst.logical_rd as usize,
            inst.phys_rd,
            load,
            store,
            branch,
            amo,
            csr,
            inst.pc,
        );
        engine.pay.clear(al);
        engine.pay.get_mut(al).ctrl = inst.ctrl;

        if let Some(trap) = inst.trap.clone() {
            engine.renamer.set_exception(al);
            engine.renamer.set_complete(al);
            engine.pay.get_mut(al).trap =
                Some((trap, inst.exception_stage.unwrap_or(ExceptionStage::Decode)));
            continue;
        }
        if is_ecall {
            engine.renamer.set_exception(al);
            engine.renamer.set_complete(al);
            engine.pay.get_mut(al).trap = Some((ecall_trap(cpu), ExceptionStage::Execute));
            continue;
        }

        if branch {
            engine.pay.get_mut(al).checkpoint_store_seq = Some(engine.lsu.current_store_seq());
        }

        let lane = if engine.presteer {
            if load || store {
                let l = engine.lane_ptr_mem % engine.lanes.lanes.len();
                engine.lane_ptr_mem += 1;
                l
            } else if branch {
                let l = engine.lane_ptr_branch % engine.lanes.lanes.len();
                engine.lane_ptr_branch += 1;
                l
            } else {
                let l = engine.lane_ptr % engine.lanes.lanes.len();
                engine.lane_ptr += 1;
                l
            }
        } else {
            let l = engine.lane_ptr % engine.lanes.lanes.len();
            engine.lane_ptr += 1;
            l
        };

        let lq_slot = if load { Some(engine.lsu.alloc_load()) } else { None };
        let (sq_slot, sq_seq) = if store {
            match engine.lsu.alloc_store(inst.ctrl.width) {
                Some((seq, slot)) => (Some(slot), Some(seq)),
                None => (None, None),
            }
        } else {
            (None, None)
        };

        {
            let p = engine.pay.get_mut(al);
            p.lane = lane;
            p.branch_id = inst.branch_id;
            p.lq_slot = lq_slot;
            p.sq_slot = sq_slot;
            p.sq_seq = sq_seq;
        }

        let rs1_ready = engine.renamer.is_ready(inst.phys_rs1);
        let rs2_ready = engine.renamer.is_ready(inst.phys_rs2);
        let uses_rs3 = inst.ctrl.rs3_fp;
        let rs3_ready = !uses_rs3 || engine.renamer.is_ready(inst.phys_rs3);

        if inst.dest_valid {
            engine.renamer.clear_ready(inst.phys_rd);
        }

        let op = LaneOp {
            al_index: al,
            branch_mask: inst.branch_mask,
            branch_id: inst.branch_id,
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
            phys_rs1: inst.phys_rs1,
            phys_rs2: inst.phys_rs2,
            phys_rs3: inst.phys_rs3,
            phys_rd: inst.phys_rd,
            dest_valid: inst.dest_valid,
            op_a: 0,
            op_b: 0,
            op_c: 0,
            lq_slot,
            sq_slot,
            is_split_lower: false,
            result: None,
            fp_flags: 0,
            paddr: None,
        };

        engine.iq.dispatch(op, lane, rs1_ready, rs2_ready, uses_rs3, rs3_ready);
    }
}
