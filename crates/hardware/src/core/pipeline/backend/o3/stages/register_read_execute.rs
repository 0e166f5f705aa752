//! Register-Read and Execute.
//!
//! Register-Read moves each lane's RR slot into `ex[0]` once a source
//! register's value is available. Execute runs the terminal `ex[depth-1]`
//! slot: ALU/FPU computation, AGEN + LSU interaction for loads/stores,
//! address-only computation for AMOs (the read-modify-write itself is
//! deferred to retire), and branch/jump target resolution.

use crate::common::{AccessType, VirtAddr};
use crate::core::Cpu;
use crate::core::pipeline::backend::inorder::execute::compute_alu;
use crate::core::pipeline::backend::o3::engine::O3Engine;
use crate::core::pipeline::backend::o3::lsu::LoadOutcome;
use crate::core::pipeline::signals::{AtomicOp, CsrOp, OpASrc, OpBSrc};
use crate::isa::rv64i::funct3;

pub fn register_read_stage(engine: &mut O3Engine) {
    for lane in &mut engine.lanes.lanes {
        if lane.ex[0].is_some() {
            continue;
        }
        let Some(mut op) = lane.rr.take() else { continue };
        op.op_a = engine.renamer.read(op.phys_rs1);
        op.op_b = engine.renamer.read(op.phys_rs2);
        op.op_c = engine.renamer.read(op.phys_rs3);
        lane.ex[0] = Some(op);
    }
}

pub fn execute_stage(engine: &mut O3Engine, cpu: &mut Cpu) {
    for lane_idx in 0..engine.lanes.lanes.len() {
        let depth = engine.lanes.lanes[lane_idx].depth();
        let Some(mut op) = engine.lanes.lanes[lane_idx].ex[depth - 1].take() else {
            continue;
        };

        let op_a = match op.ctrl.a_src {
            OpASrc::Reg1 => op.op_a,
            OpASrc::Pc => op.pc,
            OpASrc::Zero => 0,
        };
        let op_b = match op.ctrl.b_src {
            OpBSrc::Reg2 => op.op_b,
            OpBSrc::Imm => op.imm as u64,
            OpBSrc::Zero => 0,
        };
        // Store data is always rs2's value, independent of `b_src` (which
        // for stores selects the immediate for AGEN's address add).
        let store_data = op.op_b;

        if op.ctrl.atomic_op != AtomicOp::None {
            // AMO: AGEN only here. The read-modify-write and destination
            // write happen at retire, once the instruction is known
            // non-speculative (`Lsu::amo_execute`).
            let vaddr = op_a;
            engine.pay.get_mut(op.al_index).amo = Some((vaddr, op.ctrl.width, op.ctrl.atomic_op, store_data));
            op.result = Some(0);
            engine.lanes.lanes[lane_idx].wb = Some(op);
            continue;
        }

        if op.ctrl.mem_read {
            match engine.lsu.load_attempt(cpu, op.al_index, op.pc, op_a, op.ctrl.width, op.ctrl.signed_load, op.branch_mask) {
                LoadOutcome::Hit(v) => {
                    op.result = Some(v);
                    engine.lanes.lanes[lane_idx].wb = Some(op);
                }
                LoadOutcome::Stalled => {
                    // Ownership moves to the LSU's replay list; the lane
                    // slot is freed and the op is parked until replay.
                    engine.replay_parked.insert(op.al_index, op);
                }
                LoadOutcome::Fault(trap) => {
                    op.trap = Some(trap);
                    op.exception_stage = Some(crate::common::error::ExceptionStage::Memory);
                    op.result = Some(0);
                    engine.lanes.lanes[lane_idx].wb = Some(op);
                }
            }
            continue;
        }

        if op.ctrl.mem_write {
            let vaddr = op_a;
            let translation = cpu.translate(VirtAddr::new(vaddr), AccessType::Write);
            if let Some(trap) = translation.trap {
                op.trap = Some(trap);
                op.exception_stage = Some(crate::common::error::ExceptionStage::Memory);
            } else if !op.is_split_lower
                && let Some(seq) = engine.pay.get(op.al_index).sq_seq
            {
                engine.lsu.store_resolve(seq, vaddr, translation.paddr, store_data);
            }
            op.paddr = Some(translation.paddr);
            op.result = Some(0);
            engine.lanes.lanes[lane_idx].wb = Some(op);
            continue;
        }

        if op.ctrl.is_system && op.ctrl.csr_op != CsrOp::None {
            let old = cpu.csr_read(op.ctrl.csr_addr);
            let src = match op.ctrl.csr_op {
                CsrOp::Rwi | CsrOp::Rsi | CsrOp::Rci => op_a & 0x1f,
                _ => op_a,
            };
            let new = match op.ctrl.csr_op {
                CsrOp::Rw | CsrOp::Rwi => src,
                CsrOp::Rs | CsrOp::Rsi => old | src,
                CsrOp::Rc | CsrOp::Rci => old & !src,
                CsrOp::None => old,
            };
            engine.pay.get_mut(op.al_index).csr_update = Some((op.ctrl.csr_addr, new));
            op.result = Some(old);
            engine.lanes.lanes[lane_idx].wb = Some(op);
            continue;
        }

        if op.ctrl.branch {
            let taken = match (op.inst >> 12) & 0x7 {
                funct3::BEQ => op_a == op_b,
                funct3::BNE => op_a != op_b,
                funct3::BLT => (op_a as i64) < (op_b as i64),
                funct3::BGE => (op_a as i64) >= (op_b as i64),
                funct3::BLTU => op_a < op_b,
                funct3::BGEU => op_a >= op_b,
                _ => false,
            };
            let fallthrough = op.pc.wrapping_add(op.inst_size);
            let actual_target = op.pc.wrapping_add(op.imm as u64);
            let actual_next_pc = if taken { actual_target } else { fallthrough };
            op.paddr = Some(actual_next_pc);
            op.result = Some(0);
            engine.lanes.lanes[lane_idx].wb = Some(op);
            continue;
        }

        if op.ctrl.jump {
            use crate::common::constants::OPCODE_MASK;
            use crate::isa::rv64i::opcodes;
            let is_jalr = (op.inst & OPCODE_MASK) == opcodes::OP_JALR;
            const JALR_ALIGNMENT_MASK: u64 = !1;
            let actual_target = if is_jalr {
                op_a.wrapping_add(op.imm as u64) & JALR_ALIGNMENT_MASK
            } else {
                op.pc.wrapping_add(op.imm as u64)
            };
            op.paddr = Some(actual_target);
            op.result = Some(op.pc.wrapping_add(op.inst_size));
            engine.lanes.lanes[lane_idx].wb = Some(op);
            continue;
        }

        let (alu_out, fp_flags) = compute_alu(op.ctrl.alu, op_a, op_b, op.op_c, op.ctrl.is_rv32);
        op.result = Some(alu_out);
        op.fp_flags = fp_flags;
        engine.lanes.lanes[lane_idx].wb = Some(op);
    }

    // Once a stalled load's blocking store resolves, it re-enters the
    // pipeline directly at writeback, bypassing the lane entirely.
    if let Some((al_index, value)) = engine.lsu.poll_replay(cpu)
        && let Some(mut op) = engine.replay_parked.remove(&al_index)
    {
        op.result = Some(value);
        engine.replay_wb.push(op);
    }

    for lane in &mut engine.lanes.lanes {
        lane.advance_execute();
    }
}
