//! Retire: commits Active List entries in program order.
//!
//! CSR writes, MRET/SRET, and AMO read-modify-writes are all serializing —
//! at most one retires per cycle, and nothing younger commits behind it
//! until the next cycle. Synchronous exceptions stop the world immediately:
//! the caller flushes the whole engine and vectors to the trap handler.

use crate::common::error::Trap;
use crate::core::Cpu;
use crate::core::pipeline::backend::o3::engine::O3Engine;
use crate::core::pipeline::backend::o3::renamer::{ActiveListEntry, ActiveListIndex};
use crate::core::pipeline::signals::AluOp;

fn record_stats(cpu: &mut Cpu, head: &ActiveListEntry, ctrl: &crate::core::pipeline::signals::ControlSignals) {
    cpu.stats.instructions_retired += 1;
    if head.is_load {
        if ctrl.fp_reg_write {
            cpu.stats.inst_fp_load += 1;
        } else {
            cpu.stats.inst_load += 1;
        }
    } else if head.is_store {
        if ctrl.rs2_fp {
            cpu.stats.inst_fp_store += 1;
        } else {
            cpu.stats.inst_store += 1;
        }
    } else if head.is_branch {
        cpu.stats.inst_branch += 1;
    } else if head.is_csr || ctrl.is_system {
        cpu.stats.inst_system += 1;
    } else {
        match ctrl.alu {
            AluOp::FAdd
            | AluOp::FSub
            | AluOp::FMul
            | AluOp::FMin
            | AluOp::FMax
            | AluOp::FSgnJ
            | AluOp::FSgnJN
            | AluOp::FSgnJX
            | AluOp::FEq
            | AluOp::FLt
            | AluOp::FLe
            | AluOp::FClass
            | AluOp::FCvtWS
            | AluOp::FCvtLS
            | AluOp::FCvtSW
            | AluOp::FCvtSL
            | AluOp::FCvtSD
            | AluOp::FCvtDS
            | AluOp::FMvToX
            | AluOp::FMvToF => cpu.stats.inst_fp_arith += 1,
            AluOp::FDiv | AluOp::FSqrt => cpu.stats.inst_fp_div_sqrt += 1,
            AluOp::FMAdd | AluOp::FMSub | AluOp::FNMAdd | AluOp::FNMSub => cpu.stats.inst_fp_fma += 1,
            _ => cpu.stats.inst_alu += 1,
        }
    }
}

/// Commits the Active List head: writes the architectural mirror register
/// file, bumps statistics, retires its renamer/LSU resources, and clears
/// its payload slot.
fn commit_entry(engine: &mut O3Engine, cpu: &mut Cpu, head: &ActiveListEntry, al: ActiveListIndex) {
    let ctrl = engine.pay.get(al).ctrl;
    record_stats(cpu, head, &ctrl);

    if head.dest_valid {
        let val = engine.renamer.read(head.phys_dst);
        if ctrl.fp_reg_write {
            cpu.regs.write_f(head.logical_dst, val);
        } else if head.logical_dst != 0 {
            cpu.regs.write(head.logical_dst, val);
        }
    }
    cpu.regs.write(0, 0);

    if head.is_store
        && let Some(seq) = engine.pay.get(al).sq_seq
    {
        engine.lsu.store_commit(seq);
    }
    if head.is_load {
        engine.lsu.retire_load();
    }

    engine.renamer.commit();
    engine.pay.clear(al);
}

pub fn retire_stage(engine: &mut O3Engine, cpu: &mut Cpu) -> Option<(Trap, u64)> {
    for _ in 0..engine.dispatch_width {
        let Some(head) = engine.renamer.precommit() else { break };
        if !head.completed {
            break;
        }
        let al = engine.renamer.head_index();

        if head.exception || head.load_violation {
            let pc = head.pc;
            let trap = engine
                .pay
                .get(al)
                .trap
                .clone()
                .map(|(t, _)| t)
                .unwrap_or(Trap::IllegalInstruction(0));
            engine.pay.clear(al);
            engine.renamer.commit();
            return Some((trap, pc));
        }

        if let Some((addr, new_val)) = engine.pay.get(al).csr_update {
            cpu.csr_write(addr, new_val);
            commit_entry(engine, cpu, &head, al);
            break;
        }

        if let Some((vaddr, width, op, reg_val)) = engine.pay.get(al).amo {
            match engine.lsu.amo_execute(cpu, vaddr, width, op, reg_val) {
                Ok(old) => {
                    if head.dest_valid {
                        engine.renamer.write(head.phys_dst, old);
                    }
                    commit_entry(engine, cpu, &head, al);
                }
                Err(trap) => {
                    let pc = head.pc;
                    engine.pay.clear(al);
                    engine.renamer.commit();
                    return Some((trap, pc));
                }
            }
            continue;
        }

        let ctrl = engine.pay.get(al).ctrl;
        if ctrl.is_mret {
            cpu.do_mret();
            commit_entry(engine, cpu, &head, al);
            break;
        }
        if ctrl.is_sret {
            cpu.do_sret();
            commit_entry(engine, cpu, &head, al);
            break;
        }

        commit_entry(engine, cpu, &head, al);
    }

    engine.lsu.drain_to_memory(cpu);
    None
}
