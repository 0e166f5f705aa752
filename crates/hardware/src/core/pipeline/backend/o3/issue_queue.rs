//! Issue queue: out-of-order wakeup/select scheduling.
//!
//! Grounded on [`crate::core::pipeline::backend::inorder::issue::InOrderIssueUnit`]'s
//! shape (a bounded buffer the dispatch stage pushes into and the scheduler
//! drains from), generalized to true out-of-order selection: every entry
//! tracks its own per-source readiness (set once at insertion from the
//! renamer's PRF ready bits, and flipped by wakeup broadcasts afterward)
//! instead of relying on in-order head-of-queue blocking.

use crate::core::pipeline::backend::o3::lanes::LaneOp;
use crate::core::pipeline::backend::o3::renamer::ActiveListIndex;

/// One waiting instruction plus its readiness state.
#[derive(Clone, Debug)]
struct Entry {
    op: LaneOp,
    rs1_ready: bool,
    rs2_ready: bool,
    /// Only meaningful when the op actually reads rs3 (`ctrl.rs3_fp`).
    rs3_ready: bool,
    uses_rs3: bool,
    /// Lane this instruction was steered to at dispatch.
    lane: usize,
}

impl Entry {
    fn ready(&self) -> bool {
        self.rs1_ready && self.rs2_ready && (!self.uses_rs3 || self.rs3_ready)
    }
}

/// Out-of-order issue queue.
pub struct IssueQueue {
    entries: Vec<Entry>,
    capacity: usize,
}

impl IssueQueue {
    pub fn new(capacity: usize) -> Self {
        IssueQueue {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// True iff fewer than `n` slots are free.
    pub fn stall(&self, n: usize) -> bool {
        self.capacity - self.entries.len() < n
    }

    /// Inserts an instruction, lane-steered at dispatch, with its initial
    /// per-source readiness (a source not actually read by the instruction
    /// is always considered ready).
    #[allow(clippy::too_many_arguments)]
    pub fn dispatch(
        &mut self,
        op: LaneOp,
        lane: usize,
        rs1_ready: bool,
        rs2_ready: bool,
        uses_rs3: bool,
        rs3_ready: bool,
    ) {
        assert!(!self.stall(1), "IssueQueue::dispatch: queue full");
        self.entries.push(Entry {
            op,
            rs1_ready,
            rs2_ready,
            rs3_ready,
            uses_rs3,
            lane,
        });
    }

    /// Wakeup broadcast: a value for physical register `p` is now
    /// available (either already in the PRF, or bypassed this cycle).
    pub fn wakeup(&mut self, p: u32) {
        for e in &mut self.entries {
            if e.op.phys_rs1 == p {
                e.rs1_ready = true;
            }
            if e.op.phys_rs2 == p {
                e.rs2_ready = true;
            }
            if e.uses_rs3 && e.op.phys_rs3 == p {
                e.rs3_ready = true;
            }
        }
    }

    /// Selects and removes up to one ready instruction per lane, in
    /// insertion (program) order within each lane. Returns `(lane, op)`
    /// pairs.
    pub fn select(&mut self, issue_width: usize) -> Vec<(usize, LaneOp)> {
        let mut picked = vec![false; issue_width];
        let mut out = Vec::new();
        let mut i = 0;
        while i < self.entries.len() {
            let lane = self.entries[i].lane;
            if lane < issue_width && !picked[lane] && self.entries[i].ready() {
                picked[lane] = true;
                let e = self.entries.remove(i);
                out.push((lane, e.op));
                continue;
            }
            i += 1;
        }
        out
    }

    /// Clears bit `b` from every entry's branch mask.
    pub fn clear_branch_bit(&mut self, b: u32) {
        let bit = 1u64 << b;
        for e in &mut self.entries {
            e.op.branch_mask &= !bit;
        }
    }

    /// Removes every entry whose branch mask has bit `b` set.
    pub fn squash(&mut self, b: u32) {
        let bit = 1u64 << b;
        self.entries.retain(|e| e.op.branch_mask & bit == 0);
    }

    pub fn flush(&mut self) {
        self.entries.clear();
    }

    /// For diagnostics / tests: true if any entry for `al_index` remains.
    pub fn contains(&self, al_index: ActiveListIndex) -> bool {
        self.entries.iter().any(|e| e.op.al_index == al_index)
    }
}
