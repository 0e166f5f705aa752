//! The out-of-order engine: owns every O3-specific structure and drives its
//! own fetch-through-retire loop, independent of [`crate::core::pipeline::engine::ExecutionEngine`]
//! and [`crate::core::pipeline::frontend::Frontend`] — those are shaped
//! around a single shared Execute/Memory1/Memory2 path and a ROB/scoreboard
//! pair that have no out-of-order issue queue or per-lane pipeline to plug
//! into. `O3Engine` reuses the frontend's free functions directly
//! ([`fetch1_stage`], [`fetch2_stage`], [`decode_stage`]) but keeps its own
//! copies of the latches they operate on.

use crate::config::Config;
use crate::core::Cpu;
use crate::core::pipeline::backend::o3::issue_queue::IssueQueue;
use crate::core::pipeline::backend::o3::lanes::{LaneFile, LaneOp};
use crate::core::pipeline::backend::o3::latches::{DispatchBundle, RenameBundle};
use crate::core::pipeline::backend::o3::lsu::Lsu;
use crate::core::pipeline::backend::o3::oracle::{NoOracle, OracleRef};
use crate::core::pipeline::backend::o3::pay::Payload;
use crate::core::pipeline::backend::o3::renamer::{ActiveListIndex, Renamer};
use crate::core::pipeline::backend::o3::stages;
use crate::core::pipeline::frontend::decode::decode_stage;
use crate::core::pipeline::frontend::fetch1::fetch1_stage;
use crate::core::pipeline::frontend::fetch2::fetch2_stage;
use crate::core::pipeline::latches::{Fetch1Fetch2Entry, IdExEntry, IfIdEntry};

/// Number of logical (architectural) integer/FP registers the renamer maps.
/// RV64GC has 32 integer and 32 FP registers sharing one rename namespace in
/// this engine, same as the in-order backend's single [`crate::common::reg::RegisterFile`].
pub const N_LOG_REGS: usize = 64;

/// The out-of-order execution engine.
pub struct O3Engine {
    // -- frontend (Fetch1 -> Fetch2 -> Decode), private copies since this
    // engine does not implement `ExecutionEngine` and so cannot share
    // `Frontend<E>`.
    fetch1_fetch2: Vec<Fetch1Fetch2Entry>,
    fetch2_decode: Vec<IfIdEntry>,
    pub(crate) decode_rename: Vec<IdExEntry>,
    fetch1_stall: u64,
    fetch2_stall: u64,

    // -- rename
    pub(crate) rename_bundle: RenameBundle,
    pub(crate) dispatch_bundle: DispatchBundle,
    pub(crate) renamer: Renamer,

    // -- dispatch / issue / execute
    pub(crate) pay: Payload,
    pub(crate) iq: IssueQueue,
    pub(crate) lanes: LaneFile,
    pub(crate) lsu: Lsu,
    pub(crate) oracle: Box<dyn OracleRef + Send + Sync>,
    /// Loads the LSU stalled on an unresolved store: the LSU's own replay
    /// list only tracks the address/forwarding bookkeeping, so the rest of
    /// the in-flight op (needed to complete writeback once the load replays)
    /// is parked here instead, keyed by Active List index.
    pub(crate) replay_parked: std::collections::HashMap<ActiveListIndex, LaneOp>,
    /// Replayed loads that resolved this cycle, staged for writeback since
    /// they bypass their original lane entirely.
    pub(crate) replay_wb: Vec<LaneOp>,

    pub(crate) dispatch_width: usize,
    pub(crate) issue_width: usize,
    pub(crate) presteer: bool,
    /// Accepted but not yet wired: a perfect branch predictor would require
    /// a variant of `fetch1_stage` that consults the oracle instead of
    /// `cpu.branch_predictor`. See DESIGN.md.
    pub(crate) perfect_branch_pred: bool,

    /// Round-robin lane pointers used when `presteer` is false (every
    /// dispatched instruction rotates through all lanes) or as the
    /// non-memory/non-branch bucket when `presteer` is true.
    pub(crate) lane_ptr: usize,
    pub(crate) lane_ptr_mem: usize,
    pub(crate) lane_ptr_branch: usize,

    width: usize,
    pay_capacity: usize,
}

impl O3Engine {
    pub fn new(config: &Config) -> Self {
        let n_phys_regs = config.pipeline.n_phys_regs;
        let n_branches = config.pipeline.n_branches;
        let dispatch_width = config.pipeline.dispatch_width;
        let issue_width = config.pipeline.issue_width;

        let conservative_mem_dep = matches!(
            config.pipeline.mem_dep_pred,
            crate::config::MemDepPredictor::Conservative
        );
        // Oracle disambiguation is approximated as unconditionally-speculative
        // store-set disambiguation (see DESIGN.md): no per-load functional
        // oracle is wired into the LSU, so "perfect foresight" degrades to
        // "always allow speculation, predictor never forced conservative".
        let spec_disambig = config.pipeline.spec_disambig || config.pipeline.oracle_disambig;
        let conservative_mem_dep = conservative_mem_dep && !config.pipeline.oracle_disambig;
        let pay_capacity = n_phys_regs.saturating_sub(N_LOG_REGS).max(1);

        O3Engine {
            fetch1_fetch2: Vec::with_capacity(config.pipeline.width),
            fetch2_decode: Vec::with_capacity(config.pipeline.width),
            decode_rename: Vec::with_capacity(config.pipeline.width),
            fetch1_stall: 0,
            fetch2_stall: 0,

            rename_bundle: RenameBundle::default(),
            dispatch_bundle: DispatchBundle::default(),
            renamer: Renamer::new(N_LOG_REGS, n_phys_regs, n_branches),

            pay: Payload::new(pay_capacity),
            iq: IssueQueue::new(config.pipeline.issue_width.max(dispatch_width) * 4),
            lanes: LaneFile::new(issue_width, &config.pipeline.lane_ex_depth),
            lsu: Lsu::new(
                config.pipeline.store_buffer_size,
                config.pipeline.store_buffer_size,
                spec_disambig,
                conservative_mem_dep,
            ),
            oracle: Box::new(NoOracle),
            replay_parked: std::collections::HashMap::new(),
            replay_wb: Vec::new(),

            dispatch_width,
            issue_width,
            presteer: config.pipeline.presteer,
            perfect_branch_pred: config.pipeline.perfect_branch_pred,

            lane_ptr: 0,
            lane_ptr_mem: 0,
            lane_ptr_branch: 0,

            width: config.pipeline.width,
            pay_capacity,
        }
    }

    /// Runs one cycle of every stage, in reverse pipeline order (retire
    /// first, fetch last) so each stage only ever reads a latch another
    /// stage filled on a *previous* call to `tick`.
    pub fn tick(&mut self, cpu: &mut Cpu) {
        if let Some((trap, pc)) = stages::retire::retire_stage(self, cpu) {
            self.flush(cpu);
            cpu.trap(trap, pc);
            return;
        }

        if let Some(redirect) = stages::writeback::writeback_stage(self, cpu) {
            stages::squash::squash_from_branch(self, redirect.keep_al, redirect.branch_id, redirect.target);
            cpu.pc = redirect.target;
        }

        stages::register_read_execute::execute_stage(self, cpu);
        stages::register_read_execute::register_read_stage(self);

        stages::issue::issue_stage(self);

        stages::dispatch::dispatch_stage(self, cpu);

        stages::rename::rename2_stage(self);
        stages::rename::rename1_stage(self);

        if self.decode_rename.is_empty() {
            decode_stage(cpu, &mut self.fetch2_decode, &mut self.decode_rename);
        }

        if self.fetch2_stall > 0 {
            self.fetch2_stall -= 1;
        } else {
            fetch2_stage(cpu, &mut self.fetch1_fetch2, &mut self.fetch2_decode, &mut self.fetch2_stall);
        }

        if self.fetch1_stall > 0 {
            self.fetch1_stall -= 1;
        } else if self.fetch1_fetch2.is_empty() {
            fetch1_stage(cpu, &mut self.fetch1_fetch2, &mut self.fetch1_stall);
        }
    }

    /// Discards every in-flight fetch/decode latch and resets their stall
    /// counters, without touching rename/dispatch/issue/lane/LSU state.
    /// Used after a branch misprediction, where only the frontend (which
    /// fetched down the wrong path) needs wiping.
    pub(crate) fn reset_frontend(&mut self) {
        self.fetch1_fetch2.clear();
        self.fetch2_decode.clear();
        self.fetch1_stall = 0;
        self.fetch2_stall = 0;
    }

    pub fn flush(&mut self, _cpu: &mut Cpu) {
        self.reset_frontend();
        self.decode_rename.clear();

        self.rename_bundle.insts.clear();
        self.dispatch_bundle.insts.clear();
        self.renamer.squash();

        self.iq.flush();
        self.lanes.flush();
        self.lsu.flush();
        self.replay_parked.clear();
        self.replay_wb.clear();
        for i in 0..self.pay_capacity {
            self.pay.clear(crate::core::pipeline::backend::o3::renamer::ActiveListIndex(i));
        }
    }
}
