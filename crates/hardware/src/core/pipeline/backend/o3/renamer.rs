//! Register renamer: PRF, RMT/AMT, Free List, Active List, and branch
//! checkpoints.
//!
//! This is the single owner of speculative register state for the
//! out-of-order backend. Every other out-of-order structure (issue queue,
//! lanes, LSU) only ever *reads* a physical register tag or branch ID handed
//! to it by the renamer; the rename/dispatch/writeback/retire stage drivers
//! are the only callers of its methods, and always under the `stall_*`
//! preconditions documented per method. A precondition violation is a
//! programming error, not a recoverable runtime error, and panics.

/// Unique index of a live entry in the Active List.
///
/// Valid only while the entry has not yet retired; the renamer reuses the
/// slot once it commits, exactly like [`crate::core::pipeline::rob::RobTag`]
/// reuses ROB slots in the in-order backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct ActiveListIndex(pub usize);

/// Bit position in the Global Branch Mask assigned to an unresolved branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct BranchId(pub u32);

/// Snapshot of renamer state taken when a branch is renamed.
///
/// Restored verbatim into the renamer on a misprediction at the checkpointed
/// branch's writeback.
#[derive(Clone, Debug)]
struct Checkpoint {
    /// Shadow copy of the RMT at checkpoint time.
    rmt: Vec<u32>,
    /// Free List head index at checkpoint time.
    free_list_head: usize,
    /// GBM at checkpoint time, including this checkpoint's own bit.
    gbm: u64,
}

/// One record in the Active List: an in-flight instruction's retirement
/// state.
#[derive(Clone, Debug, Default)]
pub struct ActiveListEntry {
    /// Whether this instruction writes a logical destination.
    pub dest_valid: bool,
    /// Logical destination register, valid only if `dest_valid`.
    pub logical_dst: usize,
    /// Physical destination register, valid only if `dest_valid`.
    pub phys_dst: u32,
    /// Set once the instruction has written back (or was resolved at
    /// dispatch, for no-execute instructions).
    pub completed: bool,
    /// Set if the instruction has an attached architectural exception.
    pub exception: bool,
    /// Set if a load-dependence violation was detected for this instruction.
    pub load_violation: bool,
    /// Set if this is a branch and it mispredicted. Not used by the
    /// writeback-resolution recovery path (approach #5); retained for
    /// completeness of the bit vector described in the data model.
    pub branch_misprediction: bool,
    /// Set if this instruction's speculative result did not match the
    /// functional reference.
    pub value_misprediction: bool,
    /// Load classification, for retire-stage routing.
    pub is_load: bool,
    /// Store classification, for retire-stage routing.
    pub is_store: bool,
    /// Branch classification; implies this entry owns a checkpoint.
    pub is_branch: bool,
    /// Atomic memory operation classification.
    pub is_amo: bool,
    /// CSR instruction classification.
    pub is_csr: bool,
    /// Program counter, used for trap vectoring and replay redirection.
    pub pc: u64,
}

/// Register renamer and speculative-state owner.
pub struct Renamer {
    /// Number of logical (architectural) registers, `L`.
    n_log_regs: usize,
    /// Number of physical registers, `P`.
    n_phys_regs: usize,
    /// Number of checkpoint slots / GBM width, `B`.
    n_branches: usize,
    /// Capacity of the Free List and Active List rings, `P - L`.
    capacity: usize,

    /// Physical register file.
    prf: Vec<u64>,
    /// Per-physical-register readiness for issue.
    ready: Vec<bool>,

    /// Speculative logical-to-physical map.
    rmt: Vec<u32>,
    /// Committed logical-to-physical map.
    amt: Vec<u32>,

    /// Free List ring storage.
    free_list: Vec<u32>,
    free_list_head: usize,
    free_list_tail: usize,
    free_list_size: usize,

    /// Active List ring storage; `None` marks a retired/unused slot.
    active_list: Vec<Option<ActiveListEntry>>,
    al_head: usize,
    al_tail: usize,
    al_count: usize,

    /// Global Branch Mask.
    gbm: u64,
    /// One checkpoint record per possible branch ID.
    checkpoints: Vec<Checkpoint>,
    /// Free checkpoint slots, kept in lockstep with `B - gbm.count_ones()`.
    free_checkpoints: usize,
}

impl Renamer {
    /// Builds a renamer for `l` logical registers, `p` physical registers,
    /// and `b` checkpoint slots.
    ///
    /// Logical registers `0..l` start mapped one-to-one to physical
    /// registers `0..l`; physical registers `l..p` start on the Free List.
    /// All physical registers start ready (no in-flight producer).
    pub fn new(l: usize, p: usize, b: usize) -> Self {
        assert!(p > l, "physical register file must be larger than the logical one");
        assert!(b <= 64, "GBM is a 64-bit vector; n_branches must be <= 64");

        let capacity = p - l;
        let identity: Vec<u32> = (0..l as u32).collect();
        let free_list: Vec<u32> = (l as u32..p as u32).collect();

        Renamer {
            n_log_regs: l,
            n_phys_regs: p,
            n_branches: b,
            capacity,
            prf: vec![0; p],
            ready: vec![true; p],
            rmt: identity.clone(),
            amt: identity,
            free_list,
            free_list_head: 0,
            free_list_tail: 0,
            free_list_size: capacity,
            active_list: vec![None; capacity.max(1)],
            al_head: 0,
            al_tail: 0,
            al_count: 0,
            gbm: 0,
            checkpoints: vec![
                Checkpoint { rmt: vec![0; l], free_list_head: 0, gbm: 0 };
                b
            ],
            free_checkpoints: b,
        }
    }

    // ---- stall predicates -------------------------------------------------

    /// True iff fewer than `n` physical registers are free.
    pub fn stall_reg(&self, n: usize) -> bool {
        self.free_list_size < n
    }

    /// True iff fewer than `n` checkpoint slots are free.
    pub fn stall_branch(&self, n: usize) -> bool {
        self.free_checkpoints < n
    }

    /// True iff fewer than `n` Active List slots are free.
    pub fn stall_dispatch(&self, n: usize) -> bool {
        self.capacity - self.al_count < n
    }

    /// Current GBM, captured by the rename stage as a renaming instruction's
    /// branch mask.
    pub fn get_branch_mask(&self) -> u64 {
        self.gbm
    }

    // ---- renaming -----------------------------------------------------

    /// Returns the physical register currently mapped to logical register
    /// `l`.
    pub fn rename_rsrc(&self, l: usize) -> u32 {
        self.rmt[l]
    }

    /// Allocates a fresh physical register for logical register `l`,
    /// updates the RMT, and clears the new register's ready bit.
    ///
    /// Panics if [`Self::stall_reg`]`(1)` is true.
    pub fn rename_rdst(&mut self, l: usize) -> u32 {
        assert!(!self.stall_reg(1), "rename_rdst: free list empty");
        let p = self.free_list[self.free_list_head];
        self.free_list_head = (self.free_list_head + 1) % self.capacity;
        self.free_list_size -= 1;
        self.rmt[l] = p;
        self.ready[p as usize] = false;
        p
    }

    /// Allocates the lowest-numbered free checkpoint slot for an unresolved
    /// branch, snapshots the RMT / Free-List head / GBM into it, and
    /// returns the allocated branch ID.
    ///
    /// Panics if [`Self::stall_branch`]`(1)` is true.
    pub fn checkpoint(&mut self) -> BranchId {
        assert!(!self.stall_branch(1), "checkpoint: no free checkpoint slots");
        let b = self.gbm.trailing_ones();
        debug_assert!((b as usize) < self.n_branches);
        self.gbm |= 1 << b;
        self.free_checkpoints -= 1;
        self.checkpoints[b as usize] = Checkpoint {
            rmt: self.rmt.clone(),
            free_list_head: self.free_list_head,
            gbm: self.gbm,
        };
        BranchId(b)
    }

    // ---- dispatch -----------------------------------------------------

    /// Appends an Active List record at the tail and returns its index.
    ///
    /// Panics if [`Self::stall_dispatch`]`(1)` is true.
    #[allow(clippy::too_many_arguments)]
    pub fn dispatch_inst(
        &mut self,
        dest_valid: bool,
        logical_dst: usize,
        phys_dst: u32,
        is_load: bool,
        is_store: bool,
        is_branch: bool,
        is_amo: bool,
        is_csr: bool,
        pc: u64,
    ) -> ActiveListIndex {
        assert!(!self.stall_dispatch(1), "dispatch_inst: active list full");
        let idx = self.al_tail;
        self.active_list[idx] = Some(ActiveListEntry {
            dest_valid,
            logical_dst,
            phys_dst,
            completed: false,
            exception: false,
            load_violation: false,
            branch_misprediction: false,
            value_misprediction: false,
            is_load,
            is_store,
            is_branch,
            is_amo,
            is_csr,
            pc,
        });
        self.al_tail = (self.al_tail + 1) % self.capacity;
        self.al_count += 1;
        ActiveListIndex(idx)
    }

    // ---- PRF accessors --------------------------------------------------

    /// Reads a physical register's readiness bit.
    pub fn is_ready(&self, p: u32) -> bool {
        self.ready[p as usize]
    }

    /// Clears a physical register's readiness bit.
    pub fn clear_ready(&mut self, p: u32) {
        self.ready[p as usize] = false;
    }

    /// Sets a physical register's readiness bit.
    pub fn set_ready(&mut self, p: u32) {
        self.ready[p as usize] = true;
    }

    /// Reads a physical register's value.
    pub fn read(&self, p: u32) -> u64 {
        self.prf[p as usize]
    }

    /// Writes a physical register's value.
    pub fn write(&mut self, p: u32, v: u64) {
        self.prf[p as usize] = v;
    }

    // ---- Active List bit accessors --------------------------------------

    fn al_entry_mut(&mut self, i: ActiveListIndex) -> &mut ActiveListEntry {
        self.active_list[i.0]
            .as_mut()
            .expect("active list index refers to a retired/unused slot")
    }

    /// Marks an Active List entry complete (result written back, or
    /// resolved with no execution needed).
    pub fn set_complete(&mut self, i: ActiveListIndex) {
        self.al_entry_mut(i).completed = true;
    }

    /// Marks an Active List entry as carrying an architectural exception.
    pub fn set_exception(&mut self, i: ActiveListIndex) {
        self.al_entry_mut(i).exception = true;
    }

    /// Marks an Active List entry as having a load-dependence violation.
    pub fn set_load_violation(&mut self, i: ActiveListIndex) {
        self.al_entry_mut(i).load_violation = true;
    }

    /// Marks an Active List entry as a mispredicted branch.
    pub fn set_branch_misprediction(&mut self, i: ActiveListIndex) {
        self.al_entry_mut(i).branch_misprediction = true;
    }

    /// Marks an Active List entry as a value misprediction.
    pub fn set_value_misprediction(&mut self, i: ActiveListIndex) {
        self.al_entry_mut(i).value_misprediction = true;
    }

    /// Reads an Active List entry's exception bit.
    pub fn get_exception(&self, i: ActiveListIndex) -> bool {
        self.active_list[i.0]
            .as_ref()
            .expect("active list index refers to a retired/unused slot")
            .exception
    }

    // ---- retire ---------------------------------------------------------

    /// Returns a copy of the Active List head, or `None` if the Active List
    /// is empty. The retire stage driver is responsible for checking
    /// `completed` before acting on it.
    pub fn precommit(&self) -> Option<ActiveListEntry> {
        self.active_list[self.al_head].clone()
    }

    /// Index of the Active List head, for payload lookups during retire.
    pub fn head_index(&self) -> ActiveListIndex {
        ActiveListIndex(self.al_head)
    }

    /// Retires the Active List head.
    ///
    /// If it has a destination, the AMT's previous mapping of that logical
    /// register is returned to the Free List tail and the AMT is updated to
    /// the head's physical destination.
    ///
    /// Panics if the Active List is empty, or the head is not completed or
    /// carries an exception/load violation — the retire stage driver must
    /// check `precommit()` first.
    pub fn commit(&mut self) {
        assert!(self.al_count > 0, "commit: active list empty");
        let entry = self.active_list[self.al_head]
            .take()
            .expect("commit: active list head slot unexpectedly empty");
        assert!(entry.completed, "commit: active list head not completed");
        assert!(
            !entry.exception && !entry.load_violation,
            "commit: active list head has an outstanding exception or load violation"
        );

        if entry.dest_valid {
            let old_mapping = self.amt[entry.logical_dst];
            self.free_list[self.free_list_tail] = old_mapping;
            self.free_list_tail = (self.free_list_tail + 1) % self.capacity;
            self.free_list_size += 1;
            self.amt[entry.logical_dst] = entry.phys_dst;
        }

        self.al_head = (self.al_head + 1) % self.capacity;
        self.al_count -= 1;
    }

    // ---- branch resolution ------------------------------------------------

    /// Resolves a checkpointed branch.
    ///
    /// On `correct`, the branch's checkpoint slot is simply freed: its bit
    /// is cleared from the live GBM and from every stored checkpoint
    /// (idempotent — checkpoints taken before this branch never had the bit
    /// set, and checkpoints taken after it are discarded wholesale by any
    /// future misprediction that rolls back past this point).
    ///
    /// On misprediction, the GBM is restored from the branch's checkpoint
    /// (with its own bit then cleared), the RMT is restored from the
    /// checkpoint's shadow copy, the Free List head is rolled back (freeing
    /// every physical register allocated since the checkpoint and marking
    /// them ready), and the Active List tail is rolled back to immediately
    /// after `al_index` — the branch itself stays, since the caller retires
    /// or squashes it through the normal path.
    pub fn resolve(&mut self, al_index: ActiveListIndex, branch_id: BranchId, correct: bool) {
        let b = branch_id.0;
        if correct {
            self.gbm &= !(1u64 << b);
            for cp in &mut self.checkpoints {
                cp.gbm &= !(1u64 << b);
            }
            self.free_checkpoints += 1;
            return;
        }

        let cp = self.checkpoints[b as usize].clone();
        self.gbm = cp.gbm & !(1u64 << b);
        self.free_checkpoints = self.n_branches - self.gbm.count_ones() as usize;

        self.rmt.copy_from_slice(&cp.rmt);

        let pops_since_checkpoint =
            (self.free_list_head + self.capacity - cp.free_list_head) % self.capacity;
        self.free_list_head = cp.free_list_head;
        self.free_list_size += pops_since_checkpoint;
        for k in 0..self.free_list_size {
            let pos = (self.free_list_head + k) % self.capacity;
            let p = self.free_list[pos];
            self.ready[p as usize] = true;
        }

        let new_tail = (al_index.0 + 1) % self.capacity;
        let entries_removed = (self.al_tail + self.capacity - new_tail) % self.capacity;
        for k in 0..entries_removed {
            let pos = (new_tail + k) % self.capacity;
            self.active_list[pos] = None;
        }
        self.al_tail = new_tail;
        self.al_count -= entries_removed;
    }

    // ---- full squash --------------------------------------------------

    /// Full architectural rollback: RMT reverts to AMT, the Free List
    /// reclaims every physical register not currently held by the AMT, the
    /// Active List empties, and the GBM clears.
    pub fn squash(&mut self) {
        self.rmt.copy_from_slice(&self.amt);

        let mut is_architectural = vec![false; self.n_phys_regs];
        for &p in &self.amt {
            is_architectural[p as usize] = true;
        }
        let mut idx = 0;
        for (p, arch) in is_architectural.iter().enumerate() {
            if !arch {
                self.free_list[idx] = p as u32;
                self.ready[p] = true;
                idx += 1;
            }
        }
        debug_assert_eq!(idx, self.capacity);
        self.free_list_head = 0;
        self.free_list_tail = 0;
        self.free_list_size = self.capacity;

        for slot in &mut self.active_list {
            *slot = None;
        }
        self.al_head = 0;
        self.al_tail = 0;
        self.al_count = 0;

        self.gbm = 0;
        self.free_checkpoints = self.n_branches;
    }
}
