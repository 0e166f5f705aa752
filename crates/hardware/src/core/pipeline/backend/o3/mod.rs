//! Out-of-order execution backend.
//!
//! Implements register renaming, out-of-order issue, and speculative
//! execution with checkpoint-based branch recovery, as an alternative
//! [`crate::core::pipeline::engine::ExecutionEngine`] to the in-order
//! backend.

/// Register renamer: PRF, RMT/AMT, Free List, Active List, GBM, checkpoints.
pub mod renamer;

/// Per-instruction payload scratchpad, indexed by Active List index.
pub mod pay;

/// Functional-reference hook for per-commit correctness checking.
pub mod oracle;

/// Rename1/Rename2 and Dispatch latches.
pub mod latches;

/// Per-lane RR/EX/WB pipeline registers.
pub mod lanes;

/// Out-of-order issue queue: wakeup/select scheduling.
pub mod issue_queue;

/// Combined load queue / store queue.
pub mod lsu;

/// The out-of-order engine itself and its per-stage drivers.
pub mod engine;
pub mod stages;
