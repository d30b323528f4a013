//! Concurrency-control engines for Lockstep
//!
//! This crate implements the two replay disciplines:
//! - TwoPhaseEngine: strict two-phase locking with a lock table, FIFO wait
//!   queues, and cascading grant-on-release
//! - MvccEngine: multi-version concurrency control with snapshot
//!   isolation and first-committer-wins commit validation
//!
//! plus the TraceLog both engines route every observable event through.
//! The "concurrency" here is simulated: engines consume one schedule
//! record at a time, single-threaded, and decide synchronously whether a
//! request blocks. No synchronization primitives are used — the lock and
//! version logic models concurrency control, it does not rely on it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lock;
pub mod mvcc;
pub mod trace_log;
pub mod two_phase;

pub use lock::{DeferredOp, LockDecision, LockTable, WaitingOp};
pub use mvcc::MvccEngine;
pub use trace_log::TraceLog;
pub use two_phase::TwoPhaseEngine;
