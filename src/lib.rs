//! Lockstep — deterministic replay of transaction schedules
//!
//! Lockstep feeds a pre-recorded sequence of begin/read/write/commit
//! operations through one of two concurrency-control engines — strict
//! two-phase locking, or MVCC with snapshot isolation — and produces a
//! step-numbered event trace plus the resulting final state. It is a
//! pedagogical and testing instrument for concurrency-control semantics,
//! not a live transactional engine.
//!
//! # Quick Start
//!
//! ```
//! use lockstep::{replay, EngineKind, Key, Operation, TxnId, Value};
//! use std::collections::BTreeMap;
//!
//! let initial: BTreeMap<Key, Value> =
//!     [(Key::from("A"), Value::Int(100))].into_iter().collect();
//! let schedule = vec![
//!     Operation::Begin { t: TxnId(1) },
//!     Operation::Write { t: TxnId(1), item: Key::from("A"), value: Value::Int(50) },
//!     Operation::Commit { t: TxnId(1) },
//! ];
//!
//! let outcome = replay(&schedule, EngineKind::TwoPhaseLocking, &initial);
//! assert_eq!(outcome.final_state[&Key::from("A")], Value::Int(50));
//! ```
//!
//! # Architecture
//!
//! Replays go through [`replay`], which routes the schedule to one engine
//! and returns trace + final state in a uniform shape. The engines
//! themselves live in `lockstep-concurrency`; the CLI in `lockstep-cli`
//! adds the JSONL schedule/trace file boundaries.

// Re-export the public API
pub use lockstep_concurrency::{MvccEngine, TraceLog, TwoPhaseEngine};
pub use lockstep_core::{
    Error, EventBody, Key, LockMode, OpKind, OpResult, Operation, Result, TraceEvent, TxnId, Value,
};
pub use lockstep_engine::{replay, EngineKind, ReplayOutcome};
