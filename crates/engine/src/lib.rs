//! Replay dispatcher for Lockstep
//!
//! This crate is the uniform entry point over the two engines: pick a
//! discipline, feed it the schedule, get back the trace and the final
//! state in one shape. No shared mutable state crosses engines; each
//! `replay` call builds a fresh engine instance that owns all of its
//! tables and counters.
//!
//! The caller keeps ownership of `initial_state` — it is never mutated,
//! engines clone the seed values they need.

#![warn(missing_docs)]
#![warn(clippy::all)]

use lockstep_concurrency::{MvccEngine, TwoPhaseEngine};
use lockstep_core::{Error, Key, Operation, TraceEvent, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which concurrency-control discipline a replay runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineKind {
    /// Strict two-phase locking
    #[serde(rename = "2pl")]
    TwoPhaseLocking,
    /// Multi-version concurrency control with snapshot isolation
    #[serde(rename = "mvcc")]
    Mvcc,
}

impl FromStr for EngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2pl" => Ok(EngineKind::TwoPhaseLocking),
            "mvcc" => Ok(EngineKind::Mvcc),
            other => Err(Error::UnknownEngine(other.to_string())),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::TwoPhaseLocking => write!(f, "2pl"),
            EngineKind::Mvcc => write!(f, "mvcc"),
        }
    }
}

/// Trace and final state of one replay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayOutcome {
    /// Every emitted event, in emission order
    pub trace: Vec<TraceEvent>,
    /// key → visible value after all records were processed
    pub final_state: BTreeMap<Key, Value>,
}

/// Replay `schedule` under `engine`, starting from `initial_state`
///
/// Records are processed strictly in input order. Replays are
/// deterministic: the same schedule, engine, and initial state always
/// produce the same trace and final state.
pub fn replay(
    schedule: &[Operation],
    engine: EngineKind,
    initial_state: &BTreeMap<Key, Value>,
) -> ReplayOutcome {
    tracing::debug!(engine = %engine, records = schedule.len(), "starting replay");
    let (trace, final_state) = match engine {
        EngineKind::TwoPhaseLocking => {
            let mut engine = TwoPhaseEngine::new(initial_state);
            for op in schedule {
                engine.apply(op);
            }
            engine.into_outcome()
        }
        EngineKind::Mvcc => {
            let mut engine = MvccEngine::new(initial_state);
            for op in schedule {
                engine.apply(op);
            }
            engine.into_outcome()
        }
    };
    tracing::debug!(events = trace.len(), "replay finished");
    ReplayOutcome { trace, final_state }
}
