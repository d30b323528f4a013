//! Trace event emitter
//!
//! `TraceLog` is the sole writer of step numbers: every observable event
//! of a replay is routed through `emit`, which stamps the current step and
//! increments the counter by exactly one. One input record may yield zero,
//! one, or several events, so steps count *events*, not records.
//!
//! The counter doubles as the MVCC logical clock: a transaction's start
//! timestamp is the step of its BEGIN event, and its commit timestamp is
//! the step of its COMMIT event. Engines read it via `current_step()`
//! before emitting.

use lockstep_core::{EventBody, TraceEvent};

/// Ordered, append-only event log with a monotonic step counter
///
/// Owned by one engine invocation; no process-wide state. Steps start at 1
/// and are gapless per emission.
#[derive(Debug)]
pub struct TraceLog {
    next_step: u64,
    events: Vec<TraceEvent>,
}

impl TraceLog {
    /// Create an empty log with the counter at 1
    pub fn new() -> Self {
        TraceLog {
            next_step: 1,
            events: Vec::new(),
        }
    }

    /// The step the next emitted event will receive
    ///
    /// MVCC reads this as its timestamp source.
    pub fn current_step(&self) -> u64 {
        self.next_step
    }

    /// Append an event at the current step and advance the counter
    ///
    /// Returns the step that was assigned. No validation is performed;
    /// callers are responsible for the body's field shape.
    pub fn emit(&mut self, body: EventBody) -> u64 {
        let step = self.next_step;
        self.events.push(TraceEvent { step, body });
        self.next_step += 1;
        step
    }

    /// Events emitted so far, in emission order
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Number of events emitted
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check whether nothing has been emitted yet
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Consume the log, yielding the trace
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }
}

impl Default for TraceLog {
    fn default() -> Self {
        Self::new()
    }
}
