//! Trace events
//!
//! Every observable effect of a replay is recorded as a `TraceEvent`: an
//! immutable record carrying the step number it was emitted at plus a
//! kind-specific body. Once appended to a trace, an event is never
//! mutated.
//!
//! The serde representation matches the JSONL trace format, one event per
//! line, step first:
//!
//! ```text
//! {"step": 1, "event": "OP", "t": 1, "op": "BEGIN"}
//! {"step": 2, "event": "LOCK", "item": "A", "grant": "X", "to": 1}
//! {"step": 5, "event": "OP", "t": 2, "op": "R", "item": "A", "result": "BLOCKED", "why": "waiting for X(A)"}
//! ```
//!
//! Optional fields (`item`, `value`, `result`, `why`) are omitted from the
//! serialized form when absent. A read that observed no value still
//! carries an explicit `"value": null` (`Some(Value::Null)`), which is
//! distinct from a blocked read that produced no value at all (`None`).

use crate::types::{Key, LockMode, TxnId};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// The operation kind named inside OP and UNBLOCK events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    /// Transaction start
    #[serde(rename = "BEGIN")]
    Begin,
    /// Read of one item
    #[serde(rename = "R")]
    Read,
    /// Write of one item
    #[serde(rename = "W")]
    Write,
    /// Transaction commit
    #[serde(rename = "COMMIT")]
    Commit,
}

/// Outcome marker on an OP event that did not take normal effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpResult {
    /// The operation could not acquire its lock and was parked
    #[serde(rename = "BLOCKED")]
    Blocked,
    /// The operation was rejected (conflict or inactive transaction)
    #[serde(rename = "ABORT")]
    Abort,
}

/// Kind-specific payload of a trace event
///
/// A closed variant type, one variant per emitted kind. The `event` tag is
/// part of the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum EventBody {
    /// Outcome of one schedule operation
    #[serde(rename = "OP")]
    Op {
        /// Transaction the operation belongs to
        t: TxnId,
        /// Which operation this is
        op: OpKind,
        /// Item touched, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        item: Option<Key>,
        /// Value read or written; `Some(Value::Null)` is a null observation,
        /// `None` means the operation produced no value
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        /// Anomaly marker, absent on normal outcomes
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<OpResult>,
        /// Human-readable reason accompanying `result`
        #[serde(skip_serializing_if = "Option::is_none")]
        why: Option<String>,
    },
    /// A lock was granted
    #[serde(rename = "LOCK")]
    Lock {
        /// Item the lock covers
        item: Key,
        /// Mode granted
        grant: LockMode,
        /// Transaction receiving the lock
        to: TxnId,
    },
    /// A lock was released
    #[serde(rename = "UNLOCK")]
    Unlock {
        /// Item the lock covered
        item: Key,
        /// Transaction that held the lock
        t: TxnId,
        /// Mode that was held
        mode: LockMode,
    },
    /// A parked request was woken and granted
    #[serde(rename = "UNBLOCK")]
    Unblock {
        /// Transaction that was waiting
        t: TxnId,
        /// The deferred operation kind
        op: OpKind,
        /// Item it was waiting on
        item: Key,
    },
    /// A transaction was aborted (MVCC commit-time conflict)
    #[serde(rename = "ABORT")]
    Abort {
        /// The aborted transaction
        t: TxnId,
    },
}

impl EventBody {
    /// A bare OP event with no item, value, or anomaly fields
    pub fn op(t: TxnId, op: OpKind) -> Self {
        EventBody::Op {
            t,
            op,
            item: None,
            value: None,
            result: None,
            why: None,
        }
    }

    /// Attach an item to an OP event (no-op on other kinds)
    pub fn with_item(mut self, key: Key) -> Self {
        if let EventBody::Op { item, .. } = &mut self {
            *item = Some(key);
        }
        self
    }

    /// Attach a value to an OP event (no-op on other kinds)
    pub fn with_value(mut self, v: Value) -> Self {
        if let EventBody::Op { value, .. } = &mut self {
            *value = Some(v);
        }
        self
    }

    /// Mark an OP event BLOCKED with a reason (no-op on other kinds)
    pub fn blocked(mut self, reason: impl Into<String>) -> Self {
        if let EventBody::Op { result, why, .. } = &mut self {
            *result = Some(OpResult::Blocked);
            *why = Some(reason.into());
        }
        self
    }

    /// Mark an OP event ABORT, with an optional reason (no-op on other kinds)
    pub fn aborted(mut self, reason: Option<&str>) -> Self {
        if let EventBody::Op { result, why, .. } = &mut self {
            *result = Some(OpResult::Abort);
            *why = reason.map(str::to_string);
        }
        self
    }
}

/// One immutable entry in a replay trace
///
/// `step` is assigned by the trace log at emission time; see
/// `lockstep_concurrency::TraceLog`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Monotonic step number, starting at 1
    pub step: u64,
    /// Kind-specific payload
    #[serde(flatten)]
    pub body: EventBody,
}
