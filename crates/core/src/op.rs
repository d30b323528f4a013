//! Operation records
//!
//! An `Operation` is the parsed unit of work from a schedule: one of
//! BEGIN, READ, WRITE, COMMIT. The position of a record in the schedule is
//! the only ordering signal the simulation has; engines consume records
//! strictly in input order.
//!
//! The serde representation matches the JSONL schedule format, one record
//! per line:
//!
//! ```text
//! {"op": "BEGIN", "t": 1}
//! {"op": "W", "t": 1, "item": "A", "value": 50}
//! {"op": "R", "t": 2, "item": "A"}
//! {"op": "COMMIT", "t": 1}
//! ```

use crate::types::{Key, TxnId};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// One recorded operation in a transaction schedule
///
/// A closed variant type, matched exhaustively by both engines. The tag
/// names (`BEGIN`/`R`/`W`/`COMMIT`) are the wire format of the schedule
/// files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum Operation {
    /// Start a transaction
    #[serde(rename = "BEGIN")]
    Begin {
        /// Transaction id
        t: TxnId,
    },
    /// Read one item
    #[serde(rename = "R")]
    Read {
        /// Transaction id
        t: TxnId,
        /// Item to read
        item: Key,
    },
    /// Write one item
    #[serde(rename = "W")]
    Write {
        /// Transaction id
        t: TxnId,
        /// Item to write
        item: Key,
        /// Value to store
        value: Value,
    },
    /// Commit the transaction
    #[serde(rename = "COMMIT")]
    Commit {
        /// Transaction id
        t: TxnId,
    },
}

impl Operation {
    /// The transaction this operation belongs to
    pub fn txn(&self) -> TxnId {
        match self {
            Operation::Begin { t }
            | Operation::Read { t, .. }
            | Operation::Write { t, .. }
            | Operation::Commit { t } => *t,
        }
    }

    /// The item this operation touches, if any
    pub fn item(&self) -> Option<&Key> {
        match self {
            Operation::Read { item, .. } | Operation::Write { item, .. } => Some(item),
            Operation::Begin { .. } | Operation::Commit { .. } => None,
        }
    }
}
