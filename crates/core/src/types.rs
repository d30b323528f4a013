//! Core identifier types for Lockstep
//!
//! This module defines the foundational types:
//! - TxnId: Transaction identifier as recorded in a schedule
//! - Key: Name of a data item in the simulated store

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a transaction within one schedule
///
/// A TxnId is a small integer assigned by whatever produced the schedule.
/// Ids are first-use-only within a schedule: once a transaction commits or
/// aborts, its id is never reused for a later BEGIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxnId(pub u32);

impl TxnId {
    /// Create a transaction id from its raw integer
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw integer value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TxnId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Name of a data item in the simulated store
///
/// Keys are plain strings; the schedule format calls them "items".
/// Ordering is lexicographic, which fixes the iteration order of the
/// final-state map and the MVCC install order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    /// Create a key from any string-like value
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the key name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Lock mode for 2PL read/write access
///
/// SHARED permits concurrent co-readers; EXCLUSIVE permits exactly one
/// holder and excludes all others. The wire names (`"S"`/`"X"`) appear in
/// LOCK and UNLOCK trace events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockMode {
    /// Shared lock for reads (multiple readers allowed)
    #[serde(rename = "S")]
    Shared,
    /// Exclusive lock for writes (single writer, no readers)
    #[serde(rename = "X")]
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Shared => write!(f, "S"),
            LockMode::Exclusive => write!(f, "X"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_txn_id_display() {
        assert_eq!(TxnId::new(7).to_string(), "7");
    }

    #[test]
    fn test_txn_id_serde_transparent() {
        let id: TxnId = serde_json::from_str("3").unwrap();
        assert_eq!(id, TxnId(3));
        assert_eq!(serde_json::to_string(&id).unwrap(), "3");
    }

    #[test]
    fn test_key_from_str() {
        let key = Key::from("A");
        assert_eq!(key.as_str(), "A");
        assert_eq!(key.to_string(), "A");
    }

    #[test]
    fn test_key_ordering_is_lexicographic() {
        let mut keys = vec![Key::from("B"), Key::from("A"), Key::from("AB")];
        keys.sort();
        let names: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["A", "AB", "B"]);
    }

    #[test]
    fn test_lock_mode_wire_names() {
        assert_eq!(serde_json::to_string(&LockMode::Shared).unwrap(), "\"S\"");
        assert_eq!(
            serde_json::to_string(&LockMode::Exclusive).unwrap(),
            "\"X\""
        );
        assert_eq!(LockMode::Exclusive.to_string(), "X");
    }
}
