//! Error types for Lockstep
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! Per-operation anomalies inside a replay (blocked requests, conflict
//! aborts, operations on inactive transactions) are NOT errors — they are
//! recorded as structured fields on trace events so the trace remains a
//! complete record. Only boundary-level malformed input reaches this type.

use std::io;
use thiserror::Error;

/// Result type alias for Lockstep operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the Lockstep replay harness
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (schedule or state files, output directory)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A schedule line that is not a valid operation record
    #[error("malformed schedule record at line {line}: {message}")]
    MalformedRecord {
        /// 1-based line number in the schedule file
        line: usize,
        /// What was wrong with the record
        message: String,
    },

    /// An engine selector that names neither 2PL nor MVCC
    #[error("unknown engine: {0:?} (expected \"2pl\" or \"mvcc\")")]
    UnknownEngine(String),

    /// An initial-state document that is not a JSON object of key/value pairs
    #[error("invalid initial state: {0}")]
    InvalidInitialState(String),

    /// Serialization failure while writing trace or final state
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
