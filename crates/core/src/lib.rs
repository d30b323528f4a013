//! Core types for Lockstep
//!
//! This crate defines the foundational types used throughout the system:
//! - TxnId / Key: identifiers appearing in schedules and traces
//! - LockMode: shared/exclusive lock modes for the 2PL engine
//! - Value: JSON-representable value model
//! - Operation: one parsed schedule record
//! - TraceEvent / EventBody: immutable replay trace entries
//! - Error: error type hierarchy
//!
//! No logic lives here; the engines are in `lockstep-concurrency` and the
//! dispatcher in `lockstep-engine`.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Module declarations
pub mod error;
pub mod op;
pub mod trace;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use error::{Error, Result};
pub use op::Operation;
pub use trace::{EventBody, OpKind, OpResult, TraceEvent};
pub use types::{Key, LockMode, TxnId};
pub use value::Value;
