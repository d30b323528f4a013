//! Schedule and initial-state ingestion.
//!
//! A schedule file is JSONL: one operation record per line, blank lines
//! skipped. The initial state is a single JSON object mapping item names
//! to values. Malformed input is a hard failure carrying the offending
//! line number — there is no partial recovery at this boundary.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use lockstep_core::{Error, Key, Operation, Result, Value};

/// Parse one schedule line into an operation record
///
/// `line_number` is 1-based and only used for error reporting.
pub fn parse_record(line: &str, line_number: usize) -> Result<Operation> {
    serde_json::from_str(line).map_err(|e| Error::MalformedRecord {
        line: line_number,
        message: e.to_string(),
    })
}

/// Load a JSONL schedule file, skipping blank lines
pub fn load_schedule(path: &Path) -> Result<Vec<Operation>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        records.push(parse_record(trimmed, idx + 1)?);
    }
    tracing::debug!(records = records.len(), path = %path.display(), "loaded schedule");
    Ok(records)
}

/// Load an initial-state JSON object
pub fn load_initial_state(path: &Path) -> Result<BTreeMap<Key, Value>> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| Error::InvalidInitialState(e.to_string()))
}

/// The built-in initial state used when `--initial` is not given
pub fn default_initial_state() -> BTreeMap<Key, Value> {
    [
        (Key::from("A"), Value::Int(100)),
        (Key::from("B"), Value::Int(100)),
        (Key::from("X"), Value::Int(0)),
        (Key::from("Y"), Value::Int(0)),
    ]
    .into_iter()
    .collect()
}
