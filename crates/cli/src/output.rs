//! Persisting replay results.
//!
//! `trace.jsonl` gets one serialized event per line, in emission order;
//! `final_state.json` is the pretty-printed key→value mapping. The output
//! directory is created if missing.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use lockstep_core::Result;
use lockstep_engine::ReplayOutcome;

/// Write `trace.jsonl` and `final_state.json` under `dir`
///
/// Returns the two paths written, in that order.
pub fn write_outcome(dir: &Path, outcome: &ReplayOutcome) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir)?;

    let trace_path = dir.join("trace.jsonl");
    let state_path = dir.join("final_state.json");

    let mut writer = BufWriter::new(File::create(&trace_path)?);
    for event in &outcome.trace {
        serde_json::to_writer(&mut writer, event)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    let state_json = serde_json::to_string_pretty(&outcome.final_state)?;
    fs::write(&state_path, state_json + "\n")?;

    tracing::debug!(
        trace = %trace_path.display(),
        state = %state_path.display(),
        events = outcome.trace.len(),
        "wrote replay outcome"
    );
    Ok((trace_path, state_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_core::{Key, Operation, TxnId, Value};
    use lockstep_engine::{replay, EngineKind};
    use std::collections::BTreeMap;

    #[test]
    fn test_write_outcome_produces_both_files() {
        let initial: BTreeMap<Key, Value> =
            [(Key::from("A"), Value::Int(100))].into_iter().collect();
        let schedule = vec![
            Operation::Begin { t: TxnId(1) },
            Operation::Write {
                t: TxnId(1),
                item: Key::from("A"),
                value: Value::Int(50),
            },
            Operation::Commit { t: TxnId(1) },
        ];
        let outcome = replay(&schedule, EngineKind::TwoPhaseLocking, &initial);

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("results");
        let (trace_path, state_path) = write_outcome(&out, &outcome).unwrap();

        let trace_text = fs::read_to_string(trace_path).unwrap();
        let lines: Vec<&str> = trace_text.lines().collect();
        assert_eq!(lines.len(), outcome.trace.len());
        assert_eq!(
            lines[0],
            r#"{"step":1,"event":"OP","t":1,"op":"BEGIN"}"#
        );

        let state_text = fs::read_to_string(state_path).unwrap();
        let state: BTreeMap<Key, Value> = serde_json::from_str(&state_text).unwrap();
        assert_eq!(state[&Key::from("A")], Value::Int(50));
    }
}
