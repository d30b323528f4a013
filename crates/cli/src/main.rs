//! Lockstep CLI — replay a transaction schedule under 2PL or MVCC.
//!
//! Reads a JSONL schedule, runs it through the chosen engine, and writes
//! `trace.jsonl` (one event per line, in emission order) plus
//! `final_state.json` to the output directory:
//!
//! ```text
//! lockstep --cc 2pl --schedule schedule.jsonl --out results/
//! lockstep --cc mvcc --schedule schedule.jsonl --out results/ --initial state.json
//! ```

mod output;
mod schedule;

use std::path::Path;
use std::process;

use clap::{Arg, ArgMatches, Command};
use lockstep_core::Result;
use lockstep_engine::{replay, EngineKind};

fn main() {
    // RUST_LOG controls verbosity; silent by default
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let matches = build_cli().get_matches();
    if let Err(e) = run(&matches) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn build_cli() -> Command {
    Command::new("lockstep")
        .about("Run a transaction schedule under 2PL or MVCC")
        .arg(
            Arg::new("cc")
                .long("cc")
                .value_name("ENGINE")
                .required(true)
                .help("Concurrency control: 2pl (strict 2PL) or mvcc (snapshot isolation)"),
        )
        .arg(
            Arg::new("schedule")
                .long("schedule")
                .value_name("PATH")
                .required(true)
                .help("Path to schedule file (JSONL, one operation per line)"),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .value_name("DIR")
                .required(true)
                .help("Output directory for trace.jsonl and final_state.json"),
        )
        .arg(
            Arg::new("initial")
                .long("initial")
                .value_name("PATH")
                .help("Path to initial state JSON (default: built-in A=100,B=100,X=0,Y=0)"),
        )
}

fn run(matches: &ArgMatches) -> Result<()> {
    // required by clap, so present here
    let engine: EngineKind = matches
        .get_one::<String>("cc")
        .expect("--cc is required")
        .parse()?;
    let schedule_path = matches
        .get_one::<String>("schedule")
        .expect("--schedule is required");
    let out_dir = matches
        .get_one::<String>("out")
        .expect("--out is required");

    let records = schedule::load_schedule(Path::new(schedule_path))?;
    let initial_state = match matches.get_one::<String>("initial") {
        Some(path) => schedule::load_initial_state(Path::new(path))?,
        None => schedule::default_initial_state(),
    };

    let outcome = replay(&records, engine, &initial_state);

    let (trace_path, state_path) = output::write_outcome(Path::new(out_dir), &outcome)?;
    println!("Trace written to {}", trace_path.display());
    println!("Final state written to {}", state_path.display());
    Ok(())
}
