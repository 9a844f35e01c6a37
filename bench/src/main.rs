//! Benchmark entry point.
//!
//! With no arguments, builds the four mode configurations against the
//! `NHPerformance` connection and prints one `<Mode>: <ms> milliseconds` line
//! per mode. With `seed`, recreates the schema and writes the sample data.
//!
//! Usage:
//!   cargo run --release
//!   cargo run --release -- seed
//!   NHPERFORMANCE_CONNECTION_STRING=/tmp/perf.db cargo run --release

use anyhow::{bail, Result};
use chrono::Utc;
use nh_performance::environment::{load_dotenv, log_dotenv, resolve_connection_string};
use nh_performance::modes::{build_configuration, RunMode};
use nh_performance::report::log_summary;
use nh_performance::runner::run_all;
use nh_performance::seed::{seed, seed_configuration};
use perf_core::constants::{CONNECTION_NAME, REPEAT_TIMES};
use perf_core::{initialize_logger, LogSettings};
use std::io;
use std::process::ExitCode;

fn run(args: &[String]) -> Result<()> {
    let connection_string = resolve_connection_string(CONNECTION_NAME);
    log::info!("using connection {CONNECTION_NAME} -> {connection_string}");

    match args {
        [] => {}
        [cmd] if cmd == "seed" => {
            seed(&seed_configuration(&connection_string), Utc::now())?;
            return Ok(());
        }
        other => bail!("unexpected arguments {other:?}; usage: nh-performance [seed]"),
    }

    let configurations: Vec<_> = RunMode::ALL
        .iter()
        .map(|&mode| (mode, build_configuration(mode, &connection_string)))
        .collect();

    let results = run_all(&configurations, REPEAT_TIMES, &mut io::stdout().lock())?;
    log_summary(&results);

    Ok(())
}

fn main() -> ExitCode {
    let dotenv = load_dotenv();

    if let Err(err) = initialize_logger(&LogSettings::from_env()) {
        eprintln!("failed to initialize logging: {err:#}");
        return ExitCode::FAILURE;
    }
    log_dotenv(&dotenv);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
