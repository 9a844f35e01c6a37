//! Process environment: `.env` loading and named connection strings.

use perf_core::constants::DEFAULT_CONNECTION_STRING;
use std::env;
use std::path::{Path, PathBuf};

/// Path of the loaded `.env`, `None` when there is none.
pub type DotenvOutcome = dotenvy::Result<Option<PathBuf>>;

/// Load `.env` from the working directory or its parents, if present.
/// Runs before the logger exists, so the outcome is returned for
/// [`log_dotenv`] instead of being logged here.
pub fn load_dotenv() -> DotenvOutcome {
    missing_is_none(dotenvy::dotenv())
}

pub fn load_dotenv_from(path: &Path) -> DotenvOutcome {
    missing_is_none(dotenvy::from_path(path).map(|()| path.to_path_buf()))
}

fn missing_is_none(result: dotenvy::Result<PathBuf>) -> DotenvOutcome {
    match result {
        Ok(path) => Ok(Some(path)),
        Err(err) if err.not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

pub fn log_dotenv(outcome: &DotenvOutcome) {
    match outcome {
        Ok(Some(path)) => log::debug!("loaded environment from {}", path.display()),
        Ok(None) => log::debug!("no .env file found"),
        Err(err) => log::warn!("ignoring unreadable .env file: {err}"),
    }
}

/// Variable holding the connection string for connection `name`:
/// `NHPerformance` -> `NHPERFORMANCE_CONNECTION_STRING`.
pub fn connection_variable(name: &str) -> String {
    format!("{}_CONNECTION_STRING", name.to_ascii_uppercase())
}

pub fn resolve_connection_string(name: &str) -> String {
    env::var(connection_variable(name))
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_CONNECTION_STRING.to_string())
}
