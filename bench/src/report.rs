//! Report module: one line per mode on stdout, plus a comparison summary in
//! the log.

use crate::modes::RunMode;
use std::time::Duration;

/// Timing of one mode over all of its repetitions.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeResult {
    pub mode: RunMode,
    pub elapsed: Duration,
    pub repetitions: usize,
}

impl ModeResult {
    pub fn new(mode: RunMode, elapsed: Duration, repetitions: usize) -> Self {
        Self {
            mode,
            elapsed,
            repetitions,
        }
    }

    /// Whole milliseconds, truncated.
    pub fn milliseconds(&self) -> u128 {
        self.elapsed.as_millis()
    }

    pub fn mean_ms(&self) -> f64 {
        if self.repetitions == 0 {
            return 0.0;
        }
        self.elapsed.as_secs_f64() * 1e3 / self.repetitions as f64
    }

    pub fn report_line(&self) -> String {
        format!("{}: {} milliseconds", self.mode, self.milliseconds())
    }
}

/// Log every mode relative to Normal, when Normal ran.
pub fn log_summary(results: &[ModeResult]) {
    let baseline = results
        .iter()
        .find(|r| r.mode == RunMode::Normal)
        .map(|r| r.elapsed.as_secs_f64());

    for result in results {
        match baseline {
            Some(base) if base > 0.0 => log::info!(
                "{:10} {:>8.2} ms/run  {:>6.1}% of Normal",
                result.mode.name(),
                result.mean_ms(),
                result.elapsed.as_secs_f64() / base * 100.0
            ),
            _ => log::info!("{:10} {:>8.2} ms/run", result.mode.name(), result.mean_ms()),
        }
    }
}
