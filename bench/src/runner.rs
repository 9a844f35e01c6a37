//! Benchmark runner: builds one session factory per mode and times the mode's
//! read operation over a fixed number of repetitions.

use crate::modes::RunMode;
use crate::report::ModeResult;
use crate::store::{CacheMode, Configuration, FlushMode, SessionFactory};
use anyhow::{bail, Context, Result};
use perf_core::types::Value;
use std::io::Write;
use std::time::{Duration, Instant};

/// Raw query of the Sql mode. Rows come back untyped and are discarded.
pub const SQL_MODE_QUERY: &str = "SELECT v.* FROM Value v";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Reported,
}

/// One mode's pass through build, timed repetitions and report.
#[derive(Debug)]
pub struct ModeRun {
    mode: RunMode,
    state: RunState,
}

impl ModeRun {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Build the factory, run `repeat_times` repetitions inside the stopwatch
    /// and write the report line to `out`.
    pub fn execute(
        &mut self,
        cfg: &Configuration,
        repeat_times: usize,
        out: &mut dyn Write,
    ) -> Result<ModeResult> {
        if self.state != RunState::Idle {
            bail!("{} has already run", self.mode);
        }

        let factory = SessionFactory::build(cfg)
            .with_context(|| format!("failed to build session factory for {}", self.mode))?;

        self.state = RunState::Running;
        log::debug!("{}: running {repeat_times} repetitions", self.mode);
        let elapsed = measure(|| repeat(repeat_times, || run(&factory, self.mode)))
            .with_context(|| format!("{} run failed", self.mode))?;

        if factory.open_sessions() != 0 {
            log::warn!(
                "{}: {} session(s) left open",
                self.mode,
                factory.open_sessions()
            );
        }

        let result = ModeResult::new(self.mode, elapsed, repeat_times);
        writeln!(out, "{}", result.report_line())?;
        self.state = RunState::Reported;

        Ok(result)
    }
}

/// Run every mode in order, stopping at the first failure.
pub fn run_all(
    configurations: &[(RunMode, Configuration)],
    repeat_times: usize,
    out: &mut dyn Write,
) -> Result<Vec<ModeResult>> {
    configurations
        .iter()
        .map(|(mode, cfg)| ModeRun::new(*mode).execute(cfg, repeat_times, out))
        .collect()
}

/// One repetition of `mode`'s read operation, in its own session.
pub fn run(factory: &SessionFactory, mode: RunMode) -> Result<()> {
    match mode {
        RunMode::Normal | RunMode::Optimized => run_session(factory),
        RunMode::Stateless => run_stateless_session(factory),
        RunMode::Sql => run_sql(factory),
    }
}

fn run_session(factory: &SessionFactory) -> Result<()> {
    let mut session = factory.open_session();
    session.set_cache_mode(CacheMode::Ignore);
    session.set_flush_mode(FlushMode::Never);
    session.set_default_read_only(true);
    session.query::<Value>()?;
    Ok(())
}

fn run_stateless_session(factory: &SessionFactory) -> Result<()> {
    let mut session = factory.open_stateless_session();
    session.query::<Value>()?;
    Ok(())
}

fn run_sql(factory: &SessionFactory) -> Result<()> {
    let session = factory.open_stateless_session();
    session.create_sql_query(SQL_MODE_QUERY).list()?;
    Ok(())
}

pub fn repeat(times: usize, mut action: impl FnMut() -> Result<()>) -> Result<()> {
    for _ in 0..times {
        action()?;
    }
    Ok(())
}

/// Wall-clock time of `action`.
pub fn measure(action: impl FnOnce() -> Result<()>) -> Result<Duration> {
    let start = Instant::now();
    action()?;
    Ok(start.elapsed())
}
