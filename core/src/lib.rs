use anyhow::Context;
use log::LevelFilter;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Config, Root},
    encode::{pattern::PatternEncoder, Encode},
    filter::threshold::ThresholdFilter,
};
use std::{backtrace, env};

pub mod constants;
pub mod mapping;
pub mod types;

const LOGGING_PATTERN: &str = "{d} {l} {f}:{L} - {m}\n";

/// Appends a captured backtrace to error records when `RUST_BACKTRACE` or
/// `RUST_LIB_BACKTRACE` is set.
#[derive(Debug)]
struct BacktracePatternEncoder {
    pattern_encoder: PatternEncoder,
    is_backtrace_enabled: bool,
}

impl BacktracePatternEncoder {
    fn new(pattern: &str) -> Self {
        BacktracePatternEncoder {
            pattern_encoder: PatternEncoder::new(pattern),
            is_backtrace_enabled: env::var("RUST_BACKTRACE").is_ok()
                || env::var("RUST_LIB_BACKTRACE").is_ok(),
        }
    }
}

impl Encode for BacktracePatternEncoder {
    fn encode(
        &self,
        w: &mut dyn log4rs::encode::Write,
        record: &log::Record<'_>,
    ) -> anyhow::Result<()> {
        if record.level() != log::Level::Error || !self.is_backtrace_enabled {
            return self.pattern_encoder.encode(w, record);
        }

        let args = format_args!(
            "{}\nBacktrace:\n{}",
            record.args(),
            backtrace::Backtrace::capture()
        );
        let with_trace = log::Record::builder()
            .args(args)
            .level(record.level())
            .target(record.target())
            .module_path(record.module_path())
            .file(record.file())
            .line(record.line())
            .build();
        self.pattern_encoder.encode(w, &with_trace)
    }
}

/// Logger settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub file_path: Option<String>,
}

impl LogSettings {
    pub const LEVEL_VAR: &'static str = "NHPERF_LOG_LEVEL";
    pub const FILE_VAR: &'static str = "NHPERF_LOG_FILE";

    /// `NHPERF_LOG_LEVEL` (default `info`) and `NHPERF_LOG_FILE` (default: no file).
    pub fn from_env() -> Self {
        let level = env::var(Self::LEVEL_VAR)
            .ok()
            .and_then(|raw| raw.trim().parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Info);
        let file_path = env::var(Self::FILE_VAR)
            .ok()
            .filter(|path| !path.trim().is_empty());

        Self { level, file_path }
    }
}

/// Install the process-wide logger: stderr always, plus a file appender when
/// a path is given. Both appenders are gated by `settings.level`.
pub fn initialize_logger(settings: &LogSettings) -> anyhow::Result<()> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(BacktracePatternEncoder::new(LOGGING_PATTERN)))
        .build();

    let mut config_builder = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(ThresholdFilter::new(settings.level)))
            .build("stderr", Box::new(stderr)),
    );
    let mut root = Root::builder().appender("stderr");

    if let Some(path) = &settings.file_path {
        let logfile = FileAppender::builder()
            .encoder(Box::new(BacktracePatternEncoder::new(LOGGING_PATTERN)))
            .build(path)
            .with_context(|| format!("failed to open log file {path}"))?;

        config_builder =
            config_builder.appender(Appender::builder().build("logfile", Box::new(logfile)));
        root = root.appender("logfile");
    }

    let config = config_builder
        .build(root.build(settings.level))
        .context("invalid logger configuration")?;

    log4rs::init_config(config).context("logger already initialized")?;

    Ok(())
}
