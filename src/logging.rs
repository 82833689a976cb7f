//! Logging setup: terse colored stderr plus a detailed JSON log file.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::Directive,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub const DEFAULT_LOG_FILE: &str = "logs/gtimeline.log";

/// Where and how verbosely each sink logs.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub file_path: PathBuf,
    /// Default directive for the stderr sink, overridden by `RUST_LOG`.
    pub console_level: String,
    /// Default directive for the file sink, overridden by `RUST_LOG_FILE`.
    pub file_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from(DEFAULT_LOG_FILE),
            console_level: "info".to_string(),
            file_level: "debug".to_string(),
        }
    }
}

impl LogConfig {
    /// Defaults, with the file path taken from `LOG_FILE_PATH` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("LOG_FILE_PATH") {
            config.file_path = PathBuf::from(path);
        }
        config
    }

    fn split_path(&self) -> (&Path, &Path) {
        let dir = self
            .file_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let name = self
            .file_path
            .file_name()
            .map(Path::new)
            .unwrap_or(Path::new("gtimeline.log"));
        (dir, name)
    }
}

/// Keeps the file sink alive; pending lines are flushed when dropped.
pub struct LogGuard {
    _file_guard: WorkerGuard,
}

/// Installs the process-wide subscriber.
///
/// # Errors
///
/// Fails if a filter directive is invalid or if a subscriber is already
/// installed, so sinks are never attached twice.
pub fn init(config: &LogConfig) -> Result<LogGuard> {
    let (dir, name) = config.split_path();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::never(dir, name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let console_directive = config
        .console_level
        .parse::<Directive>()
        .with_context(|| format!("invalid console log level {:?}", config.console_level))?;
    let file_directive = config
        .file_level
        .parse::<Directive>()
        .with_context(|| format!("invalid file log level {:?}", config.file_level))?;

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive(console_directive));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_FILE").add_directive(file_directive));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .try_init()
        .context("logging is already initialized")?;

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}
