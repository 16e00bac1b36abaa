//! Tracing subscriber setup

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

const DEFAULT_LOG_FILE: &str = "vaidya.log";

/// Install the global subscriber.
///
/// Console output is always on. When `config.file` is set, logs are also
/// written through a daily-rolling non-blocking appender; the returned guard
/// must live as long as the process or buffered lines are lost.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    LogTracer::init().context("Failed to initialize log tracer")?;

    let filter = match &config.filter {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("Invalid log filter: {}", directive))?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))
            .with_context(|| format!("Invalid log level: {}", config.level))?,
    };

    let console = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(path));
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_ids(true)
                .compact();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer);
    // LogTracer is already installed, so bypass `try_init`
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn file_appender(path: &Path) -> RollingFileAppender {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| DEFAULT_LOG_FILE.into());
    RollingFileAppender::new(Rotation::DAILY, dir, name)
}
