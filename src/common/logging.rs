//! Logging and tracing configuration
//!
//! Logs go to stderr so that event output on stdout stays clean. File
//! logging is opt-in and goes through a non-blocking appender.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::paths;

/// Default filter when neither `RUST_LOG` nor the config sets one
const DEFAULT_FILTER: &str = "nodedebug=info,warn";

fn filter(level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or(DEFAULT_FILTER)))
}

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
pub fn init_cli(level: Option<&str>) {
    tracing_subscriber::registry()
        .with(filter(level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing to stderr and a log file in `dir`
///
/// The returned guard must be held for as long as logging is needed;
/// dropping it flushes the file writer.
pub fn init_file(dir: &Path, level: Option<&str>) -> std::io::Result<(PathBuf, WorkerGuard)> {
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::never(dir, "nodedebug.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter(level))
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .init();

    Ok((dir.join("nodedebug.log"), guard))
}

/// Get the default log directory
pub fn default_log_dir() -> Option<PathBuf> {
    paths::log_dir()
}
