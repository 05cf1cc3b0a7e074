//! Logging setup for embedders without their own subscriber.
//!
//! The dispatcher only emits `tracing` events; nothing here is required
//! if the embedding application already installs a subscriber. The hot
//! path is chatty at debug level (one event per offer attempt and per
//! listener invocation), so the default filter keeps the crate at `info`
//! and everything else at `warn` - queue saturation warnings and dropped
//! notification errors still come through. Override with `RUST_LOG`.

use std::fs;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is not set.
///
/// Keeps the per-notification debug events off while letting offer
/// timeouts, dropped notifications and invoker failures through.
pub const DEFAULT_LOG_FILTER: &str = "warn,notifyq=info";

/// Guard that must be kept alive for the duration of logging.
///
/// Holds the non-blocking file writer when one was requested; dropping
/// the guard flushes and closes it.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Installs a stdout subscriber filtered by `RUST_LOG`
/// (default [`DEFAULT_LOG_FILTER`]).
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging() -> LoggingGuard {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(io::stdout))
        .init();

    LoggingGuard { _file_guard: None }
}

/// Installs the stdout subscriber plus a non-blocking layer appending to
/// `log_file` inside `log_dir`, creating the directory if needed.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging_with_file(
    log_dir: impl AsRef<Path>,
    log_file: &str,
) -> Result<LoggingGuard, io::Error> {
    let (writer, file_guard) = file_writer(log_dir.as_ref(), log_file)?;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(io::stdout))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();

    Ok(LoggingGuard {
        _file_guard: Some(file_guard),
    })
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn file_writer(log_dir: &Path, log_file: &str) -> Result<(NonBlocking, WorkerGuard), io::Error> {
    fs::create_dir_all(log_dir)?;
    let appender = tracing_appender::rolling::never(log_dir, log_file);
    Ok(tracing_appender::non_blocking(appender))
}
