pub mod client_connection;
pub mod error;

pub use client_connection::{
    ClientConnectionConfig, DaemonApi, DaemonClient, DaemonEndpoint, DEFAULT_DAEMON_ADDR,
};
pub use error::{CommonError, Result};

use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Daily-rotated log file keeping at most `max_log_files` files, wrapped in a
/// non-blocking writer. The guard must outlive the subscriber.
pub fn rolling_file_writer(
    log_dir: &Path,
    log_file: &str,
    max_log_files: usize,
) -> Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(log_dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(log_file)
        .max_log_files(max_log_files.max(1))
        .build(log_dir)
        .map_err(|e| CommonError::Logging(e.to_string()))?;
    Ok(tracing_appender::non_blocking(appender))
}

/// `RUST_LOG` wins over the configured level when it is set.
pub fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// Installs the global subscriber: a rolling file when `log_dir` is set,
/// coloured stderr otherwise.
pub fn init_tracing(
    log_dir: Option<&Path>,
    log_file: &str,
    log_level: &str,
    max_log_files: usize,
) -> Result<Option<WorkerGuard>> {
    let filter = env_filter(log_level);

    if let Some(log_dir) = log_dir {
        let (non_blocking, guard) = rolling_file_writer(log_dir, log_file, max_log_files)?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_ansi(false),
            )
            .try_init()
            .map_err(|e| CommonError::Logging(e.to_string()))?;
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_ansi(true),
            )
            .try_init()
            .map_err(|e| CommonError::Logging(e.to_string()))?;
        Ok(None)
    }
}
