//! Logging setup.
//!
//! Installs a global tracing subscriber that always writes to
//! `<log_dir>/loanform.log`. Headless commands also log to stderr; the TUI owns
//! the terminal, so it only gets the file.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

pub const LOG_FILE_NAME: &str = "loanform.log";
pub const LOG_FILTER_ENV: &str = "LOANFORM_LOG";
const DEFAULT_FILTER: &str = "info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to prepare log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to create log file at {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
}

/// Initialize tracing. Subsequent calls are no-ops.
pub fn init(log_dir: &Path, to_stderr: bool) -> Result<PathBuf, LoggingError> {
    let log_path = log_dir.join(LOG_FILE_NAME);
    if LOG_GUARD.get().is_some() {
        return Ok(log_path);
    }

    fs::create_dir_all(log_dir).map_err(|source| LoggingError::CreateDir {
        path: log_dir.to_path_buf(),
        source,
    })?;
    ensure_file_exists(&log_path)?;

    let (file_writer, guard) = tracing_appender::non_blocking(rolling::never(log_dir, LOG_FILE_NAME));

    let file_layer = fmt::layer().with_ansi(false).with_writer(file_writer);
    let stderr_layer = to_stderr.then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    });

    let subscriber = Registry::default()
        .with(build_env_filter())
        .with(file_layer)
        .with(stderr_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
    let _ = LOG_GUARD.set(guard);

    tracing::info!("Logging initialized; log file at {}", log_path.display());
    Ok(log_path)
}

fn ensure_file_exists(path: &Path) -> Result<(), LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|source| LoggingError::CreateLogFile {
            path: path.to_path_buf(),
            source,
        })
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
