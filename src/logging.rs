//! File logging for the check runner and the management CLI.
//!
//! The runner has no terminal, so everything goes to a single append-only log
//! file under the config directory. The library itself only emits `tracing`
//! events and leaves subscriber setup to whoever owns the process.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::config::LOG_FILTER_ENV_VAR;

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Log path {0} has no parent directory or file name")]
    InvalidPath(PathBuf),

    #[error("Failed to prepare log file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Install a global subscriber writing to `path`.
///
/// The returned guard flushes pending lines when dropped; keep it alive for
/// the lifetime of the process.
pub fn init_file_logging(path: &Path) -> Result<WorkerGuard, LoggingError> {
    let (dir, file_name) = match (path.parent(), path.file_name()) {
        (Some(dir), Some(file_name)) => (dir, file_name),
        _ => return Err(LoggingError::InvalidPath(path.to_path_buf())),
    };

    ensure_file_exists(dir, path)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(file_writer);

    let subscriber = Registry::default().with(build_env_filter()).with(file_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::debug!("Logging to {}", path.display());
    Ok(guard)
}

fn ensure_file_exists(dir: &Path, path: &Path) -> Result<(), LoggingError> {
    let create = |source| LoggingError::CreateFile {
        path: path.to_path_buf(),
        source,
    };
    fs::create_dir_all(dir).map_err(create)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(create)
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
