//! File logging. The terminal belongs to the board, so nothing is written to
//! stderr while it runs.

use std::fs;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

/// Overrides the configured level, e.g. `GHBOARD_LOG=ghboard=debug`.
pub const LOG_ENV: &str = "GHBOARD_LOG";
const LOG_FILE: &str = "ghboard.log";

/// Directory for the log file: the XDG state dir, else the cache dir.
pub fn log_dir() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::cache_dir)
        .map(|dir| dir.join("ghboard"))
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Keep the returned guard alive until exit
/// so buffered lines get flushed. Returns `None` when no log directory is
/// usable; the app then runs without logs.
pub fn init(level: &str) -> Option<WorkerGuard> {
    let dir = log_dir()?;
    if let Err(e) = fs::create_dir_all(&dir) {
        eprintln!("Warning: could not create log directory {}: {e}", dir.display());
        return None;
    }
    let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    registry()
        .with(filter(level))
        .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(false))
        .init();
    Some(guard)
}
