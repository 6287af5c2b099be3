//! Logging setup for the tilepyramid binary.
//!
//! - Writes to `<log_dir>/<log_file>`, truncated at session start
//! - Mirrors to stderr so stdout stays free for command output
//! - Local-time RFC 3339 timestamps
//! - Filter from `RUST_LOG`, defaulting to `info`
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! binary's job.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::UtcOffset;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping it flushes and closes the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created, the log file
/// cannot be truncated, or a global subscriber is already installed.
pub fn init_logging(log_dir: &Path, log_file: &str) -> Result<LoggingGuard, io::Error> {
    let (subscriber, guard) = build_subscriber(log_dir, log_file)?;
    subscriber
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))?;
    Ok(guard)
}

/// Creates `log_dir` and empties `log_file` for a new session.
fn prepare_log_file(log_dir: &Path, log_file: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(log_file);
    fs::write(&path, "")?;
    Ok(path)
}

fn build_subscriber(
    log_dir: &Path,
    log_file: &str,
) -> io::Result<(impl Subscriber + Send + Sync + 'static, LoggingGuard)> {
    prepare_log_file(log_dir, log_file)?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(offset, Rfc3339);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_timer(timer.clone())
        .with_ansi(false)
        .with_thread_names(true)
        .with_target(false);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_timer(timer)
        .with_target(false)
        .compact();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer);

    Ok((
        subscriber,
        LoggingGuard {
            _file_guard: file_guard,
        },
    ))
}

/// Default log directory.
pub fn default_log_dir() -> &'static str {
    "logs"
}

/// Default log file name.
pub fn default_log_file() -> &'static str {
    "tilepyramid.log"
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_paths() {
        assert_eq!(default_log_dir(), "logs");
        assert_eq!(default_log_file(), "tilepyramid.log");
    }

    #[test]
    fn test_prepare_creates_directory_and_truncates_file() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("nested").join("logs");
        fs::create_dir_all(&log_dir).unwrap();
        fs::write(log_dir.join("run.log"), "previous session").unwrap();

        let path = prepare_log_file(&log_dir, "run.log").unwrap();

        assert_eq!(path, log_dir.join("run.log"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_prepare_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("a").join("b");

        prepare_log_file(&log_dir, "x.log").unwrap();

        assert!(log_dir.join("x.log").exists());
    }

    #[test]
    fn test_events_reach_log_file() {
        let dir = TempDir::new().unwrap();
        let (subscriber, guard) = build_subscriber(dir.path(), "scoped.log").unwrap();

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(zoom = 19, "written to the scoped subscriber");
        });
        // Dropping the guard flushes the non-blocking writer
        drop(guard);

        let content = fs::read_to_string(dir.path().join("scoped.log")).unwrap();
        assert!(content.contains("written to the scoped subscriber"));
        assert!(content.contains("zoom=19"));
    }
}
