//! File logging for replay runs
//!
//! Logs go to `$XDG_STATE_HOME/flowscope/flowscope.log` (daily rotation). The
//! configured level applies to flowscope's own crates only; the HTTP stack
//! stays at `warn` unless `RUST_LOG` says otherwise.
//!
//! Reconciliation anomalies are logged at `warn` with the ids needed to find
//! the offending record in the engine's history:
//!
//! | Event                        | Fields                                      |
//! |------------------------------|---------------------------------------------|
//! | Dropped history record       | `input`, `index`, `reason`                  |
//! | Superseded definition        | `process_definition_id`, `records`          |
//! | Unresolved edge target       | `edge_id`, `process_definition_id`          |
//! | Task with no activity        | `task_id`, `task_name`                      |
//! | Stale or failed session load | `sequence`, `newest` / `error`              |
//! | Fetch retry / graph fallback | `url` / `definition_id`                     |
//!
//! Stage summaries (`records`, `steps`, `loop_backs`, `warnings`) are logged
//! at `debug` once per built model.

use crate::config::{Config, LoggingConfig};
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize the logging system
///
/// Sets up tracing with:
/// - File output to XDG state directory
/// - Daily rotation, keeping `config.max_files` files
/// - Configurable log level via config or RUST_LOG env var
pub fn init(config: &LoggingConfig) -> crate::error::Result<LoggingGuard> {
    let log_dir = Config::state_dir();

    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("flowscope.log")
        .max_log_files(config.max_files.max(1))
        .build(&log_dir)
        .map_err(|e| crate::error::Error::Config(format!("failed to create log file: {}", e)))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %config.level,
        max_files = config.max_files,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Filter directives for a configured level: our crates at `level`,
/// everything else at `warn`.
fn default_directives(level: &str) -> String {
    format!("warn,flowscope_core={level},flowscope={level}")
}

/// Initialize logging for tests (logs to stdout)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any pending log writes.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Returns the log file path
pub fn log_file_path() -> PathBuf {
    Config::log_path()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_path() {
        let path = log_file_path();
        assert!(path.ends_with("flowscope.log"));
    }

    #[test]
    fn test_default_directives_scope_level_to_our_crates() {
        let directives = default_directives("debug");
        assert_eq!(directives, "warn,flowscope_core=debug,flowscope=debug");
        assert!(directives.parse::<EnvFilter>().is_ok());
    }
}
