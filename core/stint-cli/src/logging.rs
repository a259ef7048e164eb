//! Log setup for the `stint` binary.
//!
//! The terminal belongs to the timer display, so logs go to a daily rolling file
//! under `<data dir>/logs/`. `RUST_LOG` picks the filter; `STINT_DEBUG_LOG=1`
//! forces `debug`. If the log directory cannot be created, logs fall back to
//! stderr at `warn`.

use std::env;

use stint_core::StorageConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const DEBUG_LOG_ENV: &str = "STINT_DEBUG_LOG";
const LOG_FILE_PREFIX: &str = "stint.log";

/// Installs the global subscriber. Keep the returned guard alive for the life of
/// the process so buffered lines are flushed on exit.
pub fn init(storage: &StorageConfig) -> Option<WorkerGuard> {
    let filter = filter_from_env();
    let logs_dir = storage.logs_dir();

    if let Err(err) = fs_err::create_dir_all(&logs_dir) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("warn"))
            .with_writer(std::io::stderr)
            .try_init();
        tracing::warn!(error = %err, "Log directory unavailable; logging to stderr");
        return None;
    }

    let appender = tracing_appender::rolling::daily(&logs_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init();
    Some(guard)
}

fn filter_from_env() -> EnvFilter {
    if debug_enabled(env::var(DEBUG_LOG_ENV).ok().as_deref()) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn debug_enabled(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "TRUE" | "yes" | "YES"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_flag_values() {
        assert!(debug_enabled(Some("1")));
        assert!(debug_enabled(Some("yes")));
        assert!(!debug_enabled(Some("0")));
        assert!(!debug_enabled(None));
    }
}
