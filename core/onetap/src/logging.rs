//! Diagnostics for `tap`.
//!
//! Two sinks: stderr (quiet by default, `warn`) and a daily-rolling file under
//! `~/.onetap/logs/` that keeps `info` and up for after-the-fact debugging.
//! `ONETAP_DEBUG_LOG=1` turns both up to `debug`; otherwise `RUST_LOG` drives
//! the stderr filter. User-facing output never goes through here.

use std::env;
use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEBUG_ENV_VAR: &str = "ONETAP_DEBUG_LOG";
const LOG_FILE_PREFIX: &str = "tap";
const LOG_FILE_SUFFIX: &str = "log";

/// Installs the global subscriber. Hold the returned guard until exit so
/// buffered file output is flushed.
pub fn init(logs_dir: &Path) -> Option<WorkerGuard> {
    let debug_enabled = debug_enabled(env::var(DEBUG_ENV_VAR).ok().as_deref());

    let stderr_filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let file_level = if debug_enabled {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let (file_layer, guard) = match file_appender(logs_dir) {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_level);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = fmt::layer()
        .with_target(debug_enabled)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    // Fails only if a subscriber is already installed; keep that one.
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    guard
}

fn debug_enabled(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "TRUE" | "yes" | "YES"))
}

fn file_appender(logs_dir: &Path) -> Option<RollingFileAppender> {
    if let Err(e) = fs_err::create_dir_all(logs_dir) {
        eprintln!("tap: file logging disabled: {}", e);
        return None;
    }
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(logs_dir)
        .map_err(|e| eprintln!("tap: file logging disabled: {}", e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_accepts_common_truthy_values() {
        assert!(debug_enabled(Some("1")));
        assert!(debug_enabled(Some("yes")));
        assert!(debug_enabled(Some("TRUE")));
        assert!(!debug_enabled(Some("0")));
        assert!(!debug_enabled(Some("")));
        assert!(!debug_enabled(None));
    }
}
