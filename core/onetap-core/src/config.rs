//! User configuration loaded from `~/.onetap/config.toml`.
//!
//! Every field has a default, so a missing file (or a file that only sets a
//! few keys) is fine. A file that exists but does not parse is an error; we
//! don't guess at what the user meant.
//!
//! ```toml
//! stale_grace_hours = 24
//! prefer_booted = true
//! minimum_runtime = "iOS-17-0"
//! build_configuration = "Debug"
//! ```

use std::path::Path;

use chrono::Duration;
use serde::Deserialize;

use crate::error::{Result, TapError};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TapConfig {
    /// How long a non-terminal claim survives its owner process.
    pub stale_grace_hours: u64,
    /// Prefer already-booted simulators when auto-selecting.
    pub prefer_booted: bool,
    /// Lowest runtime auto-select will consider (e.g. `iOS-17-0`).
    pub minimum_runtime: Option<String>,
    pub build_configuration: String,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            stale_grace_hours: 24,
            prefer_booted: true,
            minimum_runtime: None,
            build_configuration: "Debug".to_string(),
        }
    }
}

impl TapConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs_err::read_to_string(path)
            .map_err(|e| TapError::io(format!("reading {}", path.display()), e))?;
        toml::from_str(&content).map_err(|e| TapError::ConfigMalformed {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
    }

    /// Capped at ten years so the window always fits in a `Duration`.
    pub fn stale_grace(&self) -> Duration {
        const MAX_GRACE_HOURS: u64 = 10 * 365 * 24;
        let hours = self.stale_grace_hours.min(MAX_GRACE_HOURS);
        Duration::hours(i64::try_from(hours).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempdir().unwrap();
        let config = TapConfig::load(&temp.path().join("config.toml")).unwrap();
        assert_eq!(config, TapConfig::default());
        assert_eq!(config.stale_grace(), Duration::hours(24));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs_err::write(&path, "stale_grace_hours = 2\nminimum_runtime = \"iOS-18-0\"\n").unwrap();

        let config = TapConfig::load(&path).unwrap();
        assert_eq!(config.stale_grace_hours, 2);
        assert_eq!(config.minimum_runtime.as_deref(), Some("iOS-18-0"));
        assert!(config.prefer_booted);
        assert_eq!(config.build_configuration, "Debug");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs_err::write(&path, "stale_grace_hours = \"soon\"").unwrap();

        let err = TapConfig::load(&path).unwrap_err();
        assert!(matches!(err, TapError::ConfigMalformed { .. }));
    }
}
