//! Storage configuration and path management for onetap.
//!
//! All on-disk locations live under one root (default `~/.onetap`):
//!
//! ```text
//! ~/.onetap/
//! ├── state.json   # registry snapshot (claims + schema version)
//! ├── state.lock   # zero-length lock handle, never read
//! ├── config.toml  # optional user configuration
//! └── logs/        # daily-rolling debug logs
//! ```
//!
//! Production code uses [`StorageConfig::from_env`]; tests use
//! [`StorageConfig::with_root`] with a temp directory for isolation.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Result, TapError};

/// Overrides the storage root when set and non-empty.
pub const HOME_ENV_VAR: &str = "ONETAP_HOME";

const DEFAULT_ROOT_DIR: &str = ".onetap";

#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    /// Resolves the root from `ONETAP_HOME`, falling back to `~/.onetap`.
    pub fn from_env() -> Result<Self> {
        if let Some(root) = env::var_os(HOME_ENV_VAR).filter(|v| !v.is_empty()) {
            return Ok(Self::with_root(PathBuf::from(root)));
        }
        let home = dirs::home_dir().ok_or(TapError::HomeDirNotFound)?;
        Ok(Self::with_root(home.join(DEFAULT_ROOT_DIR)))
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the registry snapshot.
    pub fn state_file(&self) -> PathBuf {
        self.root.join("state.json")
    }

    /// Sibling lock handle for the state file.
    pub fn lock_file(&self) -> PathBuf {
        self.root.join("state.lock")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Creates the root directory if needed.
    pub fn ensure_root(&self) -> Result<()> {
        fs_err::create_dir_all(&self.root)
            .map_err(|e| TapError::io("creating state directory", e))
    }
}
