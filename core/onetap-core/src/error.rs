//! Error types for onetap-core operations.
//!
//! Storage and lock failures are always fatal to the invoking command: there is
//! no fallback to a partial or default snapshot, since that could hand the same
//! simulator to two sessions. Claim conflicts and empty selections are
//! recoverable and surface as a plain user message.

use std::path::PathBuf;

/// All errors that can occur in onetap-core operations.
#[derive(Debug, thiserror::Error)]
pub enum TapError {
    // ─────────────────────────────────────────────────────────────────────
    // Registry Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("State file is corrupt: {path}: {details}")]
    StorageCorrupt { path: PathBuf, details: String },

    #[error("Failed to acquire state lock: {path}: {source}")]
    LockUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No simulator claimed for this session. Run 'tap claim' first.")]
    NoActiveClaim,

    #[error("Simulator {resource} is already claimed by {owner}")]
    ResourceAlreadyClaimed { resource: String, owner: String },

    #[error("Session {session} already holds a claim on {resource}. Release it first with 'tap release'")]
    SessionAlreadyClaimed { session: String, resource: String },

    // ─────────────────────────────────────────────────────────────────────
    // Device Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Simulator not found: {0}")]
    ResourceNotFound(String),

    #[error("No available simulators to claim")]
    NoResourcesAvailable,

    #[error("Not in an interactive terminal. Use --auto or --udid")]
    NotInteractive,

    #[error("Simulator {0} is not booted. Boot it first with 'tap claim --boot'")]
    DeviceNotBooted(String),

    #[error("Command failed with code {code}: {command}\n{output}")]
    ExternalCommandFailed {
        command: String,
        code: i32,
        output: String,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Build Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("No Xcode project or workspace found in {}", .0.display())]
    ProjectNotFound(PathBuf),

    #[error("Multiple projects found: {}. Specify one with --project", .0.join(", "))]
    MultipleProjectsFound(Vec<String>),

    #[error("No schemes found in project")]
    NoSchemeFound,

    #[error("Build failed: {0}")]
    BuildFailed(String),

    #[error("xcodebuild failed with code {code}:\n{details}")]
    XcodebuildFailed { code: i32, details: String },

    #[error("Install failed: {0}")]
    InstallFailed(String),

    #[error("Launch failed: {0}")]
    LaunchFailed(String),

    // ─────────────────────────────────────────────────────────────────────
    // Configuration / I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TapError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        TapError::Io {
            context: context.into(),
            source,
        }
    }

    /// True for failures reported to the user as a message rather than a crash.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TapError::NoActiveClaim
                | TapError::ResourceAlreadyClaimed { .. }
                | TapError::SessionAlreadyClaimed { .. }
                | TapError::ResourceNotFound(_)
                | TapError::NoResourcesAvailable
                | TapError::NotInteractive
        )
    }
}

/// Convenience type alias for Results using TapError.
pub type Result<T> = std::result::Result<T, TapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_conflicts_are_recoverable() {
        assert!(TapError::NoActiveClaim.is_recoverable());
        assert!(TapError::NoResourcesAvailable.is_recoverable());
        assert!(TapError::ResourceAlreadyClaimed {
            resource: "iPhone 15".to_string(),
            owner: "auth-feature".to_string(),
        }
        .is_recoverable());
    }

    #[test]
    fn storage_failures_are_fatal() {
        let corrupt = TapError::StorageCorrupt {
            path: PathBuf::from("/tmp/state.json"),
            details: "expected value".to_string(),
        };
        assert!(!corrupt.is_recoverable());

        let lock = TapError::LockUnavailable {
            path: PathBuf::from("/tmp/state.lock"),
            source: std::io::Error::other("denied"),
        };
        assert!(!lock.is_recoverable());
    }

    #[test]
    fn external_command_message_includes_code_and_output() {
        let err = TapError::ExternalCommandFailed {
            command: "xcrun simctl boot ABC".to_string(),
            code: 149,
            output: "Unable to boot device".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("149"));
        assert!(message.contains("Unable to boot device"));
    }
}
