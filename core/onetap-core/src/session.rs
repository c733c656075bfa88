//! Session identity: which terminal (or process tree) is calling us.
//!
//! Every `tap` invocation is a fresh process, so the session has to be derived
//! from something that outlives it. Resolution order:
//!
//! 1. `ONETAP_SESSION` (non-empty) → `env-<value>`
//! 2. Controlling terminal of stdin → `/dev/ttys003`
//! 3. Parent process id → `pid-<ppid>`
//!
//! The prefixes keep the three forms from colliding, and the liveness policy
//! keys off them: only terminal sessions have a long-lived shell to probe.

use std::env;
use std::fmt;
use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

pub const SESSION_ENV_VAR: &str = "ONETAP_SESSION";

const OVERRIDE_PREFIX: &str = "env-";
const FALLBACK_PREFIX: &str = "pid-";
const TERMINAL_PREFIX: &str = "/dev/";

/// How a session identifier was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Override,
    Terminal,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        SessionId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> SessionKind {
        if self.0.starts_with(TERMINAL_PREFIX) {
            SessionKind::Terminal
        } else if self.0.starts_with(OVERRIDE_PREFIX) {
            SessionKind::Override
        } else {
            SessionKind::Fallback
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind() == SessionKind::Terminal
    }

    /// Abbreviated form for status output.
    ///
    /// `/dev/ttys003` → `tty003`, `/dev/pts/4` → `pts/4`. Override and
    /// fallback ids are already short and are returned as-is.
    pub fn short_display(&self) -> String {
        match self.kind() {
            SessionKind::Terminal => {
                if let Some(rest) = self.0.strip_prefix("/dev/ttys") {
                    format!("tty{}", rest)
                } else {
                    self.0[TERMINAL_PREFIX.len()..].to_string()
                }
            }
            SessionKind::Override | SessionKind::Fallback => self.0.clone(),
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw environment signals a session id is derived from.
///
/// Split out from [`resolve`] so resolution can be tested without a tty.
#[derive(Debug, Clone, Default)]
pub struct SessionSignals {
    pub override_value: Option<String>,
    pub tty_path: Option<String>,
    pub parent_pid: u32,
}

impl SessionSignals {
    pub fn capture() -> Self {
        SessionSignals {
            override_value: env::var(SESSION_ENV_VAR).ok(),
            tty_path: tty_path(),
            parent_pid: parent_pid(),
        }
    }
}

/// Resolves the calling session from the live process environment.
pub fn resolve() -> SessionId {
    resolve_from(&SessionSignals::capture())
}

pub fn resolve_from(signals: &SessionSignals) -> SessionId {
    if let Some(value) = signals.override_value.as_deref().filter(|v| !v.is_empty()) {
        return SessionId(format!("{}{}", OVERRIDE_PREFIX, value));
    }

    if let Some(tty) = signals.tty_path.as_deref().filter(|t| !t.is_empty()) {
        return SessionId(tty.to_string());
    }

    SessionId(format!("{}{}", FALLBACK_PREFIX, signals.parent_pid))
}

pub fn current_pid() -> u32 {
    std::process::id()
}

pub fn parent_pid() -> u32 {
    #[cfg(unix)]
    {
        // SAFETY: getppid has no preconditions and cannot fail.
        let ppid = unsafe { libc::getppid() };
        u32::try_from(ppid).unwrap_or(0)
    }
    #[cfg(not(unix))]
    {
        0
    }
}

/// Process id recorded as the claim owner (the liveness key).
///
/// Terminal sessions record the shell (our parent), which lives as long as the
/// terminal does. Other sessions record this process; the grace window in the
/// liveness policy covers the fact that it exits right away.
pub fn owner_pid(session: &SessionId) -> u32 {
    if session.is_terminal() {
        parent_pid()
    } else {
        current_pid()
    }
}

/// Both stdin and stdout are attached to a terminal.
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

fn tty_path() -> Option<String> {
    #[cfg(unix)]
    {
        // SAFETY: isatty/ttyname only inspect the descriptor. ttyname returns a
        // pointer to static storage which we copy before any other call.
        unsafe {
            if libc::isatty(libc::STDIN_FILENO) != 1 {
                return None;
            }
            let name = libc::ttyname(libc::STDIN_FILENO);
            if name.is_null() {
                return None;
            }
            Some(
                std::ffi::CStr::from_ptr(name)
                    .to_string_lossy()
                    .into_owned(),
            )
        }
    }
    #[cfg(not(unix))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(override_value: Option<&str>, tty: Option<&str>, ppid: u32) -> SessionSignals {
        SessionSignals {
            override_value: override_value.map(str::to_string),
            tty_path: tty.map(str::to_string),
            parent_pid: ppid,
        }
    }

    #[test]
    fn override_takes_precedence_and_is_prefixed() {
        let id = resolve_from(&signals(Some("ci-42"), Some("/dev/ttys003"), 100));
        assert_eq!(id.as_str(), "env-ci-42");
        assert_eq!(id.kind(), SessionKind::Override);
    }

    #[test]
    fn empty_override_is_ignored() {
        let id = resolve_from(&signals(Some(""), Some("/dev/ttys003"), 100));
        assert_eq!(id.as_str(), "/dev/ttys003");
    }

    #[test]
    fn same_terminal_resolves_to_same_session() {
        let first = resolve_from(&signals(None, Some("/dev/ttys003"), 100));
        let second = resolve_from(&signals(None, Some("/dev/ttys003"), 200));
        assert_eq!(first, second);
        assert!(first.is_terminal());
    }

    #[test]
    fn different_terminals_resolve_differently() {
        let a = resolve_from(&signals(None, Some("/dev/ttys003"), 100));
        let b = resolve_from(&signals(None, Some("/dev/ttys004"), 100));
        assert_ne!(a, b);
    }

    #[test]
    fn detached_context_falls_back_to_parent_pid() {
        let id = resolve_from(&signals(None, None, 4242));
        assert_eq!(id.as_str(), "pid-4242");
        assert_eq!(id.kind(), SessionKind::Fallback);
    }

    #[test]
    fn short_display_abbreviates_terminal_paths_only() {
        assert_eq!(SessionId::new("/dev/ttys003").short_display(), "tty003");
        assert_eq!(SessionId::new("/dev/pts/4").short_display(), "pts/4");
        assert_eq!(SessionId::new("pid-4242").short_display(), "pid-4242");
        assert_eq!(SessionId::new("env-ci-42").short_display(), "env-ci-42");
    }

    #[test]
    fn non_terminal_owner_is_current_process() {
        assert_eq!(owner_pid(&SessionId::new("pid-1")), current_pid());
    }

    #[test]
    fn session_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&SessionId::new("/dev/ttys001")).unwrap();
        assert_eq!(json, "\"/dev/ttys001\"");
    }
}
