//! Stale-claim detection.
//!
//! A claim is alive while its owner process exists. When the probe says the
//! process is gone, terminal sessions are dead immediately (the shell exited),
//! but override/fallback sessions get a grace window on `last_activity_at`:
//! their recorded pid is a short-lived `tap` process that is expected to be
//! gone by the next command.

use chrono::{DateTime, Duration, Utc};

use crate::claim::Claim;

/// Existence check for a process id.
pub trait ProcessProbe {
    fn exists(&self, pid: u32) -> bool;
}

/// Probes the live process table with `kill(pid, 0)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl ProcessProbe for SystemProbe {
    fn exists(&self, pid: u32) -> bool {
        is_pid_alive(pid)
    }
}

/// `kill(pid, 0)`: no signal is delivered, only existence is checked.
///
/// `EPERM` means the process exists but belongs to someone else, so it counts
/// as alive.
pub fn is_pid_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    #[cfg(unix)]
    {
        // SAFETY: signal 0 performs error checking only.
        if unsafe { libc::kill(pid, 0) } == 0 {
            return true;
        }
        std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }
    #[cfg(not(unix))]
    {
        // No probe available; never report a live owner as dead.
        let _ = pid;
        true
    }
}

#[derive(Debug, Clone)]
pub struct LivenessPolicy<P = SystemProbe> {
    probe: P,
    grace: Duration,
}

impl LivenessPolicy<SystemProbe> {
    pub fn new(grace: Duration) -> Self {
        Self::with_probe(SystemProbe, grace)
    }
}

impl<P: ProcessProbe> LivenessPolicy<P> {
    pub fn with_probe(probe: P, grace: Duration) -> Self {
        LivenessPolicy { probe, grace }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    pub fn is_alive(&self, claim: &Claim, now: DateTime<Utc>) -> bool {
        if self.probe.exists(claim.owner_process_id) {
            return true;
        }
        if claim.session_id.is_terminal() {
            return false;
        }
        now.signed_duration_since(claim.last_activity_at) < self.grace
    }
}
