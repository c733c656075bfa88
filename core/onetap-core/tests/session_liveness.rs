//! Session identity and liveness working together across invocations.

use chrono::{Duration, Utc};
use onetap_core::session::{self, SessionKind, SessionSignals};
use onetap_core::{Claim, ClaimRegistry, LivenessPolicy, ProcessProbe, SessionId, StorageConfig};
use tempfile::tempdir;

/// Every pid is gone, as for a wrapper process that exits after each call.
struct NothingRunning;

impl ProcessProbe for NothingRunning {
    fn exists(&self, _pid: u32) -> bool {
        false
    }
}

fn signals(tty: Option<&str>, parent_pid: u32) -> SessionSignals {
    SessionSignals {
        override_value: None,
        tty_path: tty.map(str::to_string),
        parent_pid,
    }
}

#[test]
fn test_same_terminal_resolves_to_same_session() {
    let first = session::resolve_from(&signals(Some("/dev/ttys004"), 100));
    let second = session::resolve_from(&signals(Some("/dev/ttys004"), 200));
    assert_eq!(first, second);
    assert_eq!(first.kind(), SessionKind::Terminal);

    let other = session::resolve_from(&signals(Some("/dev/ttys005"), 100));
    assert_ne!(first, other);
}

#[test]
fn test_fallback_claim_survives_new_pids_within_grace() {
    let temp = tempdir().unwrap();
    let registry = ClaimRegistry::open(&StorageConfig::with_root(temp.path().to_path_buf())).unwrap();
    let policy = LivenessPolicy::with_probe(NothingRunning, Duration::hours(24));

    let session = session::resolve_from(&signals(None, 4242));
    assert_eq!(session.kind(), SessionKind::Fallback);
    registry
        .add_claim(Claim::new("SIM", "iPhone 15", session.clone(), 90001, None))
        .unwrap();

    // A later invocation has a different pid but the claim is still live.
    registry.touch(&session).unwrap();
    assert!(registry.garbage_collect_stale(&policy).unwrap().is_empty());
    assert!(registry.claim_for_session(&session).unwrap().is_some());
}

#[test]
fn test_fallback_claim_expires_after_grace() {
    let temp = tempdir().unwrap();
    let registry = ClaimRegistry::open(&StorageConfig::with_root(temp.path().to_path_buf())).unwrap();
    let policy = LivenessPolicy::with_probe(NothingRunning, Duration::hours(24));

    let session = SessionId::new("pid-4242");
    registry
        .modify(|snapshot| {
            let mut claim = Claim::new("SIM", "iPhone 15", session.clone(), 90001, None);
            let long_ago = Utc::now() - Duration::hours(48);
            claim.created_at = long_ago;
            claim.last_activity_at = long_ago;
            snapshot.add_claim(claim)
        })
        .unwrap();

    let removed = registry.garbage_collect_stale(&policy).unwrap();
    assert_eq!(removed.len(), 1);
    assert!(registry.claims().unwrap().is_empty());
}

#[test]
fn test_terminal_claim_dies_with_its_shell() {
    let temp = tempdir().unwrap();
    let registry = ClaimRegistry::open(&StorageConfig::with_root(temp.path().to_path_buf())).unwrap();
    let policy = LivenessPolicy::with_probe(NothingRunning, Duration::hours(24));

    registry
        .add_claim(Claim::new("SIM", "iPhone 15", SessionId::new("/dev/ttys009"), 90001, None))
        .unwrap();

    assert_eq!(registry.find_stale(&policy).unwrap().len(), 1);
    assert_eq!(registry.garbage_collect_stale(&policy).unwrap().len(), 1);
}

#[test]
fn test_claim_owned_by_this_process_is_alive() {
    let policy = LivenessPolicy::new(Duration::hours(24));
    let claim = Claim::new("SIM", "iPhone 15", SessionId::new("/dev/ttys001"), std::process::id(), None);
    assert!(policy.is_alive(&claim, Utc::now()));

    let gone = Claim::new("SIM", "iPhone 15", SessionId::new("/dev/ttys001"), 99_999_999, None);
    assert!(!policy.is_alive(&gone, Utc::now()));
}
