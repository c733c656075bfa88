//! Concurrent writers through independent registry handles.
//!
//! Each thread opens its own `ClaimRegistry`, so each holds its own lock file
//! descriptor and contends on `flock` exactly as separate `tap` processes do.

use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

use onetap_core::{Claim, ClaimRegistry, SessionId, StorageConfig, TapError};
use tempfile::tempdir;

const THREADS: usize = 8;
const ROUNDS: usize = 12;

fn open(root: &Path) -> ClaimRegistry {
    ClaimRegistry::open(&StorageConfig::with_root(root.to_path_buf())).unwrap()
}

fn claim(resource: &str, session: &str) -> Claim {
    Claim::new(resource, resource, SessionId::new(session), std::process::id(), None)
}

#[test]
fn test_interleaved_adds_and_removes_lose_no_updates() {
    let temp = tempdir().unwrap();
    let root = temp.path().to_path_buf();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let root = root.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let registry = open(&root);
                barrier.wait();
                for round in 0..ROUNDS {
                    let session = format!("pid-{}-{}", t, round);
                    let resource = format!("SIM-{}-{}", t, round);
                    registry
                        .modify(|snapshot| snapshot.add_claim(claim(&resource, &session)))
                        .unwrap();
                    if round % 3 == 0 {
                        let removed = registry
                            .modify(|snapshot| Ok(snapshot.remove_claim_for_resource(&resource)))
                            .unwrap();
                        assert!(removed.is_some());
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let claims = open(&root).claims().unwrap();
    let removed_per_thread = (0..ROUNDS).filter(|r| r % 3 == 0).count();
    assert_eq!(claims.len(), THREADS * (ROUNDS - removed_per_thread));

    let mut resources: Vec<_> = claims.iter().map(|c| c.resource_id.clone()).collect();
    resources.sort();
    resources.dedup();
    assert_eq!(resources.len(), claims.len());
}

#[test]
fn test_racing_sessions_get_exactly_one_claim_on_a_shared_simulator() {
    let temp = tempdir().unwrap();
    let root = temp.path().to_path_buf();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let root = root.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let registry = open(&root);
                barrier.wait();
                registry.add_claim(claim("SHARED", &format!("pid-{}", t)))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, TapError::ResourceAlreadyClaimed { .. })));

    assert_eq!(open(&root).claims().unwrap().len(), 1);
}

#[test]
fn test_readers_never_see_a_partial_file() {
    let temp = tempdir().unwrap();
    let root = temp.path().to_path_buf();

    let writer = {
        let root = root.clone();
        thread::spawn(move || {
            let registry = open(&root);
            for i in 0..50 {
                let session = format!("env-writer-{}", i);
                registry.add_claim(claim(&format!("SIM-{}", i), &session)).unwrap();
                registry.release(&SessionId::new(session)).unwrap();
            }
        })
    };

    let registry = open(&root);
    for _ in 0..200 {
        // Any load error here would mean a torn read.
        let snapshot = registry.load().unwrap();
        assert!(snapshot.claims.len() <= 1);
    }
    writer.join().unwrap();
}
