//! File-backed claim registry.
//!
//! # File Format
//!
//! ```json
//! {
//!   "claims": [
//!     {
//!       "createdAt": "2026-01-05T10:00:00Z",
//!       "id": "01HZX...",
//!       "lastActivityAt": "2026-01-05T10:20:00Z",
//!       "ownerProcessId": 4182,
//!       "resourceId": "8A1F...",
//!       "resourceLabel": "iPhone 15 Pro",
//!       "sessionId": "/dev/ttys003"
//!     }
//!   ],
//!   "version": 1
//! }
//! ```
//!
//! Keys are written sorted so diffs of the file stay small.
//!
//! # Concurrency
//!
//! [`ClaimRegistry::modify`] is the only write path: lock, re-read, transform,
//! write temp file, rename, unlock. Readers never lock; the rename means they
//! see either the old file or the new one, never half of one.
//!
//! Unlike the other stores in this workspace, a corrupt file is an error here,
//! not an empty store. Treating it as empty would let two sessions claim the
//! same simulator.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;

use super::lock::{ExclusiveAccess, FileLock};
use super::snapshot::{Snapshot, CURRENT_VERSION};
use crate::claim::Claim;
use crate::error::{Result, TapError};
use crate::liveness::{LivenessPolicy, ProcessProbe};
use crate::session::{self, SessionId};
use crate::storage::StorageConfig;

pub struct ClaimRegistry<L = FileLock> {
    state_file: PathBuf,
    lock: L,
}

impl ClaimRegistry<FileLock> {
    /// Opens the registry under `storage`, creating the directory if needed.
    pub fn open(storage: &StorageConfig) -> Result<Self> {
        storage.ensure_root()?;
        Ok(ClaimRegistry {
            state_file: storage.state_file(),
            lock: FileLock::new(storage.lock_file()),
        })
    }
}

impl<L: ExclusiveAccess> ClaimRegistry<L> {
    pub fn with_lock(state_file: impl Into<PathBuf>, lock: L) -> Self {
        ClaimRegistry {
            state_file: state_file.into(),
            lock,
        }
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    /// Reads the persisted snapshot without locking.
    ///
    /// A missing file is an empty snapshot. An unreadable, unparsable, or
    /// newer-version file is [`TapError::StorageCorrupt`].
    pub fn load(&self) -> Result<Snapshot> {
        if !self.state_file.exists() {
            return Ok(Snapshot::default());
        }

        let content = fs_err::read_to_string(&self.state_file).map_err(|e| self.corrupt(e))?;
        let snapshot: Snapshot = serde_json::from_str(&content).map_err(|e| self.corrupt(e))?;

        if snapshot.version > CURRENT_VERSION {
            return Err(self.corrupt(format!(
                "unsupported version {} (expected <= {})",
                snapshot.version, CURRENT_VERSION
            )));
        }

        Ok(snapshot)
    }

    /// Atomic read-modify-write under the host-wide lock.
    ///
    /// The snapshot is re-read after the lock is held. If `transform` fails,
    /// or leaves two claims on one simulator or session, nothing is written.
    /// The lock is released on every path when the guard drops.
    pub fn modify<T, F>(&self, transform: F) -> Result<T>
    where
        F: FnOnce(&mut Snapshot) -> Result<T>,
    {
        let _guard = self.lock.acquire()?;

        let mut snapshot = self.load()?;
        let value = transform(&mut snapshot)?;
        snapshot.validate()?;
        snapshot.version = CURRENT_VERSION;
        self.write(&snapshot)?;

        Ok(value)
    }

    pub fn claims(&self) -> Result<Vec<Claim>> {
        Ok(self.load()?.claims)
    }

    pub fn claim_for_session(&self, session_id: &SessionId) -> Result<Option<Claim>> {
        Ok(self.load()?.claim_for_session(session_id).cloned())
    }

    /// Claim held by the calling session, if any.
    pub fn current_claim(&self) -> Result<Option<Claim>> {
        self.claim_for_session(&session::resolve())
    }

    /// Like [`Self::claim_for_session`], but a missing claim is an error.
    pub fn require_claim(&self, session_id: &SessionId) -> Result<Claim> {
        self.claim_for_session(session_id)?
            .ok_or(TapError::NoActiveClaim)
    }

    /// Adds `claim`, failing if its simulator or session is already held.
    pub fn add_claim(&self, claim: Claim) -> Result<Claim> {
        let added = claim.clone();
        self.modify(move |snapshot| snapshot.add_claim(claim))?;
        tracing::info!(
            claim = %added.id,
            resource = %added.resource_id,
            session = %added.session_id,
            "Claim created"
        );
        Ok(added)
    }

    pub fn release(&self, session_id: &SessionId) -> Result<Option<Claim>> {
        let removed = self.modify(|snapshot| Ok(snapshot.remove_claim_for_session(session_id)))?;
        if let Some(claim) = &removed {
            tracing::info!(claim = %claim.id, resource = %claim.resource_id, "Claim released");
        }
        Ok(removed)
    }

    pub fn release_resource(&self, resource_id: &str) -> Result<Option<Claim>> {
        self.modify(|snapshot| Ok(snapshot.remove_claim_for_resource(resource_id)))
    }

    pub fn touch(&self, session_id: &SessionId) -> Result<()> {
        self.modify(|snapshot| {
            if snapshot.touch_session(session_id, Utc::now()) {
                Ok(())
            } else {
                Err(TapError::NoActiveClaim)
            }
        })
    }

    /// Records the app last used by the session, bumping its activity time.
    pub fn record_artifact(&self, session_id: &SessionId, artifact_id: &str) -> Result<()> {
        self.modify(|snapshot| {
            if snapshot.update_artifact_id(artifact_id, session_id, Utc::now()) {
                Ok(())
            } else {
                Err(TapError::NoActiveClaim)
            }
        })
    }

    /// Dead claims as of now, without removing them.
    pub fn find_stale<P: ProcessProbe>(&self, policy: &LivenessPolicy<P>) -> Result<Vec<Claim>> {
        let now = Utc::now();
        Ok(self
            .load()?
            .claims
            .into_iter()
            .filter(|c| !policy.is_alive(c, now))
            .collect())
    }

    /// Removes dead claims under one lock and returns what was removed.
    pub fn garbage_collect_stale<P: ProcessProbe>(
        &self,
        policy: &LivenessPolicy<P>,
    ) -> Result<Vec<Claim>> {
        let removed = self.modify(|snapshot| Ok(snapshot.remove_stale(policy, Utc::now())))?;
        for claim in &removed {
            tracing::info!(
                claim = %claim.id,
                resource = %claim.resource_id,
                pid = claim.owner_process_id,
                "Stale claim collected"
            );
        }
        Ok(removed)
    }

    fn write(&self, snapshot: &Snapshot) -> Result<()> {
        // Round-trip through Value: its map is ordered, so keys come out sorted.
        let value = serde_json::to_value(snapshot).map_err(|e| TapError::Json {
            context: "serializing state".to_string(),
            source: e,
        })?;
        let mut content = serde_json::to_string_pretty(&value).map_err(|e| TapError::Json {
            context: "serializing state".to_string(),
            source: e,
        })?;
        content.push('\n');

        let parent_dir = self
            .state_file
            .parent()
            .ok_or_else(|| TapError::io("state file has no parent directory", std::io::ErrorKind::NotFound.into()))?;
        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .map_err(|e| TapError::io("creating temp state file", e))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| TapError::io("writing temp state file", e))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| TapError::io("syncing temp state file", e))?;
        temp_file
            .persist(&self.state_file)
            .map_err(|e| TapError::io("replacing state file", e.error))?;

        tracing::debug!(
            path = %self.state_file.display(),
            claims = snapshot.claims.len(),
            "State written"
        );
        Ok(())
    }

    fn corrupt(&self, details: impl ToString) -> TapError {
        TapError::StorageCorrupt {
            path: self.state_file.clone(),
            details: details.to_string(),
        }
    }
}
