//! The full durable registry state and the pure operations over it.
//!
//! A snapshot is only ever mutated inside [`ClaimRegistry::modify`], which
//! replaces the whole file at once. The helpers here keep both uniqueness
//! invariants (one claim per simulator, one claim per session) by refusing
//! duplicates rather than trusting callers to check first.
//!
//! [`ClaimRegistry::modify`]: super::ClaimRegistry::modify

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::claim::Claim;
use crate::error::{Result, TapError};
use crate::liveness::{LivenessPolicy, ProcessProbe};
use crate::session::SessionId;

pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub claims: Vec<Claim>,
    pub version: u32,
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot {
            claims: Vec::new(),
            version: CURRENT_VERSION,
        }
    }
}

impl Snapshot {
    pub fn claim_for_session(&self, session_id: &SessionId) -> Option<&Claim> {
        self.claims.iter().find(|c| &c.session_id == session_id)
    }

    pub fn claim_for_resource(&self, resource_id: &str) -> Option<&Claim> {
        self.claims.iter().find(|c| c.resource_id == resource_id)
    }

    pub fn claimed_resource_ids(&self) -> HashSet<String> {
        self.claims.iter().map(|c| c.resource_id.clone()).collect()
    }

    /// Appends `claim`, rejecting a simulator or session that is already held.
    pub fn add_claim(&mut self, claim: Claim) -> Result<()> {
        if let Some(owner) = self.claim_for_resource(&claim.resource_id) {
            return Err(TapError::ResourceAlreadyClaimed {
                resource: claim.resource_label.clone(),
                owner: owner.display_name(),
            });
        }
        if let Some(existing) = self.claim_for_session(&claim.session_id) {
            return Err(TapError::SessionAlreadyClaimed {
                session: claim.session_id.short_display(),
                resource: existing.resource_label.clone(),
            });
        }
        self.claims.push(claim);
        Ok(())
    }

    pub fn remove_claim_for_session(&mut self, session_id: &SessionId) -> Option<Claim> {
        let index = self.claims.iter().position(|c| &c.session_id == session_id)?;
        Some(self.claims.remove(index))
    }

    pub fn remove_claim_for_resource(&mut self, resource_id: &str) -> Option<Claim> {
        let index = self.claims.iter().position(|c| c.resource_id == resource_id)?;
        Some(self.claims.remove(index))
    }

    /// Bumps `last_activity_at`. Returns false if the session holds no claim.
    pub fn touch_session(&mut self, session_id: &SessionId, now: DateTime<Utc>) -> bool {
        match self.claims.iter_mut().find(|c| &c.session_id == session_id) {
            Some(claim) => {
                claim.touch(now);
                true
            }
            None => false,
        }
    }

    /// Records the last app used on the session's simulator, touching the claim.
    pub fn update_artifact_id(
        &mut self,
        artifact_id: &str,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> bool {
        match self.claims.iter_mut().find(|c| &c.session_id == session_id) {
            Some(claim) => {
                claim.last_artifact_id = Some(artifact_id.to_string());
                claim.touch(now);
                true
            }
            None => false,
        }
    }

    /// Removes and returns every claim the policy considers dead.
    pub fn remove_stale<P: ProcessProbe>(
        &mut self,
        policy: &LivenessPolicy<P>,
        now: DateTime<Utc>,
    ) -> Vec<Claim> {
        let (alive, stale): (Vec<Claim>, Vec<Claim>) = std::mem::take(&mut self.claims)
            .into_iter()
            .partition(|c| policy.is_alive(c, now));
        self.claims = alive;
        stale
    }

    /// Checks both uniqueness invariants over the whole snapshot.
    pub fn validate(&self) -> Result<()> {
        let mut resources = HashSet::new();
        let mut sessions = HashSet::new();
        for claim in &self.claims {
            if !resources.insert(claim.resource_id.as_str()) {
                let owner = self
                    .claim_for_resource(&claim.resource_id)
                    .map(Claim::display_name)
                    .unwrap_or_default();
                return Err(TapError::ResourceAlreadyClaimed {
                    resource: claim.resource_label.clone(),
                    owner,
                });
            }
            if !sessions.insert(claim.session_id.as_str()) {
                return Err(TapError::SessionAlreadyClaimed {
                    session: claim.session_id.short_display(),
                    resource: claim.resource_label.clone(),
                });
            }
        }
        Ok(())
    }
}
