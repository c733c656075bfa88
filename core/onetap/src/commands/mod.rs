//! Subcommand implementations.
//!
//! Every command resolves the calling session once, up front, and finds its
//! target by looking the session up in the registry. No simulator id is
//! passed between commands.

pub mod claim;
pub mod gc;
pub mod logs;
pub mod release;
pub mod run;
pub mod screenshot;
pub mod status;

use onetap_core::session::{self, SessionId};
use onetap_core::{Claim, ClaimRegistry, LivenessPolicy, Result, Simctl, StorageConfig, TapConfig};

/// Everything a command needs, built once per invocation.
pub struct Context {
    pub config: TapConfig,
    pub registry: ClaimRegistry,
    pub simctl: Simctl,
    pub session: SessionId,
}

impl Context {
    pub fn load(storage: &StorageConfig) -> Result<Self> {
        let config = TapConfig::load(&storage.config_file())?;
        let registry = ClaimRegistry::open(storage)?;
        let session = session::resolve();
        tracing::debug!(session = %session, root = %storage.root().display(), "Context loaded");

        Ok(Context {
            config,
            registry,
            simctl: Simctl,
            session,
        })
    }

    /// The calling session's claim, or [`onetap_core::TapError::NoActiveClaim`].
    pub fn require_claim(&self) -> Result<Claim> {
        self.registry.require_claim(&self.session)
    }

    pub fn liveness(&self) -> LivenessPolicy {
        LivenessPolicy::new(self.config.stale_grace())
    }

    /// Remembers the app for later `launch`/`logs` and marks the claim active.
    pub fn record_artifact(&self, bundle_id: &str) -> Result<()> {
        self.registry.record_artifact(&self.session, bundle_id)
    }

    /// Boots the claimed simulator if it isn't already, telling the user.
    pub fn ensure_booted(&self, claim: &Claim) -> Result<()> {
        if self.simctl.ensure_booted(&claim.resource_id)? {
            println!("Booted {}", claim.resource_label);
        }
        Ok(())
    }
}
