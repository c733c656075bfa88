//! Claiming a simulator for a session.
//!
//! The device listing is taken before the lock (it shells out and can be
//! slow); the already-claimed check and the write happen inside one
//! [`ClaimRegistry::modify`], so two sessions racing for the same simulator
//! can't both win.

use crate::claim::Claim;
use crate::device::{Device, DeviceDirectory};
use crate::error::{Result, TapError};
use crate::registry::{ClaimRegistry, ExclusiveAccess};
use crate::selection::{auto_select, SelectionOptions};
use crate::session::SessionId;

/// How the simulator is chosen.
#[derive(Debug, Clone)]
pub enum DeviceChoice {
    /// A specific simulator by UDID; must exist and be unclaimed.
    Udid(String),
    /// Let the selection policy decide among unclaimed simulators.
    Auto(SelectionOptions),
    /// A device the caller already picked (e.g. from the interactive list).
    Picked(Device),
}

#[derive(Debug, Clone)]
pub struct ClaimRequest {
    pub session: SessionId,
    pub owner_pid: u32,
    pub name: Option<String>,
    pub choice: DeviceChoice,
}

pub fn claim_device<L, D>(
    registry: &ClaimRegistry<L>,
    directory: &D,
    request: ClaimRequest,
) -> Result<(Claim, Device)>
where
    L: ExclusiveAccess,
    D: DeviceDirectory,
{
    let ClaimRequest {
        session,
        owner_pid,
        name,
        choice,
    } = request;

    let devices = match &choice {
        DeviceChoice::Picked(_) => Vec::new(),
        _ => directory.list_devices()?,
    };

    let (claim, device) = registry.modify(|snapshot| {
        if let Some(existing) = snapshot.claim_for_session(&session) {
            return Err(TapError::SessionAlreadyClaimed {
                session: session.short_display(),
                resource: existing.resource_label.clone(),
            });
        }

        let device = match &choice {
            DeviceChoice::Udid(udid) => devices
                .iter()
                .find(|d| &d.udid == udid)
                .cloned()
                .ok_or_else(|| TapError::ResourceNotFound(udid.clone()))?,
            DeviceChoice::Picked(device) => device.clone(),
            DeviceChoice::Auto(options) => {
                auto_select(&devices, &snapshot.claimed_resource_ids(), options)
                    .cloned()
                    .ok_or(TapError::NoResourcesAvailable)?
            }
        };

        let claim = Claim::new(
            device.udid.clone(),
            device.name.clone(),
            session.clone(),
            owner_pid,
            name.clone(),
        );
        snapshot.add_claim(claim.clone())?;
        Ok((claim, device))
    })?;

    tracing::info!(
        claim = %claim.id,
        resource = %claim.resource_id,
        session = %claim.session_id,
        "Claim created"
    );
    Ok((claim, device))
}
