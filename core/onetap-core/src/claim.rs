//! A session's exclusive hold on one simulator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::session::SessionId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    /// Generated at creation, never reassigned.
    pub id: String,
    /// Simulator UDID.
    pub resource_id: String,
    /// Simulator name at claim time.
    pub resource_label: String,
    pub session_id: SessionId,
    pub owner_process_id: u32,
    /// User-supplied label (e.g. `auth-feature`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Bundle id of the last app built, installed, or launched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_artifact_id: Option<String>,
}

impl Claim {
    pub fn new(
        resource_id: impl Into<String>,
        resource_label: impl Into<String>,
        session_id: SessionId,
        owner_process_id: u32,
        name: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Claim {
            id: Ulid::new().to_string(),
            resource_id: resource_id.into(),
            resource_label: resource_label.into(),
            session_id,
            owner_process_id,
            name: name.filter(|n| !n.trim().is_empty()),
            created_at: now,
            last_activity_at: now,
            last_artifact_id: None,
        }
    }

    /// User label, or `session-<suffix of id>`.
    ///
    /// Uses the random tail of the ULID; the head is a timestamp and would
    /// repeat for claims made in the same second.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => {
                let start = self.id.len().saturating_sub(8);
                format!("session-{}", self.id[start..].to_lowercase())
            }
        }
    }

    /// Time since creation, as `2h 5m` or `12m`.
    pub fn uptime(&self, now: DateTime<Utc>) -> String {
        let minutes_total = now.signed_duration_since(self.created_at).num_minutes().max(0);
        let hours = minutes_total / 60;
        let minutes = minutes_total % 60;
        if hours > 0 {
            format!("{}h {}m", hours, minutes)
        } else {
            format!("{}m", minutes)
        }
    }

    /// Records activity at `now`, never moving before `created_at`.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now.max(self.created_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claim(name: Option<&str>) -> Claim {
        Claim::new(
            "UDID-1",
            "iPhone 15 Pro",
            SessionId::new("/dev/ttys001"),
            100,
            name.map(str::to_string),
        )
    }

    #[test]
    fn new_claim_has_matching_timestamps() {
        let c = claim(None);
        assert_eq!(c.created_at, c.last_activity_at);
        assert!(c.last_artifact_id.is_none());
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(claim(None).id, claim(None).id);
    }

    #[test]
    fn display_name_prefers_user_label() {
        assert_eq!(claim(Some("auth-feature")).display_name(), "auth-feature");
    }

    #[test]
    fn display_name_falls_back_to_id_suffix() {
        let c = claim(None);
        let name = c.display_name();
        assert!(name.starts_with("session-"));
        assert_eq!(name.len(), "session-".len() + 8);
    }

    #[test]
    fn blank_name_is_treated_as_absent() {
        assert!(claim(Some("  ")).name.is_none());
    }

    #[test]
    fn uptime_formats_hours_and_minutes() {
        let c = claim(None);
        assert_eq!(c.uptime(c.created_at + Duration::minutes(12)), "12m");
        assert_eq!(c.uptime(c.created_at + Duration::minutes(125)), "2h 5m");
    }

    #[test]
    fn touch_never_precedes_creation() {
        let mut c = claim(None);
        c.touch(c.created_at - Duration::hours(1));
        assert_eq!(c.last_activity_at, c.created_at);

        let later = c.created_at + Duration::minutes(3);
        c.touch(later);
        assert_eq!(c.last_activity_at, later);
    }

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let json = serde_json::to_value(claim(None)).unwrap();
        assert!(json.get("name").is_none());
        assert!(json.get("lastArtifactId").is_none());
        assert_eq!(json["resourceId"], "UDID-1");
        assert_eq!(json["sessionId"], "/dev/ttys001");
    }
}
