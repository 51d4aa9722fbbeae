//! Portal-facing domain types shared with the lifecycle core.

use serde::{Deserialize, Serialize};

use crate::error::{PortalError, Result};

/// Which checkin surface(s) an account uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckinMode {
    /// Checkin on the portal web endpoint only.
    Portal,
    /// Checkin on the mobile-client endpoint only.
    Mobile,
    /// Checkin on both surfaces.
    Both,
}

impl CheckinMode {
    #[must_use]
    pub fn includes_portal(self) -> bool {
        matches!(self, Self::Portal | Self::Both)
    }

    #[must_use]
    pub fn includes_mobile(self) -> bool {
        matches!(self, Self::Mobile | Self::Both)
    }
}

/// Authoritative user state as reported by the portal.
///
/// Unknown fields are preserved through `extra` so a snapshot can be
/// uploaded to the ledger verbatim, not just the fields this core reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    /// Current portal username.
    pub username: String,
    /// Remaining quota balance.
    pub balance: i64,
    /// Consumed quota.
    #[serde(default)]
    pub used: i64,
    /// Fields this core does not interpret, carried verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Outcome of the checkin step inside one acquisition.
///
/// Deliberately separate from acquisition success: a valid session can be
/// returned even when the checkin itself failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CheckinOutcome {
    /// Checkin succeeded and credited `delta` quota.
    Completed { delta: i64 },
    /// The portal reports a checkin was already recorded today.
    AlreadyDone,
    /// The checkin call failed; the session may still be valid.
    Failed { reason: String },
}

impl CheckinOutcome {
    /// Whether a checkin is recorded for today (freshly completed or already
    /// done).
    #[must_use]
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::AlreadyDone)
    }
}

/// Result of one session acquisition.
#[derive(Debug, Clone)]
pub struct AcquireOutcome {
    /// Session token extracted from the cookie jar.
    pub session: String,
    /// Portal user id from the login response body.
    pub user_id: String,
    /// Authoritative snapshot (self-info, or the login-embedded snapshot
    /// when the self-info call failed).
    pub snapshot: UserSnapshot,
    /// Checkin step outcome, reported independently of acquisition.
    pub checkin: CheckinOutcome,
}

/// One credential-rotation attempt against the portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationRequest {
    /// Username to log in with (pre-rotation).
    pub old_username: String,
    /// Password to log in with (pre-rotation).
    pub old_password: String,
    /// Desired new username, if rotating the username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_username: Option<String>,
    /// Desired new password, if rotating the password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
}

impl RotationRequest {
    /// Validate before any network or browser action.
    ///
    /// At least one of the new fields must be present and non-empty.
    pub fn validate(&self) -> Result<()> {
        let has_username = self.new_username.as_deref().is_some_and(|u| !u.is_empty());
        let has_password = self.new_password.as_deref().is_some_and(|p| !p.is_empty());
        if !has_username && !has_password {
            return Err(PortalError::InvalidParameter {
                param: "new_username/new_password".to_string(),
                detail: "at least one of new username or new password is required".to_string(),
            });
        }
        Ok(())
    }

    /// Same rotation with a different candidate username.
    #[must_use]
    pub fn with_new_username(mut self, username: impl Into<String>) -> Self {
        self.new_username = Some(username.into());
        self
    }
}

/// Result of a verified credential rotation.
#[derive(Debug, Clone)]
pub struct RotationOutcome {
    /// Portal user id from the login response body.
    pub user_id: String,
    /// Post-change authoritative snapshot. `snapshot.username` is the
    /// verified username, which is what callers must report upstream.
    pub snapshot: UserSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkin_mode_surfaces() {
        assert!(CheckinMode::Portal.includes_portal());
        assert!(!CheckinMode::Portal.includes_mobile());
        assert!(!CheckinMode::Mobile.includes_portal());
        assert!(CheckinMode::Mobile.includes_mobile());
        assert!(CheckinMode::Both.includes_portal());
        assert!(CheckinMode::Both.includes_mobile());
    }

    #[test]
    fn checkin_outcome_recorded() {
        assert!(CheckinOutcome::Completed { delta: 50 }.is_recorded());
        assert!(CheckinOutcome::AlreadyDone.is_recorded());
        assert!(
            !CheckinOutcome::Failed {
                reason: "x".into()
            }
            .is_recorded()
        );
    }

    #[test]
    fn rotation_requires_one_new_field() {
        let base = RotationRequest {
            old_username: "old".into(),
            old_password: "pw".into(),
            new_username: None,
            new_password: None,
        };
        assert!(matches!(
            base.validate(),
            Err(PortalError::InvalidParameter { .. })
        ));

        let with_username = base.clone().with_new_username("fresh");
        assert!(with_username.validate().is_ok());

        let mut with_password = base.clone();
        with_password.new_password = Some("newpw".into());
        assert!(with_password.validate().is_ok());
    }

    #[test]
    fn rotation_rejects_empty_strings() {
        let req = RotationRequest {
            old_username: "old".into(),
            old_password: "pw".into(),
            new_username: Some(String::new()),
            new_password: None,
        };
        assert!(matches!(
            req.validate(),
            Err(PortalError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn snapshot_preserves_unknown_fields() {
        let json = r#"{"username":"alice","balance":120,"used":30,"vipLevel":3,"email":"a@b.c"}"#;
        let snapshot: UserSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.username, "alice");
        assert_eq!(snapshot.balance, 120);
        assert_eq!(snapshot.used, 30);

        let back = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(back["vipLevel"], 3);
        assert_eq!(back["email"], "a@b.c");
    }

    #[test]
    fn checkin_mode_wire_names() {
        assert_eq!(
            serde_json::to_string(&CheckinMode::Portal).unwrap(),
            "\"portal\""
        );
        assert_eq!(
            serde_json::from_str::<CheckinMode>("\"both\"").unwrap(),
            CheckinMode::Both
        );
    }
}
