//! Password-change request model and its upstream report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use account_orchestrator_portal::{RotationOutcome, RotationRequest, UserSnapshot};

/// Request state machine. Terminal states never transition again within one
/// request's lifetime; further attempts need a fresh request.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RotationStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Error,
}

impl RotationStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// One pending credential rotation, created externally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeRequest {
    /// Request ID (opaque, ledger-assigned).
    pub id: String,
    /// Username to log in with (pre-rotation).
    pub old_username: String,
    /// Password to log in with (pre-rotation).
    pub old_password: String,
    /// Desired new username.
    #[serde(default)]
    pub new_username: Option<String>,
    /// Desired new password.
    #[serde(default)]
    pub new_password: Option<String>,
    /// Current state.
    #[serde(default)]
    pub status: RotationStatus,
    /// Confirmed-remote-failure count, carried in from the external
    /// scheduler. Increments only on authoritative API rejections.
    #[serde(default)]
    pub error_count: u32,
    /// Completion time, set on success.
    #[serde(default, with = "crate::utils::datetime")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl PasswordChangeRequest {
    /// The portal-facing rotation payload for this request.
    #[must_use]
    pub fn rotation(&self) -> RotationRequest {
        RotationRequest {
            old_username: self.old_username.clone(),
            old_password: self.old_password.clone(),
            new_username: self.new_username.clone(),
            new_password: self.new_password.clone(),
        }
    }
}

/// Structured outcome reported to the ledger for a rotation request.
///
/// Sent on every path before the service returns; nothing finishes in an
/// untracked state.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RotationReport {
    pub status: RotationStatus,
    /// Failure reason, when `status == Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    /// Whether the failure was an authoritative portal rejection. The
    /// ledger increments the request's error count only when this is set;
    /// local faults (browser init, parsing) must never escalate.
    pub api_error: bool,
    /// Verified post-change username from the snapshot — never the locally
    /// generated candidate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_username: Option<String>,
    /// Post-change snapshot, uploaded verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_info: Option<UserSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none", with = "crate::utils::datetime")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RotationReport {
    /// Report entering the in-progress state.
    #[must_use]
    pub fn in_progress() -> Self {
        Self {
            status: RotationStatus::InProgress,
            error_reason: None,
            api_error: false,
            new_username: None,
            account_info: None,
            completed_at: None,
        }
    }

    /// Report a verified, completed rotation.
    #[must_use]
    pub fn completed(outcome: &RotationOutcome, at: DateTime<Utc>) -> Self {
        Self {
            status: RotationStatus::Completed,
            error_reason: None,
            api_error: false,
            new_username: Some(outcome.snapshot.username.clone()),
            account_info: Some(outcome.snapshot.clone()),
            completed_at: Some(at),
        }
    }

    /// Report a terminal failure.
    #[must_use]
    pub fn error(reason: impl Into<String>, api_error: bool) -> Self {
        Self {
            status: RotationStatus::Error,
            error_reason: Some(reason.into()),
            api_error,
            new_username: None,
            account_info: None,
            completed_at: None,
        }
    }
}
