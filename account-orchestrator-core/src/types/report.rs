//! Checkin-run result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use account_orchestrator_portal::CheckinOutcome;

use crate::types::Account;

/// Atomic balance mutation result, as reported by the ledger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChange {
    pub old_balance: i64,
    pub new_balance: i64,
}

/// One eligibility query result.
///
/// `as_of` and `reference_date` are server-observed so downstream logging
/// has a consistent time reference independent of caller clock skew.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibleBatch {
    pub accounts: Vec<Account>,
    /// Server-observed timestamp of the query.
    #[serde(default, with = "crate::utils::datetime")]
    pub as_of: Option<DateTime<Utc>>,
    /// Resolved calendar date in the service's reference timezone.
    pub reference_date: String,
}

/// Per-account outcome of one checkin pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinReport {
    pub account_id: String,
    /// Whether a refreshed session was persisted.
    pub session_refreshed: bool,
    /// Checkin step outcome; absent when acquisition failed outright.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkin: Option<CheckinOutcome>,
    /// Applied balance delta, when one was applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<BalanceChange>,
    /// Failure reason, when the account did not complete cleanly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate of one checkin run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Accounts that acquired a session and recorded a checkin.
    pub success_count: usize,
    /// Accounts whose session was refreshed but whose checkin step failed.
    pub soft_failed_count: usize,
    /// Accounts that failed outright (no session, or ledger rejection).
    pub failed_count: usize,
    /// Accounts skipped by the local eligibility re-check.
    pub skipped_count: usize,
    /// Per-account detail, in processing order.
    pub reports: Vec<CheckinReport>,
}

impl RunSummary {
    #[must_use]
    pub fn processed(&self) -> usize {
        self.success_count + self.soft_failed_count + self.failed_count + self.skipped_count
    }
}
