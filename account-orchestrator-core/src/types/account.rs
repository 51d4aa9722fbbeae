//! Account data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use account_orchestrator_portal::CheckinMode;

/// How the account authenticates against the portal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Username/password login (the only type this core rotates).
    Password,
    /// Google OAuth login.
    Google,
    /// GitHub OAuth login.
    Github,
}

/// One credential set for the portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Account ID (opaque, ledger-assigned).
    pub id: String,
    /// Owning-user reference.
    pub owner_id: String,
    /// Authentication type.
    pub account_type: AccountType,
    /// Portal username (semantics depend on `account_type`).
    pub username: String,
    /// Portal password.
    pub password: String,
    /// Session token; empty means no session.
    #[serde(default)]
    pub session: String,
    /// Session expiry; absent or past means expired.
    #[serde(default, with = "crate::utils::datetime")]
    pub session_expire_time: Option<DateTime<Utc>>,
    /// Which checkin surface(s) this account uses.
    pub checkin_mode: CheckinMode,
    /// Time of the last successful checkin.
    #[serde(default, with = "crate::utils::datetime")]
    pub checkin_date: Option<DateTime<Utc>>,
    /// Remaining quota. Mutated only through atomic deltas.
    pub balance: i64,
    /// Consumed quota.
    #[serde(default)]
    pub used: i64,
    /// Sold accounts are never touched by the orchestrators.
    #[serde(default)]
    pub is_sold: bool,
    /// Whether the account may be listed for sale.
    #[serde(default)]
    pub can_sell: bool,
}

impl Account {
    /// Whether the stored session is present and unexpired at `now`.
    #[must_use]
    pub fn has_live_session(&self, now: DateTime<Utc>) -> bool {
        !self.session.is_empty() && self.session_expire_time.is_some_and(|t| t > now)
    }
}

/// Partial account update sent to the ledger.
///
/// Absent fields are not serialized and therefore never clobbered; balance
/// deliberately has no field here — it moves only through
/// [`AccountLedger::increment_balance`](crate::traits::AccountLedger::increment_balance).
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// New session token; an empty string clears the session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", with = "crate::utils::datetime")]
    pub session_expire_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", with = "crate::utils::datetime")]
    pub checkin_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used: Option<i64>,
}

impl AccountPatch {
    #[must_use]
    pub fn with_session(
        mut self,
        session: impl Into<String>,
        expires: Option<DateTime<Utc>>,
    ) -> Self {
        self.session = Some(session.into());
        self.session_expire_time = expires;
        self
    }

    /// Clear the stored session so the next eligibility pass retries.
    #[must_use]
    pub fn clearing_session(mut self) -> Self {
        self.session = Some(String::new());
        self.session_expire_time = None;
        self
    }

    #[must_use]
    pub fn with_checkin_date(mut self, at: DateTime<Utc>) -> Self {
        self.checkin_date = Some(at);
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    #[must_use]
    pub fn with_used(mut self, used: i64) -> Self {
        self.used = Some(used);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account() -> Account {
        Account {
            id: "acc-1".to_string(),
            owner_id: "user-1".to_string(),
            account_type: AccountType::Password,
            username: "alice".to_string(),
            password: "pw".to_string(),
            session: String::new(),
            session_expire_time: None,
            checkin_mode: CheckinMode::Portal,
            checkin_date: None,
            balance: 100,
            used: 0,
            is_sold: false,
            can_sell: true,
        }
    }

    #[test]
    fn empty_session_is_not_live() {
        let acc = account();
        assert!(!acc.has_live_session(Utc::now()));
    }

    #[test]
    fn unexpired_session_is_live() {
        let now = Utc::now();
        let mut acc = account();
        acc.session = "tok".to_string();
        acc.session_expire_time = Some(now + Duration::hours(1));
        assert!(acc.has_live_session(now));
    }

    #[test]
    fn expired_session_is_not_live() {
        let now = Utc::now();
        let mut acc = account();
        acc.session = "tok".to_string();
        acc.session_expire_time = Some(now - Duration::hours(1));
        assert!(!acc.has_live_session(now));
    }

    #[test]
    fn session_without_expiry_is_not_live() {
        let mut acc = account();
        acc.session = "tok".to_string();
        assert!(!acc.has_live_session(Utc::now()));
    }

    #[test]
    fn patch_skips_absent_fields() {
        let patch = AccountPatch::default().with_checkin_date(Utc::now());
        let json = serde_json::to_value(&patch).unwrap();
        assert!(json.get("session").is_none());
        assert!(json.get("username").is_none());
        assert!(json.get("checkinDate").is_some());
    }

    #[test]
    fn clearing_session_serializes_empty_string() {
        let patch = AccountPatch::default().clearing_session();
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["session"], "");
    }

    #[test]
    fn account_wire_round_trip() {
        let json = r#"{
            "id": "acc-9",
            "ownerId": "user-3",
            "accountType": "password",
            "username": "bob",
            "password": "secret",
            "session": "tok",
            "sessionExpireTime": 1700000000,
            "checkinMode": "both",
            "checkinDate": "2026-08-05T16:00:00Z",
            "balance": 42,
            "used": 7,
            "isSold": false,
            "canSell": true
        }"#;
        let acc: Account = serde_json::from_str(json).unwrap();
        assert_eq!(acc.account_type, AccountType::Password);
        assert_eq!(acc.checkin_mode, CheckinMode::Both);
        assert_eq!(acc.session_expire_time.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(acc.balance, 42);
    }
}
