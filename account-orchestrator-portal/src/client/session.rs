//! Session acquisition: scripted login, daily checkin, self-info refresh.

use serde::Deserialize;

use crate::browser::BrowserPage;
use crate::error::{PortalError, Result};
use crate::types::{AcquireOutcome, CheckinMode, CheckinOutcome, UserSnapshot};

use super::http::PortalResponse;
use super::{
    CHECKIN_PATH, CODE_ALREADY_CHECKED_IN, LOGIN_PATH, MOBILE_CHECKIN_PATH, PortalClient,
    SELF_INFO_PATH, SESSION_COOKIE,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    user_id: Option<String>,
    #[serde(default)]
    user: Option<UserSnapshot>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckinData {
    #[serde(default)]
    delta: Option<i64>,
}

impl PortalClient {
    /// One full acquisition on an already-launched page.
    ///
    /// Order matters: navigate and wait for quiescence first (the portal
    /// bootstraps client-side session state on load), then login, then read
    /// the session cookie, then checkin, then self-info. A pause separates
    /// each network action.
    pub(crate) async fn acquire_on_page(
        &self,
        page: &mut dyn BrowserPage,
        username: &str,
        password: &str,
        mode: CheckinMode,
    ) -> Result<AcquireOutcome> {
        page.goto("/").await?;

        let (user_id, login_snapshot) = self.login(page, username, password).await?;

        let session = page
            .cookie_value(SESSION_COOKIE)
            .await?
            .ok_or_else(|| PortalError::SessionCookieMissing {
                cookie: SESSION_COOKIE.to_string(),
            })?;

        self.action_pause().await;
        let checkin = self.checkin(page, mode).await;

        self.action_pause().await;
        // Self-info is best-effort; the login-embedded snapshot is the
        // fallback when it fails.
        let snapshot = match self.self_info(page).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("self-info failed for user {user_id}, using login snapshot: {e}");
                login_snapshot
            }
        };

        Ok(AcquireOutcome {
            session,
            user_id,
            snapshot,
            checkin,
        })
    }

    /// Invoke the in-page login endpoint and extract user id and the
    /// login-embedded snapshot.
    pub(crate) async fn login(
        &self,
        page: &mut dyn BrowserPage,
        username: &str,
        password: &str,
    ) -> Result<(String, UserSnapshot)> {
        let response = page
            .post_form(LOGIN_PATH, &[("username", username), ("password", password)])
            .await?;

        let envelope: PortalResponse<LoginData> = Self::decode(&response, "login")?;
        let data = Self::success_data(envelope, "login", None)?;

        let user_id = data.user_id.ok_or_else(|| PortalError::ParseError {
            detail: "login response is missing the user id".to_string(),
        })?;
        let snapshot = data.user.ok_or_else(|| PortalError::ParseError {
            detail: "login response is missing the user snapshot".to_string(),
        })?;

        log::info!("logged in as user {user_id}");
        Ok((user_id, snapshot))
    }

    /// Run the checkin step for the account's mode.
    ///
    /// Never fails the acquisition: every failure folds into
    /// [`CheckinOutcome::Failed`].
    async fn checkin(&self, page: &mut dyn BrowserPage, mode: CheckinMode) -> CheckinOutcome {
        let portal = if mode.includes_portal() {
            Some(self.checkin_at(page, CHECKIN_PATH).await)
        } else {
            None
        };

        let mobile = if mode.includes_mobile() {
            if portal.is_some() {
                self.action_pause().await;
            }
            Some(self.checkin_at(page, MOBILE_CHECKIN_PATH).await)
        } else {
            None
        };

        combine_checkins(portal, mobile)
    }

    async fn checkin_at(&self, page: &mut dyn BrowserPage, path: &str) -> CheckinOutcome {
        let response = match page.post_json(path, &serde_json::json!({})).await {
            Ok(response) => response,
            Err(e) => {
                return CheckinOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let envelope: PortalResponse<CheckinData> = match Self::decode(&response, "checkin") {
            Ok(envelope) => envelope,
            Err(e) => {
                return CheckinOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        if envelope.code == CODE_ALREADY_CHECKED_IN {
            return CheckinOutcome::AlreadyDone;
        }

        match Self::success_data(envelope, "checkin", None) {
            Ok(data) => CheckinOutcome::Completed {
                delta: data.delta.unwrap_or(0),
            },
            Err(e) => CheckinOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    /// Fetch the authoritative user snapshot for the current session.
    pub(crate) async fn self_info(&self, page: &mut dyn BrowserPage) -> Result<UserSnapshot> {
        let response = page.get(SELF_INFO_PATH).await?;
        let envelope: PortalResponse<UserSnapshot> = Self::decode(&response, "self-info")?;
        Self::success_data(envelope, "self-info", None)
    }
}

/// Fold per-surface checkin results into one outcome.
///
/// Any completed surface wins (deltas summed); otherwise an already-done
/// surface wins; otherwise the failures are joined.
fn combine_checkins(
    portal: Option<CheckinOutcome>,
    mobile: Option<CheckinOutcome>,
) -> CheckinOutcome {
    let outcomes: Vec<CheckinOutcome> = [portal, mobile].into_iter().flatten().collect();

    let total_delta: i64 = outcomes
        .iter()
        .filter_map(|o| match o {
            CheckinOutcome::Completed { delta } => Some(*delta),
            _ => None,
        })
        .sum();
    if outcomes
        .iter()
        .any(|o| matches!(o, CheckinOutcome::Completed { .. }))
    {
        return CheckinOutcome::Completed { delta: total_delta };
    }

    if outcomes.iter().any(|o| matches!(o, CheckinOutcome::AlreadyDone)) {
        return CheckinOutcome::AlreadyDone;
    }

    let reasons: Vec<String> = outcomes
        .into_iter()
        .map(|o| match o {
            CheckinOutcome::Failed { reason } => reason,
            _ => String::new(),
        })
        .collect();
    CheckinOutcome::Failed {
        reason: reasons.join("; "),
    }
}
