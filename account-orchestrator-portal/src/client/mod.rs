//! Scripted-browser portal client.

mod http;
mod rotate;
mod session;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::browser::{BrowserEngine, BrowserPage, BrowserProfile};
use crate::delay::human_pause;
use crate::error::Result;
use crate::traits::AccountPortal;
use crate::types::{AcquireOutcome, CheckinMode, RotationOutcome, RotationRequest};

pub(crate) const LOGIN_PATH: &str = "/api/v1/passport/login";
pub(crate) const CHECKIN_PATH: &str = "/api/v1/user/checkin";
pub(crate) const MOBILE_CHECKIN_PATH: &str = "/api/v1/client/checkin";
pub(crate) const SELF_INFO_PATH: &str = "/api/v1/user/info";
pub(crate) const SETTINGS_PATH: &str = "/api/v1/user/settings";

/// Cookie carrying the session token. The login body never contains it.
pub(crate) const SESSION_COOKIE: &str = "session";

/// Portal application error codes.
/// Observed behavior, not documented API; updated as the portal drifts.
pub(crate) const CODE_BAD_CREDENTIALS: i64 = 1001;
pub(crate) const CODE_ACCOUNT_DISABLED: i64 = 1002;
pub(crate) const CODE_ALREADY_CHECKED_IN: i64 = 2001;
pub(crate) const CODE_DUPLICATE_USERNAME: i64 = 2002;

/// Default bounds for the pause inserted between successive in-page actions.
const DEFAULT_ACTION_PAUSE_MIN_MS: u64 = 800;
const DEFAULT_ACTION_PAUSE_MAX_MS: u64 = 2_500;

/// Drives the portal through one isolated browser context per operation.
///
/// Construct → use → teardown is scoped to each call; a context is never
/// shared or reused across accounts.
pub struct PortalClient {
    engine: Arc<dyn BrowserEngine>,
    profile: BrowserProfile,
    pause_min: Duration,
    pause_max: Duration,
}

impl PortalClient {
    #[must_use]
    pub fn new(engine: Arc<dyn BrowserEngine>) -> Self {
        Self {
            engine,
            profile: BrowserProfile::default(),
            pause_min: Duration::from_millis(DEFAULT_ACTION_PAUSE_MIN_MS),
            pause_max: Duration::from_millis(DEFAULT_ACTION_PAUSE_MAX_MS),
        }
    }

    /// Override the browser fingerprint profile.
    #[must_use]
    pub fn with_profile(mut self, profile: BrowserProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Override the inter-action pause bounds.
    #[must_use]
    pub fn with_action_pause(mut self, min: Duration, max: Duration) -> Self {
        self.pause_min = min;
        self.pause_max = max;
        self
    }

    pub(crate) async fn launch_page(&self) -> Result<Box<dyn BrowserPage>> {
        self.engine.launch(&self.profile).await
    }

    /// Teardown runs on every exit path; a failed close is logged, never
    /// propagated over the operation's own result.
    pub(crate) async fn teardown(mut page: Box<dyn BrowserPage>) {
        if let Err(e) = page.close().await {
            log::warn!("browser teardown failed: {e}");
        }
    }

    pub(crate) async fn action_pause(&self) {
        human_pause(self.pause_min, self.pause_max).await;
    }
}

#[async_trait]
impl AccountPortal for PortalClient {
    async fn acquire(
        &self,
        username: &str,
        password: &str,
        mode: CheckinMode,
    ) -> Result<AcquireOutcome> {
        let mut page = self.launch_page().await?;
        let result = self
            .acquire_on_page(page.as_mut(), username, password, mode)
            .await;
        Self::teardown(page).await;
        result
    }

    async fn rotate_credentials(&self, rotation: &RotationRequest) -> Result<RotationOutcome> {
        rotation.validate()?;
        let mut page = self.launch_page().await?;
        let result = self.rotate_on_page(page.as_mut(), rotation).await;
        Self::teardown(page).await;
        result
    }
}
