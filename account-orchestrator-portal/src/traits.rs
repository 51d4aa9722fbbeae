use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AcquireOutcome, CheckinMode, RotationOutcome, RotationRequest};

/// The portal capability consumed by the lifecycle core.
///
/// One implementation drives the real portal through a scripted browser
/// ([`PortalClient`](crate::PortalClient)); test doubles script outcomes.
/// Both operations are single-attempt: retry policy belongs to the caller.
#[async_trait]
pub trait AccountPortal: Send + Sync {
    /// Acquire an authenticated session for the given credentials and run
    /// the daily checkin for `mode`.
    ///
    /// Checkin failure is reported inside the returned
    /// [`AcquireOutcome::checkin`], never as an acquisition error.
    async fn acquire(
        &self,
        username: &str,
        password: &str,
        mode: CheckinMode,
    ) -> Result<AcquireOutcome>;

    /// Log in with the rotation's old credentials, apply the new username
    /// and/or password, and verify the change against a fresh snapshot.
    async fn rotate_credentials(&self, rotation: &RotationRequest) -> Result<RotationOutcome>;
}
