//! Password-rotation state machine.
//!
//! `not-started → in-progress → {completed, error}`. Terminal states are
//! final for a request's lifetime; the external scheduler issues a fresh
//! request for further attempts.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;

use account_orchestrator_portal::{PortalError, RotationRequest};

use crate::error::{CoreError, CoreResult};
use crate::policy::RotationPolicy;
use crate::services::ServiceContext;
use crate::types::{PasswordChangeRequest, RotationReport};

/// Length of the random suffix appended to a conflicting username.
const CONFLICT_SUFFIX_LEN: usize = 2;

/// Processes one pending [`PasswordChangeRequest`] end to end.
pub struct PasswordChangeService {
    ctx: Arc<ServiceContext>,
    policy: RotationPolicy,
}

impl PasswordChangeService {
    /// Create a password-change service instance
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self {
            ctx,
            policy: RotationPolicy::default(),
        }
    }

    /// Override the rotation policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RotationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Drive one request through the state machine.
    ///
    /// The outcome report is delivered to the ledger on every path after the
    /// in-progress transition; only validation failures (no side effects
    /// yet) and a failed in-progress transition itself return early.
    pub async fn process(&self, request: &PasswordChangeRequest) -> CoreResult<RotationReport> {
        if request.status.is_terminal() {
            return Err(CoreError::ValidationError(format!(
                "request {} is already finalized",
                request.id
            )));
        }

        // Caught before any network or browser action; the request record
        // stays untouched so the scheduler can reissue it.
        let rotation = request.rotation();
        rotation.validate()?;

        log::info!(
            "rotation request {}: entering in-progress (error_count={})",
            request.id,
            request.error_count
        );
        self.ctx
            .ledger
            .update_rotation_request(&request.id, &RotationReport::in_progress())
            .await?;

        let report = self.execute(request, rotation).await;

        match &report.error_reason {
            Some(reason) => log::warn!(
                "rotation request {} finished with error (api_error={}): {reason}",
                request.id,
                report.api_error
            ),
            None => log::info!("rotation request {} completed", request.id),
        }

        // Guaranteed finalization: the terminal report reaches the ledger
        // even for failures produced above.
        self.ctx
            .ledger
            .update_rotation_request(&request.id, &report)
            .await?;

        Ok(report)
    }

    /// Run the rotation attempts. Infallible by construction: every failure
    /// folds into a terminal [`RotationReport`].
    async fn execute(
        &self,
        request: &PasswordChangeRequest,
        rotation: RotationRequest,
    ) -> RotationReport {
        let first_attempt = self.ctx.portal.rotate_credentials(&rotation).await;

        let error = match first_attempt {
            Ok(outcome) => return RotationReport::completed(&outcome, Utc::now()),
            Err(e) => e,
        };

        // Conflict-retry rule: a duplicate-username rejection, arriving with
        // the carried-in error count exactly at the threshold, earns one
        // retry with a suffix-mutated candidate. Bounded to two rotation
        // attempts total.
        if matches!(error, PortalError::DuplicateUsername { .. })
            && request.error_count == self.policy.conflict_retry_threshold
        {
            if let Some(desired) = rotation.new_username.clone() {
                let candidate = conflict_candidate(&desired);
                log::info!(
                    "rotation request {}: username conflict at threshold, retrying once as '{candidate}'",
                    request.id
                );

                let retry = rotation.with_new_username(candidate);
                return match self.ctx.portal.rotate_credentials(&retry).await {
                    Ok(outcome) => RotationReport::completed(&outcome, Utc::now()),
                    Err(e) => RotationReport::error(e.to_string(), e.is_api_error()),
                };
            }
        }

        RotationReport::error(error.to_string(), error.is_api_error())
    }
}

/// `base` plus [`CONFLICT_SUFFIX_LEN`] random lowercase alphanumeric chars.
fn conflict_candidate(base: &str) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    let mut candidate = String::with_capacity(base.len() + CONFLICT_SUFFIX_LEN);
    candidate.push_str(base);
    for _ in 0..CONFLICT_SUFFIX_LEN {
        let index = rng.random_range(0..ALPHABET.len());
        candidate.push(char::from(ALPHABET[index]));
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_context, rotation_outcome, test_request, TestContext};
    use crate::types::RotationStatus;

    fn service(ctx: &TestContext) -> PasswordChangeService {
        PasswordChangeService::new(Arc::clone(&ctx.ctx))
    }

    #[test]
    fn conflict_candidate_appends_two_chars() {
        for _ in 0..100 {
            let candidate = conflict_candidate("bob");
            assert_eq!(candidate.len(), "bob".len() + 2);
            assert!(candidate.starts_with("bob"));
            assert!(candidate[3..]
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn successful_rotation_reports_completed() {
        let ctx = create_test_context();
        ctx.portal
            .push_rotate(Ok(rotation_outcome("bob")))
            .await;

        let request = test_request("pcr-1", Some("bob"), None, 0);
        let report = service(&ctx).process(&request).await.unwrap();

        assert_eq!(report.status, RotationStatus::Completed);
        assert_eq!(report.new_username.as_deref(), Some("bob"));
        assert!(report.completed_at.is_some());

        // in-progress, then terminal, in order.
        let reports = ctx.ledger.rotation_reports().await;
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].1.status, RotationStatus::InProgress);
        assert_eq!(reports[1].1.status, RotationStatus::Completed);
    }

    #[tokio::test]
    async fn browser_fault_reports_error_without_escalation() {
        let ctx = create_test_context();
        ctx.portal
            .push_rotate(Err(PortalError::BrowserError {
                detail: "chromium crashed".to_string(),
            }))
            .await;

        let request = test_request("pcr-1", Some("bob"), None, 1);
        let report = service(&ctx).process(&request).await.unwrap();

        assert_eq!(report.status, RotationStatus::Error);
        assert!(!report.api_error, "local faults must not escalate");
        assert!(report.error_reason.as_deref().unwrap().contains("chromium"));
    }

    #[tokio::test]
    async fn api_rejection_reports_error_with_escalation() {
        let ctx = create_test_context();
        ctx.portal
            .push_rotate(Err(PortalError::ApiError {
                raw_code: Some("5001".to_string()),
                raw_message: "rejected".to_string(),
            }))
            .await;

        let request = test_request("pcr-1", Some("bob"), None, 0);
        let report = service(&ctx).process(&request).await.unwrap();

        assert_eq!(report.status, RotationStatus::Error);
        assert!(report.api_error);
    }

    #[tokio::test]
    async fn duplicate_at_threshold_retries_once_with_suffix() {
        let ctx = create_test_context();
        ctx.portal
            .push_rotate(Err(PortalError::DuplicateUsername {
                username: "bob".to_string(),
                raw_message: None,
            }))
            .await;
        // Retry succeeds; the portal verifies whatever candidate it got.
        ctx.portal.push_rotate(Ok(rotation_outcome("bob3k"))).await;

        let request = test_request("pcr-1", Some("bob"), None, 2);
        let report = service(&ctx).process(&request).await.unwrap();

        assert_eq!(report.status, RotationStatus::Completed);
        // Reported username is the verified snapshot one, not a local string.
        assert_eq!(report.new_username.as_deref(), Some("bob3k"));

        let calls = ctx.portal.rotate_calls().await;
        assert_eq!(calls.len(), 2, "exactly one retry");
        let candidate = calls[1].new_username.as_deref().unwrap();
        assert_eq!(candidate.len(), "bob".len() + 2);
        assert!(candidate.starts_with("bob"));
        assert_ne!(candidate, "bob");
    }

    #[tokio::test]
    async fn duplicate_below_threshold_is_terminal() {
        let ctx = create_test_context();
        ctx.portal
            .push_rotate(Err(PortalError::DuplicateUsername {
                username: "bob".to_string(),
                raw_message: None,
            }))
            .await;

        let request = test_request("pcr-1", Some("bob"), None, 1);
        let report = service(&ctx).process(&request).await.unwrap();

        assert_eq!(report.status, RotationStatus::Error);
        assert!(report.api_error);
        assert_eq!(ctx.portal.rotate_calls().await.len(), 1, "no retry");
    }

    #[tokio::test]
    async fn duplicate_above_threshold_is_terminal() {
        let ctx = create_test_context();
        ctx.portal
            .push_rotate(Err(PortalError::DuplicateUsername {
                username: "bob".to_string(),
                raw_message: None,
            }))
            .await;

        let request = test_request("pcr-1", Some("bob"), None, 3);
        let report = service(&ctx).process(&request).await.unwrap();

        assert_eq!(report.status, RotationStatus::Error);
        assert_eq!(ctx.portal.rotate_calls().await.len(), 1);
    }

    #[tokio::test]
    async fn second_consecutive_failure_after_retry_is_terminal() {
        let ctx = create_test_context();
        for _ in 0..2 {
            ctx.portal
                .push_rotate(Err(PortalError::DuplicateUsername {
                    username: "bob".to_string(),
                    raw_message: None,
                }))
                .await;
        }

        let request = test_request("pcr-1", Some("bob"), None, 2);
        let report = service(&ctx).process(&request).await.unwrap();

        assert_eq!(report.status, RotationStatus::Error);
        assert!(report.api_error);
        // Bounded to two rotation attempts total.
        assert_eq!(ctx.portal.rotate_calls().await.len(), 2);
    }

    #[tokio::test]
    async fn password_only_conflict_never_retries() {
        // A duplicate error without a desired username has nothing to mutate.
        let ctx = create_test_context();
        ctx.portal
            .push_rotate(Err(PortalError::DuplicateUsername {
                username: "alice".to_string(),
                raw_message: None,
            }))
            .await;

        let request = test_request("pcr-1", None, Some("new-pw"), 2);
        let report = service(&ctx).process(&request).await.unwrap();

        assert_eq!(report.status, RotationStatus::Error);
        assert_eq!(ctx.portal.rotate_calls().await.len(), 1);
    }

    #[tokio::test]
    async fn invalid_request_has_no_side_effects() {
        let ctx = create_test_context();

        let request = test_request("pcr-1", None, None, 0);
        let result = service(&ctx).process(&request).await;

        assert!(matches!(result, Err(CoreError::Portal(_))));
        assert!(ctx.ledger.rotation_reports().await.is_empty());
        assert!(ctx.portal.rotate_calls().await.is_empty());
    }

    #[tokio::test]
    async fn finalized_request_is_rejected() {
        let ctx = create_test_context();

        let mut request = test_request("pcr-1", Some("bob"), None, 0);
        request.status = RotationStatus::Completed;
        let result = service(&ctx).process(&request).await;

        assert!(matches!(result, Err(CoreError::ValidationError(_))));
        assert!(ctx.ledger.rotation_reports().await.is_empty());
    }

    #[tokio::test]
    async fn terminal_report_is_delivered_even_on_failure() {
        let ctx = create_test_context();
        ctx.portal
            .push_rotate(Err(PortalError::NetworkError {
                detail: "connection reset".to_string(),
            }))
            .await;

        let request = test_request("pcr-1", Some("bob"), None, 0);
        let report = service(&ctx).process(&request).await.unwrap();

        assert_eq!(report.status, RotationStatus::Error);
        assert!(!report.api_error);

        let reports = ctx.ledger.rotation_reports().await;
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].1.status, RotationStatus::Error);
    }

    #[tokio::test]
    async fn custom_threshold_is_honored() {
        let ctx = create_test_context();
        ctx.portal
            .push_rotate(Err(PortalError::DuplicateUsername {
                username: "bob".to_string(),
                raw_message: None,
            }))
            .await;
        ctx.portal.push_rotate(Ok(rotation_outcome("bobxy"))).await;

        let request = test_request("pcr-1", Some("bob"), None, 5);
        let report = service(&ctx)
            .with_policy(RotationPolicy {
                conflict_retry_threshold: 5,
            })
            .process(&request)
            .await
            .unwrap();

        assert_eq!(report.status, RotationStatus::Completed);
        assert_eq!(ctx.portal.rotate_calls().await.len(), 2);
    }
}
