//! Daily checkin orchestration.

use std::sync::Arc;

use chrono::Utc;

use account_orchestrator_portal::{human_pause, AcquireOutcome, CheckinOutcome};

use crate::eligibility;
use crate::error::CoreResult;
use crate::policy::CheckinPolicy;
use crate::services::ServiceContext;
use crate::types::{Account, AccountPatch, CheckinReport, RunSummary};

/// Drives one eligibility pass: acquire a session per due account, persist
/// the refreshed state, and fold the reported balance into the ledger.
///
/// Accounts are processed strictly sequentially with a randomized pause in
/// between; a browser session is never shared across accounts.
pub struct CheckinService {
    ctx: Arc<ServiceContext>,
    policy: CheckinPolicy,
}

impl CheckinService {
    /// Create a checkin service instance
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self {
            ctx,
            policy: CheckinPolicy::default(),
        }
    }

    /// Override the orchestration policy.
    #[must_use]
    pub fn with_policy(mut self, policy: CheckinPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run one checkin pass over all currently eligible accounts.
    pub async fn run(&self, limit: Option<u32>) -> CoreResult<RunSummary> {
        let batch = self.ctx.ledger.find_due_for_checkin(limit).await?;
        log::info!(
            "checkin pass: {} account(s) due on {} (as of {:?})",
            batch.accounts.len(),
            batch.reference_date,
            batch.as_of
        );

        let mut summary = RunSummary::default();
        for (index, account) in batch.accounts.iter().enumerate() {
            if index > 0 {
                let (min, max) = self.policy.inter_account_pause;
                human_pause(min, max).await;
            }

            let report = self.process_account(account).await;
            match &report {
                r if r.error.is_some() => summary.failed_count += 1,
                r if matches!(r.checkin, Some(CheckinOutcome::Failed { .. })) => {
                    summary.soft_failed_count += 1;
                }
                r if r.checkin.is_none() && !r.session_refreshed => summary.skipped_count += 1,
                _ => summary.success_count += 1,
            }
            summary.reports.push(report);
        }

        log::info!(
            "checkin pass finished: {} ok, {} soft-failed, {} failed, {} skipped",
            summary.success_count,
            summary.soft_failed_count,
            summary.failed_count,
            summary.skipped_count
        );
        Ok(summary)
    }

    /// Process one account end to end. Never returns an error; every outcome
    /// folds into the report.
    async fn process_account(&self, account: &Account) -> CheckinReport {
        let now = Utc::now();
        let tz = self.policy.reference_timezone;

        // The ledger already filtered, but a same-day double checkin is the
        // one failure mode this core may never cause.
        if !eligibility::is_due_for_checkin(account, now, tz) {
            log::info!("account {} not due, skipping", account.id);
            return CheckinReport {
                account_id: account.id.clone(),
                session_refreshed: false,
                checkin: None,
                balance: None,
                error: None,
            };
        }

        let outcome = match self
            .ctx
            .portal
            .acquire(&account.username, &account.password, account.checkin_mode)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                if e.is_expected() {
                    log::warn!("acquisition failed for account {}: {e}", account.id);
                } else {
                    log::error!("acquisition failed for account {}: {e}", account.id);
                }
                // Clear the stored session so the next scheduled pass picks
                // the account up again; no internal retry here.
                if let Err(patch_err) = self
                    .ctx
                    .ledger
                    .update_account(&account.id, &AccountPatch::default().clearing_session())
                    .await
                {
                    log::warn!(
                        "failed to clear session for account {}: {patch_err}",
                        account.id
                    );
                }
                return CheckinReport {
                    account_id: account.id.clone(),
                    session_refreshed: false,
                    checkin: None,
                    balance: None,
                    error: Some(e.to_string()),
                };
            }
        };

        self.persist_outcome(account, outcome).await
    }

    /// Persist the refreshed session/snapshot, then apply the balance delta
    /// atomically. A failed checkin step is a soft failure: the session is
    /// still persisted and the run continues.
    async fn persist_outcome(&self, account: &Account, outcome: AcquireOutcome) -> CheckinReport {
        let now = Utc::now();

        if let CheckinOutcome::Failed { reason } = &outcome.checkin {
            log::warn!("checkin step failed for account {}: {reason}", account.id);
        }

        let mut patch = AccountPatch::default()
            .with_session(outcome.session.clone(), Some(now + self.policy.session_ttl))
            .with_used(outcome.snapshot.used);
        if outcome.checkin.is_recorded() {
            patch = patch.with_checkin_date(now);
        }

        if let Err(e) = self.ctx.ledger.update_account(&account.id, &patch).await {
            log::error!("failed to persist session for account {}: {e}", account.id);
            return CheckinReport {
                account_id: account.id.clone(),
                session_refreshed: false,
                checkin: Some(outcome.checkin),
                balance: None,
                error: Some(e.to_string()),
            };
        }

        // Always a delta against the ledger's authoritative balance, never
        // an overwrite: concurrent actors (sales, manual adjustments) also
        // move this field.
        let delta = outcome.snapshot.balance - account.balance;
        let balance = if delta == 0 {
            None
        } else {
            match self.ctx.ledger.increment_balance(&account.id, delta).await {
                Ok(change) => {
                    log::info!(
                        "account {} balance {} -> {} (delta {delta:+})",
                        account.id,
                        change.old_balance,
                        change.new_balance
                    );
                    Some(change)
                }
                Err(e) => {
                    if e.is_expected() {
                        log::warn!("balance delta rejected for account {}: {e}", account.id);
                    } else {
                        log::error!("balance delta failed for account {}: {e}", account.id);
                    }
                    return CheckinReport {
                        account_id: account.id.clone(),
                        session_refreshed: true,
                        checkin: Some(outcome.checkin),
                        balance: None,
                        error: Some(e.to_string()),
                    };
                }
            }
        };

        CheckinReport {
            account_id: account.id.clone(),
            session_refreshed: true,
            checkin: Some(outcome.checkin),
            balance,
            error: None,
        }
    }
}
