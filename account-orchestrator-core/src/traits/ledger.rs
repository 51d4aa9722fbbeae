//! Backend ledger abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{AccountPatch, BalanceChange, EligibleBatch, RotationReport};

/// External system of record for accounts and rotation requests.
///
/// The ledger owns all persistence and all atomicity guarantees; this core
/// only issues requests against the contract. Balance in particular is
/// mutated exclusively through [`increment_balance`](Self::increment_balance)
/// — computing a new absolute balance locally and writing it back would
/// clobber concurrent externally-driven changes.
#[async_trait]
pub trait AccountLedger: Send + Sync {
    /// Accounts due for a checkin pass.
    ///
    /// Server-side filter: not sold; session absent or expired; owning user
    /// active with unexpired membership; no successful checkin on the
    /// current day in the service's reference timezone.
    ///
    /// # Arguments
    /// * `limit` - maximum result count; unset means unbounded
    async fn find_due_for_checkin(&self, limit: Option<u32>) -> CoreResult<EligibleBatch>;

    /// Atomically apply a signed balance delta.
    ///
    /// A debit whose magnitude exceeds the current balance must fail the
    /// whole operation with
    /// [`CoreError::InsufficientBalance`](crate::error::CoreError::InsufficientBalance)
    /// and leave the balance unchanged.
    ///
    /// # Arguments
    /// * `account_id` - Account ID
    /// * `amount` - signed delta (positive credit, negative debit)
    async fn increment_balance(&self, account_id: &str, amount: i64)
        -> CoreResult<BalanceChange>;

    /// Update a subset of an account's fields.
    ///
    /// Returns the number of records updated.
    ///
    /// # Arguments
    /// * `account_id` - Account ID
    /// * `patch` - fields to update; absent fields are untouched
    async fn update_account(&self, account_id: &str, patch: &AccountPatch) -> CoreResult<u64>;

    /// Report a rotation request's state transition.
    ///
    /// The ledger increments the request's error count only when the report
    /// carries `api_error == true`.
    ///
    /// # Arguments
    /// * `request_id` - request ID
    /// * `report` - structured outcome
    async fn update_rotation_request(
        &self,
        request_id: &str,
        report: &RotationReport,
    ) -> CoreResult<()>;
}
