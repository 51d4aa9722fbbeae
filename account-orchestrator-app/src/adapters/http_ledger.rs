//! HTTP implementation of the [`AccountLedger`] contract.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use account_orchestrator_core::traits::AccountLedger;
use account_orchestrator_core::types::{
    AccountPatch, BalanceChange, EligibleBatch, RotationReport,
};
use account_orchestrator_core::{CoreError, CoreResult};

use crate::http::{
    create_http_client, decode_envelope, execute_with_retry, LedgerResponse, DEFAULT_MAX_RETRIES,
};

/// Ledger application error codes.
const CODE_NOT_FOUND: i64 = 4004;
const CODE_INSUFFICIENT_BALANCE: i64 = 3001;

#[derive(Debug, Deserialize)]
struct InsufficientBalanceDetail {
    #[serde(default)]
    balance: i64,
    #[serde(default)]
    requested: i64,
}

#[derive(Debug, Deserialize)]
struct UpdatedCount {
    updated: u64,
}

/// Backend ledger client.
///
/// Transient transport failures are retried with exponential backoff;
/// anything the ledger actually decided (not-found, insufficient balance)
/// surfaces immediately as a typed [`CoreError`].
pub struct HttpAccountLedger {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpAccountLedger {
    pub fn new(base_url: impl Into<String>, api_token: Option<String>) -> CoreResult<Self> {
        Ok(Self {
            client: create_http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    async fn call<T>(&self, request: RequestBuilder, action: &str) -> CoreResult<LedgerResponse<T>>
    where
        T: DeserializeOwned,
    {
        let (_, body) = execute_with_retry(request, action, DEFAULT_MAX_RETRIES).await?;
        decode_envelope(&body, action)
    }
}

/// Map a non-zero ledger code to a typed error. `not_found` supplies the
/// subject-specific variant for [`CODE_NOT_FOUND`].
fn map_ledger_error(
    envelope: &LedgerResponse<serde_json::Value>,
    account_id: Option<&str>,
    not_found: impl FnOnce() -> CoreError,
) -> CoreError {
    let message = envelope
        .message
        .clone()
        .unwrap_or_else(|| "unknown error".to_string());
    match envelope.code {
        CODE_NOT_FOUND => not_found(),
        CODE_INSUFFICIENT_BALANCE => {
            let detail: InsufficientBalanceDetail = envelope
                .data
                .clone()
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or(InsufficientBalanceDetail {
                    balance: 0,
                    requested: 0,
                });
            CoreError::InsufficientBalance {
                account_id: account_id.unwrap_or("<unknown>").to_string(),
                balance: detail.balance,
                requested: detail.requested,
            }
        }
        _ => CoreError::LedgerError(format!("({}) {message}", envelope.code)),
    }
}

fn success_data<T>(
    envelope: LedgerResponse<serde_json::Value>,
    action: &str,
    account_id: Option<&str>,
    not_found: impl FnOnce() -> CoreError,
) -> CoreResult<T>
where
    T: DeserializeOwned,
{
    if envelope.code != 0 {
        return Err(map_ledger_error(&envelope, account_id, not_found));
    }
    let data = envelope
        .data
        .ok_or_else(|| CoreError::SerializationError(format!("{action}: missing data field")))?;
    serde_json::from_value(data)
        .map_err(|e| CoreError::SerializationError(format!("{action}: {e}")))
}

#[async_trait]
impl AccountLedger for HttpAccountLedger {
    async fn find_due_for_checkin(&self, limit: Option<u32>) -> CoreResult<EligibleBatch> {
        let mut url = format!("{}/api/v1/accounts/due-checkin", self.base_url);
        if let Some(limit) = limit {
            url.push_str(&format!("?limit={limit}"));
        }

        let envelope = self
            .call(self.authorize(self.client.get(&url)), "due-checkin")
            .await?;
        success_data(envelope, "due-checkin", None, || {
            CoreError::LedgerError("due-checkin endpoint not found".to_string())
        })
    }

    async fn increment_balance(
        &self,
        account_id: &str,
        amount: i64,
    ) -> CoreResult<BalanceChange> {
        let url = format!(
            "{}/api/v1/accounts/{}/balance",
            self.base_url,
            urlencoding::encode(account_id)
        );
        let body = serde_json::json!({ "amount": amount });

        let envelope = self
            .call(
                self.authorize(self.client.post(&url).json(&body)),
                "increment-balance",
            )
            .await?;
        success_data(envelope, "increment-balance", Some(account_id), || {
            CoreError::AccountNotFound(account_id.to_string())
        })
    }

    async fn update_account(&self, account_id: &str, patch: &AccountPatch) -> CoreResult<u64> {
        let url = format!(
            "{}/api/v1/accounts/{}",
            self.base_url,
            urlencoding::encode(account_id)
        );

        let envelope = self
            .call(
                self.authorize(self.client.patch(&url).json(patch)),
                "update-account",
            )
            .await?;
        let count: UpdatedCount =
            success_data(envelope, "update-account", Some(account_id), || {
                CoreError::AccountNotFound(account_id.to_string())
            })?;
        Ok(count.updated)
    }

    async fn update_rotation_request(
        &self,
        request_id: &str,
        report: &RotationReport,
    ) -> CoreResult<()> {
        let url = format!(
            "{}/api/v1/password-requests/{}",
            self.base_url,
            urlencoding::encode(request_id)
        );

        let envelope: LedgerResponse<serde_json::Value> = self
            .call(
                self.authorize(self.client.patch(&url).json(report)),
                "update-rotation-request",
            )
            .await?;
        if envelope.code != 0 {
            return Err(map_ledger_error(&envelope, None, || {
                CoreError::RequestNotFound(request_id.to_string())
            }));
        }
        Ok(())
    }
}
