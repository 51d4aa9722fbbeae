//! HTTP plumbing for the ledger adapter.
//!
//! One shared flow for every ledger call: send, classify transport errors,
//! retry transient failures with capped exponential backoff, decode the
//! `{code, message, data}` envelope. Application-level rejections are never
//! retried.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use account_orchestrator_core::{CoreError, CoreResult};

/// Default connect timeout (seconds).
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default request timeout (seconds).
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Retry cap for transient failures.
pub(crate) const DEFAULT_MAX_RETRIES: u32 = 3;

/// Ledger response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct LedgerResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

/// Build the HTTP client used for all ledger calls.
pub(crate) fn create_http_client() -> CoreResult<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| CoreError::NetworkError(format!("failed to build HTTP client: {e}")))
}

/// Execute a request once, classifying transport and gateway failures.
async fn execute_request(
    request_builder: RequestBuilder,
    action: &str,
) -> CoreResult<(u16, String)> {
    log::debug!("[ledger] {action}");

    let response = request_builder.send().await.map_err(|e| {
        if e.is_timeout() {
            CoreError::NetworkError(format!("{action}: timeout: {e}"))
        } else {
            CoreError::NetworkError(format!("{action}: {e}"))
        }
    })?;

    let status = response.status().as_u16();
    log::debug!("[ledger] {action}: status {status}");

    if status == 429 || matches!(status, 502..=504) {
        let body = response.text().await.unwrap_or_default();
        return Err(CoreError::NetworkError(format!(
            "{action}: HTTP {status}: {body}"
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| CoreError::NetworkError(format!("{action}: failed to read body: {e}")))?;

    Ok((status, body))
}

/// Execute with transient-failure retry.
///
/// Only [`CoreError::NetworkError`] is retried; everything the ledger
/// actually decided (validation, insufficient balance) surfaces immediately.
/// Backoff: 100ms, 200ms, 400ms, ... capped at 10s.
pub(crate) async fn execute_with_retry(
    request_builder: RequestBuilder,
    action: &str,
    max_retries: u32,
) -> CoreResult<(u16, String)> {
    let mut last_error = None;

    for attempt in 0..=max_retries {
        let Some(request) = request_builder.try_clone() else {
            // Streaming bodies cannot be replayed; fall back to one attempt.
            log::warn!("[ledger] {action}: cannot clone request, disabling retry");
            return execute_request(request_builder, action).await;
        };

        match execute_request(request, action).await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_retries && is_retryable(&e) => {
                let delay = backoff_delay(attempt);
                log::warn!(
                    "[ledger] {action}: attempt {}/{} failed, retrying in {:.1}s: {e}",
                    attempt + 1,
                    max_retries,
                    delay.as_secs_f32()
                );
                tokio::time::sleep(delay).await;
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error
        .unwrap_or_else(|| CoreError::NetworkError(format!("{action}: retries exhausted"))))
}

/// Decode the envelope body, mapping non-zero application codes.
pub(crate) fn decode_envelope<T>(body: &str, action: &str) -> CoreResult<LedgerResponse<T>>
where
    T: DeserializeOwned,
{
    serde_json::from_str(body).map_err(|e| {
        log::error!("[ledger] {action}: envelope parse failed: {e}");
        CoreError::SerializationError(format!("{action}: {e}"))
    })
}

fn is_retryable(error: &CoreError) -> bool {
    matches!(error, CoreError::NetworkError(_))
}

/// 100ms, 200ms, 400ms, ... capped at 10 seconds.
fn backoff_delay(attempt: u32) -> Duration {
    let capped_attempt = attempt.min(20);
    let delay_ms = 100_u64.saturating_mul(1_u64 << capped_attempt);
    Duration::from_millis(delay_ms.min(10_000))
}
