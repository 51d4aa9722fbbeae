//! Envelope decoding and error mapping for in-page portal responses.
//!
//! Every portal endpoint answers with `{"code": n, "message": .., "data": ..}`
//! where `code == 0` means success. Non-zero codes are application-level
//! rejections and map to [`PortalError`] variants here.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::browser::PageResponse;
use crate::error::{PortalError, Result};
use crate::logging::truncate_for_log;

use super::{CODE_ACCOUNT_DISABLED, CODE_BAD_CREDENTIALS, CODE_DUPLICATE_USERNAME, PortalClient};

/// Portal response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct PortalResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl PortalClient {
    /// Decode the raw page response into an envelope, handling transport
    /// and body-shape failures. Application codes are left to the caller.
    pub(crate) fn decode<T>(response: &PageResponse, action: &str) -> Result<PortalResponse<T>>
    where
        T: DeserializeOwned,
    {
        log::debug!("{action}: status {}", response.status);

        if matches!(response.status, 502..=504) {
            return Err(PortalError::NetworkError {
                detail: format!("{action}: HTTP {}", response.status),
            });
        }

        log::debug!("{action}: body {}", truncate_for_log(&response.body));

        serde_json::from_str(&response.body).map_err(|e| {
            log::error!("{action}: envelope parse failed: {e}");
            PortalError::ParseError {
                detail: format!("{action}: {e}"),
            }
        })
    }

    /// Extract `data` from a successful envelope, or map the application
    /// error code.
    pub(crate) fn success_data<T>(
        envelope: PortalResponse<T>,
        action: &str,
        attempted_username: Option<&str>,
    ) -> Result<T> {
        if envelope.code != 0 {
            let err = map_api_error(envelope.code, envelope.message, attempted_username);
            if err.is_expected() {
                log::warn!("{action}: {err}");
            } else {
                log::error!("{action}: {err}");
            }
            return Err(err);
        }
        envelope.data.ok_or_else(|| PortalError::ParseError {
            detail: format!("{action}: response is missing the data field"),
        })
    }

    /// Check only the application code; for acks whose `data` is empty.
    pub(crate) fn check_code<T>(
        envelope: &PortalResponse<T>,
        action: &str,
        attempted_username: Option<&str>,
    ) -> Result<()> {
        if envelope.code != 0 {
            let err = map_api_error(
                envelope.code,
                envelope.message.clone(),
                attempted_username,
            );
            if err.is_expected() {
                log::warn!("{action}: {err}");
            } else {
                log::error!("{action}: {err}");
            }
            return Err(err);
        }
        Ok(())
    }
}

/// Map a non-zero portal code to a typed error.
///
/// `attempted_username` provides context for duplicate-username rejections
/// that are only recognizable from the message text.
pub(crate) fn map_api_error(
    code: i64,
    message: Option<String>,
    attempted_username: Option<&str>,
) -> PortalError {
    let msg = message.unwrap_or_else(|| "unknown error".to_string());
    match code {
        CODE_BAD_CREDENTIALS | CODE_ACCOUNT_DISABLED => PortalError::LoginFailed {
            raw_message: Some(msg),
        },
        CODE_DUPLICATE_USERNAME => PortalError::DuplicateUsername {
            username: attempted_username.unwrap_or("<unknown>").to_string(),
            raw_message: Some(msg),
        },
        _ if is_duplicate_username_message(&msg) => PortalError::DuplicateUsername {
            username: attempted_username.unwrap_or("<unknown>").to_string(),
            raw_message: Some(msg),
        },
        _ => PortalError::ApiError {
            raw_code: Some(code.to_string()),
            raw_message: msg,
        },
    }
}

/// The portal is not consistent about the duplicate-username code; fall back
/// to recognizing the message.
fn is_duplicate_username_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("duplicate")
        || lower.contains("already exists")
        || lower.contains("already taken")
        || message.contains("已存在")
        || message.contains("已被使用")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> PageResponse {
        PageResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn decode_success_envelope() {
        let resp = response(200, r#"{"code":0,"message":"ok","data":{"x":1}}"#);
        let envelope: PortalResponse<serde_json::Value> =
            PortalClient::decode(&resp, "test").unwrap();
        assert_eq!(envelope.code, 0);
        assert_eq!(envelope.data.unwrap()["x"], 1);
    }

    #[test]
    fn decode_gateway_error_is_network() {
        let resp = response(503, "upstream down");
        let result: Result<PortalResponse<serde_json::Value>> =
            PortalClient::decode(&resp, "test");
        assert!(matches!(result, Err(PortalError::NetworkError { .. })));
    }

    #[test]
    fn decode_non_json_is_parse_error() {
        let resp = response(200, "<html>interstitial</html>");
        let result: Result<PortalResponse<serde_json::Value>> =
            PortalClient::decode(&resp, "test");
        assert!(matches!(result, Err(PortalError::ParseError { .. })));
    }

    #[test]
    fn success_data_missing_data_field() {
        let envelope = PortalResponse::<serde_json::Value> {
            code: 0,
            message: None,
            data: None,
        };
        let result = PortalClient::success_data(envelope, "test", None);
        assert!(matches!(result, Err(PortalError::ParseError { .. })));
    }

    #[test]
    fn check_code_accepts_empty_data() {
        let envelope = PortalResponse::<serde_json::Value> {
            code: 0,
            message: Some("ok".into()),
            data: None,
        };
        assert!(PortalClient::check_code(&envelope, "test", None).is_ok());
    }

    #[test]
    fn check_code_maps_rejections() {
        let envelope = PortalResponse::<serde_json::Value> {
            code: CODE_DUPLICATE_USERNAME,
            message: Some("taken".into()),
            data: None,
        };
        let result = PortalClient::check_code(&envelope, "test", Some("bob"));
        assert!(matches!(
            result,
            Err(PortalError::DuplicateUsername { username, .. }) if username == "bob"
        ));
    }

    #[test]
    fn map_bad_credentials() {
        let err = map_api_error(CODE_BAD_CREDENTIALS, Some("wrong password".into()), None);
        assert!(matches!(err, PortalError::LoginFailed { .. }));
    }

    #[test]
    fn map_disabled_account() {
        let err = map_api_error(CODE_ACCOUNT_DISABLED, Some("account disabled".into()), None);
        assert!(matches!(err, PortalError::LoginFailed { .. }));
    }

    #[test]
    fn map_duplicate_username_by_code() {
        let err = map_api_error(
            CODE_DUPLICATE_USERNAME,
            Some("username taken".into()),
            Some("bob"),
        );
        assert!(matches!(
            err,
            PortalError::DuplicateUsername { username, .. } if username == "bob"
        ));
    }

    #[test]
    fn map_duplicate_username_by_message() {
        let err = map_api_error(5000, Some("The username already exists".into()), Some("bob"));
        assert!(matches!(err, PortalError::DuplicateUsername { .. }));
    }

    #[test]
    fn map_duplicate_username_chinese_message() {
        let err = map_api_error(5000, Some("用户名已存在".into()), Some("bob"));
        assert!(matches!(err, PortalError::DuplicateUsername { .. }));
    }

    #[test]
    fn map_unknown_code_fallback() {
        let err = map_api_error(9999, Some("boom".into()), None);
        assert!(matches!(
            err,
            PortalError::ApiError { raw_code, .. } if raw_code.as_deref() == Some("9999")
        ));
    }

    #[test]
    fn duplicate_without_context_uses_placeholder() {
        let err = map_api_error(CODE_DUPLICATE_USERNAME, None, None);
        assert!(matches!(
            err,
            PortalError::DuplicateUsername { username, .. } if username == "<unknown>"
        ));
    }
}
