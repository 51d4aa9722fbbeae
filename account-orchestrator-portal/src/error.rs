use serde::{Deserialize, Serialize};

/// Unified error type for all portal operations.
///
/// Variants are serializable for structured error reporting. Two orthogonal
/// classifications drive the callers:
///
/// - [`is_api_error`](Self::is_api_error) — `true` when the portal itself
///   rejected the request at the application level. Only these failures may
///   escalate a rotation request's error count; local faults (browser init,
///   network, parsing) must not.
/// - [`is_expected`](Self::is_expected) — `true` for business outcomes that
///   warrant `warn`-level logging rather than `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum PortalError {
    /// The browser context could not be launched or torn down.
    ///
    /// This is a local/environment fault, never an authoritative rejection.
    BrowserError {
        /// Error details.
        detail: String,
    },

    /// A network-level error occurred (DNS resolution failure, connection refused, etc.).
    NetworkError {
        /// Error details.
        detail: String,
    },

    /// A navigation or request timed out.
    Timeout {
        /// Error details.
        detail: String,
    },

    /// The portal rejected the login credentials.
    LoginFailed {
        /// Original error message from the portal, if available.
        raw_message: Option<String>,
    },

    /// Login reported success but the session cookie was absent from the jar.
    ///
    /// The session token lives in a cookie, not in the login response body;
    /// without it the acquisition yields no usable session.
    SessionCookieMissing {
        /// Name of the expected cookie.
        cookie: String,
    },

    /// The requested username collides with an existing portal account.
    DuplicateUsername {
        /// The username that was rejected.
        username: String,
        /// Original error message from the portal, if available.
        raw_message: Option<String>,
    },

    /// A request parameter is invalid (caught before any network action).
    InvalidParameter {
        /// Name of the invalid parameter.
        param: String,
        /// Description of what's wrong.
        detail: String,
    },

    /// An application-level rejection from the portal not mapped to a
    /// specific variant.
    ApiError {
        /// Raw error code from the portal, if available.
        raw_code: Option<String>,
        /// Raw error message from the portal.
        raw_message: String,
    },

    /// Failed to parse a portal response.
    ParseError {
        /// Details about the parse failure.
        detail: String,
    },

    /// Failed to serialize a request body.
    SerializationError {
        /// Details about the serialization failure.
        detail: String,
    },
}

impl PortalError {
    /// Whether the failure is an authoritative application-level rejection
    /// by the portal, as opposed to a local or transport fault.
    ///
    /// **Please update this method simultaneously when new variants are added.**
    #[must_use]
    pub fn is_api_error(&self) -> bool {
        matches!(
            self,
            Self::LoginFailed { .. } | Self::DuplicateUsername { .. } | Self::ApiError { .. }
        )
    }

    /// Whether this is expected behavior (bad credentials, taken username,
    /// caller input), used for log level classification.
    ///
    /// Use `warn` when this returns `true` and `error` when it returns `false`.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::LoginFailed { .. }
                | Self::DuplicateUsername { .. }
                | Self::InvalidParameter { .. }
        )
    }
}

impl std::fmt::Display for PortalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BrowserError { detail } => {
                write!(f, "[portal] Browser context error: {detail}")
            }
            Self::NetworkError { detail } => {
                write!(f, "[portal] Network error: {detail}")
            }
            Self::Timeout { detail } => {
                write!(f, "[portal] Request timeout: {detail}")
            }
            Self::LoginFailed { raw_message } => {
                if let Some(msg) = raw_message {
                    write!(f, "[portal] Login failed: {msg}")
                } else {
                    write!(f, "[portal] Login failed")
                }
            }
            Self::SessionCookieMissing { cookie } => {
                write!(f, "[portal] Session cookie '{cookie}' missing after login")
            }
            Self::DuplicateUsername { username, .. } => {
                write!(f, "[portal] Username '{username}' is already taken")
            }
            Self::InvalidParameter { param, detail } => {
                write!(f, "[portal] Invalid parameter '{param}': {detail}")
            }
            Self::ApiError {
                raw_code,
                raw_message,
            } => {
                if let Some(code) = raw_code {
                    write!(f, "[portal] API error ({code}): {raw_message}")
                } else {
                    write!(f, "[portal] API error: {raw_message}")
                }
            }
            Self::ParseError { detail } => {
                write!(f, "[portal] Parse error: {detail}")
            }
            Self::SerializationError { detail } => {
                write!(f, "[portal] Serialization error: {detail}")
            }
        }
    }
}

impl std::error::Error for PortalError {}

/// Convenience type alias for `Result<T, PortalError>`.
pub type Result<T> = std::result::Result<T, PortalError>;
