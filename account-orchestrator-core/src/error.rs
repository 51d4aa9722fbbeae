//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

// Re-export library error type
pub use account_orchestrator_portal::PortalError;

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Password-change request not found
    #[error("Password change request not found: {0}")]
    RequestNotFound(String),

    /// Validation error (caught before any network/browser action)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A debit would drive the balance negative; the ledger rejected the
    /// whole operation and the balance is unchanged.
    #[error("Insufficient balance on {account_id}: balance {balance}, requested {requested}")]
    InsufficientBalance {
        account_id: String,
        /// Authoritative balance at rejection time.
        balance: i64,
        /// Requested (negative) delta magnitude.
        requested: i64,
    },

    /// Application-level rejection from the backend ledger
    #[error("Ledger error: {0}")]
    LedgerError(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Portal error (converting from library)
    #[error("{0}")]
    Portal(#[from] PortalError),
}

impl CoreError {
    /// Whether it is expected behavior (user input, resource does not exist,
    /// business rejections) — used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error`
    /// when returning `false`.
    /// **Please update this method simultaneously when new variants are added.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::AccountNotFound(_)
            | Self::RequestNotFound(_)
            | Self::ValidationError(_)
            | Self::InsufficientBalance { .. } => true,
            Self::Portal(e) => e.is_expected(),
            _ => false,
        }
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;
