//! Environment-based configuration.

use std::env;

use account_orchestrator_core::{CoreError, CoreResult};

/// Runtime configuration for the orchestrator binaries.
///
/// | Variable | Required | Meaning |
/// |---|---|---|
/// | `LEDGER_BASE_URL` | yes | Backend ledger origin |
/// | `LEDGER_API_TOKEN` | no | Bearer token for ledger calls |
/// | `PORTAL_BASE_URL` | yes | Target portal origin |
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ledger_base_url: String,
    pub ledger_api_token: Option<String>,
    pub portal_base_url: String,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> CoreResult<Self> {
        Ok(Self {
            ledger_base_url: required("LEDGER_BASE_URL")?,
            ledger_api_token: optional("LEDGER_API_TOKEN"),
            portal_base_url: required("PORTAL_BASE_URL")?,
        })
    }
}

fn required(name: &str) -> CoreResult<String> {
    optional(name)
        .ok_or_else(|| CoreError::ValidationError(format!("missing environment variable {name}")))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}
