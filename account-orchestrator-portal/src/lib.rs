//! # account-orchestrator-portal
//!
//! Scripted-browser client for the quota portal. One isolated browser
//! context is launched per operation, used for a scripted login flow, and
//! torn down on every exit path.
//!
//! ## Operations
//!
//! - **Session acquisition** — [`AccountPortal::acquire`]: login with an
//!   account's credentials, extract the session token from the cookie jar,
//!   run the daily checkin, and return an authoritative user snapshot.
//!   The checkin result is reported independently of acquisition success.
//! - **Credential rotation** — [`AccountPortal::rotate_credentials`]: login
//!   with the old credentials, submit a new username and/or password, and
//!   verify the change against a fresh snapshot. Single attempt; retry
//!   policy belongs to the caller.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use account_orchestrator_portal::{
//!     AccountPortal, CheckinMode, HttpBrowserEngine, PortalClient,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Arc::new(HttpBrowserEngine::new("https://portal.example.com"));
//!     let client = PortalClient::new(engine);
//!
//!     let outcome = client
//!         .acquire("alice", "password", CheckinMode::Portal)
//!         .await?;
//!     println!(
//!         "user {} balance {} checkin {:?}",
//!         outcome.user_id, outcome.snapshot.balance, outcome.checkin
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, PortalError>`](PortalError). Callers
//! that track escalation distinguish authoritative rejections
//! ([`PortalError::is_api_error`]) from local faults such as
//! [`PortalError::BrowserError`], which must never escalate.

mod browser;
mod client;
mod delay;
mod error;
mod logging;
mod traits;
mod types;

// Re-export error types
pub use error::{PortalError, Result};

// Re-export the capability trait and its production client
pub use client::PortalClient;
pub use traits::AccountPortal;

// Re-export the browser-context contract
pub use browser::{BrowserEngine, BrowserPage, BrowserProfile, HttpBrowserEngine, PageResponse};

// Re-export delay helpers (the orchestrator reuses them between accounts)
pub use delay::{human_delay, human_pause};

// Re-export types
pub use types::{
    AcquireOutcome, CheckinMode, CheckinOutcome, RotationOutcome, RotationRequest, UserSnapshot,
};
