//! Platform wiring for Account Orchestrator.
//!
//! Provides the HTTP implementation of the core's [`AccountLedger`]
//! contract and the environment-based [`AppConfig`] the binaries load at
//! startup.
//!
//! [`AccountLedger`]: account_orchestrator_core::traits::AccountLedger

mod adapters;
mod config;
mod http;

pub use adapters::HttpAccountLedger;
pub use config::AppConfig;
