//! Ledger adapter implementations.

mod http_ledger;

pub use http_ledger::HttpAccountLedger;
