//! Application use cases. Orchestrate domain logic via ports.

pub mod ledger_service;

pub use ledger_service::{GroupSummary, LedgerService};
