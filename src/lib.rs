//! split-ledger: shared-expense ledger with balances, minimal settlement transfers and archival.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
