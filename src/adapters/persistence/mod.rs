//! Persistence adapters. Implement ExpenseStore and GroupStore.

pub mod json_store;
pub mod sqlite_repo;

pub use json_store::JsonStore;
pub use sqlite_repo::SqliteRepo;
