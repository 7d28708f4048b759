//! Infrastructure adapters. Implement outbound ports.
//!
//! Stores, group locks, CSV export, console UI. Map errors to DomainError.

pub mod export;
pub mod locking;
pub mod persistence;
pub mod ui;
