//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use crate::domain::GroupId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// The referenced group has no record. Summary and settlement fail fast on this.
    #[error("Group not found: {group_id}")]
    NotFound { group_id: GroupId },

    /// Input rejected before anything was written (split sum mismatch, bad amount, ...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Persistence unavailable or inconsistent. Propagated, never retried here.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Console error: {0}")]
    Ui(String),
}
