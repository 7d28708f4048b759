//! Group lock outbound port. Serializes read-compute-write per group.
//!
//! Settlement detection reads balances, decides, then writes. Two concurrent
//! payments on the same group race without this scope. The store side decides how
//! the scope is provided (process mutex, DB transaction, advisory lock).

use crate::domain::{DomainError, GroupId};

/// Held for the duration of one orchestrator operation. Dropping it releases the group.
pub struct GroupLease {
    _guard: Box<dyn Send + Sync>,
}

impl GroupLease {
    pub fn new(guard: impl Send + Sync + 'static) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

/// Port for acquiring exclusive access to one group's ledger.
#[async_trait::async_trait]
pub trait GroupLockPort: Send + Sync {
    /// Wait until the group is free, then hold it until the lease is dropped.
    ///
    /// # Errors
    /// Returns `DomainError::Store` if the backing lock cannot be obtained.
    async fn acquire(&self, group_id: GroupId) -> Result<GroupLease, DomainError>;
}
