//! Implements GroupLockPort with one async mutex per group.
//!
//! Process-local only: two processes sharing a database are not serialized by this.

use crate::domain::{DomainError, GroupId};
use crate::ports::{GroupLease, GroupLockPort};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-process per-group lock. Slots are created lazily and kept for the process lifetime.
#[derive(Default)]
pub struct InProcessGroupLock {
    slots: Mutex<HashMap<GroupId, Arc<Mutex<()>>>>,
}

impl InProcessGroupLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl GroupLockPort for InProcessGroupLock {
    async fn acquire(&self, group_id: GroupId) -> Result<GroupLease, DomainError> {
        let slot = {
            let mut slots = self.slots.lock().await;
            Arc::clone(slots.entry(group_id).or_default())
        };
        let guard = slot.lock_owned().await;
        debug!(group_id = %group_id, "group lock acquired");
        Ok(GroupLease::new(guard))
    }
}
