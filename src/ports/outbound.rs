//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters (SQLite, JSON file, in-process lock).

use crate::domain::{DomainError, Expense, Group, GroupId, MemberId, NewExpense, PaymentStatus};

/// Expense store. Durable expense records scoped to a group.
#[async_trait::async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Persist a new, unsettled expense. The store assigns id and `created_at`.
    async fn create_expense(&self, expense: NewExpense) -> Result<Expense, DomainError>;

    /// Expenses of a group with the given settlement status, newest first.
    async fn list_expenses(
        &self,
        group_id: GroupId,
        settled: bool,
    ) -> Result<Vec<Expense>, DomainError>;

    /// Flip every unsettled expense of the group to settled. Returns how many changed.
    async fn mark_group_settled(&self, group_id: GroupId) -> Result<u64, DomainError>;
}

/// Group store. Roster and payment metadata; membership edits live elsewhere.
#[async_trait::async_trait]
pub trait GroupStore: Send + Sync {
    async fn get_group(&self, group_id: GroupId) -> Result<Option<Group>, DomainError>;

    async fn list_groups(&self) -> Result<Vec<Group>, DomainError>;

    /// Create a group with an ordered, de-duplicated roster.
    async fn create_group(&self, name: &str, members: &[MemberId]) -> Result<Group, DomainError>;

    async fn set_payment_status(
        &self,
        group_id: GroupId,
        status: PaymentStatus,
    ) -> Result<(), DomainError>;
}
