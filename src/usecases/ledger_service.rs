//! Settlement orchestrator: summaries, payments, targeted settlements, archival.
//!
//! - Loads roster + unsettled expenses through the store ports
//! - Computes balances and transfers with the pure domain functions
//! - Records payments as ordinary expenses
//! - Archives the group (bulk mark-settled) once every balance is zero
//!
//! Every write path holds the group lease for its whole read-compute-write sequence.

use crate::domain::{
    calculate_balances, display_name, minimize_debts, validate_new_expense, validate_payment,
    Balances, Cents, DomainError, Expense, Group, GroupId, LedgerState, NewExpense,
    PaymentStatus, ResidueCorrection, Transfer,
};
use crate::ports::{ExpenseStore, GroupLockPort, GroupStore};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Balances and the transfers that would clear them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub balances: Balances,
    pub transfers: Vec<Transfer>,
    /// Present when the ledger had to be forced back to zero-sum.
    pub correction: Option<ResidueCorrection>,
}

/// Ledger service. Coordinates stores, lock and the balance engine.
pub struct LedgerService {
    groups: Arc<dyn GroupStore>,
    expenses: Arc<dyn ExpenseStore>,
    lock: Arc<dyn GroupLockPort>,
}

impl LedgerService {
    pub fn new(
        groups: Arc<dyn GroupStore>,
        expenses: Arc<dyn ExpenseStore>,
        lock: Arc<dyn GroupLockPort>,
    ) -> Self {
        Self {
            groups,
            expenses,
            lock,
        }
    }

    /// Balances and transfers over the group's unsettled expenses.
    pub async fn get_group_summary(&self, group_id: GroupId) -> Result<GroupSummary, DomainError> {
        let (group, active) = self.load_active(group_id).await?;
        summarize(&group, &active)
    }

    /// Validate and store a new expense.
    pub async fn add_expense(&self, expense: NewExpense) -> Result<Expense, DomainError> {
        validate_new_expense(&expense)?;
        let group_id = expense.group_id;

        let _lease = self.lock.acquire(group_id).await?;
        self.require_group(group_id).await?;
        let created = self.expenses.create_expense(expense).await?;
        info!(
            group_id = %group_id,
            expense_id = %created.id,
            amount = %created.amount,
            paid_by = %created.paid_by,
            "expense added"
        );
        Ok(created)
    }

    /// Record a direct payment `from -> to`, archiving the group if that clears it.
    pub async fn record_payment(
        &self,
        group_id: GroupId,
        from: &str,
        to: &str,
        amount: Cents,
    ) -> Result<Expense, DomainError> {
        validate_payment(from, to, amount)?;

        let _lease = self.lock.acquire(group_id).await?;
        self.require_group(group_id).await?;
        let title = format!("Payment: {} to {}", display_name(from), display_name(to));
        let payment = self
            .expenses
            .create_expense(NewExpense::payment(group_id, title, from, to, amount))
            .await?;
        info!(group_id = %group_id, from, to, amount = %amount, "payment recorded");

        self.archive_if_resolved(group_id).await?;
        Ok(payment)
    }

    /// Record every current transfer that involves `member`, on either side.
    ///
    /// Clears the member's position without the counterparties acting first.
    /// Returns the recorded settlement expenses (empty if there was nothing to settle).
    pub async fn settle_user_debts(
        &self,
        group_id: GroupId,
        member: &str,
    ) -> Result<Vec<Expense>, DomainError> {
        let _lease = self.lock.acquire(group_id).await?;
        let (group, active) = self.load_active(group_id).await?;
        let pending: Vec<Transfer> = summarize(&group, &active)?
            .transfers
            .into_iter()
            .filter(|t| t.involves(member))
            .collect();

        info!(group_id = %group_id, member, count = pending.len(), "settling member debts");
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let mut recorded = Vec::with_capacity(pending.len());
        for t in pending {
            let title = format!(
                "Settlement: {} to {}",
                display_name(&t.from),
                display_name(&t.to)
            );
            debug!(group_id = %group_id, transfer = %t, "recording settlement");
            let expense = self
                .expenses
                .create_expense(NewExpense::payment(group_id, title, &t.from, &t.to, t.amount))
                .await?;
            recorded.push(expense);
        }

        self.archive_if_resolved(group_id).await?;
        Ok(recorded)
    }

    /// Archive the group unconditionally. Returns the number of expenses archived.
    pub async fn settle_group(&self, group_id: GroupId) -> Result<u64, DomainError> {
        let _lease = self.lock.acquire(group_id).await?;
        self.require_group(group_id).await?;
        self.archive(group_id).await
    }

    /// Archive the group if every balance is zero. Returns whether archival happened.
    pub async fn check_and_archive_if_resolved(
        &self,
        group_id: GroupId,
    ) -> Result<bool, DomainError> {
        let _lease = self.lock.acquire(group_id).await?;
        self.archive_if_resolved(group_id).await
    }

    /// Unsettled expenses, newest first.
    pub async fn active_expenses(&self, group_id: GroupId) -> Result<Vec<Expense>, DomainError> {
        self.load_active(group_id).await.map(|(_, active)| active)
    }

    /// Archived expenses. Inert for balances, kept for audit.
    pub async fn settled_history(&self, group_id: GroupId) -> Result<Vec<Expense>, DomainError> {
        self.require_group(group_id).await?;
        self.expenses.list_expenses(group_id, true).await
    }

    pub async fn ledger_state(&self, group_id: GroupId) -> Result<LedgerState, DomainError> {
        let (group, active) = self.load_active(group_id).await?;
        if active.is_empty() {
            return Ok(LedgerState::Archived);
        }
        let sheet = calculate_balances(&group.members, &active)?;
        Ok(if sheet.balances.is_cleared() {
            LedgerState::Resolved
        } else {
            LedgerState::Active
        })
    }

    // The helpers below assume the caller already holds the group lease.

    async fn archive_if_resolved(&self, group_id: GroupId) -> Result<bool, DomainError> {
        let (group, active) = self.load_active(group_id).await?;
        if active.is_empty() {
            return Ok(false);
        }
        let sheet = calculate_balances(&group.members, &active)?;
        if !sheet.balances.is_cleared() {
            debug!(group_id = %group_id, "balances outstanding; not archiving");
            return Ok(false);
        }

        info!(group_id = %group_id, "full resolution reached");
        self.archive(group_id).await?;
        Ok(true)
    }

    async fn archive(&self, group_id: GroupId) -> Result<u64, DomainError> {
        let archived = self.expenses.mark_group_settled(group_id).await?;
        self.groups
            .set_payment_status(group_id, PaymentStatus::settled(Utc::now()))
            .await?;
        info!(group_id = %group_id, archived, "group settled; history archived");
        Ok(archived)
    }

    async fn require_group(&self, group_id: GroupId) -> Result<Group, DomainError> {
        self.groups
            .get_group(group_id)
            .await?
            .ok_or(DomainError::NotFound { group_id })
    }

    async fn load_active(&self, group_id: GroupId) -> Result<(Group, Vec<Expense>), DomainError> {
        let group = self.require_group(group_id).await?;
        let active = self.expenses.list_expenses(group_id, false).await?;
        Ok((group, active))
    }
}

fn summarize(group: &Group, active: &[Expense]) -> Result<GroupSummary, DomainError> {
    let sheet = calculate_balances(&group.members, active)?;
    let transfers = minimize_debts(&sheet.balances);
    Ok(GroupSummary {
        balances: sheet.balances,
        transfers,
        correction: sheet.correction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::locking::InProcessGroupLock;
    use crate::adapters::persistence::JsonStore;
    use crate::domain::{MemberId, SplitLine, SplitType};

    async fn setup(names: &[&str]) -> (LedgerService, Group) {
        let store = Arc::new(JsonStore::in_memory());
        let roster: Vec<MemberId> = names.iter().map(|s| s.to_string()).collect();
        let group = store.create_group("Trip", &roster).await.unwrap();
        let service = LedgerService::new(
            store.clone(),
            store,
            Arc::new(InProcessGroupLock::new()),
        );
        (service, group)
    }

    fn equal_expense(group: &Group, paid_by: &str, amount: i64) -> NewExpense {
        NewExpense {
            group_id: group.id,
            title: "Groceries".into(),
            amount: Cents::new(amount),
            paid_by: paid_by.into(),
            split_type: SplitType::Equal,
            split_details: SplitLine::equal_shares(Cents::new(amount), &group.members, &[]),
        }
    }

    #[tokio::test]
    async fn two_members_one_expense() {
        let (service, group) = setup(&["alice", "bob"]).await;
        service
            .add_expense(equal_expense(&group, "alice", 10_000))
            .await
            .unwrap();

        let summary = service.get_group_summary(group.id).await.unwrap();
        assert_eq!(summary.balances.get("alice"), Some(Cents::new(5000)));
        assert_eq!(summary.balances.get("bob"), Some(Cents::new(-5000)));
        assert_eq!(
            summary.transfers,
            vec![Transfer {
                from: "bob".into(),
                to: "alice".into(),
                amount: Cents::new(5000),
            }]
        );
    }

    #[tokio::test]
    async fn summary_json_reports_decimal_amounts() {
        let (service, group) = setup(&["alice", "bob"]).await;
        service
            .add_expense(equal_expense(&group, "alice", 10_000))
            .await
            .unwrap();

        let summary = service.get_group_summary(group.id).await.unwrap();
        assert_eq!(
            serde_json::to_string(&summary).unwrap(),
            r#"{"balances":{"alice":50.0,"bob":-50.0},"transfers":[{"from":"bob","to":"alice","amount":50.0}],"correction":null}"#
        );
    }

    #[tokio::test]
    async fn split_one_cent_short_still_nets_to_zero() {
        let (service, group) = setup(&["alice", "bob", "carol"]).await;
        let expense = NewExpense {
            group_id: group.id,
            title: "Hotel".into(),
            amount: Cents::new(10_000),
            paid_by: "alice".into(),
            split_type: SplitType::Unequal,
            split_details: vec![
                SplitLine::share("alice", Cents::new(3333)),
                SplitLine::share("bob", Cents::new(3333)),
                SplitLine::share("carol", Cents::new(3333)),
            ],
        };
        service.add_expense(expense).await.unwrap();

        let summary = service.get_group_summary(group.id).await.unwrap();
        assert_eq!(summary.balances.total(), Cents::ZERO);
        assert!(summary.correction.is_some());
    }

    #[tokio::test]
    async fn offsetting_payment_archives_the_group() {
        let (service, group) = setup(&["alice", "bob"]).await;
        service
            .add_expense(equal_expense(&group, "alice", 10_000))
            .await
            .unwrap();

        let payment = service
            .record_payment(group.id, "bob", "alice", Cents::new(5000))
            .await
            .unwrap();
        assert_eq!(payment.title, "Payment: bob to alice");
        assert_eq!(payment.paid_by, "bob");

        let summary = service.get_group_summary(group.id).await.unwrap();
        assert_eq!(summary.balances.get("alice"), Some(Cents::ZERO));
        assert_eq!(summary.balances.get("bob"), Some(Cents::ZERO));
        assert!(summary.transfers.is_empty());

        assert!(service.active_expenses(group.id).await.unwrap().is_empty());
        let history = service.settled_history(group.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|e| e.is_settled));
        assert_eq!(
            service.ledger_state(group.id).await.unwrap(),
            LedgerState::Archived
        );
    }

    #[tokio::test]
    async fn partial_payment_keeps_the_group_active() {
        let (service, group) = setup(&["alice", "bob"]).await;
        service
            .add_expense(equal_expense(&group, "alice", 10_000))
            .await
            .unwrap();
        service
            .record_payment(group.id, "bob", "alice", Cents::new(2000))
            .await
            .unwrap();

        let summary = service.get_group_summary(group.id).await.unwrap();
        assert_eq!(summary.balances.get("bob"), Some(Cents::new(-3000)));
        assert_eq!(service.active_expenses(group.id).await.unwrap().len(), 2);
        assert_eq!(
            service.ledger_state(group.id).await.unwrap(),
            LedgerState::Active
        );
    }

    #[tokio::test]
    async fn always_excluded_member_stays_at_zero() {
        let (service, group) = setup(&["alice", "bob", "dave"]).await;
        let excluded = vec!["dave".to_string()];
        for (payer, amount) in [("alice", 3000), ("bob", 4500), ("alice", 999)] {
            let expense = NewExpense {
                group_id: group.id,
                title: "Drinks".into(),
                amount: Cents::new(amount),
                paid_by: payer.into(),
                split_type: SplitType::Equal,
                split_details: SplitLine::equal_shares(
                    Cents::new(amount),
                    &group.members,
                    &excluded,
                ),
            };
            service.add_expense(expense).await.unwrap();
        }

        let summary = service.get_group_summary(group.id).await.unwrap();
        assert_eq!(summary.balances.get("dave"), Some(Cents::ZERO));
        assert!(summary.transfers.iter().all(|t| !t.involves("dave")));
    }

    #[tokio::test]
    async fn summary_is_idempotent() {
        let (service, group) = setup(&["a", "b", "c"]).await;
        service.add_expense(equal_expense(&group, "a", 1001)).await.unwrap();
        service.add_expense(equal_expense(&group, "c", 4250)).await.unwrap();

        let first = service.get_group_summary(group.id).await.unwrap();
        let second = service.get_group_summary(group.id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unknown_group_is_not_found() {
        let (service, _) = setup(&["alice"]).await;
        let missing = GroupId::new();

        assert!(matches!(
            service.get_group_summary(missing).await,
            Err(DomainError::NotFound { group_id }) if group_id == missing
        ));
        assert!(matches!(
            service
                .record_payment(missing, "bob", "alice", Cents::new(100))
                .await,
            Err(DomainError::NotFound { .. })
        ));
        assert!(matches!(
            service.settle_group(missing).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn mismatched_split_is_rejected_and_not_stored() {
        let (service, group) = setup(&["alice", "bob"]).await;
        let expense = NewExpense {
            group_id: group.id,
            title: "Taxi".into(),
            amount: Cents::new(4000),
            paid_by: "alice".into(),
            split_type: SplitType::Unequal,
            split_details: vec![
                SplitLine::share("alice", Cents::new(1000)),
                SplitLine::share("bob", Cents::new(1000)),
            ],
        };

        assert!(matches!(
            service.add_expense(expense).await,
            Err(DomainError::Validation(_))
        ));
        assert!(service.active_expenses(group.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn settling_each_debtor_eventually_archives() {
        let (service, group) = setup(&["alice", "bob", "carol"]).await;
        service
            .add_expense(equal_expense(&group, "alice", 9000))
            .await
            .unwrap();

        let bob = service.settle_user_debts(group.id, "bob").await.unwrap();
        assert_eq!(bob.len(), 1);
        assert_eq!(bob[0].title, "Settlement: bob to alice");
        assert_eq!(bob[0].amount, Cents::new(3000));
        assert_eq!(
            service.ledger_state(group.id).await.unwrap(),
            LedgerState::Active
        );

        let carol = service.settle_user_debts(group.id, "carol").await.unwrap();
        assert_eq!(carol.len(), 1);
        assert_eq!(
            service.ledger_state(group.id).await.unwrap(),
            LedgerState::Archived
        );
        assert_eq!(service.settled_history(group.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn creditor_settlement_clears_all_their_transfers() {
        let (service, group) = setup(&["alice", "bob", "carol"]).await;
        service
            .add_expense(equal_expense(&group, "alice", 9000))
            .await
            .unwrap();

        let recorded = service.settle_user_debts(group.id, "alice").await.unwrap();
        assert_eq!(recorded.len(), 2);
        assert_eq!(
            service.ledger_state(group.id).await.unwrap(),
            LedgerState::Archived
        );
    }

    #[tokio::test]
    async fn settling_a_member_with_nothing_owed_is_a_no_op() {
        let (service, group) = setup(&["alice", "bob", "carol"]).await;
        let expense = NewExpense {
            group_id: group.id,
            title: "Lunch".into(),
            amount: Cents::new(2000),
            paid_by: "alice".into(),
            split_type: SplitType::Unequal,
            split_details: vec![SplitLine::share("bob", Cents::new(2000))],
        };
        service.add_expense(expense).await.unwrap();

        assert!(service
            .settle_user_debts(group.id, "carol")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(service.active_expenses(group.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn manual_settle_archives_and_opens_a_new_period() {
        let (service, group) = setup(&["alice", "bob"]).await;
        service
            .add_expense(equal_expense(&group, "alice", 10_000))
            .await
            .unwrap();

        assert_eq!(service.settle_group(group.id).await.unwrap(), 1);
        assert_eq!(
            service.ledger_state(group.id).await.unwrap(),
            LedgerState::Archived
        );

        service
            .add_expense(equal_expense(&group, "bob", 2000))
            .await
            .unwrap();
        let summary = service.get_group_summary(group.id).await.unwrap();
        assert_eq!(summary.balances.get("bob"), Some(Cents::new(1000)));
        assert_eq!(summary.balances.get("alice"), Some(Cents::new(-1000)));
    }

    #[tokio::test]
    async fn archive_check_ignores_empty_and_outstanding_ledgers() {
        let (service, group) = setup(&["alice", "bob"]).await;
        assert!(!service.check_and_archive_if_resolved(group.id).await.unwrap());

        service
            .add_expense(equal_expense(&group, "alice", 500))
            .await
            .unwrap();
        assert!(!service.check_and_archive_if_resolved(group.id).await.unwrap());
        assert_eq!(service.active_expenses(group.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resolved_ledger_is_detected_then_archived() {
        let (service, group) = setup(&["alice", "bob"]).await;
        // Self-funded expense: alice pays and bears the whole amount.
        let expense = NewExpense {
            group_id: group.id,
            title: "Book".into(),
            amount: Cents::new(1500),
            paid_by: "alice".into(),
            split_type: SplitType::Unequal,
            split_details: vec![SplitLine::share("alice", Cents::new(1500))],
        };
        service.add_expense(expense).await.unwrap();

        assert_eq!(
            service.ledger_state(group.id).await.unwrap(),
            LedgerState::Resolved
        );
        assert!(service.check_and_archive_if_resolved(group.id).await.unwrap());
        assert_eq!(
            service.ledger_state(group.id).await.unwrap(),
            LedgerState::Archived
        );
    }

    #[tokio::test]
    async fn concurrent_payments_archive_exactly_once() {
        let (service, group) = setup(&["alice", "bob"]).await;
        service
            .add_expense(equal_expense(&group, "alice", 10_000))
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            service.record_payment(group.id, "bob", "alice", Cents::new(2500)),
            service.record_payment(group.id, "bob", "alice", Cents::new(2500)),
        );
        first.unwrap();
        second.unwrap();

        assert!(service.active_expenses(group.id).await.unwrap().is_empty());
        assert_eq!(service.settled_history(group.id).await.unwrap().len(), 3);
    }
}
