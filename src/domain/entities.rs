//! Domain entities. Pure data structures for the ledger.
//!
//! No storage or UI types here; adapters map into these.

use crate::domain::{Cents, DomainError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Member identifier. In practice an email address.
pub type MemberId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(Uuid);

impl GroupId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for GroupId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| DomainError::Validation(format!("invalid group id {:?}: {}", s, e)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(Uuid);

impl ExpenseId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExpenseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ExpenseId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| DomainError::Validation(format!("invalid expense id {:?}: {}", s, e)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    Equal,
    Unequal,
}

impl SplitType {
    pub fn as_str(self) -> &'static str {
        match self {
            SplitType::Equal => "equal",
            SplitType::Unequal => "unequal",
        }
    }
}

impl FromStr for SplitType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal" => Ok(SplitType::Equal),
            "unequal" => Ok(SplitType::Unequal),
            other => Err(DomainError::Validation(format!(
                "split type must be 'equal' or 'unequal', got {:?}",
                other
            ))),
        }
    }
}

/// One member's share of an expense.
///
/// Excluded lines are kept for bookkeeping but never debited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitLine {
    pub member: MemberId,
    pub amount: Cents,
    #[serde(default)]
    pub excluded: bool,
}

impl SplitLine {
    pub fn share(member: impl Into<MemberId>, amount: Cents) -> Self {
        Self {
            member: member.into(),
            amount,
            excluded: false,
        }
    }

    pub fn excluded(member: impl Into<MemberId>) -> Self {
        Self {
            member: member.into(),
            amount: Cents::ZERO,
            excluded: true,
        }
    }

    /// Split `amount` equally among `members`, skipping those in `excluded`.
    ///
    /// Shares always sum to `amount` exactly: leftover cents go one each to the
    /// first included members. Excluded members get a zero line flagged `excluded`.
    /// Returns an empty vec when every member is excluded.
    pub fn equal_shares(amount: Cents, members: &[MemberId], excluded: &[MemberId]) -> Vec<Self> {
        let included = members.iter().filter(|m| !excluded.contains(m)).count() as i64;
        if included == 0 {
            return Vec::new();
        }
        let base = amount.cents() / included;
        let mut remainder = amount.cents() % included;

        members
            .iter()
            .map(|m| {
                if excluded.contains(m) {
                    return Self::excluded(m.clone());
                }
                let extra = if remainder > 0 {
                    remainder -= 1;
                    1
                } else {
                    0
                };
                Self::share(m.clone(), Cents::new(base + extra))
            })
            .collect()
    }
}

/// A logged expense. Immutable once stored, apart from the bulk `is_settled` flip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub group_id: GroupId,
    pub title: String,
    pub amount: Cents,
    pub paid_by: MemberId,
    pub split_type: SplitType,
    pub split_details: Vec<SplitLine>,
    pub is_settled: bool,
    pub created_at: DateTime<Utc>,
}

/// Creation payload. The store assigns id, timestamp and the unsettled flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub group_id: GroupId,
    pub title: String,
    pub amount: Cents,
    pub paid_by: MemberId,
    pub split_type: SplitType,
    pub split_details: Vec<SplitLine>,
}

impl NewExpense {
    /// A direct payment: `from` advances `amount`, `to` bears all of it.
    pub fn payment(
        group_id: GroupId,
        title: impl Into<String>,
        from: &str,
        to: &str,
        amount: Cents,
    ) -> Self {
        Self {
            group_id,
            title: title.into(),
            amount,
            paid_by: from.to_string(),
            split_type: SplitType::Unequal,
            split_details: vec![SplitLine::share(to, amount)],
        }
    }

    pub fn into_expense(self, id: ExpenseId, created_at: DateTime<Utc>) -> Expense {
        Expense {
            id,
            group_id: self.group_id,
            title: self.title,
            amount: self.amount,
            paid_by: self.paid_by,
            split_type: self.split_type,
            split_details: self.split_details,
            is_settled: false,
            created_at,
        }
    }
}

/// Group-level payment metadata, reset on every archival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub amount: Cents,
    pub date: DateTime<Utc>,
    pub is_paid: bool,
}

impl PaymentStatus {
    pub fn pending(now: DateTime<Utc>) -> Self {
        Self {
            amount: Cents::ZERO,
            date: now,
            is_paid: false,
        }
    }

    pub fn settled(now: DateTime<Utc>) -> Self {
        Self {
            amount: Cents::ZERO,
            date: now,
            is_paid: true,
        }
    }
}

/// A group and its ordered roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub members: Vec<MemberId>,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// A proposed direct payment between two members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: MemberId,
    pub to: MemberId,
    #[serde(with = "crate::domain::money::decimal")]
    pub amount: Cents,
}

impl Transfer {
    pub fn involves(&self, member: &str) -> bool {
        self.from == member || self.to == member
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.from, self.to, self.amount)
    }
}

/// Lifecycle of a group's ledger, derived from its unsettled expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerState {
    /// Unsettled expenses with at least one non-zero balance.
    Active,
    /// Unsettled expenses exist but every balance is zero; not yet archived.
    Resolved,
    /// No unsettled expenses. The next expense opens a new period.
    Archived,
}

impl fmt::Display for LedgerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LedgerState::Active => "active",
            LedgerState::Resolved => "resolved",
            LedgerState::Archived => "archived",
        };
        f.write_str(s)
    }
}

/// Local part of an email address, used for human-readable payment titles.
pub fn display_name(member: &str) -> &str {
    member.split('@').next().unwrap_or(member)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(names: &[&str]) -> Vec<MemberId> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn equal_shares_distributes_remainder_in_roster_order() {
        let roster = members(&["a@x", "b@x", "c@x"]);
        let lines = SplitLine::equal_shares(Cents::new(10_000), &roster, &[]);

        let amounts: Vec<i64> = lines.iter().map(|l| l.amount.cents()).collect();
        assert_eq!(amounts, vec![3334, 3333, 3333]);
        assert_eq!(lines.iter().map(|l| l.amount).sum::<Cents>(), Cents::new(10_000));
    }

    #[test]
    fn equal_shares_marks_excluded_members() {
        let roster = members(&["a@x", "b@x", "c@x"]);
        let lines = SplitLine::equal_shares(Cents::new(900), &roster, &members(&["b@x"]));

        assert_eq!(lines.len(), 3);
        assert!(lines[1].excluded);
        assert!(lines[1].amount.is_zero());
        assert_eq!(lines[0].amount, Cents::new(450));
        assert_eq!(lines[2].amount, Cents::new(450));
    }

    #[test]
    fn equal_shares_all_excluded_is_empty() {
        let roster = members(&["a@x"]);
        assert!(SplitLine::equal_shares(Cents::new(100), &roster, &roster).is_empty());
    }

    #[test]
    fn payment_credits_recipient_in_full() {
        let gid = GroupId::new();
        let p = NewExpense::payment(gid, "Payment: bob to alice", "bob@x", "alice@x", Cents::new(5000));
        assert_eq!(p.paid_by, "bob@x");
        assert_eq!(p.split_type, SplitType::Unequal);
        assert_eq!(p.split_details, vec![SplitLine::share("alice@x", Cents::new(5000))]);
    }

    #[test]
    fn display_name_strips_domain() {
        assert_eq!(display_name("alice@example.com"), "alice");
        assert_eq!(display_name("bob"), "bob");
    }

    #[test]
    fn ids_round_trip_through_strings() {
        let gid = GroupId::new();
        assert_eq!(gid.to_string().parse::<GroupId>().unwrap(), gid);
        assert!("not-a-uuid".parse::<GroupId>().is_err());
    }
}
