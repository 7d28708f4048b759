//! Balance calculator: roster + unsettled expenses -> net position per member.
//!
//! Accumulates in integer cents, so per-operation rounding never happens. A non-zero
//! total can still appear when a malformed split slips past validation; the residue
//! is then absorbed by the member with the largest absolute balance and reported.

use crate::domain::{Cents, DomainError, Expense, MemberId};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use tracing::warn;

/// Ordered `member -> net amount`. Positive = owed to the member, negative = owes.
///
/// Serializes as a JSON object of 2-decimal amounts (`{"alice": 50.0}`).
///
/// Iteration follows insertion: roster first, then members discovered while scanning
/// expenses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balances {
    entries: Vec<(MemberId, Cents)>,
    index: HashMap<MemberId, usize>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a zero balance for every roster member.
    pub fn with_roster(roster: &[MemberId]) -> Self {
        let mut balances = Self::new();
        for member in roster {
            balances.entry(member);
        }
        balances
    }

    /// Mutable slot for `member`, inserting a zero balance if unseen.
    pub fn entry(&mut self, member: &str) -> &mut Cents {
        let idx = match self.index.get(member) {
            Some(&idx) => idx,
            None => {
                self.entries.push((member.to_string(), Cents::ZERO));
                self.index.insert(member.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    pub fn get(&self, member: &str) -> Option<Cents> {
        self.index.get(member).map(|&idx| self.entries[idx].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Cents)> {
        self.entries.iter().map(|(m, c)| (m.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all balances, clamped to the representable range.
    pub fn total(&self) -> Cents {
        let sum: i128 = self.entries.iter().map(|(_, c)| i128::from(c.cents())).sum();
        Cents::new(sum.clamp(-i128::from(i64::MAX), i128::from(i64::MAX)) as i64)
    }

    fn checked_total(&self) -> Option<Cents> {
        self.entries
            .iter()
            .try_fold(Cents::ZERO, |acc, (_, c)| acc.checked_add(*c))
    }

    fn credit(&mut self, member: &str, amount: Cents) -> Result<(), DomainError> {
        let slot = self.entry(member);
        *slot = slot.checked_add(amount).ok_or_else(|| overflow(member))?;
        Ok(())
    }

    fn debit(&mut self, member: &str, amount: Cents) -> Result<(), DomainError> {
        let slot = self.entry(member);
        *slot = slot.checked_sub(amount).ok_or_else(|| overflow(member))?;
        Ok(())
    }

    /// True when every balance is within 0.01 of zero.
    pub fn is_cleared(&self) -> bool {
        self.entries.iter().all(|(_, c)| c.abs() < Cents::ONE)
    }

    /// Member with the strictly largest absolute balance; the first one wins ties.
    fn largest_absolute(&self) -> Option<&str> {
        let mut best: Option<(&str, Cents)> = None;
        for (member, amount) in self.iter() {
            match best {
                Some((_, top)) if amount.abs() <= top.abs() => {}
                _ => best = Some((member, amount)),
            }
        }
        best.map(|(m, _)| m)
    }
}

impl Serialize for Balances {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (member, amount) in &self.entries {
            map.serialize_entry(member, &amount.as_decimal())?;
        }
        map.end()
    }
}

/// Audit record of a forced zero-sum adjustment.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ResidueCorrection {
    /// Member whose balance absorbed the residue.
    pub member: MemberId,
    /// Sum of all balances before correction; subtracted from `member`.
    #[serde(with = "crate::domain::money::decimal")]
    pub residue: Cents,
}

/// Calculator output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSheet {
    pub balances: Balances,
    pub correction: Option<ResidueCorrection>,
}

/// Turns a roster and its unsettled expenses into net balances.
///
/// The payer is credited the full amount; every non-excluded split line is debited.
/// Members outside the roster (payer or split member) join the mapping. Balance
/// values do not depend on expense order.
///
/// Fails with `Validation` only if amounts are large enough to overflow a balance.
pub fn calculate_balances(
    roster: &[MemberId],
    expenses: &[Expense],
) -> Result<BalanceSheet, DomainError> {
    let mut balances = Balances::with_roster(roster);

    for expense in expenses {
        balances.credit(&expense.paid_by, expense.amount)?;
        for split in &expense.split_details {
            if split.excluded {
                balances.entry(&split.member);
            } else {
                balances.debit(&split.member, split.amount)?;
            }
        }
    }

    // Cents leave no sub-cent dust, so no snapping pass is needed after this.
    let correction = absorb_residue(&mut balances)?;

    Ok(BalanceSheet {
        balances,
        correction,
    })
}

fn overflow(member: &str) -> DomainError {
    DomainError::Validation(format!("balance of {} is out of range", member))
}

/// Forces the ledger to net to exactly zero.
fn absorb_residue(balances: &mut Balances) -> Result<Option<ResidueCorrection>, DomainError> {
    let residue = balances
        .checked_total()
        .ok_or_else(|| DomainError::Validation("ledger total is out of range".into()))?;
    if residue.abs() < Cents::ONE {
        return Ok(None);
    }
    let Some(member) = balances.largest_absolute().map(str::to_string) else {
        return Ok(None);
    };
    balances.debit(&member, residue)?;

    warn!(
        member = %member,
        residue = %residue,
        "ledger did not net to zero; residue absorbed by largest balance"
    );

    Ok(Some(ResidueCorrection { member, residue }))
}
