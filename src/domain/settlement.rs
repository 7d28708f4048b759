//! Debt minimizer: balances -> directed transfers that clear them.
//!
//! Greedy two-pointer merge over debtors and creditors in mapping order. Not
//! optimal in transfer count, but it moves the minimum total amount and is
//! deterministic.

use crate::domain::{Balances, Cents, Transfer};

/// Produces transfers that, applied as debits/credits, zero every balance.
///
/// At most `debtors + creditors - 1` transfers are emitted. Output order follows
/// the mapping order, not amount size.
pub fn minimize_debts(balances: &Balances) -> Vec<Transfer> {
    let mut debtors: Vec<(&str, Cents)> = Vec::new();
    let mut creditors: Vec<(&str, Cents)> = Vec::new();
    for (member, amount) in balances.iter() {
        if amount.is_negative() {
            debtors.push((member, amount.abs()));
        } else if amount.is_positive() {
            creditors.push((member, amount));
        }
    }

    let mut transfers = Vec::with_capacity(debtors.len() + creditors.len());
    let (mut d, mut c) = (0usize, 0usize);
    while d < debtors.len() && c < creditors.len() {
        let amount = debtors[d].1.min(creditors[c].1);
        transfers.push(Transfer {
            from: debtors[d].0.to_string(),
            to: creditors[c].0.to_string(),
            amount,
        });

        debtors[d].1 -= amount;
        creditors[c].1 -= amount;
        if debtors[d].1 < Cents::ONE {
            d += 1;
        }
        if creditors[c].1 < Cents::ONE {
            c += 1;
        }
    }

    transfers
}
