//! Creation-time checks for expenses and payments.
//!
//! These run before anything is written. The calculator still tolerates records
//! that bypassed them (see residue correction in `balance`).

use crate::domain::{Cents, DomainError, NewExpense, SplitType};

/// Allowed gap between an unequal split's total and the expense amount.
pub const SPLIT_TOLERANCE: Cents = Cents::ONE;

/// Rejects malformed expenses. Unequal splits must sum to the amount within 0.01.
pub fn validate_new_expense(expense: &NewExpense) -> Result<(), DomainError> {
    if expense.title.trim().is_empty() {
        return Err(DomainError::Validation("expense title is required".into()));
    }
    if !expense.amount.is_positive() {
        return Err(DomainError::Validation(format!(
            "amount must be greater than 0, got {}",
            expense.amount
        )));
    }
    if expense.paid_by.trim().is_empty() {
        return Err(DomainError::Validation("payer is required".into()));
    }
    if expense.split_details.is_empty() {
        return Err(DomainError::Validation(
            "split details must contain at least one member".into(),
        ));
    }
    for line in &expense.split_details {
        if line.member.trim().is_empty() {
            return Err(DomainError::Validation("split member is required".into()));
        }
        if line.amount.is_negative() {
            return Err(DomainError::Validation(format!(
                "split amount for {} must not be negative",
                line.member
            )));
        }
    }

    if expense.split_type == SplitType::Unequal {
        let split_total = expense
            .split_details
            .iter()
            .filter(|l| !l.excluded)
            .try_fold(Cents::ZERO, |acc, l| acc.checked_add(l.amount))
            .ok_or_else(|| DomainError::Validation("split amounts are out of range".into()))?;
        if (split_total - expense.amount).abs() > SPLIT_TOLERANCE {
            return Err(DomainError::Validation(format!(
                "split amounts must sum up to the total amount ({} != {})",
                split_total, expense.amount
            )));
        }
    }
    Ok(())
}

/// Rejects payments that cannot be recorded.
pub fn validate_payment(from: &str, to: &str, amount: Cents) -> Result<(), DomainError> {
    if from.trim().is_empty() || to.trim().is_empty() {
        return Err(DomainError::Validation(
            "payment needs both a payer and a payee".into(),
        ));
    }
    if from == to {
        return Err(DomainError::Validation(format!(
            "{} cannot pay themselves",
            from
        )));
    }
    if !amount.is_positive() {
        return Err(DomainError::Validation(format!(
            "payment amount must be greater than 0, got {}",
            amount
        )));
    }
    Ok(())
}
