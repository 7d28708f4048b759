//! Core domain layer. No external I/O dependencies.
//!
//! Entities, money, and the pure ledger rules (balances, debt minimization,
//! validation). Dependencies flow inward.

pub mod balance;
pub mod entities;
pub mod errors;
pub mod money;
pub mod settlement;
pub mod validation;

pub use balance::{calculate_balances, BalanceSheet, Balances, ResidueCorrection};
pub use entities::{
    display_name, Expense, ExpenseId, Group, GroupId, LedgerState, MemberId, NewExpense,
    PaymentStatus, SplitLine, SplitType, Transfer,
};
pub use errors::DomainError;
pub use money::Cents;
pub use settlement::minimize_debts;
pub use validation::{validate_new_expense, validate_payment, SPLIT_TOLERANCE};
