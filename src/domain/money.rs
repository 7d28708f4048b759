//! Fixed-point money. Every amount the engine touches is integer cents.
//!
//! Decimals only exist at the boundary (parsing input, rendering output).

use crate::domain::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Signed amount in minor units (cents). Currency-agnostic.
///
/// Serializes as the bare integer for storage; presentation types use [`decimal`].
///
/// ```rust
/// use split_ledger::domain::Cents;
///
/// let share = Cents::from_decimal(33.336);
/// assert_eq!(share.cents(), 3334);
/// assert_eq!(share.to_string(), "33.34");
/// assert_eq!("-0,5".parse::<Cents>().unwrap().cents(), -50);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    /// Smallest representable non-zero amount (0.01).
    pub const ONE: Cents = Cents(1);

    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Converts a decimal amount, rounding half away from zero to the nearest cent.
    pub fn from_decimal(value: f64) -> Self {
        Self((value * 100.0).round() as i64)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Decimal view for presentation. Never feed this back into arithmetic.
    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Checked addition. `None` when the result leaves `-i64::MAX..=i64::MAX`,
    /// so a checked result can always be negated and `abs`'d.
    #[must_use]
    pub fn checked_add(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_add(rhs.0).filter(|v| *v != i64::MIN).map(Cents)
    }

    /// Checked subtraction, same range as [`Cents::checked_add`].
    #[must_use]
    pub fn checked_sub(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_sub(rhs.0).filter(|v| *v != i64::MIN).map(Cents)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

// The operators below are unchecked. Anything summing caller-supplied amounts
// (balances, split totals) goes through `checked_add`/`checked_sub` instead.

impl Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Cents) {
        self.0 += rhs.0;
    }
}

impl Sub for Cents {
    type Output = Cents;

    fn sub(self, rhs: Cents) -> Cents {
        Cents(self.0 - rhs.0)
    }
}

impl SubAssign for Cents {
    fn sub_assign(&mut self, rhs: Cents) {
        self.0 -= rhs.0;
    }
}

impl Neg for Cents {
    type Output = Cents;

    fn neg(self) -> Cents {
        Cents(-self.0)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Cents {
        iter.fold(Cents::ZERO, |acc, c| acc + c)
    }
}

impl<'a> Sum<&'a Cents> for Cents {
    fn sum<I: Iterator<Item = &'a Cents>>(iter: I) -> Cents {
        iter.copied().sum()
    }
}

impl FromStr for Cents {
    type Err = DomainError;

    /// Accepts an optional sign, `.` or `,` as separator and at most two decimals.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::Validation(format!("invalid amount: {:?}", s));

        let trimmed = s.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let rest = rest.replace(',', ".");
        let (units, frac) = match rest.split_once('.') {
            Some((u, f)) => (u, f),
            None => (rest.as_str(), ""),
        };

        if units.is_empty() || !units.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let units: i64 = units.parse().map_err(|_| invalid())?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(invalid)?;

        Ok(Cents(if negative { -total } else { total }))
    }
}

/// Serde adapter for outward-facing amounts: `5000` cents is written as `50.0`.
///
/// Use with `#[serde(with = "crate::domain::money::decimal")]`.
pub mod decimal {
    use super::Cents;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(amount.as_decimal())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Cents, D::Error> {
        f64::deserialize(deserializer).map(Cents::from_decimal)
    }
}
