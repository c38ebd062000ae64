use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const EURO_CURRENCY_CODE: &str = "EUR";
/// ISO-4217 numeric code for the euro, as used by card gateways.
pub const EURO_ISO_NUMERIC_CODE: &str = "978";

//--------------------------------------        Money        ---------------------------------------------------------
/// An amount of money in euro cents.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Value cannot be represented as an amount of money: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}€", abs / 100, abs % 100)
    }
}

/// Parses a decimal string such as `"4.95"`, `"12"` or `"-0.5"` without going through floating point.
impl FromStr for Money {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        let err = || MoneyConversionError(format!("'{s}' is not a valid amount"));
        let (negative, digits) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value),
        };
        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(err());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
        if fraction.len() > 2 {
            return Err(MoneyConversionError(format!("'{s}' has more than two decimal places")));
        }
        let whole = if whole.is_empty() { 0 } else { whole.parse::<i64>().map_err(|_| err())? };
        let cents = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| err())? * 10,
            _ => fraction.parse::<i64>().map_err(|_| err())?,
        };
        let total = whole.checked_mul(100).and_then(|w| w.checked_add(cents)).ok_or_else(err)?;
        Ok(Self(if negative { -total } else { total }))
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn from_euros(euros: i64) -> Self {
        Self(euros * 100)
    }

    /// Converts an amount in major units (euros) to cents, rounding half away from zero.
    pub fn try_from_major_units(amount: f64) -> Result<Self, MoneyConversionError> {
        if !amount.is_finite() {
            return Err(MoneyConversionError(format!("{amount} is not a finite number")));
        }
        let cents = (amount * 100.0).round();
        if cents.abs() > i64::MAX as f64 {
            return Err(MoneyConversionError(format!("{amount} is too large")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(cents as i64))
    }

    pub fn to_major_units(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Multiplies the amount by `rate`, rounding the result to the nearest cent (half away from zero).
    pub fn apply_rate(&self, rate: f64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self((self.0 as f64 * rate).round() as i64)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}
