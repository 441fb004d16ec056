use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Digits after the decimal point in the statement currency (cents).
pub const MINOR_UNIT_DIGITS: u32 = 2;

/// A signed amount in the statement currency.
///
/// Positive values are outflows (money leaving the wallet), negative
/// values are inflows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid amount: '{0}'")]
pub struct ParseMoneyError(pub String);

impl Money {
    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp(MINOR_UNIT_DIGITS))
    }

    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, MINOR_UNIT_DIGITS))
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    pub fn amount(self) -> Decimal {
        self.0
    }

    /// Parses an amount as printed on a statement: thousands separators,
    /// a leading sign and accounting parentheses are accepted.
    pub fn parse(s: &str) -> Result<Self, ParseMoneyError> {
        let trimmed = s.trim();
        let (negative, body) = match trimmed.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            Some(inner) => (true, inner),
            None => (false, trimmed),
        };
        let cleaned = body.replace([',', ' '], "");
        if cleaned.is_empty() {
            return Err(ParseMoneyError(s.to_string()));
        }
        let mut dec = Decimal::from_str(&cleaned).map_err(|_| ParseMoneyError(s.to_string()))?;
        if negative {
            dec = -dec;
        }
        Ok(Money::from_decimal(dec))
    }
}

impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = format!("{:.*}", MINOR_UNIT_DIGITS as usize, self.0);
        f.pad(&rendered)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self {
        if self.0.is_zero() {
            return Money::zero();
        }
        Money(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}
