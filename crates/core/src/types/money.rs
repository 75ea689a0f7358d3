//! Monetary amounts using decimal arithmetic.
//!
//! Catalog prices and order totals are US dollars. Order history additionally
//! shows a local-currency figure computed with a fixed display rate; that value
//! is never sent back to the API.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An amount in US dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Usd(Decimal);

impl Usd {
    /// Zero dollars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal number of dollars.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from whole cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Convert to a local currency using a fixed display rate.
    #[must_use]
    pub fn to_local(self, rate: &LocalCurrency) -> LocalAmount {
        LocalAmount {
            amount: (self.0 * rate.per_usd).round_dp(2),
            code: rate.code.clone(),
        }
    }
}

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl Add for Usd {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Usd {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        Self(self.0 * Decimal::from(rhs))
    }
}

impl Sum for Usd {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Fixed conversion used to display order totals in the shop's local currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCurrency {
    /// ISO 4217 code shown next to the amount (e.g. "NPR").
    pub code: String,
    /// Local units per US dollar.
    pub per_usd: Decimal,
}

/// An amount in the local display currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAmount {
    pub amount: Decimal,
    pub code: String,
}

impl fmt::Display for LocalAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.code, self.amount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Usd::from_cents(450).to_string(), "$4.50");
        assert_eq!(Usd::from_cents(1000).to_string(), "$10.00");
        assert_eq!(Usd::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn test_multiply_by_quantity() {
        assert_eq!(Usd::from_cents(450) * 2, Usd::from_cents(900));
    }

    #[test]
    fn test_sum() {
        let total: Usd = [Usd::from_cents(450), Usd::from_cents(325)].into_iter().sum();
        assert_eq!(total, Usd::from_cents(775));
    }

    #[test]
    fn test_to_local() {
        let rate = LocalCurrency {
            code: "NPR".to_string(),
            per_usd: Decimal::new(1330, 1),
        };
        let local = Usd::from_cents(1000).to_local(&rate);
        assert_eq!(local.amount, Decimal::new(133_000, 2));
        assert_eq!(local.to_string(), "NPR 1330.00");
    }

    #[test]
    fn test_is_negative() {
        assert!(Usd::from_cents(-1).is_negative());
        assert!(!Usd::ZERO.is_negative());
    }
}
