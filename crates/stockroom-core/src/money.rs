//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │                                                                         │
//! │  A price of 19.99 with 15% tax stored as a float drifts a cent over    │
//! │  enough re-saves. Stored as 1999 minor units it never does.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every money field in the API and the database is an integer count of
//! minor units. Only spreadsheet imports carry decimal strings, and those go
//! through [`Money::parse_decimal`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Signed so refunds and adjustments can be represented.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ```rust
    /// use stockroom_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Parses a decimal string in major units, as found in spreadsheets.
    ///
    /// Accepts an optional sign, digits, and up to two decimal places.
    /// Returns `None` for anything else, including empty input.
    ///
    /// ```rust
    /// use stockroom_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("12.5"), Some(Money::from_cents(1250)));
    /// assert_eq!(Money::parse_decimal("7"), Some(Money::from_cents(700)));
    /// assert_eq!(Money::parse_decimal("1.234"), None);
    /// assert_eq!(Money::parse_decimal("abc"), None);
    /// ```
    pub fn parse_decimal(input: &str) -> Option<Money> {
        let s = input.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return None;
        }
        if fraction.len() > 2 {
            return None;
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }

        let major: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let minor: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().ok()? * 10,
            _ => fraction.parse().ok()?,
        };

        let cents = major.checked_mul(100)?.checked_add(minor)?;
        Some(Money(if negative { -cents } else { cents }))
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates tax at the given rate, rounding half up to the minor unit.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`, widened to i128 so
    /// large amounts cannot overflow.
    ///
    /// ```rust
    /// use stockroom_core::money::Money;
    /// use stockroom_core::types::TaxRate;
    ///
    /// let price = Money::from_cents(1000);
    /// // 10.00 at 8.25% = 0.825, rounds to 0.83
    /// assert_eq!(price.calculate_tax(TaxRate::from_bps(825)).cents(), 83);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Formats as a plain decimal in major units: `12.50`, `-3.05`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.dollars().abs(), self.cents_part())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(0).to_string(), "0.00");
    }

    #[test]
    fn test_parse_decimal_accepts_spreadsheet_values() {
        assert_eq!(Money::parse_decimal("12"), Some(Money::from_cents(1200)));
        assert_eq!(Money::parse_decimal(" 12.50 "), Some(Money::from_cents(1250)));
        assert_eq!(Money::parse_decimal("0.05"), Some(Money::from_cents(5)));
        assert_eq!(Money::parse_decimal(".5"), Some(Money::from_cents(50)));
        assert_eq!(Money::parse_decimal("-3.10"), Some(Money::from_cents(-310)));
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        assert_eq!(Money::parse_decimal(""), None);
        assert_eq!(Money::parse_decimal("."), None);
        assert_eq!(Money::parse_decimal("abc"), None);
        assert_eq!(Money::parse_decimal("12.345"), None);
        assert_eq!(Money::parse_decimal("1,000"), None);
        assert_eq!(Money::parse_decimal("12a"), None);
    }

    #[test]
    fn test_tax_calculation_with_rounding() {
        let amount = Money::from_cents(1000);
        assert_eq!(amount.calculate_tax(TaxRate::from_bps(1000)).cents(), 100);
        assert_eq!(amount.calculate_tax(TaxRate::from_bps(825)).cents(), 83);
        assert_eq!(amount.calculate_tax(TaxRate::zero()).cents(), 0);
    }

    #[test]
    fn test_sum_and_multiply() {
        let lines = [Money::from_cents(1000) * 2, Money::from_cents(500).multiply_quantity(3)];
        let total: Money = lines.iter().copied().sum();
        assert_eq!(total.cents(), 3500);
    }
}
