//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                                  │
//! │                                                                         │
//! │  A commission of 3.5% on $1000.00 taxed at 16% must come out as        │
//! │  exactly $40.60, on every terminal, every time.                        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents + Basis Points                             │
//! │    100000 cents × 350 bps  / 10000 = 3500 cents                         │
//! │      3500 cents × 1600 bps / 10000 =  560 cents                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use caja_core::money::Money;
//!
//! let price = Money::from_cents(1099); // $10.99
//! let doubled = price * 2;             // $21.98
//! let total = price + Money::from_cents(500);
//! assert_eq!(total.cents(), 1599);
//! assert_eq!(doubled.to_string(), "$21.98");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::{Quantity, Rate};

// =============================================================================
// Rounding
// =============================================================================

/// Divides with rounding half away from zero.
///
/// Every multiplication of money by a rate or quantity funnels through
/// here so that all terminals round the same way.
pub(crate) fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money Flows
/// ```text
/// SaleLine.unit_price ──► pricing::compute_line ──► LineAmounts
///                                                       │
///                        Sale totals ◄──── sum ─────────┘
///                             │
///                             ▼
///          commission::compute_commission (card payments)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use caja_core::money::Money;
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
    ///
    /// ```rust
    /// use caja_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole major-unit part (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor-unit part, always 0-99.
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns zero for negative amounts, the amount otherwise.
    ///
    /// ```rust
    /// use caja_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-250).clamp_non_negative(), Money::zero());
    /// assert_eq!(Money::from_cents(250).clamp_non_negative().cents(), 250);
    /// ```
    #[inline]
    pub const fn clamp_non_negative(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Applies a rate and rounds half-up to the nearest cent.
    ///
    /// This is the single primitive behind line tax, percent discounts,
    /// commission base and tax on commission.
    ///
    /// ```rust
    /// use caja_core::money::Money;
    /// use caja_core::types::Rate;
    ///
    /// let subtotal = Money::from_cents(2500);
    /// assert_eq!(subtotal.apply_rate(Rate::from_percent(16)).cents(), 400);
    ///
    /// // $10.00 × 8.25% = $0.825 → $0.83
    /// let price = Money::from_cents(1000);
    /// assert_eq!(price.apply_rate(Rate::from_bps(825)).cents(), 83);
    /// ```
    pub fn apply_rate(&self, rate: Rate) -> Money {
        let scaled = self.0 as i128 * rate.bps() as i128;
        Money(div_round_half_up(scaled, Rate::BPS_PER_WHOLE as i128) as i64)
    }

    /// Multiplies a unit price by a quantity expressed in thousandths.
    ///
    /// ```rust
    /// use caja_core::money::Money;
    /// use caja_core::types::Quantity;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.times_quantity(Quantity::from_units(3)).cents(), 897);
    ///
    /// // 0.750 kg at $12.99/kg = $9.7425 → $9.74
    /// let per_kg = Money::from_cents(1299);
    /// assert_eq!(per_kg.times_quantity(Quantity::from_milli(750)).cents(), 974);
    /// ```
    pub fn times_quantity(&self, quantity: Quantity) -> Money {
        let scaled = self.0 as i128 * quantity.milli() as i128;
        Money(div_round_half_up(scaled, Quantity::MILLI_PER_UNIT as i128) as i64)
    }

    /// Formats the amount with a currency symbol.
    ///
    /// ```rust
    /// use caja_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(95940).format_with("$"), "$959.40");
    /// assert_eq!(Money::from_cents(-550).format_with("€"), "-€5.50");
    /// ```
    pub fn format_with(&self, symbol: &str) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!(
            "{}{}{}.{:02}",
            sign,
            symbol,
            self.major().abs(),
            self.minor_part()
        )
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly display with a `$` symbol. Presentation code should use
/// [`Money::format_with`] and the configured symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with("$"))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
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
    fn mul(self, factor: i64) -> Self {
        Money(self.0 * factor)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::zero()), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let mut c = a;
        c += b;
        c -= Money::from_cents(100);
        assert_eq!(c.cents(), 1400);
    }

    #[test]
    fn test_apply_rate_rounds_half_up() {
        // 0.5 cent rounds up
        assert_eq!(Money::from_cents(50).apply_rate(Rate::from_bps(100)).cents(), 1);
        // 0.49 cent rounds down
        assert_eq!(Money::from_cents(49).apply_rate(Rate::from_bps(100)).cents(), 0);
        // symmetric for negatives
        assert_eq!(Money::from_cents(-50).apply_rate(Rate::from_bps(100)).cents(), -1);
    }

    #[test]
    fn test_apply_rate_large_amount_no_overflow() {
        let big = Money::from_cents(i64::MAX / 2);
        let tax = big.apply_rate(Rate::from_percent(16));
        assert!(tax.is_positive());
    }

    #[test]
    fn test_times_quantity_fractional() {
        let per_kg = Money::from_cents(2000);
        assert_eq!(per_kg.times_quantity(Quantity::from_milli(1500)).cents(), 3000);
        assert_eq!(per_kg.times_quantity(Quantity::from_milli(1)).cents(), 2);
    }

    #[test]
    fn test_sum() {
        let amounts = [Money::from_cents(100), Money::from_cents(250)];
        let total: Money = amounts.iter().sum();
        assert_eq!(total.cents(), 350);

        let empty: Vec<Money> = Vec::new();
        assert_eq!(empty.into_iter().sum::<Money>(), Money::zero());
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(100).is_positive());
        assert!(Money::from_cents(-100).is_negative());
        assert_eq!(Money::from_cents(-100).abs().cents(), 100);
    }
}
