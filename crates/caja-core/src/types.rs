//! # Domain Types
//!
//! Value types shared by the pricing, commission and sale modules.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Rate       │   │    Quantity     │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  milli (i64)    │   │  Cash           │       │
//! │  │  1600 = 16%     │   │  3000 = 3 units │   │  Card           │       │
//! │  │   350 = 3.5%    │   │   750 = 0.75 kg │   │  Transfer       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │                        ┌─────────────────┐                              │
//! │                        │   SaleStatus    │                              │
//! │                        │  ─────────────  │                              │
//! │                        │  Open           │                              │
//! │                        │  Finalized      │ (terminal)                   │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::div_round_half_up;

// =============================================================================
// Rate
// =============================================================================

/// A percentage expressed in basis points (1 bps = 0.01%).
///
/// Used for tax rates, discount percentages and commission rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// Basis points in 100%.
    pub const BPS_PER_WHOLE: u32 = 10_000;

    /// 100%.
    pub const FULL: Rate = Rate(Self::BPS_PER_WHOLE);

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from a whole percentage (16 → 16%).
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        Rate(percent * 100)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage, for display only.
    #[inline]
    pub fn percent(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns `self × (1 + other)`, rounded half-up to a basis point.
    ///
    /// ```rust
    /// use caja_core::types::Rate;
    ///
    /// // 3.5% commission taxed at 16% costs 4.06% of the payment
    /// let effective = Rate::from_bps(350).compounded_with(Rate::from_percent(16));
    /// assert_eq!(effective.bps(), 406);
    /// ```
    pub fn compounded_with(&self, other: Rate) -> Rate {
        let scaled = self.0 as i128 * (Self::BPS_PER_WHOLE as i128 + other.0 as i128);
        Rate(div_round_half_up(scaled, Self::BPS_PER_WHOLE as i128) as u32)
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// A sold quantity in thousandths of a unit.
///
/// Whole-piece goods use multiples of 1000; weighed goods use the scale
/// reading directly (0.750 kg = 750).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    /// Thousandths in one unit.
    pub const MILLI_PER_UNIT: i64 = 1_000;

    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * Self::MILLI_PER_UNIT)
    }

    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// True when the quantity is a whole number of units.
    #[inline]
    pub const fn is_whole(&self) -> bool {
        self.0 % Self::MILLI_PER_UNIT == 0
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_whole() {
            write!(f, "{}", self.0 / Self::MILLI_PER_UNIT)
        } else {
            let sign = if self.0 < 0 { "-" } else { "" };
            let abs = self.0.abs();
            write!(
                f,
                "{}{}.{:03}",
                sign,
                abs / Self::MILLI_PER_UNIT,
                abs % Self::MILLI_PER_UNIT
            )
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer pays for a sale.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash.
    #[default]
    Cash,
    /// Card charged through an external processor.
    Card,
    /// Bank transfer.
    Transfer,
}

impl PaymentMethod {
    /// Only card payments incur a processor commission.
    pub const fn incurs_commission(&self) -> bool {
        matches!(self, PaymentMethod::Card)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "efectivo" => Ok(PaymentMethod::Cash),
            "card" | "tarjeta" => Ok(PaymentMethod::Card),
            "transfer" | "transferencia" => Ok(PaymentMethod::Transfer),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: vec!["cash".into(), "card".into(), "transfer".into()],
            }),
        }
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// Lifecycle of a sale aggregate. `Finalized` is terminal.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Lines can still be added and edited.
    #[default]
    Open,
    /// Snapshot taken and being stored; reopened if storing fails.
    Finalizing,
    /// Snapshot stored; no further mutation.
    Finalized,
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaleStatus::Open => f.write_str("open"),
            SaleStatus::Finalizing => f.write_str("finalizing"),
            SaleStatus::Finalized => f.write_str("finalized"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_from_percent() {
        assert_eq!(Rate::from_percent(16).bps(), 1600);
        assert!((Rate::from_bps(350).percent() - 3.5).abs() < f64::EPSILON);
        assert_eq!(Rate::from_bps(350).to_string(), "3.50%");
    }

    #[test]
    fn test_rate_compounded_with_zero_is_identity() {
        let rate = Rate::from_bps(275);
        assert_eq!(rate.compounded_with(Rate::zero()), rate);
    }

    #[test]
    fn test_quantity_display() {
        assert_eq!(Quantity::from_units(3).to_string(), "3");
        assert_eq!(Quantity::from_milli(750).to_string(), "0.750");
        assert_eq!(Quantity::from_milli(2_125).to_string(), "2.125");
    }

    #[test]
    fn test_quantity_add() {
        let q = Quantity::from_units(2) + Quantity::from_milli(500);
        assert_eq!(q.milli(), 2_500);
        assert!(!q.is_whole());
    }

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert_eq!("Efectivo".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert!("cheque".parse::<PaymentMethod>().is_err());
        assert!(PaymentMethod::Card.incurs_commission());
        assert!(!PaymentMethod::Cash.incurs_commission());
    }
}
