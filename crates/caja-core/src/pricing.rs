//! # Pricing Engine
//!
//! Line-level price computation.
//!
//! ## Line Computation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         compute_line                                    │
//! │                                                                         │
//! │   quantity × unit_price ──► gross          (half-up to the cent)       │
//! │                               │                                         │
//! │                   gross - discount ──► max(0, _) ──► subtotal          │
//! │                                                         │               │
//! │                              subtotal × tax_rate ──► tax                │
//! │                                                         │               │
//! │                                   subtotal + tax ──► total             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine has no error conditions. Inputs are validated by the sale
//! aggregate before they get here; anything that slips through is clamped.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Quantity, Rate};

/// Computed amounts for one sale line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineAmounts {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

/// Quantity times unit price, before discount.
#[inline]
pub fn gross_amount(quantity: Quantity, unit_price: Money) -> Money {
    unit_price.times_quantity(quantity)
}

/// Computes subtotal, tax and total for a line.
///
/// ```rust
/// use caja_core::money::Money;
/// use caja_core::pricing::compute_line;
/// use caja_core::types::{Quantity, Rate};
///
/// // A discount larger than the gross clamps the line to zero.
/// let amounts = compute_line(
///     Quantity::from_units(1),
///     Money::from_cents(500),
///     Money::from_cents(900),
///     Rate::from_percent(16),
/// );
/// assert!(amounts.total.is_zero());
/// ```
pub fn compute_line(
    quantity: Quantity,
    unit_price: Money,
    discount: Money,
    tax_rate: Rate,
) -> LineAmounts {
    let gross = gross_amount(quantity, unit_price);
    let subtotal = (gross - discount).clamp_non_negative();
    let tax = subtotal.apply_rate(tax_rate);

    LineAmounts {
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

/// Converts a percentage discount into a fixed amount off the line gross.
///
/// ```rust
/// use caja_core::money::Money;
/// use caja_core::pricing::discount_from_percent;
/// use caja_core::types::{Quantity, Rate};
///
/// let d = discount_from_percent(Quantity::from_units(2), Money::from_cents(1250), Rate::from_percent(10));
/// assert_eq!(d.cents(), 250);
/// ```
pub fn discount_from_percent(quantity: Quantity, unit_price: Money, percent: Rate) -> Money {
    gross_amount(quantity, unit_price)
        .apply_rate(percent)
        .clamp_non_negative()
}
