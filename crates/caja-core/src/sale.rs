//! # Sale Aggregate
//!
//! The transaction being rung up at the counter: a header plus ordered
//! lines, with totals recomputed on every mutation.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Sale Lifecycle                                  │
//! │                                                                         │
//! │   Sale::new()                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   ┌────────┐  add_line / remove_line / update_line_quantity             │
//! │   │  Open  │◄─ apply_line_discount / apply_line_discount_percent        │
//! │   └───┬────┘  set_customer_label / set_payment_method                   │
//! │       │                                                                 │
//! │       │ begin_finalize()  ── validate ── SaleSnapshot                   │
//! │       ▼                                                                 │
//! │   ┌────────────┐  cancel_finalize() ──► back to Open                    │
//! │   │ Finalizing │  mutations → InvalidSaleStatus                         │
//! │   └───┬────────┘                                                        │
//! │       │ complete_finalize()                                             │
//! │       ▼                                                                 │
//! │   ┌───────────┐                                                         │
//! │   │ Finalized │  terminal; every further mutation → InvalidSaleStatus   │
//! │   └───────────┘                                                         │
//! │                                                                         │
//! │   finalize() runs begin + complete in one step.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by `product_id` (adding the same product increases quantity)
//! - Sale totals always equal the sum of the line amounts
//! - At most [`MAX_SALE_LINES`] lines, [`MAX_LINE_UNITS`] units per line

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::{compute_line, discount_from_percent, gross_amount, LineAmounts};
use crate::types::{PaymentMethod, Quantity, Rate, SaleStatus};
use crate::validation::{
    validate_discount, validate_line_name, validate_percent_rate, validate_product_ref,
    validate_quantity, validate_unit_price,
};
use crate::{MAX_LINE_UNITS, MAX_SALE_LINES};

/// Maximum length of the free-text customer label.
const MAX_CUSTOMER_LABEL_LEN: usize = 100;

// =============================================================================
// Sale Line
// =============================================================================

/// One product on a sale.
///
/// Name, unit, price and tax rate are frozen when the line is added, so a
/// catalog change mid-sale does not alter what the customer was quoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub product_id: String,
    pub name: String,
    /// Unit of measure shown on the receipt ("pz", "kg").
    pub unit: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub discount: Money,
    pub tax_rate: Rate,
}

impl SaleLine {
    /// A new line with no discount.
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
        quantity: Quantity,
        unit_price: Money,
        tax_rate: Rate,
    ) -> Self {
        SaleLine {
            product_id: product_id.into(),
            name: name.into(),
            unit: unit.into(),
            quantity,
            unit_price,
            discount: Money::zero(),
            tax_rate,
        }
    }

    /// Quantity times unit price, before discount.
    pub fn gross(&self) -> Money {
        gross_amount(self.quantity, self.unit_price)
    }

    /// Subtotal, tax and total for this line.
    pub fn amounts(&self) -> LineAmounts {
        compute_line(self.quantity, self.unit_price, self.discount, self.tax_rate)
    }

    fn validate(&self) -> CoreResult<()> {
        validate_product_ref(&self.product_id)?;
        validate_quantity(self.quantity)?;
        validate_unit_price(self.unit_price)?;
        Ok(())
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Aggregate totals, returned by every mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleTotals {
    pub line_count: usize,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl From<&Sale> for SaleTotals {
    fn from(sale: &Sale) -> Self {
        sale.lines.iter().map(SaleLine::amounts).fold(
            SaleTotals {
                line_count: sale.lines.len(),
                ..SaleTotals::default()
            },
            |mut acc, amounts| {
                acc.subtotal += amounts.subtotal;
                acc.tax += amounts.tax;
                acc.total += amounts.total;
                acc
            },
        )
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A sale in progress (or finalized).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub customer_label: Option<String>,
    pub payment_method: PaymentMethod,
    status: SaleStatus,
    pub lines: Vec<SaleLine>,
}

impl Default for Sale {
    fn default() -> Self {
        Self::new()
    }
}

impl Sale {
    /// Starts an empty open sale.
    pub fn new() -> Self {
        Sale {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            customer_label: None,
            payment_method: PaymentMethod::default(),
            status: SaleStatus::Open,
            lines: Vec::new(),
        }
    }

    pub fn status(&self) -> SaleStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == SaleStatus::Open
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, product_id: &str) -> Option<&SaleLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Current totals.
    pub fn totals(&self) -> SaleTotals {
        SaleTotals::from(self)
    }

    // =========================================================================
    // Line operations
    // =========================================================================

    /// Adds a line, or increases the quantity of the existing line for the
    /// same product.
    ///
    /// A merge keeps the existing line's name and unit and adds the
    /// incoming discount to its own. The unit price and tax rate must match
    /// the existing line; otherwise [`CoreError::LineTermsMismatch`].
    ///
    /// ```rust
    /// use caja_core::{Money, Quantity, Rate, Sale, SaleLine};
    ///
    /// let mut sale = Sale::new();
    /// let line = SaleLine::new("P-1", "Coffee", "pz", Quantity::from_units(1), Money::from_cents(1000), Rate::from_percent(16));
    /// sale.add_line(line.clone()).unwrap();
    /// let totals = sale.add_line(line).unwrap();
    ///
    /// assert_eq!(totals.line_count, 1);
    /// assert_eq!(totals.total.cents(), 2320);
    /// ```
    pub fn add_line(&mut self, line: SaleLine) -> CoreResult<SaleTotals> {
        self.ensure_open()?;
        line.validate()?;
        validate_line_name(&line.name)?;
        validate_percent_rate("tax_rate", line.tax_rate)?;
        validate_discount(line.discount, line.gross())?;

        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            if existing.unit_price != line.unit_price || existing.tax_rate != line.tax_rate {
                return Err(CoreError::LineTermsMismatch {
                    product_id: line.product_id,
                });
            }

            let merged = existing.quantity + line.quantity;
            ensure_within_max(merged)?;
            let discount = existing.discount + line.discount;
            validate_discount(discount, gross_amount(merged, existing.unit_price))?;

            existing.quantity = merged;
            existing.discount = discount;
            return Ok(self.totals());
        }

        if self.lines.len() >= MAX_SALE_LINES {
            return Err(CoreError::SaleTooLarge {
                max: MAX_SALE_LINES,
            });
        }
        ensure_within_max(line.quantity)?;

        self.lines.push(line);
        Ok(self.totals())
    }

    /// Removes the line for a product.
    pub fn remove_line(&mut self, product_id: &str) -> CoreResult<SaleTotals> {
        self.ensure_open()?;
        let index = self.line_index(product_id)?;
        self.lines.remove(index);
        Ok(self.totals())
    }

    /// Replaces a line's quantity.
    ///
    /// A discount larger than the new gross is reduced to the gross.
    pub fn update_line_quantity(
        &mut self,
        product_id: &str,
        quantity: Quantity,
    ) -> CoreResult<SaleTotals> {
        self.ensure_open()?;
        validate_quantity(quantity)?;
        ensure_within_max(quantity)?;

        let index = self.line_index(product_id)?;
        let line = &mut self.lines[index];
        line.quantity = quantity;
        let gross = line.gross();
        if line.discount > gross {
            line.discount = gross;
        }
        Ok(self.totals())
    }

    /// Sets a fixed discount on a line. Must be between zero and the
    /// line's gross amount.
    pub fn apply_line_discount(
        &mut self,
        product_id: &str,
        discount: Money,
    ) -> CoreResult<SaleTotals> {
        self.ensure_open()?;
        let index = self.line_index(product_id)?;
        let line = &mut self.lines[index];
        validate_discount(discount, line.gross())?;
        line.discount = discount;
        Ok(self.totals())
    }

    /// Sets a discount expressed as a percentage of the line gross.
    pub fn apply_line_discount_percent(
        &mut self,
        product_id: &str,
        percent: Rate,
    ) -> CoreResult<SaleTotals> {
        self.ensure_open()?;
        validate_percent_rate("discount_percent", percent)?;
        let index = self.line_index(product_id)?;
        let line = &mut self.lines[index];
        line.discount = discount_from_percent(line.quantity, line.unit_price, percent);
        Ok(self.totals())
    }

    // =========================================================================
    // Header operations
    // =========================================================================

    /// Sets or clears the customer label. Blank labels clear it.
    pub fn set_customer_label(&mut self, label: Option<String>) -> CoreResult<SaleTotals> {
        self.ensure_open()?;
        let label = label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        if let Some(l) = &label {
            if l.chars().count() > MAX_CUSTOMER_LABEL_LEN {
                return Err(ValidationError::TooLong {
                    field: "customer_label".to_string(),
                    max: MAX_CUSTOMER_LABEL_LEN,
                }
                .into());
            }
        }

        self.customer_label = label;
        Ok(self.totals())
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) -> CoreResult<SaleTotals> {
        self.ensure_open()?;
        self.payment_method = method;
        Ok(self.totals())
    }

    // =========================================================================
    // Finalization
    // =========================================================================

    /// Checks the sale can be finalized: at least one line, and every line
    /// has a product reference, positive quantity and positive price.
    pub fn validate(&self) -> CoreResult<()> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptySale {
                sale_id: self.id.clone(),
            });
        }
        self.lines.iter().try_for_each(SaleLine::validate)
    }

    /// Validates, marks the sale finalized and returns the frozen record.
    pub fn finalize(&mut self, finalized_at: DateTime<Utc>) -> CoreResult<SaleSnapshot> {
        let snapshot = self.begin_finalize(finalized_at)?;
        self.status = SaleStatus::Finalized;
        Ok(snapshot)
    }

    /// Validates and freezes the sale while its snapshot is being stored.
    ///
    /// The sale stays `Finalizing` until [`Sale::complete_finalize`] or
    /// [`Sale::cancel_finalize`]; every mutation is rejected meanwhile.
    pub fn begin_finalize(&mut self, finalized_at: DateTime<Utc>) -> CoreResult<SaleSnapshot> {
        self.ensure_status(SaleStatus::Open)?;
        self.validate()?;

        self.status = SaleStatus::Finalizing;

        Ok(SaleSnapshot {
            sale_id: self.id.clone(),
            created_at: self.created_at,
            finalized_at,
            customer_label: self.customer_label.clone(),
            payment_method: self.payment_method,
            lines: self.lines.iter().map(SnapshotLine::from).collect(),
            totals: self.totals(),
        })
    }

    /// The snapshot was stored. `Finalized` is terminal.
    pub fn complete_finalize(&mut self) -> CoreResult<()> {
        self.ensure_status(SaleStatus::Finalizing)?;
        self.status = SaleStatus::Finalized;
        Ok(())
    }

    /// Storing the snapshot failed; the sale is editable again.
    pub fn cancel_finalize(&mut self) -> CoreResult<()> {
        self.ensure_status(SaleStatus::Finalizing)?;
        self.status = SaleStatus::Open;
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn ensure_open(&self) -> CoreResult<()> {
        self.ensure_status(SaleStatus::Open)
    }

    fn ensure_status(&self, expected: SaleStatus) -> CoreResult<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(CoreError::InvalidSaleStatus {
                sale_id: self.id.clone(),
                current_status: self.status.to_string(),
            })
        }
    }

    fn line_index(&self, product_id: &str) -> CoreResult<usize> {
        self.lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::LineNotFound {
                sale_id: self.id.clone(),
                product_id: product_id.to_string(),
            })
    }
}

fn ensure_within_max(quantity: Quantity) -> CoreResult<()> {
    if quantity.milli() > MAX_LINE_UNITS * Quantity::MILLI_PER_UNIT {
        return Err(CoreError::QuantityTooLarge {
            requested: quantity.to_string(),
            max: MAX_LINE_UNITS,
        });
    }
    Ok(())
}

// =============================================================================
// Snapshot
// =============================================================================

/// A line as it was at finalization, with its computed amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotLine {
    pub product_id: String,
    pub name: String,
    pub unit: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub discount: Money,
    pub tax_rate: Rate,
    pub amounts: LineAmounts,
}

impl From<&SaleLine> for SnapshotLine {
    fn from(line: &SaleLine) -> Self {
        SnapshotLine {
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            unit: line.unit.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            discount: line.discount,
            tax_rate: line.tax_rate,
            amounts: line.amounts(),
        }
    }
}

/// Immutable record of a finalized sale. This is what gets persisted and
/// pushed to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleSnapshot {
    pub sale_id: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub finalized_at: DateTime<Utc>,
    pub customer_label: Option<String>,
    pub payment_method: PaymentMethod,
    pub lines: Vec<SnapshotLine>,
    pub totals: SaleTotals,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: &str, units: i64, price_cents: i64) -> SaleLine {
        SaleLine::new(
            product_id,
            format!("Product {}", product_id),
            "pz",
            Quantity::from_units(units),
            Money::from_cents(price_cents),
            Rate::from_percent(16),
        )
    }

    fn assert_totals_match_lines(sale: &Sale) {
        let sum: Money = sale.lines.iter().map(|l| l.amounts().total).sum();
        assert_eq!(sale.totals().total, sum);
    }

    #[test]
    fn test_add_line_returns_totals() {
        let mut sale = Sale::new();
        let totals = sale.add_line(line("A", 3, 1000)).unwrap();

        assert_eq!(totals.line_count, 1);
        assert_eq!(totals.subtotal.cents(), 3000);
        assert_eq!(totals.tax.cents(), 480);
        assert_eq!(totals.total.cents(), 3480);
    }

    #[test]
    fn test_add_same_product_merges_quantity() {
        let mut sale = Sale::new();
        sale.add_line(line("A", 1, 500)).unwrap();
        sale.add_line(line("A", 2, 500)).unwrap();

        assert_eq!(sale.lines.len(), 1);
        assert_eq!(sale.lines[0].quantity, Quantity::from_units(3));
    }

    #[test]
    fn test_merge_requires_same_price_and_tax() {
        let mut sale = Sale::new();
        sale.add_line(line("A", 1, 500)).unwrap();

        assert!(matches!(
            sale.add_line(line("A", 1, 450)),
            Err(CoreError::LineTermsMismatch { .. })
        ));

        let mut exempt = line("A", 1, 500);
        exempt.tax_rate = Rate::zero();
        assert!(matches!(
            sale.add_line(exempt),
            Err(CoreError::LineTermsMismatch { .. })
        ));

        assert_eq!(sale.lines[0].quantity, Quantity::from_units(1));
    }

    #[test]
    fn test_merge_accumulates_discount() {
        let mut sale = Sale::new();
        let mut first = line("A", 1, 1000);
        first.discount = Money::from_cents(100);
        sale.add_line(first).unwrap();

        let mut second = line("A", 1, 1000);
        second.discount = Money::from_cents(50);
        let totals = sale.add_line(second).unwrap();

        assert_eq!(sale.lines[0].discount.cents(), 150);
        assert_eq!(totals.subtotal.cents(), 1850);
        assert_totals_match_lines(&sale);
    }

    #[test]
    fn test_add_line_rejects_invalid_input() {
        let mut sale = Sale::new();

        let err = sale.add_line(line("A", 0, 500)).unwrap_err();
        assert!(err.is_validation());

        let err = sale.add_line(line("A", 1, 0)).unwrap_err();
        assert!(err.is_validation());

        let err = sale.add_line(line("", 1, 500)).unwrap_err();
        assert!(err.is_validation());

        assert!(sale.is_empty());
    }

    #[test]
    fn test_quantity_limit_applies_to_merged_line() {
        let mut sale = Sale::new();
        sale.add_line(line("A", MAX_LINE_UNITS, 100)).unwrap();

        let err = sale.add_line(line("A", 1, 100)).unwrap_err();
        assert!(matches!(err, CoreError::QuantityTooLarge { .. }));
        assert_eq!(sale.lines[0].quantity, Quantity::from_units(MAX_LINE_UNITS));
    }

    #[test]
    fn test_max_lines() {
        let mut sale = Sale::new();
        for i in 0..MAX_SALE_LINES {
            sale.add_line(line(&format!("P{}", i), 1, 100)).unwrap();
        }
        let err = sale.add_line(line("overflow", 1, 100)).unwrap_err();
        assert!(matches!(err, CoreError::SaleTooLarge { .. }));
    }

    #[test]
    fn test_remove_and_update() {
        let mut sale = Sale::new();
        sale.add_line(line("A", 1, 1000)).unwrap();
        sale.add_line(line("B", 2, 250)).unwrap();

        let totals = sale.update_line_quantity("B", Quantity::from_units(4)).unwrap();
        assert_eq!(totals.subtotal.cents(), 2000);
        assert_totals_match_lines(&sale);

        let totals = sale.remove_line("A").unwrap();
        assert_eq!(totals.line_count, 1);
        assert_eq!(totals.subtotal.cents(), 1000);
        assert_totals_match_lines(&sale);

        assert!(matches!(
            sale.remove_line("A").unwrap_err(),
            CoreError::LineNotFound { .. }
        ));
    }

    #[test]
    fn test_update_quantity_rejects_zero() {
        let mut sale = Sale::new();
        sale.add_line(line("A", 2, 1000)).unwrap();
        assert!(sale.update_line_quantity("A", Quantity::zero()).is_err());
        assert_eq!(sale.lines[0].quantity, Quantity::from_units(2));
    }

    #[test]
    fn test_discounts() {
        let mut sale = Sale::new();
        sale.add_line(line("A", 3, 1000)).unwrap();

        let totals = sale.apply_line_discount("A", Money::from_cents(500)).unwrap();
        assert_eq!(totals.subtotal.cents(), 2500);
        assert_eq!(totals.tax.cents(), 400);
        assert_eq!(totals.total.cents(), 2900);

        assert!(sale.apply_line_discount("A", Money::from_cents(3001)).is_err());
        assert!(sale.apply_line_discount("A", Money::from_cents(-1)).is_err());

        let totals = sale.apply_line_discount_percent("A", Rate::from_percent(10)).unwrap();
        assert_eq!(sale.lines[0].discount.cents(), 300);
        assert_eq!(totals.subtotal.cents(), 2700);

        assert!(sale
            .apply_line_discount_percent("A", Rate::from_percent(101))
            .is_err());
    }

    #[test]
    fn test_reducing_quantity_caps_discount() {
        let mut sale = Sale::new();
        sale.add_line(line("A", 3, 1000)).unwrap();
        sale.apply_line_discount("A", Money::from_cents(2500)).unwrap();

        sale.update_line_quantity("A", Quantity::from_units(2)).unwrap();
        assert_eq!(sale.lines[0].discount.cents(), 2000);
        assert!(sale.totals().total.is_zero());
    }

    #[test]
    fn test_totals_track_every_mutation() {
        let mut sale = Sale::new();
        sale.add_line(line("A", 1, 199)).unwrap();
        assert_totals_match_lines(&sale);
        sale.add_line(line("B", 5, 333)).unwrap();
        assert_totals_match_lines(&sale);
        sale.add_line(line("A", 2, 199)).unwrap();
        assert_totals_match_lines(&sale);
        sale.apply_line_discount("B", Money::from_cents(100)).unwrap();
        assert_totals_match_lines(&sale);
        sale.update_line_quantity("B", Quantity::from_milli(1_500)).unwrap();
        assert_totals_match_lines(&sale);
        sale.remove_line("A").unwrap();
        assert_totals_match_lines(&sale);
    }

    #[test]
    fn test_customer_label() {
        let mut sale = Sale::new();
        sale.set_customer_label(Some("  Maria  ".to_string())).unwrap();
        assert_eq!(sale.customer_label.as_deref(), Some("Maria"));

        sale.set_customer_label(Some("   ".to_string())).unwrap();
        assert!(sale.customer_label.is_none());

        assert!(sale.set_customer_label(Some("x".repeat(101))).is_err());
    }

    #[test]
    fn test_finalize_empty_sale_fails() {
        let mut sale = Sale::new();
        let err = sale.finalize(Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::EmptySale { .. }));
        assert!(sale.is_open());
    }

    #[test]
    fn test_finalize_produces_snapshot() {
        let mut sale = Sale::new();
        sale.add_line(line("A", 3, 1000)).unwrap();
        sale.apply_line_discount("A", Money::from_cents(500)).unwrap();
        sale.set_payment_method(PaymentMethod::Card).unwrap();

        let at = Utc::now();
        let snapshot = sale.finalize(at).unwrap();

        assert_eq!(snapshot.sale_id, sale.id);
        assert_eq!(snapshot.finalized_at, at);
        assert_eq!(snapshot.payment_method, PaymentMethod::Card);
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(snapshot.lines[0].amounts.total.cents(), 2900);
        assert_eq!(snapshot.totals.total.cents(), 2900);
        assert_eq!(sale.status(), SaleStatus::Finalized);
    }

    #[test]
    fn test_finalized_sale_rejects_mutation() {
        let mut sale = Sale::new();
        sale.add_line(line("A", 1, 1000)).unwrap();
        sale.finalize(Utc::now()).unwrap();

        let is_state_error =
            |r: CoreResult<SaleTotals>| matches!(r, Err(CoreError::InvalidSaleStatus { .. }));

        assert!(is_state_error(sale.add_line(line("B", 1, 100))));
        assert!(is_state_error(sale.remove_line("A")));
        assert!(is_state_error(sale.update_line_quantity("A", Quantity::from_units(2))));
        assert!(is_state_error(sale.apply_line_discount("A", Money::zero())));
        assert!(is_state_error(sale.apply_line_discount_percent("A", Rate::zero())));
        assert!(is_state_error(sale.set_customer_label(None)));
        assert!(is_state_error(sale.set_payment_method(PaymentMethod::Transfer)));
        assert!(matches!(
            sale.finalize(Utc::now()),
            Err(CoreError::InvalidSaleStatus { .. })
        ));
    }
    #[test]
    fn test_finalizing_sale_is_frozen_until_resolved() {
        let mut sale = Sale::new();
        sale.add_line(line("A", 1, 1000)).unwrap();

        let snapshot = sale.begin_finalize(Utc::now()).unwrap();
        assert_eq!(sale.status(), SaleStatus::Finalizing);
        assert!(!sale.is_open());
        assert!(matches!(
            sale.add_line(line("B", 1, 100)),
            Err(CoreError::InvalidSaleStatus { .. })
        ));
        assert!(sale.begin_finalize(Utc::now()).is_err());

        sale.cancel_finalize().unwrap();
        assert!(sale.is_open());
        sale.add_line(line("B", 1, 100)).unwrap();

        let second = sale.begin_finalize(Utc::now()).unwrap();
        assert_eq!(second.sale_id, snapshot.sale_id);
        assert_eq!(second.lines.len(), 2);

        sale.complete_finalize().unwrap();
        assert_eq!(sale.status(), SaleStatus::Finalized);
        assert!(sale.cancel_finalize().is_err());
        assert!(sale.complete_finalize().is_err());
    }

    #[test]
    fn test_resolving_without_begin_fails() {
        let mut sale = Sale::new();
        sale.add_line(line("A", 1, 1000)).unwrap();

        assert!(sale.complete_finalize().is_err());
        assert!(sale.cancel_finalize().is_err());
        assert!(sale.is_open());
    }
}
