//! # Validation Module
//!
//! Input validation for checkout operations and terminal identity.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Presentation                                                 │
//! │  └── Immediate operator feedback                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Sale aggregate (Rust)                                        │
//! │  └── THIS MODULE: quantity, price, discount, rate bounds               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  └── NOT NULL / CHECK / foreign key constraints                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pricing engine itself never fails: it clamps. Validation happens
//! here, at the operation that receives the input.

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Quantity, Rate};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product reference carried on a sale line.
///
/// ```rust
/// use caja_core::validation::validate_product_ref;
///
/// assert!(validate_product_ref("P-001").is_ok());
/// assert!(validate_product_ref("   ").is_err());
/// ```
pub fn validate_product_ref(product_id: &str) -> ValidationResult<()> {
    let product_id = product_id.trim();

    if product_id.is_empty() {
        return Err(ValidationError::required("product_id"));
    }

    if product_id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "product_id".to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates the display name frozen onto a sale line.
pub fn validate_line_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a terminal identifier.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - Letters, numbers, hyphens and underscores only
///
/// ```rust
/// use caja_core::validation::validate_terminal_id;
///
/// assert!(validate_terminal_id("caja-01").is_ok());
/// assert!(validate_terminal_id("caja 01").is_err());
/// ```
pub fn validate_terminal_id(terminal_id: &str) -> ValidationResult<()> {
    if terminal_id.trim().is_empty() {
        return Err(ValidationError::required("terminal_id"));
    }

    if terminal_id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "terminal_id".to_string(),
            max: 64,
        });
    }

    if !terminal_id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "terminal_id".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity: must be greater than zero.
///
/// The per-line maximum is enforced by the sale aggregate, which knows
/// the merged quantity.
pub fn validate_quantity(quantity: Quantity) -> ValidationResult<()> {
    if !quantity.is_positive() {
        return Err(ValidationError::must_be_positive("quantity"));
    }
    Ok(())
}

/// Validates a unit price: must be greater than zero.
pub fn validate_unit_price(unit_price: Money) -> ValidationResult<()> {
    if !unit_price.is_positive() {
        return Err(ValidationError::must_be_positive("unit_price"));
    }
    Ok(())
}

/// Validates a fixed discount against the line's gross amount.
///
/// ## User Workflow
/// ```text
/// Line: 3 × $10.00 = $30.00 gross
///      │
///      ▼
/// Operator enters discount $5.00
///      │
///      ▼
/// validate_discount($5.00, $30.00) ← THIS FUNCTION
///      │
///      ├── discount < 0?      → OutOfRange
///      ├── discount > gross?  → OutOfRange
///      └── OK → line re-priced
/// ```
pub fn validate_discount(discount: Money, gross: Money) -> ValidationResult<()> {
    if discount.is_negative() || discount > gross {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: gross.cents().max(0),
        });
    }
    Ok(())
}

/// Validates a percentage rate (tax, discount, commission): 0% to 100%.
///
/// ```rust
/// use caja_core::types::Rate;
/// use caja_core::validation::validate_percent_rate;
///
/// assert!(validate_percent_rate("tax_rate", Rate::from_percent(16)).is_ok());
/// assert!(validate_percent_rate("tax_rate", Rate::from_bps(10_001)).is_err());
/// ```
pub fn validate_percent_rate(field: &str, rate: Rate) -> ValidationResult<()> {
    if rate > Rate::FULL {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: Rate::BPS_PER_WHOLE as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_ref() {
        assert!(validate_product_ref("SKU-1").is_ok());
        assert!(validate_product_ref("").is_err());
        assert!(validate_product_ref(&"A".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_terminal_id() {
        assert!(validate_terminal_id("terminal_2").is_ok());
        assert!(validate_terminal_id("").is_err());
        assert!(validate_terminal_id("caja/2").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(Quantity::from_milli(1)).is_ok());
        assert!(validate_quantity(Quantity::zero()).is_err());
        assert!(validate_quantity(Quantity::from_units(-1)).is_err());
    }

    #[test]
    fn test_validate_unit_price() {
        assert!(validate_unit_price(Money::from_cents(1)).is_ok());
        assert!(validate_unit_price(Money::zero()).is_err());
    }

    #[test]
    fn test_validate_discount_bounds() {
        let gross = Money::from_cents(3000);
        assert!(validate_discount(Money::zero(), gross).is_ok());
        assert!(validate_discount(gross, gross).is_ok());
        assert!(validate_discount(Money::from_cents(3001), gross).is_err());
        assert!(validate_discount(Money::from_cents(-1), gross).is_err());
    }

    #[test]
    fn test_validate_percent_rate() {
        assert!(validate_percent_rate("discount", Rate::FULL).is_ok());
        assert!(validate_percent_rate("discount", Rate::zero()).is_ok());
        assert!(validate_percent_rate("discount", Rate::from_percent(101)).is_err());
    }
}
