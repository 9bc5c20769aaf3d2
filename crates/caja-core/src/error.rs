//! # Error Types
//!
//! Domain-specific error types for caja-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  caja-core errors (this file)                                          │
//! │  ├── CoreError        - Sale state and permission failures             │
//! │  └── ValidationError  - Bad input (quantity, price, discount)          │
//! │                                                                         │
//! │  caja-core::license                                                    │
//! │  └── LicenseError     - Key decoding failures                          │
//! │                                                                         │
//! │  caja-db / caja-sync                                                   │
//! │  └── DbError, SyncError                                                │
//! │                                                                         │
//! │  caja-terminal                                                         │
//! │  └── AppError         - Categorised for the presentation layer         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → AppError → presentation           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the sale aggregate and role checks.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No line for the product exists in the sale.
    #[error("Product {product_id} is not in sale {sale_id}")]
    LineNotFound { sale_id: String, product_id: String },

    /// The product is already on the sale with a different unit price or
    /// tax rate, so the quantities cannot be merged into one line.
    #[error("Product {product_id} is already in the sale at a different price or tax rate")]
    LineTermsMismatch { product_id: String },

    /// The sale is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Editing lines while the sale is being finalized
    /// - Adding or editing lines after finalization
    /// - Finalizing the same sale twice
    #[error("Sale {sale_id} is {current_status}, cannot perform operation")]
    InvalidSaleStatus {
        sale_id: String,
        current_status: String,
    },

    /// Finalization attempted with no lines.
    #[error("Sale {sale_id} has no lines")]
    EmptySale { sale_id: String },

    /// Sale has exceeded the maximum number of lines.
    #[error("Sale cannot have more than {max} lines")]
    SaleTooLarge { max: usize },

    /// Line quantity exceeds the maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: String, max: i64 },

    /// The session's role lacks a capability.
    #[error("Role {role} is not allowed to {permission}")]
    PermissionDenied { role: String, permission: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// True for errors caused by user input rather than sale state.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::Validation(_)
                | CoreError::QuantityTooLarge { .. }
                | CoreError::SaleTooLarge { .. }
                | CoreError::EmptySale { .. }
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, surfaced immediately to the operator.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid URL).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidSaleStatus {
            sale_id: "s-1".to_string(),
            current_status: "finalized".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Sale s-1 is finalized, cannot perform operation"
        );

        let err = CoreError::PermissionDenied {
            role: "cashier".to_string(),
            permission: "sales.void".to_string(),
        };
        assert_eq!(err.to_string(), "Role cashier is not allowed to sales.void");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("product_id").to_string(),
            "product_id is required"
        );

        let err = ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: 3000,
        };
        assert_eq!(err.to_string(), "discount must be between 0 and 3000");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::must_be_positive("quantity").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert!(core_err.is_validation());
    }
}
