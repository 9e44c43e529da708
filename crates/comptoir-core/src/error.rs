//! # Error Types
//!
//! Domain-specific error types for comptoir-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  comptoir-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  comptoir-db errors                                                    │
//! │  └── DbError          - Database failures (wraps CoreError)            │
//! │                                                                         │
//! │  server errors                                                         │
//! │  └── ApiError         - What the client sees (JSON + status code)      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Not enough stock to take `requested` units out.
    ///
    /// ## When This Occurs
    /// - Selling more than the shelf holds
    /// - Cancelling a received supply order whose goods were already sold
    #[error("Insufficient stock for {reference}: available {available}, requested {requested}")]
    InsufficientStock {
        reference: String,
        available: i64,
        requested: i64,
    },

    /// A movement would leave the counter below zero.
    #[error("Stock of {reference} cannot go below zero (current {current}, change {delta})")]
    NegativeStock {
        reference: String,
        current: i64,
        delta: i64,
    },

    /// A payment would bring the paid amount above the order total.
    #[error("Payment of {amount} exceeds the remaining balance of {remaining}")]
    Overpayment { amount: String, remaining: String },

    /// Initial paid amount outside `0..=total`.
    #[error("Paid amount {paid} must be between 0 and the total {total}")]
    InvalidPaidAmount { paid: String, total: String },

    /// Cash tendered does not cover the sale.
    #[error("Amount tendered {tendered} does not cover the total {total}")]
    InsufficientTender { tendered: String, total: String },

    /// Discount larger than the subtotal.
    #[error("Discount {discount} exceeds the subtotal {subtotal}")]
    DiscountTooLarge { discount: String, subtotal: String },

    /// Sale or supply order without lines.
    #[error("{document} must contain at least one line")]
    EmptyDocument { document: String },

    /// Too many lines on a single document.
    #[error("{document} cannot have more than {max} lines")]
    TooManyLines { document: String, max: usize },

    /// A return linked to a sale asks for more units of a product than the
    /// sale still has to give back. `sold` is 0 when the product is not on
    /// the sale at all.
    #[error("Return of {requested} for product {product_id} exceeds sale {sale_id}: sold {sold}, already returned {returned}")]
    ReturnExceedsSale {
        sale_id: String,
        product_id: String,
        sold: i64,
        returned: i64,
        requested: i64,
    },

    /// Supply order already received.
    #[error("Supply order {0} has already been received")]
    AlreadyReceived(String),

    /// The operation would leave the shop without an active administrator.
    #[error("At least one active administrator must remain")]
    LastAdministrator,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid e-mail).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate product reference).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::InvalidFormat`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

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
        let err = CoreError::InsufficientStock {
            reference: "CAFE-250".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for CAFE-250: available 3, requested 5"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("reference").to_string(),
            "reference is required"
        );

        let err = ValidationError::TooShort {
            field: "password".to_string(),
            min: 8,
        };
        assert_eq!(err.to_string(), "password must be at least 8 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("name").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
