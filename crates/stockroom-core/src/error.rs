//! # Error Types
//!
//! Domain-specific error types for stockroom-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stockroom-core (this file)                                            │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockroom-db                                                          │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  apps/api                                                              │
//! │  └── ApiError         - JSON body + HTTP status                        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Dashboard    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An order was submitted without lines.
    #[error("No items in the order.")]
    EmptyOrder,

    /// Checkout on a missing or empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Order or cart has exceeded the maximum line count.
    #[error("Order cannot have more than {max} items")]
    TooManyLines { max: usize },

    /// A status change that the lifecycle does not allow.
    ///
    /// ## When This Occurs
    /// - Moving a cancelled order back to paid
    /// - Receiving a purchase order twice
    #[error("Cannot move {entity} from {from} to {to}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },

    /// Two active tax rules would cover the same category.
    ///
    /// Only raised when tax precedence is `exclusive`.
    #[error("Category '{category}' is already covered by active tax {code}")]
    OverlappingTax { code: String, category: String },

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
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

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed email).
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
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
