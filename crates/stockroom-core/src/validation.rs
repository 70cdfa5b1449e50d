//! # Validation Module
//!
//! Field validators shared by the API, the importer and the repositories.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Dashboard form checks (immediate feedback)                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (API handlers, import rows)                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite NOT NULL / UNIQUE / CHECK constraints                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```rust
//! use stockroom_core::validation::{validate_sku, validate_quantity};
//!
//! assert!(validate_sku("COKE-330").is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::{MAX_ITEM_QUANTITY, MAX_PRICE_CENTS, MAX_RECEIVED_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Non-empty after trimming.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

/// Validates a SKU.
///
/// ## Rules
/// - 1 to 50 characters
/// - Letters, digits, `-`, `_` and `.` only
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    validate_required("sku", sku)?;

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, underscores and dots"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (products, suppliers, categories, taxes).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    validate_required(field, name)?;

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Loose email check: one `@`, something on both sides, a dot in the domain.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    validate_required("email", email)?;

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must be a valid email address".to_string(),
        });
    }

    Ok(())
}

/// Digits with optional `+`, spaces, dashes and parentheses; 6 to 20 digits.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    validate_required("phone", phone)?;

    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
    let digits = phone.chars().filter(char::is_ascii_digit).count();

    if !allowed || !(6..=20).contains(&digits) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must be a phone number".to_string(),
        });
    }

    Ok(())
}

/// Tax and permission codes: letters, digits and underscores.
pub fn validate_code(field: &str, code: &str) -> ValidationResult<()> {
    let code = code.trim();

    validate_required(field, code)?;

    if code.len() > 30 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 30,
        });
    }

    if !code.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers and underscores".to_string(),
        });
    }

    Ok(())
}

/// Search text; may be empty, trimmed, at most 100 characters.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// A line quantity: 1 to MAX_ITEM_QUANTITY.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Money amount in minor units: 0 to MAX_PRICE_CENTS.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Stock counts and reorder levels; zero allowed.
pub fn validate_stock_level(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Quantity received into stock: 1 to MAX_RECEIVED_QUANTITY.
pub fn validate_received_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantityReceived".to_string(),
        });
    }
    if qty > MAX_RECEIVED_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantityReceived".to_string(),
            min: 1,
            max: MAX_RECEIVED_QUANTITY,
        });
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    validate_required("id", id)?;

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
