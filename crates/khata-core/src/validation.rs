//! # Validation Module
//!
//! Input validation utilities for Khata.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (khata-server)                                  │
//! │  └── Type validation (JSON deserialization)                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Field rules (names, quantities, prices, rates)                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Engine services (khata-db)                                   │
//! │  └── Rules that need state (stock level, unit, ownership)              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  └── NOT NULL / UNIQUE / CHECK / foreign keys                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use khata_core::quantity::Quantity;
//! use khata_core::validation::{validate_name, validate_item_quantity};
//!
//! validate_name("name", "Basmati Rice").unwrap();
//! validate_item_quantity(Quantity::from_milli(1500)).unwrap();
//! ```

use crate::error::ValidationError;
use crate::quantity::Quantity;
use crate::{MAX_AMOUNT_CENTS, MAX_INVOICE_ITEMS, MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted display name (products, customers).
pub const MAX_NAME_LEN: usize = 200;

/// Longest accepted free-text note or reason.
pub const MAX_NOTES_LEN: usize = 1000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most [`MAX_NAME_LEN`] characters
///
/// ## Returns
/// The trimmed name.
///
/// ## Example
/// ```rust
/// use khata_core::validation::validate_name;
///
/// assert_eq!(validate_name("name", "  Ravi Traders ").unwrap(), "Ravi Traders");
/// assert!(validate_name("name", "   ").is_err());
/// ```
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

/// Validates optional free text (notes, reasons, addresses).
///
/// Blank input collapses to `None`.
pub fn validate_optional_text(field: &str, text: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    if text.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTES_LEN,
        });
    }

    Ok(Some(text.to_string()))
}

/// Validates a phone number: digits plus an optional leading `+`,
/// spaces and hyphens allowed.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = phone
        .chars()
        .enumerate()
        .all(|(i, c)| c.is_ascii_digit() || c == ' ' || c == '-' || (i == 0 && c == '+'));

    if !allowed || !(7..=15).contains(&digits) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain 7 to 15 digits".to_string(),
        });
    }

    Ok(())
}

/// Minimal email shape check: `local@domain.tld`.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
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
            reason: "must look like name@example.com".to_string(),
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns all/default results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an invoice line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_ITEM_QUANTITY`] whole units
///
/// Granularity against the product's minimum increment is checked by the
/// stock rules, which know the product.
pub fn validate_item_quantity(qty: Quantity) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > Quantity::from_whole(MAX_ITEM_QUANTITY) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in paise.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
/// - At most [`MAX_PRICE_CENTS`]
///
/// ## Example
/// ```rust
/// use khata_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());  // ₹10.99
/// assert!(validate_price_cents(0).is_ok());     // Free item
/// assert!(validate_price_cents(-100).is_err()); // Invalid
/// assert!(validate_price_cents(i64::MAX).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }

    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a customer payment amount in paise.
///
/// ## Rules
/// - Must be positive (> 0)
/// - At most [`MAX_AMOUNT_CENTS`]
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 1,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates the amount collected at invoice time.
pub fn validate_amount_paid(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: "amount_paid".to_string(),
        });
    }

    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "amount_paid".to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a figure a client claims for an invoice or line.
///
/// Claims are compared against computed totals, so only the magnitude is
/// bounded here.
pub fn validate_claimed_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents.unsigned_abs() > MAX_AMOUNT_CENTS as u64 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: -MAX_AMOUNT_CENTS,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "rate_bps".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines on an invoice.
///
/// ## Rules
/// - At least one line
/// - At most [`MAX_INVOICE_ITEMS`]
pub fn validate_invoice_size(items: usize) -> ValidationResult<()> {
    if items == 0 {
        return Err(ValidationError::required("items"));
    }

    if items > MAX_INVOICE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_INVOICE_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates an owner or actor identifier supplied by the caller.
///
/// These come from the upstream identity gateway and are opaque, so only
/// presence and length are checked.
pub fn validate_principal(field: &str, id: &str) -> ValidationResult<String> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::required(field));
    }

    if id.len() > 128 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 128,
        });
    }

    Ok(id.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================
