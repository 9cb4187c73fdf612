//! # Error Types
//!
//! Domain-specific error types for khata-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  khata-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - Machine-readable classification                │
//! │                                                                         │
//! │  khata-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── ServiceError     - Engine operation failures (Core + Db + abort)  │
//! │                                                                         │
//! │  khata-server errors                                                   │
//! │  └── ApiError         - What HTTP clients see (code + message)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → ApiError           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::quantity::Quantity;
use crate::types::UnitOfMeasure;

// =============================================================================
// Error Kind
// =============================================================================

/// Machine-readable error classification shared by every layer.
///
/// Every failure surfaced to a client maps to exactly one kind plus a
/// human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Missing or malformed input (negative quantity, empty name, ...).
    ValidationError,
    /// Item unit differs from the product's configured unit.
    UnitMismatch,
    /// The change would drive a product's stock below zero.
    InsufficientStock,
    /// Subtotal/tax/total arithmetic disagrees beyond 0.01.
    InvoiceInconsistent,
    /// Invoice, product or customer missing or not owned by the caller.
    NotFound,
    /// The enclosing transaction failed or timed out; retry the whole operation.
    OperationAborted,
    /// Unexpected storage failure.
    Internal,
}

impl ErrorKind {
    /// Wire representation of the kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::UnitMismatch => "UNIT_MISMATCH",
            ErrorKind::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorKind::InvoiceInconsistent => "INVOICE_INCONSISTENT",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::OperationAborted => "OPERATION_ABORTED",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. They abort the
/// enclosing unit of work and travel to the caller verbatim.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invoice, product or customer cannot be found for this owner.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Item unit doesn't match the product's configured unit.
    ///
    /// ## When This Occurs
    /// - Selling "kg" of a product stocked in "piece"
    /// - Adjusting stock in "ml" for a product stocked in "liter"
    #[error("Unit mismatch for {product}: product is stocked in {expected}, got {actual}")]
    UnitMismatch {
        product: String,
        expected: UnitOfMeasure,
        actual: UnitOfMeasure,
    },

    /// Insufficient stock to apply a change.
    ///
    /// ## User Workflow
    /// ```text
    /// Create invoice (qty: 5, status: final)
    ///      │
    ///      ▼
    /// Check stock: available=2
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Rice", available: 2, requested: 5 }
    ///      │
    ///      ▼
    /// Whole invoice rolled back, nothing persisted
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: Quantity,
        requested: Quantity,
    },

    /// Invoice arithmetic does not add up within the 0.01 tolerance.
    #[error("Invoice inconsistent: {reason}")]
    InvoiceInconsistent { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvoiceInconsistent error.
    pub fn inconsistent(reason: impl Into<String>) -> Self {
        CoreError::InvoiceInconsistent {
            reason: reason.into(),
        }
    }

    /// Machine-readable classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::UnitMismatch { .. } => ErrorKind::UnitMismatch,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::InvoiceInconsistent { .. } => ErrorKind::InvoiceInconsistent,
            CoreError::Validation(_) => ErrorKind::ValidationError,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
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

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Quantity is not a multiple of the product's minimum increment.
    #[error("{field} must be a multiple of {increment}")]
    Granularity { field: String, increment: Quantity },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Arithmetic on the value would leave the representable money range.
    #[error("{field} exceeds the supported range")]
    Overflow { field: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Creates a Required error.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates an Overflow error.
    pub fn overflow(field: impl Into<String>) -> Self {
        ValidationError::Overflow {
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
