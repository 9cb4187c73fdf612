//! # khata-core: Pure Business Logic for Khata
//!
//! This crate is the **heart** of the invoice & ledger engine. It holds the
//! rules that keep invoices, stock levels and customer balances consistent,
//! written as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Khata Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 khata-server (HTTP + JSON)                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │         khata-db (SQLite + transaction engine services)         │   │
//! │  │   InvoiceManager ──► StockLedger + CustomerLedger               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ calls pure rules                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ khata-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌───────┐ ┌──────────┐  │   │
//! │  │   │  money  │ │ quantity │ │ invoice │ │ stock │ │  ledger  │  │   │
//! │  │   │  Money  │ │ Quantity │ │ totals  │ │ math  │ │  replay  │  │   │
//! │  │   └─────────┘ └──────────┘ └─────────┘ └───────┘ └──────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Invoice, Customer, ledger records)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`quantity`] - Quantity type in thousandths of a unit
//! - [`payment`] - Payment methods and the legacy compatibility mapping
//! - [`invoice`] - Line pricing, totals and the 0.01 consistency checks
//! - [`stock`] - Stock arithmetic and movement descriptions
//! - [`ledger`] - Running balance arithmetic and chronological replay
//! - [`receipt`] - Receipt artifact and its text renderer
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use khata_core::money::Money;
//! use khata_core::quantity::Quantity;
//!
//! // 1.5 kg at ₹50.00 per kg
//! let price = Money::from_cents(5000);
//! let line = price.multiply_quantity(Quantity::from_milli(1500)).unwrap();
//! assert_eq!(line.cents(), 7500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod invoice;
pub mod ledger;
pub mod money;
pub mod payment;
pub mod quantity;
pub mod receipt;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use payment::{LegacyPaymentMethod, PaymentMethod, PaymentMode};
pub use quantity::Quantity;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Absolute tolerance for monetary comparisons, in minor units (0.01).
pub const MONEY_TOLERANCE_CENTS: i64 = 1;

/// Maximum line items allowed on a single invoice.
pub const MAX_INVOICE_ITEMS: usize = 200;

/// Maximum quantity of a single line, in whole units.
///
/// Guards against typing 10000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 100_000;

/// Highest unit price a product or invoice line may carry, in paise (₹1 crore).
///
/// With [`MAX_ITEM_QUANTITY`] and [`MAX_INVOICE_ITEMS`] this keeps every
/// invoice total far inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Largest single amount accepted from a caller, in paise: payments,
/// amounts paid and claimed invoice totals.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000_000_000;

/// Prefix of human-readable invoice numbers (`INV-000042`).
pub const INVOICE_NUMBER_PREFIX: &str = "INV";

/// Formats an invoice number from its per-owner sequence value.
///
/// ```rust
/// assert_eq!(khata_core::format_invoice_number(42), "INV-000042");
/// ```
pub fn format_invoice_number(seq: i64) -> String {
    format!("{}-{:06}", INVOICE_NUMBER_PREFIX, seq)
}
