//! # Domain Types
//!
//! Core domain types used throughout Khata.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────────┐                        │
//! │  │    Product      │◄──│  StockMovementEntry  │  append-only           │
//! │  │  current_stock  │   │  previous → new      │  audit log             │
//! │  └────────▲────────┘   └──────────────────────┘                        │
//! │           │ weak ref                                                    │
//! │  ┌────────┴────────┐                                                    │
//! │  │    Invoice      │  owns Vec<InvoiceItem> (embedded)                  │
//! │  │  status, totals │                                                    │
//! │  └────────┬────────┘                                                    │
//! │           │ weak ref (id + name snapshot)                               │
//! │  ┌────────▼────────┐   ┌──────────────────────┐                        │
//! │  │    Customer     │◄──│  LedgerTransaction   │  append-only           │
//! │  │  amount_due     │   │  before → after      │  balance log           │
//! │  └─────────────────┘   └──────────────────────┘                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every record carries an `owner_id`: the business account it belongs to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::payment::{PaymentMethod, PaymentMode};
use crate::quantity::Quantity;

// =============================================================================
// Tax
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01%, so 1800 bps = 18% GST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// Tax configuration supplied by the settings provider for one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TaxSettings {
    pub enabled: bool,
    pub rate_bps: u32,
}

impl TaxSettings {
    /// The rate invoices should use: zero when tax is disabled.
    pub fn effective_rate(&self) -> TaxRate {
        if self.enabled {
            TaxRate::from_bps(self.rate_bps)
        } else {
            TaxRate::zero()
        }
    }
}

// =============================================================================
// Unit of Measure
// =============================================================================

/// The unit a product is stocked and sold in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum UnitOfMeasure {
    #[default]
    Piece,
    Kg,
    Gram,
    Liter,
    Ml,
    Packet,
    Box,
    Dozen,
}

impl UnitOfMeasure {
    pub const ALL: [UnitOfMeasure; 8] = [
        UnitOfMeasure::Piece,
        UnitOfMeasure::Kg,
        UnitOfMeasure::Gram,
        UnitOfMeasure::Liter,
        UnitOfMeasure::Ml,
        UnitOfMeasure::Packet,
        UnitOfMeasure::Box,
        UnitOfMeasure::Dozen,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            UnitOfMeasure::Piece => "piece",
            UnitOfMeasure::Kg => "kg",
            UnitOfMeasure::Gram => "gram",
            UnitOfMeasure::Liter => "liter",
            UnitOfMeasure::Ml => "ml",
            UnitOfMeasure::Packet => "packet",
            UnitOfMeasure::Box => "box",
            UnitOfMeasure::Dozen => "dozen",
        }
    }

    /// Smallest quantity step used when a product doesn't configure one.
    ///
    /// Countable units move in whole units, kg/liter in grams/millilitres.
    pub const fn default_increment(&self) -> Quantity {
        match self {
            UnitOfMeasure::Kg | UnitOfMeasure::Liter => Quantity::from_milli(1),
            _ => Quantity::from_whole(1),
        }
    }
}

impl fmt::Display for UnitOfMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitOfMeasure {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        UnitOfMeasure::ALL
            .into_iter()
            .find(|u| u.as_str() == needle)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "unit".to_string(),
                allowed: UnitOfMeasure::ALL
                    .iter()
                    .map(|u| u.as_str().to_string())
                    .collect(),
            })
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product that can be invoiced.
///
/// Stock is only ever changed through the stock ledger, which writes a
/// [`StockMovementEntry`] for every change.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub category_id: Option<String>,
    /// Price per unit in paise.
    pub price_cents: i64,
    pub unit: UnitOfMeasure,
    /// Current stock level (never negative).
    pub current_stock: Quantity,
    /// When false, stock is never checked or mutated.
    pub is_stock_required: bool,
    /// Smallest allowed quantity step.
    pub min_quantity: Quantity,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks if a quantity can be taken out of stock right now.
    pub fn can_sell(&self, quantity: Quantity) -> bool {
        !self.is_stock_required || self.current_stock >= quantity
    }
}

// =============================================================================
// Stock Movements
// =============================================================================

/// Why a product's stock changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum StockMovementKind {
    /// Opening stock when the product was created.
    Initial,
    /// Manual restock / purchase order received.
    Addition,
    /// Manual write-off (damage, expiry, theft).
    Removal,
    /// Sold on a non-draft invoice.
    Sale,
    /// Put back because an invoice went back to draft or was deleted.
    Return,
    /// Reversal while an invoice is being edited.
    Adjustment,
}

impl StockMovementKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StockMovementKind::Initial => "initial",
            StockMovementKind::Addition => "addition",
            StockMovementKind::Removal => "removal",
            StockMovementKind::Sale => "sale",
            StockMovementKind::Return => "return",
            StockMovementKind::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for StockMovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit record of one stock change.
///
/// Invariant: `new_stock == previous_stock + quantity`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovementEntry {
    pub id: String,
    pub owner_id: String,
    pub product_id: String,
    /// Signed adjustment (negative for sales and removals).
    pub quantity: Quantity,
    pub unit: UnitOfMeasure,
    pub previous_stock: Quantity,
    pub new_stock: Quantity,
    pub kind: StockMovementKind,
    pub description: String,
    /// Invoice number or purchase order.
    pub reference: Option<String>,
    pub invoice_id: Option<String>,
    pub actor: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Customer
// =============================================================================

/// A customer with a running balance.
///
/// `amount_due_cents` is signed: positive means the customer owes money,
/// negative means they hold an advance, zero means settled.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub amount_due_cents: i64,
    pub total_purchases_cents: i64,
    pub total_payments_cents: i64,
    #[ts(as = "Option<String>")]
    pub last_transaction_date: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    #[inline]
    pub fn amount_due(&self) -> Money {
        Money::from_cents(self.amount_due_cents)
    }

    /// True when the business owes the customer (overpayment).
    #[inline]
    pub fn has_advance(&self) -> bool {
        self.amount_due_cents < 0
    }

    /// Snapshot used when the customer is attached to an invoice.
    pub fn as_ref_snapshot(&self) -> CustomerRef {
        CustomerRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

// =============================================================================
// Ledger Transactions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum LedgerTransactionKind {
    /// Customer bought on credit: balance goes up.
    Purchase,
    /// Customer paid: balance goes down.
    Payment,
}

impl LedgerTransactionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LedgerTransactionKind::Purchase => "purchase",
            LedgerTransactionKind::Payment => "payment",
        }
    }
}

/// Immutable record of one balance change with before/after snapshots.
///
/// Only reconciliation rewrites the snapshots, and only as part of a full
/// chronological replay.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LedgerTransaction {
    pub id: String,
    pub owner_id: String,
    pub customer_id: String,
    pub kind: LedgerTransactionKind,
    /// Always positive; the kind gives the direction.
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub transaction_date: DateTime<Utc>,
    pub invoice_id: Option<String>,
    pub invoice_number: Option<String>,
    pub balance_before_cents: i64,
    pub balance_after_cents: i64,
    pub payment_mode: Option<PaymentMode>,
    pub description: String,
    pub actor: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// Invoice lifecycle status.
///
/// There is no enforced ordering: any status may move to any other.
/// Every non-draft status has committed its stock effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Final,
    Paid,
}

impl InvoiceStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Final => "final",
            InvoiceStatus::Paid => "paid",
        }
    }

    /// Whether invoices in this status hold stock out of inventory.
    #[inline]
    pub const fn commits_stock(&self) -> bool {
        !matches!(self, InvoiceStatus::Draft)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(InvoiceStatus::Draft),
            "final" => Ok(InvoiceStatus::Final),
            "paid" => Ok(InvoiceStatus::Paid),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["draft".into(), "final".into(), "paid".into()],
            }),
        }
    }
}

/// Denormalized customer reference stored on an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerRef {
    pub id: String,
    /// Name at the time the invoice was written.
    pub name: String,
}

/// A line on an invoice. Owned by the invoice, no identity of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceItem {
    pub product_id: String,
    /// Product name at the time of sale (frozen).
    pub product_name: String,
    pub quantity: Quantity,
    pub unit: UnitOfMeasure,
    pub unit_price_cents: i64,
    /// unit price × quantity, rounded to the paisa.
    pub subtotal_cents: i64,
}

impl InvoiceItem {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// An invoice document.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub owner_id: String,
    /// Human-readable number, unique per owner (`INV-000042`).
    pub invoice_number: String,
    #[ts(as = "String")]
    pub invoice_date: DateTime<Utc>,
    /// None for walk-in customers.
    pub customer: Option<CustomerRef>,
    pub items: Vec<InvoiceItem>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub status: InvoiceStatus,
    pub payment_method: PaymentMethod,
    /// Collected at invoice time (only meaningful for `due`).
    pub amount_paid_cents: i64,
    /// Owed by the customer; zero unless the method is `due`.
    pub due_amount_cents: i64,
    pub notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn due_amount(&self) -> Money {
        Money::from_cents(self.due_amount_cents)
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer.as_ref().map(|c| c.id.as_str())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_percentage() {
        let rate = TaxRate::from_percentage(18.0);
        assert_eq!(rate.bps(), 1800);
        assert!((rate.percentage() - 18.0).abs() < 0.001);
    }

    #[test]
    fn test_disabled_tax_has_zero_rate() {
        let settings = TaxSettings {
            enabled: false,
            rate_bps: 1800,
        };
        assert!(settings.effective_rate().is_zero());

        let settings = TaxSettings {
            enabled: true,
            rate_bps: 1800,
        };
        assert_eq!(settings.effective_rate().bps(), 1800);
    }

    #[test]
    fn test_unit_parse_and_increment() {
        assert_eq!("KG".parse::<UnitOfMeasure>().unwrap(), UnitOfMeasure::Kg);
        assert!("bushel".parse::<UnitOfMeasure>().is_err());
        assert_eq!(UnitOfMeasure::Kg.default_increment().milli(), 1);
        assert_eq!(UnitOfMeasure::Dozen.default_increment(), Quantity::from_whole(1));
    }

    #[test]
    fn test_status_commits_stock() {
        assert!(!InvoiceStatus::Draft.commits_stock());
        assert!(InvoiceStatus::Final.commits_stock());
        assert!(InvoiceStatus::Paid.commits_stock());
        assert_eq!(InvoiceStatus::default(), InvoiceStatus::Draft);
        assert_eq!("PAID".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Paid);
    }
}
