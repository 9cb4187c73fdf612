//! # Invoice Arithmetic
//!
//! Line pricing, totals, the 0.01 consistency checks and due computation.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LineInput ──► price_line(product) ──► InvoiceItem                      │
//! │    qty, unit       │                     subtotal = price × qty         │
//! │    price?          ├── unit == product.unit?   else UnitMismatch        │
//! │    claimed?        └── claimed ≈ subtotal?     else InvoiceInconsistent │
//! │                                                                         │
//! │  [InvoiceItem] ──► InvoiceTotals::compute(rate)                         │
//! │                      subtotal = Σ item.subtotal                         │
//! │                      tax      = subtotal × rate (rounded)               │
//! │                      total    = subtotal + tax                          │
//! │                                                                         │
//! │  ClaimedTotals ──► verify_claimed()   each claim within 0.01            │
//! │                                                                         │
//! │  compute_due(method, total, paid) = max(total − paid, 0) if Due else 0  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::payment::PaymentMethod;
use crate::quantity::Quantity;
use crate::types::{Invoice, InvoiceItem, Product, TaxRate, UnitOfMeasure};
use crate::validation::{validate_claimed_cents, validate_item_quantity, validate_price_cents};
use crate::ValidationError;

// =============================================================================
// Line Input
// =============================================================================

/// One requested invoice line, before pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineInput {
    pub product_id: String,
    pub quantity: Quantity,
    /// Defaults to the product's unit when omitted.
    #[serde(default)]
    pub unit: Option<UnitOfMeasure>,
    /// Overrides the product's current price.
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
    /// Subtotal computed by the client, checked against ours.
    #[serde(default)]
    pub subtotal_cents: Option<i64>,
}

/// Prices one line against its product.
///
/// ## Errors
/// - `ValidationError` for a non-positive/oversized quantity, a price outside
///   `0..=MAX_PRICE_CENTS` or a claimed subtotal outside the money range
/// - `UnitMismatch` when the requested unit differs from the product's
/// - `InvoiceInconsistent` when the client's claimed subtotal is off by more
///   than 0.01
///
/// ## Example
/// ```rust,ignore
/// let item = price_line(&rice, &LineInput { quantity: 1.5 kg, .. })?;
/// assert_eq!(item.subtotal_cents, 7500);
/// ```
pub fn price_line(product: &Product, line: &LineInput) -> CoreResult<InvoiceItem> {
    validate_item_quantity(line.quantity)?;

    let unit = line.unit.unwrap_or(product.unit);
    if unit != product.unit {
        return Err(CoreError::UnitMismatch {
            product: product.name.clone(),
            expected: product.unit,
            actual: unit,
        });
    }

    let unit_price_cents = line.unit_price_cents.unwrap_or(product.price_cents);
    validate_price_cents(unit_price_cents)?;

    let subtotal = Money::from_cents(unit_price_cents)
        .multiply_quantity(line.quantity)
        .ok_or_else(|| ValidationError::overflow("subtotal"))?;

    if let Some(claimed) = line.subtotal_cents {
        validate_claimed_cents("subtotal", claimed)?;
        if !subtotal.approx_eq(Money::from_cents(claimed)) {
            return Err(CoreError::inconsistent(format!(
                "line for {} claims subtotal {} but {} × {} = {}",
                product.name,
                Money::from_cents(claimed),
                Money::from_cents(unit_price_cents),
                line.quantity,
                subtotal
            )));
        }
    }

    Ok(InvoiceItem {
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        quantity: line.quantity,
        unit,
        unit_price_cents,
        subtotal_cents: subtotal.cents(),
    })
}

// =============================================================================
// Totals
// =============================================================================

/// Computed invoice totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceTotals {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

impl InvoiceTotals {
    /// Sums the lines and applies the tax rate to the subtotal.
    ///
    /// Fails with `ValidationError` instead of wrapping when a figure leaves
    /// the `i64` range.
    pub fn compute(items: &[InvoiceItem], rate: TaxRate) -> CoreResult<Self> {
        let subtotal = Money::checked_sum(items.iter().map(InvoiceItem::subtotal))
            .ok_or_else(|| ValidationError::overflow("subtotal"))?;
        let tax = subtotal
            .calculate_tax(rate)
            .ok_or_else(|| ValidationError::overflow("tax"))?;
        let total = subtotal
            .checked_add(tax)
            .ok_or_else(|| ValidationError::overflow("total"))?;

        Ok(InvoiceTotals {
            subtotal_cents: subtotal.cents(),
            tax_cents: tax.cents(),
            total_cents: total.cents(),
        })
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Totals a client claims for the invoice. Every field is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClaimedTotals {
    #[serde(default)]
    pub subtotal_cents: Option<i64>,
    #[serde(default)]
    pub tax_cents: Option<i64>,
    #[serde(default)]
    pub total_cents: Option<i64>,
}

/// Checks each claimed figure against the computed one.
pub fn verify_claimed(computed: &InvoiceTotals, claimed: &ClaimedTotals) -> CoreResult<()> {
    let checks = [
        ("subtotal", claimed.subtotal_cents, computed.subtotal_cents),
        ("tax", claimed.tax_cents, computed.tax_cents),
        ("total", claimed.total_cents, computed.total_cents),
    ];

    for (field, claim, actual) in checks {
        if let Some(claim) = claim {
            validate_claimed_cents(field, claim)?;
            let claim = Money::from_cents(claim);
            let actual = Money::from_cents(actual);
            if !claim.approx_eq(actual) {
                return Err(CoreError::inconsistent(format!(
                    "{} claimed {} but computed {}",
                    field, claim, actual
                )));
            }
        }
    }

    Ok(())
}

/// Verifies a stored invoice's arithmetic.
///
/// `|subtotal + tax − total| ≤ 0.01` and `|Σ item.subtotal − subtotal| ≤ 0.01`.
pub fn verify_invoice(invoice: &Invoice) -> CoreResult<()> {
    let subtotal = Money::from_cents(invoice.subtotal_cents);
    let tax = Money::from_cents(invoice.tax_cents);
    let total = invoice.total();

    let summed = subtotal
        .checked_add(tax)
        .ok_or_else(|| ValidationError::overflow("total"))?;
    if !summed.approx_eq(total) {
        return Err(CoreError::inconsistent(format!(
            "{}: subtotal {} + tax {} != total {}",
            invoice.invoice_number, subtotal, tax, total
        )));
    }

    let items = Money::checked_sum(invoice.items.iter().map(InvoiceItem::subtotal))
        .ok_or_else(|| ValidationError::overflow("subtotal"))?;
    if !items.approx_eq(subtotal) {
        return Err(CoreError::inconsistent(format!(
            "{}: line subtotals {} != subtotal {}",
            invoice.invoice_number, items, subtotal
        )));
    }

    Ok(())
}

// =============================================================================
// Due Amount
// =============================================================================

/// Amount the customer still owes for an invoice.
///
/// Zero unless the method is `Due`; then `total − amount_paid`, floored at 0.
///
/// ## Example
/// ```rust
/// use khata_core::invoice::compute_due;
/// use khata_core::money::Money;
/// use khata_core::payment::PaymentMethod;
///
/// let total = Money::from_cents(50_000);
/// assert_eq!(compute_due(PaymentMethod::Due, total, Money::from_cents(10_000)).cents(), 40_000);
/// assert_eq!(compute_due(PaymentMethod::Due, total, Money::from_cents(60_000)).cents(), 0);
/// assert_eq!(compute_due(PaymentMethod::Cash, total, Money::zero()).cents(), 0);
/// ```
pub fn compute_due(method: PaymentMethod, total: Money, amount_paid: Money) -> Money {
    if !method.is_due() {
        return Money::zero();
    }

    match total.checked_sub(amount_paid) {
        Some(due) if due.is_positive() => due,
        _ => Money::zero(),
    }
}

/// The purchase this invoice should have on its customer's ledger.
///
/// Some only when a customer is attached, the status commits stock, the
/// method is `Due` and something is owed.
pub fn ledger_charge(invoice: &Invoice) -> Option<(String, Money)> {
    let customer = invoice.customer.as_ref()?;
    let due = invoice.due_amount();

    if invoice.status.commits_stock() && invoice.payment_method.is_due() && due.is_positive() {
        Some((customer.id.clone(), due))
    } else {
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
