//! # Invoice Lifecycle Manager
//!
//! Owns invoice documents and keeps their effects on stock and customer
//! balances in step, one unit of work per operation.
//!
//! ## Effects by Operation
//! ```text
//! ┌────────────────┬──────────────────────────────┬─────────────────────────────┐
//! │ Operation      │ Stock                        │ Customer ledger             │
//! ├────────────────┼──────────────────────────────┼─────────────────────────────┤
//! │ create         │ non-draft: sale per line     │ non-draft + due > 0:        │
//! │                │                              │   one purchase              │
//! │ change_status  │ draft → non-draft: sale      │ never                       │
//! │                │ non-draft → draft: return    │                             │
//! │ update         │ items/status in patch:       │ recorded charge != new      │
//! │                │   old non-draft: adjustment  │ charge: reconcile old       │
//! │                │   then new non-draft: sale   │ customer, charge new one    │
//! │ delete         │ non-draft: return per line   │ reconcile_ledger_on_delete: │
//! │                │                              │   charge reconciled away    │
//! └────────────────┴──────────────────────────────┴─────────────────────────────┘
//! ```
//!
//! Any failing step (unknown product, unit mismatch, insufficient stock,
//! inconsistent totals) aborts the unit of work: nothing is persisted and the
//! invoice number taken from the counter is released with the rollback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::info;

use crate::pool::Database;
use crate::repository::invoice::{self as invoice_repo, InvoiceFilter};
use crate::repository::{customer as customer_repo, generate_id, ledger as ledger_repo, product};
use crate::service::config::EngineConfig;
use crate::service::customer_ledger::{self, InvoiceRef, Replacement};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::stock_ledger::{self, MovementContext};
use crate::service::tax::TaxSettingsProvider;
use crate::service::{bounded, CallerContext};
use khata_core::invoice::{
    compute_due, ledger_charge, price_line, verify_claimed, ClaimedTotals, InvoiceTotals,
    LineInput,
};
use khata_core::receipt::{Receipt, ReceiptRenderer};
use khata_core::stock::{restore_lines, sale_lines};
use khata_core::validation::{validate_amount_paid, validate_invoice_size, validate_optional_text};
use khata_core::{
    format_invoice_number, CustomerRef, Invoice, InvoiceItem, InvoiceStatus, LedgerTransactionKind,
    Money, PaymentMethod, StockMovementKind, TaxRate,
};

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvoiceRequest {
    #[serde(default)]
    pub customer_id: Option<String>,
    pub items: Vec<LineInput>,
    /// Accepts legacy names (`credit`, `mixed`, `upi`). Default: cash.
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Default: draft.
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    #[serde(default)]
    pub amount_paid_cents: Option<i64>,
    /// Default: now.
    #[serde(default)]
    pub invoice_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub claimed: ClaimedTotals,
}

/// Partial update. Absent fields keep their value; `null` clears the
/// customer or the notes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInvoiceRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub customer_id: Option<Option<String>>,
    #[serde(default)]
    pub items: Option<Vec<LineInput>>,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub amount_paid_cents: Option<i64>,
    #[serde(default)]
    pub invoice_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    #[serde(flatten)]
    pub claimed: ClaimedTotals,
}

impl UpdateInvoiceRequest {
    fn touches_stock(&self) -> bool {
        self.items.is_some() || self.status.is_some()
    }
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoicePage {
    pub invoices: Vec<Invoice>,
    /// Matching invoices across all pages.
    pub total: i64,
}

/// A rendered receipt with the MIME type of its body.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub content_type: &'static str,
    pub body: String,
    pub receipt: Receipt,
}

fn parse_method(method: Option<&str>) -> ServiceResult<PaymentMethod> {
    match method.map(str::trim).filter(|m| !m.is_empty()) {
        Some(method) => Ok(method.parse()?),
        None => Ok(PaymentMethod::Cash),
    }
}

fn normalized_id(id: Option<&str>) -> Option<&str> {
    id.map(str::trim).filter(|id| !id.is_empty())
}

// =============================================================================
// Connection-level helpers
// =============================================================================

async fn snapshot_customer(
    conn: &mut SqliteConnection,
    ctx: &CallerContext,
    customer_id: &str,
) -> ServiceResult<CustomerRef> {
    customer_repo::fetch(conn, &ctx.owner_id, customer_id)
        .await?
        .map(|c| c.as_ref_snapshot())
        .ok_or_else(|| ServiceError::not_found("Customer", customer_id))
}

async fn price_lines(
    conn: &mut SqliteConnection,
    ctx: &CallerContext,
    lines: &[LineInput],
) -> ServiceResult<Vec<InvoiceItem>> {
    let mut items = Vec::with_capacity(lines.len());

    for line in lines {
        let product = product::fetch(conn, &ctx.owner_id, &line.product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", &line.product_id))?;
        items.push(price_line(&product, line)?);
    }

    Ok(items)
}

async fn fetch_invoice(
    conn: &mut SqliteConnection,
    ctx: &CallerContext,
    invoice_id: &str,
) -> ServiceResult<Invoice> {
    invoice_repo::fetch(conn, &ctx.owner_id, invoice_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Invoice", invoice_id))
}

/// Purchases currently on the ledger for an invoice, per customer.
async fn recorded_charges(
    conn: &mut SqliteConnection,
    ctx: &CallerContext,
    invoice_id: &str,
) -> ServiceResult<Vec<(String, Money)>> {
    let txs = ledger_repo::list_for_invoice(conn, &ctx.owner_id, invoice_id).await?;

    let mut charges: Vec<(String, Money)> = Vec::new();
    for tx in txs
        .iter()
        .filter(|tx| tx.kind == LedgerTransactionKind::Purchase)
    {
        match charges.iter_mut().find(|(id, _)| *id == tx.customer_id) {
            Some((_, amount)) => *amount += tx.amount(),
            None => charges.push((tx.customer_id.clone(), tx.amount())),
        }
    }

    Ok(charges)
}

/// Brings the ledger in line with the invoice's new charge.
async fn sync_ledger(
    conn: &mut SqliteConnection,
    ctx: &CallerContext,
    invoice: &Invoice,
) -> ServiceResult<()> {
    let recorded = recorded_charges(conn, ctx, &invoice.id).await?;
    let wanted = ledger_charge(invoice);

    if recorded == wanted.iter().cloned().collect::<Vec<_>>() {
        return Ok(());
    }

    let mut charged = false;
    for (customer_id, _) in &recorded {
        let replacement = match &wanted {
            Some((wanted_id, amount)) if wanted_id == customer_id => {
                charged = true;
                Some(Replacement {
                    amount: *amount,
                    invoice_number: invoice.invoice_number.clone(),
                })
            }
            _ => None,
        };
        customer_ledger::reconcile_invoice(conn, ctx, customer_id, &invoice.id, replacement)
            .await?;
    }

    if let (false, Some((customer_id, amount))) = (charged, wanted) {
        let invoice_ref = InvoiceRef {
            invoice_id: &invoice.id,
            invoice_number: &invoice.invoice_number,
        };
        customer_ledger::record_purchase(conn, ctx, &customer_id, amount, Some(invoice_ref))
            .await?;
    }

    Ok(())
}

/// Applies or reverses an invoice's lines against stock.
async fn move_stock(
    conn: &mut SqliteConnection,
    ctx: &CallerContext,
    invoice: &Invoice,
    kind: StockMovementKind,
) -> ServiceResult<()> {
    let lines = match kind {
        StockMovementKind::Sale => sale_lines(&invoice.items),
        _ => restore_lines(&invoice.items),
    };
    let movement = MovementContext::for_invoice(kind, &invoice.id, &invoice.invoice_number);
    stock_ledger::apply_lines(conn, ctx, &lines, &movement).await?;
    Ok(())
}

// =============================================================================
// Service
// =============================================================================

#[derive(Clone)]
pub struct InvoiceManager {
    db: Database,
    config: Arc<EngineConfig>,
    tax: Arc<dyn TaxSettingsProvider>,
}

impl InvoiceManager {
    pub fn new(
        db: Database,
        config: Arc<EngineConfig>,
        tax: Arc<dyn TaxSettingsProvider>,
    ) -> Self {
        InvoiceManager { db, config, tax }
    }

    async fn tax_rate(&self, ctx: &CallerContext) -> ServiceResult<TaxRate> {
        Ok(self.tax.tax_settings(&ctx.owner_id).await?.effective_rate())
    }

    /// Creates an invoice and, unless it is a draft, takes its stock and
    /// charges the customer's due amount.
    pub async fn create(
        &self,
        ctx: &CallerContext,
        request: CreateInvoiceRequest,
    ) -> ServiceResult<Invoice> {
        validate_invoice_size(request.items.len())?;
        let amount_paid = request.amount_paid_cents.unwrap_or(0);
        validate_amount_paid(amount_paid)?;
        let notes = validate_optional_text("notes", request.notes.as_deref())?;
        let payment_method = parse_method(request.payment_method.as_deref())?;
        let status = request.status.unwrap_or_default();

        // Resolved before the unit of work: providers may use the pool
        let rate = self.tax_rate(ctx).await?;

        let invoice = bounded(self.config.operation_timeout, "create_invoice", async {
            let mut uow = self.db.begin().await?;

            let customer = match normalized_id(request.customer_id.as_deref()) {
                Some(id) => Some(snapshot_customer(uow.conn(), ctx, id).await?),
                None => None,
            };

            let items = price_lines(uow.conn(), ctx, &request.items).await?;
            let totals = InvoiceTotals::compute(&items, rate)?;
            verify_claimed(&totals, &request.claimed)?;

            let due = compute_due(payment_method, totals.total(), Money::from_cents(amount_paid));
            let seq = invoice_repo::next_sequence(uow.conn(), &ctx.owner_id).await?;
            let now = Utc::now();

            let invoice = Invoice {
                id: generate_id(),
                owner_id: ctx.owner_id.clone(),
                invoice_number: format_invoice_number(seq),
                invoice_date: request.invoice_date.unwrap_or(now),
                customer,
                items,
                subtotal_cents: totals.subtotal_cents,
                tax_cents: totals.tax_cents,
                total_cents: totals.total_cents,
                status,
                payment_method,
                amount_paid_cents: amount_paid,
                due_amount_cents: due.cents(),
                notes: notes.clone(),
                created_by: ctx.actor.clone(),
                created_at: now,
                updated_at: now,
            };
            invoice_repo::insert(uow.conn(), &invoice).await?;

            if invoice.status.commits_stock() {
                move_stock(uow.conn(), ctx, &invoice, StockMovementKind::Sale).await?;

                if let Some((customer_id, amount)) = ledger_charge(&invoice) {
                    let invoice_ref = InvoiceRef {
                        invoice_id: &invoice.id,
                        invoice_number: &invoice.invoice_number,
                    };
                    customer_ledger::record_purchase(
                        uow.conn(),
                        ctx,
                        &customer_id,
                        amount,
                        Some(invoice_ref),
                    )
                    .await?;
                }
            }

            Ok((uow, invoice))
        })
        .await?;

        info!(
            invoice_id = %invoice.id,
            number = %invoice.invoice_number,
            status = %invoice.status,
            total_cents = invoice.total_cents,
            items = invoice.items.len(),
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Moves an invoice to another status. Only crossing the draft boundary
    /// touches stock; the customer ledger is never touched.
    pub async fn change_status(
        &self,
        ctx: &CallerContext,
        invoice_id: &str,
        new_status: InvoiceStatus,
    ) -> ServiceResult<Invoice> {
        let changed = bounded(self.config.operation_timeout, "change_invoice_status", async {
            let mut uow = self.db.begin().await?;
            let mut invoice = fetch_invoice(uow.conn(), ctx, invoice_id).await?;
            let old_status = invoice.status;

            match (old_status.commits_stock(), new_status.commits_stock()) {
                (false, true) => {
                    move_stock(uow.conn(), ctx, &invoice, StockMovementKind::Sale).await?
                }
                (true, false) => {
                    move_stock(uow.conn(), ctx, &invoice, StockMovementKind::Return).await?
                }
                _ => {}
            }

            if old_status != new_status {
                invoice.status = new_status;
                invoice.updated_at = Utc::now();
                invoice_repo::update(uow.conn(), &invoice).await?;
            }

            Ok((uow, (invoice, old_status)))
        })
        .await?;
        let (invoice, old_status) = changed;

        info!(
            invoice_id = %invoice.id,
            from = %old_status,
            to = %new_status,
            "Invoice status changed"
        );
        Ok(invoice)
    }

    /// Applies a partial update, re-deriving stock and ledger effects.
    pub async fn update(
        &self,
        ctx: &CallerContext,
        invoice_id: &str,
        patch: UpdateInvoiceRequest,
    ) -> ServiceResult<Invoice> {
        if let Some(items) = &patch.items {
            validate_invoice_size(items.len())?;
        }
        if let Some(paid) = patch.amount_paid_cents {
            validate_amount_paid(paid)?;
        }
        let notes = match &patch.notes {
            Some(notes) => Some(validate_optional_text("notes", notes.as_deref())?),
            None => None,
        };
        let payment_method = match patch.payment_method.as_deref() {
            Some(method) => Some(parse_method(Some(method))?),
            None => None,
        };
        let rate = match patch.items {
            Some(_) => Some(self.tax_rate(ctx).await?),
            None => None,
        };

        let next = bounded(self.config.operation_timeout, "update_invoice", async {
            let mut uow = self.db.begin().await?;
            let original = fetch_invoice(uow.conn(), ctx, invoice_id).await?;
            let mut next = original.clone();

            if let Some(customer_id) = &patch.customer_id {
                next.customer = match normalized_id(customer_id.as_deref()) {
                    Some(id) => Some(snapshot_customer(uow.conn(), ctx, id).await?),
                    None => None,
                };
            }

            match (&patch.items, rate) {
                (Some(lines), Some(rate)) => {
                    next.items = price_lines(uow.conn(), ctx, lines).await?;
                    let totals = InvoiceTotals::compute(&next.items, rate)?;
                    verify_claimed(&totals, &patch.claimed)?;
                    next.subtotal_cents = totals.subtotal_cents;
                    next.tax_cents = totals.tax_cents;
                    next.total_cents = totals.total_cents;
                }
                _ => {
                    let stored = InvoiceTotals {
                        subtotal_cents: next.subtotal_cents,
                        tax_cents: next.tax_cents,
                        total_cents: next.total_cents,
                    };
                    verify_claimed(&stored, &patch.claimed)?;
                }
            }

            if let Some(status) = patch.status {
                next.status = status;
            }
            if let Some(method) = payment_method {
                next.payment_method = method;
            }
            if let Some(paid) = patch.amount_paid_cents {
                next.amount_paid_cents = paid;
            }
            if let Some(date) = patch.invoice_date {
                next.invoice_date = date;
            }
            if let Some(notes) = notes.clone() {
                next.notes = notes;
            }
            next.due_amount_cents = compute_due(
                next.payment_method,
                next.total(),
                Money::from_cents(next.amount_paid_cents),
            )
            .cents();
            next.updated_at = Utc::now();

            // Reversal strictly before reapplication
            if patch.touches_stock() {
                if original.status.commits_stock() {
                    move_stock(uow.conn(), ctx, &original, StockMovementKind::Adjustment).await?;
                }
                if next.status.commits_stock() {
                    move_stock(uow.conn(), ctx, &next, StockMovementKind::Sale).await?;
                }
            }

            invoice_repo::update(uow.conn(), &next).await?;
            sync_ledger(uow.conn(), ctx, &next).await?;

            Ok((uow, next))
        })
        .await?;

        info!(
            invoice_id = %next.id,
            status = %next.status,
            total_cents = next.total_cents,
            due_cents = next.due_amount_cents,
            "Invoice updated"
        );
        Ok(next)
    }

    /// Deletes an invoice, returning its stock. With
    /// `reconcile_ledger_on_delete` its charge leaves the customer ledger too.
    pub async fn delete(&self, ctx: &CallerContext, invoice_id: &str) -> ServiceResult<Invoice> {
        let reconcile = self.config.reconcile_ledger_on_delete;

        let invoice = bounded(self.config.operation_timeout, "delete_invoice", async {
            let mut uow = self.db.begin().await?;
            let invoice = fetch_invoice(uow.conn(), ctx, invoice_id).await?;

            if invoice.status.commits_stock() {
                move_stock(uow.conn(), ctx, &invoice, StockMovementKind::Return).await?;
            }

            if reconcile {
                for (customer_id, _) in recorded_charges(uow.conn(), ctx, &invoice.id).await? {
                    customer_ledger::reconcile_invoice(
                        uow.conn(),
                        ctx,
                        &customer_id,
                        &invoice.id,
                        None,
                    )
                    .await?;
                }
            }

            invoice_repo::delete(uow.conn(), &ctx.owner_id, &invoice.id).await?;
            Ok((uow, invoice))
        })
        .await?;

        info!(
            invoice_id = %invoice.id,
            number = %invoice.invoice_number,
            reconciled = reconcile,
            "Invoice deleted"
        );
        Ok(invoice)
    }

    pub async fn get(&self, ctx: &CallerContext, invoice_id: &str) -> ServiceResult<Invoice> {
        self.db
            .invoices()
            .get_by_id(&ctx.owner_id, invoice_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Invoice", invoice_id))
    }

    pub async fn list(
        &self,
        ctx: &CallerContext,
        filter: &InvoiceFilter,
    ) -> ServiceResult<InvoicePage> {
        if let Some(search) = &filter.search {
            khata_core::validation::validate_search_query(search)?;
        }

        let repo = self.db.invoices();
        let invoices = repo.list(&ctx.owner_id, filter).await?;
        let total = repo.count(&ctx.owner_id, filter).await?;

        Ok(InvoicePage { invoices, total })
    }

    /// Renders a receipt. Read-only, outside any unit of work.
    pub async fn generate_artifact(
        &self,
        ctx: &CallerContext,
        invoice_id: &str,
        renderer: &dyn ReceiptRenderer,
    ) -> ServiceResult<Artifact> {
        let invoice = self.get(ctx, invoice_id).await?;
        let receipt = Receipt::from_invoice(&invoice, &self.config.store_name);

        Ok(Artifact {
            content_type: renderer.content_type(),
            body: renderer.render(&receipt),
            receipt,
        })
    }
}

impl std::fmt::Debug for InvoiceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvoiceManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method_defaults_and_legacy() {
        assert_eq!(parse_method(None).unwrap(), PaymentMethod::Cash);
        assert_eq!(parse_method(Some("  ")).unwrap(), PaymentMethod::Cash);
        assert_eq!(parse_method(Some("credit")).unwrap(), PaymentMethod::Due);
        assert!(parse_method(Some("barter")).is_err());
    }

    #[test]
    fn test_update_request_distinguishes_null_from_absent() {
        let patch: UpdateInvoiceRequest = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(patch.notes, Some(None));
        assert_eq!(patch.customer_id, None);
        assert!(!patch.touches_stock());

        let patch: UpdateInvoiceRequest =
            serde_json::from_str(r#"{"status": "final", "total_cents": 8000}"#).unwrap();
        assert!(patch.touches_stock());
        assert_eq!(patch.claimed.total_cents, Some(8000));
    }

    #[test]
    fn test_create_request_reads_claimed_totals() {
        let request: CreateInvoiceRequest = serde_json::from_str(
            r#"{
                "items": [{"product_id": "p1", "quantity": 1.5}],
                "payment_method": "due",
                "subtotal_cents": 7500
            }"#,
        )
        .unwrap();

        assert_eq!(request.items[0].quantity, khata_core::Quantity::from_milli(1500));
        assert_eq!(request.claimed.subtotal_cents, Some(7500));
        assert!(request.status.is_none());
    }
}
