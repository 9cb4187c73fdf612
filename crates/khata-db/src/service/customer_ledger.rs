//! # Customer Balance Ledger
//!
//! Owns each customer's signed running balance. Every balance change writes
//! one ledger transaction with before/after snapshots and updates the
//! customer's denormalized aggregates in the same unit of work.
//!
//! ## Reconciliation
//! ```text
//! reconcile_invoice(customer, invoice, replacement?)
//!   │
//!   ├── delete the customer's transactions for this invoice
//!   ├── load the rest (insertion order)
//!   ├── ledger::rebase ── stable sort by date, replay from 0,
//!   │                      rewrite every before/after snapshot
//!   ├── customer::set_totals(replayed aggregates)
//!   └── replacement? → record_purchase(new amount, same invoice)
//! ```
//!
//! The ledger never deduplicates. Callers record at most one purchase per
//! invoice transition and reconcile when an invoice's charge changes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, info};

use crate::pool::Database;
use crate::repository::{customer, generate_id, ledger as ledger_repo};
use crate::service::config::EngineConfig;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::{bounded, CallerContext};
use khata_core::ledger::{self, LedgerTotals};
use khata_core::validation::{
    validate_email, validate_name, validate_optional_text, validate_payment_amount,
    validate_phone, validate_search_query,
};
use khata_core::{Customer, LedgerTransaction, LedgerTransactionKind, Money, PaymentMode};

// =============================================================================
// Requests / Reports
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub amount_cents: i64,
    #[serde(default)]
    pub payment_mode: PaymentMode,
    #[serde(default)]
    pub note: Option<String>,
}

/// The invoice a purchase belongs to.
#[derive(Debug, Clone, Copy)]
pub struct InvoiceRef<'a> {
    pub invoice_id: &'a str,
    pub invoice_number: &'a str,
}

/// Purchase appended after a reconciliation.
#[derive(Debug, Clone)]
pub struct Replacement {
    pub amount: Money,
    pub invoice_number: String,
}

#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// Transactions deleted for the invoice.
    pub removed: u64,
    /// Balance after the replay and the optional replacement.
    pub amount_due: Money,
    pub replacement: Option<LedgerTransaction>,
}

/// Outcome of replaying a customer's ledger against the stored balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceReport {
    pub customer_id: String,
    pub amount_due_cents: i64,
    pub replayed_cents: i64,
    /// Transactions whose `balance_before` doesn't chain from the previous
    /// `balance_after`.
    pub snapshot_breaks: usize,
    pub consistent: bool,
}

// =============================================================================
// Connection-level operations
// =============================================================================

async fn fetch_customer(
    conn: &mut SqliteConnection,
    ctx: &CallerContext,
    customer_id: &str,
) -> ServiceResult<Customer> {
    customer::fetch(conn, &ctx.owner_id, customer_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Customer", customer_id))
}

struct Posting<'a> {
    kind: LedgerTransactionKind,
    amount: Money,
    invoice: Option<InvoiceRef<'a>>,
    payment_mode: Option<PaymentMode>,
    description: String,
}

async fn post(
    conn: &mut SqliteConnection,
    ctx: &CallerContext,
    customer_id: &str,
    posting: Posting<'_>,
) -> ServiceResult<LedgerTransaction> {
    validate_payment_amount(posting.amount.cents())?;

    let current = fetch_customer(conn, ctx, customer_id).await?;
    let before = current.amount_due();
    let after = ledger::apply_balance(posting.kind, before, posting.amount)?;
    let now = Utc::now();

    let tx = LedgerTransaction {
        id: generate_id(),
        owner_id: ctx.owner_id.clone(),
        customer_id: current.id.clone(),
        kind: posting.kind,
        amount_cents: posting.amount.cents(),
        transaction_date: now,
        invoice_id: posting.invoice.map(|r| r.invoice_id.to_string()),
        invoice_number: posting.invoice.map(|r| r.invoice_number.to_string()),
        balance_before_cents: before.cents(),
        balance_after_cents: after.cents(),
        payment_mode: posting.payment_mode,
        description: posting.description,
        actor: ctx.actor.clone(),
        created_at: now,
    };
    ledger_repo::insert(conn, &tx).await?;

    let mut totals = LedgerTotals {
        amount_due: before,
        total_purchases: Money::from_cents(current.total_purchases_cents),
        total_payments: Money::from_cents(current.total_payments_cents),
        last_transaction_date: current.last_transaction_date,
    };
    totals.record(posting.kind, posting.amount, after, now)?;
    customer::set_totals(conn, &current.id, &totals, now).await?;

    debug!(
        customer_id = %current.id,
        kind = posting.kind.as_str(),
        before = %before,
        after = %after,
        "Balance updated"
    );

    Ok(tx)
}

/// Customer bought on credit: balance goes up by `amount`.
pub async fn record_purchase(
    conn: &mut SqliteConnection,
    ctx: &CallerContext,
    customer_id: &str,
    amount: Money,
    invoice: Option<InvoiceRef<'_>>,
) -> ServiceResult<LedgerTransaction> {
    let posting = Posting {
        kind: LedgerTransactionKind::Purchase,
        amount,
        invoice,
        payment_mode: None,
        description: ledger::describe_purchase(invoice.map(|r| r.invoice_number)),
    };
    post(conn, ctx, customer_id, posting).await
}

/// Customer paid: balance goes down, possibly below zero (advance).
pub async fn record_payment(
    conn: &mut SqliteConnection,
    ctx: &CallerContext,
    customer_id: &str,
    amount: Money,
    mode: PaymentMode,
    note: Option<&str>,
) -> ServiceResult<LedgerTransaction> {
    let posting = Posting {
        kind: LedgerTransactionKind::Payment,
        amount,
        invoice: None,
        payment_mode: Some(mode),
        description: ledger::describe_payment(mode, note),
    };
    post(conn, ctx, customer_id, posting).await
}

/// Removes an invoice's transactions, replays the rest chronologically and
/// optionally appends a replacement purchase for the invoice.
pub async fn reconcile_invoice(
    conn: &mut SqliteConnection,
    ctx: &CallerContext,
    customer_id: &str,
    invoice_id: &str,
    replacement: Option<Replacement>,
) -> ServiceResult<ReconcileOutcome> {
    let current = fetch_customer(conn, ctx, customer_id).await?;

    let removed = ledger_repo::delete_for_invoice(conn, &current.id, invoice_id).await?;

    let mut remaining = ledger_repo::list_for_customer(conn, &ctx.owner_id, &current.id).await?;
    let totals = ledger::rebase(&mut remaining)?;

    for tx in &remaining {
        ledger_repo::set_snapshot(conn, &tx.id, tx.balance_before_cents, tx.balance_after_cents)
            .await?;
    }
    customer::set_totals(conn, &current.id, &totals, Utc::now()).await?;

    debug!(
        customer_id = %current.id,
        invoice_id = %invoice_id,
        removed,
        replayed = remaining.len(),
        amount_due = %totals.amount_due,
        "Ledger replayed"
    );

    let replacement = match replacement {
        Some(Replacement {
            amount,
            invoice_number,
        }) => {
            let invoice = InvoiceRef {
                invoice_id,
                invoice_number: &invoice_number,
            };
            Some(record_purchase(conn, ctx, &current.id, amount, Some(invoice)).await?)
        }
        None => None,
    };

    let amount_due = replacement
        .as_ref()
        .map_or(totals.amount_due, |tx| Money::from_cents(tx.balance_after_cents));

    Ok(ReconcileOutcome {
        removed,
        amount_due,
        replacement,
    })
}

// =============================================================================
// Service
// =============================================================================

/// Standalone customer operations, each in its own unit of work.
#[derive(Debug, Clone)]
pub struct CustomerLedger {
    db: Database,
    config: Arc<EngineConfig>,
}

impl CustomerLedger {
    pub fn new(db: Database, config: Arc<EngineConfig>) -> Self {
        CustomerLedger { db, config }
    }

    pub async fn create_customer(
        &self,
        ctx: &CallerContext,
        request: NewCustomer,
    ) -> ServiceResult<Customer> {
        let name = validate_name("name", &request.name)?;
        let phone = validate_optional_text("phone", request.phone.as_deref())?;
        if let Some(phone) = &phone {
            validate_phone(phone)?;
        }
        let email = validate_optional_text("email", request.email.as_deref())?;
        if let Some(email) = &email {
            validate_email(email)?;
        }
        let address = validate_optional_text("address", request.address.as_deref())?;

        let now = Utc::now();
        let new_customer = Customer {
            id: generate_id(),
            owner_id: ctx.owner_id.clone(),
            name,
            phone,
            email,
            address,
            amount_due_cents: 0,
            total_purchases_cents: 0,
            total_payments_cents: 0,
            last_transaction_date: None,
            created_at: now,
            updated_at: now,
        };

        bounded(self.config.operation_timeout, "create_customer", async {
            let mut uow = self.db.begin().await?;
            customer::insert(uow.conn(), &new_customer).await?;
            Ok((uow, ()))
        })
        .await?;

        info!(customer_id = %new_customer.id, name = %new_customer.name, "Customer created");
        Ok(new_customer)
    }

    pub async fn get_customer(
        &self,
        ctx: &CallerContext,
        customer_id: &str,
    ) -> ServiceResult<Customer> {
        self.db
            .customers()
            .get_by_id(&ctx.owner_id, customer_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Customer", customer_id))
    }

    pub async fn list_customers(
        &self,
        ctx: &CallerContext,
        search: &str,
        limit: u32,
        offset: u32,
    ) -> ServiceResult<Vec<Customer>> {
        let search = validate_search_query(search)?;
        Ok(self
            .db
            .customers()
            .search(&ctx.owner_id, &search, limit, offset)
            .await?)
    }

    pub async fn record_payment(
        &self,
        ctx: &CallerContext,
        customer_id: &str,
        request: PaymentRequest,
    ) -> ServiceResult<LedgerTransaction> {
        validate_payment_amount(request.amount_cents)?;
        let note = validate_optional_text("note", request.note.as_deref())?;

        let tx = bounded(self.config.operation_timeout, "record_payment", async {
            let mut uow = self.db.begin().await?;
            let tx = record_payment(
                uow.conn(),
                ctx,
                customer_id,
                Money::from_cents(request.amount_cents),
                request.payment_mode,
                note.as_deref(),
            )
            .await?;
            Ok((uow, tx))
        })
        .await?;

        info!(
            customer_id = %customer_id,
            amount_cents = tx.amount_cents,
            balance_after = tx.balance_after_cents,
            "Payment recorded"
        );
        Ok(tx)
    }

    pub async fn record_purchase(
        &self,
        ctx: &CallerContext,
        customer_id: &str,
        amount: Money,
        invoice: Option<InvoiceRef<'_>>,
    ) -> ServiceResult<LedgerTransaction> {
        let tx = bounded(self.config.operation_timeout, "record_purchase", async {
            let mut uow = self.db.begin().await?;
            let tx = record_purchase(uow.conn(), ctx, customer_id, amount, invoice).await?;
            Ok((uow, tx))
        })
        .await?;

        info!(customer_id = %customer_id, amount_cents = tx.amount_cents, "Purchase recorded");
        Ok(tx)
    }

    /// Transactions in the order they were written.
    pub async fn transactions(
        &self,
        ctx: &CallerContext,
        customer_id: &str,
    ) -> ServiceResult<Vec<LedgerTransaction>> {
        self.get_customer(ctx, customer_id).await?;
        Ok(self
            .db
            .ledger()
            .list_for_customer(&ctx.owner_id, customer_id)
            .await?)
    }

    pub async fn reconcile_invoice(
        &self,
        ctx: &CallerContext,
        customer_id: &str,
        invoice_id: &str,
        replacement: Option<Replacement>,
    ) -> ServiceResult<ReconcileOutcome> {
        let outcome = bounded(self.config.operation_timeout, "reconcile_invoice", async {
            let mut uow = self.db.begin().await?;
            let outcome =
                reconcile_invoice(uow.conn(), ctx, customer_id, invoice_id, replacement).await?;
            Ok((uow, outcome))
        })
        .await?;

        info!(
            customer_id = %customer_id,
            invoice_id = %invoice_id,
            removed = outcome.removed,
            amount_due = %outcome.amount_due,
            "Invoice reconciled"
        );
        Ok(outcome)
    }

    /// Replays the ledger from zero and compares with the stored balance.
    pub async fn verify_balance(
        &self,
        ctx: &CallerContext,
        customer_id: &str,
    ) -> ServiceResult<BalanceReport> {
        let current = self.get_customer(ctx, customer_id).await?;
        let mut txs = self
            .db
            .ledger()
            .list_for_customer(&ctx.owner_id, customer_id)
            .await?;

        let replayed = ledger::replay_balance(&txs)?;

        txs.sort_by_key(|tx| tx.transaction_date);
        let mut running = 0;
        let mut snapshot_breaks = 0;
        for tx in &txs {
            let expected = ledger::apply_balance(tx.kind, Money::from_cents(running), tx.amount())?;
            if tx.balance_before_cents != running || tx.balance_after_cents != expected.cents() {
                snapshot_breaks += 1;
            }
            running = tx.balance_after_cents;
        }

        let consistent = snapshot_breaks == 0 && replayed == current.amount_due();
        Ok(BalanceReport {
            customer_id: current.id,
            amount_due_cents: current.amount_due_cents,
            replayed_cents: replayed.cents(),
            snapshot_breaks,
            consistent,
        })
    }
}
